use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use logview_core::view::{self, Row};
use logview_core::ExecutionNode;
use logview_fetch::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("logview")
        .version(logview_fetch::VERSION)
        .about("Follow the log sections of a pipeline step")
        .subcommand_required(true)
        .subcommand(
            Command::new("tail")
                .about("Load the sections of a node and print the open ones")
                .arg(
                    Arg::new("node")
                        .long("node")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Execution node JSON file"),
                )
                .arg(
                    Arg::new("step")
                        .long("step")
                        .required(true)
                        .help("Selected step identifier"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("token")
                        .long("token")
                        .env("LOGVIEW_TOKEN")
                        .help("Bearer token for the retrieval services"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Highlight lines matching this text"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .default_value("30")
                        .value_parser(value_parser!(u64))
                        .help("Seconds to wait for sections to settle"),
                )
                .arg(
                    Arg::new("log-level")
                        .long("log-level")
                        .default_value("info")
                        .help("Log filter used when RUST_LOG is unset"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("tail", args)) => tail(args).await,
        _ => Ok(()),
    }
}

async fn tail(args: &ArgMatches) -> Result<()> {
    let level = args
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => LogViewConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LogViewConfig::default(),
    };

    let node_path = args
        .get_one::<PathBuf>("node")
        .context("--node is required")?;
    let raw = std::fs::read_to_string(node_path)
        .with_context(|| format!("reading node {}", node_path.display()))?;
    let node: ExecutionNode = serde_json::from_str(&raw)
        .with_context(|| format!("parsing node {}", node_path.display()))?;
    let step = args
        .get_one::<String>("step")
        .context("--step is required")?
        .clone();
    let timeout = Duration::from_secs(args.get_one::<u64>("timeout").copied().unwrap_or(30));

    let tokens = Arc::new(SharedToken::new(args.get_one::<String>("token").cloned()));
    let orchestrator = LogOrchestrator::new(
        config.clone(),
        BlobCache::new(config.cache_capacity),
        tokens,
        Arc::new(HttpBlobService::new(&config).context("blob service")?),
        Arc::new(WsStreamService::new(&config)),
    );

    let mut updates = orchestrator.subscribe();
    orchestrator.on_node_update(Some(node), step);

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    loop {
        if orchestrator.snapshot().is_settled() || orchestrator.is_idle() {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            () = &mut deadline => {
                tracing::warn!(?timeout, "sections did not settle in time");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                orchestrator.reconcile();
            }
        }
    }

    if let Some(query) = args.get_one::<String>("search") {
        orchestrator.search(query.clone());
    }

    print_state(&orchestrator.snapshot());
    orchestrator.shutdown().await;
    Ok(())
}

fn print_state(state: &LogViewState) {
    for line in render(state) {
        println!("{line}");
    }
}

/// Text lines for the sections of a state, current search hit marked `>`
/// and other hits `*`.
fn render(state: &LogViewState) -> Vec<String> {
    let current_row = state
        .search
        .current_line()
        .and_then(|position| view::row_of_position(state, position));

    let mut out = Vec::new();
    for (row_index, row) in view::rows(state).into_iter().enumerate() {
        match row {
            Row::Header { section, .. } => {
                let duration = section
                    .duration()
                    .map(|d| format!(" {:.1}s", d.as_secs_f64()))
                    .unwrap_or_default();
                out.push(format!(
                    "== {} [{:?}]{} ({} lines)",
                    section.title,
                    section.status,
                    duration,
                    section.data.len()
                ));
            }
            Row::Line { line, .. } => {
                let marker = if current_row == Some(row_index) {
                    '>'
                } else if line.search_indices.is_some() {
                    '*'
                } else {
                    ' '
                };
                out.push(format!(
                    "{marker} {} {:<5} {}",
                    line.text.time, line.text.level, line.text.out
                ));
            }
        }
    }

    let counts = view::group_counts(state);
    let shown: usize = counts.iter().sum();
    let total: usize = state.sections().map(|(_, s)| s.data.len()).sum();
    out.push(format!("-- {shown} of {total} lines shown in {} sections", counts.len()));

    if !state.search.text.is_empty() {
        out.push(format!(
            "-- {} matches for {:?}",
            state.search.result_count(),
            state.search.text
        ));
    }
    out
}
