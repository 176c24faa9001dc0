//! Stream fetcher tests: throttling, error handling and teardown

use logview_core::prelude::*;
use logview_fetch::{SharedToken, Store, StreamEvent, StreamFetcher, StreamHandle, TokenGate};
use logview_test_utils::{
    line, node_with_units, settle, ChannelStreamService, StreamConnect, StreamSender, TOKEN,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const KEY: &str = "logKey1";
const THROTTLE: Duration = Duration::from_secs(2);

struct Fixture {
    store: Store,
    tokens: Arc<SharedToken>,
    service: Arc<ChannelStreamService>,
    fetcher: StreamFetcher,
}

fn fixture(token: Option<&str>) -> Fixture {
    let node = node_with_units(
        ExecutionStatus::Running,
        &[("Run", KEY, ExecutionStatus::Running)],
    );
    let store = Store::with_state(reduce(
        &LogViewState::new(),
        &Action::CreateSections(CreateSectionsPayload::new(node, "step")),
    ));
    let tokens = Arc::new(SharedToken::new(token.map(str::to_string)));
    let service = Arc::new(ChannelStreamService::new());
    let fetcher = StreamFetcher::new(
        store.clone(),
        TokenGate::new(tokens.clone(), Duration::from_millis(300)),
        service.clone(),
        "acc",
        THROTTLE,
    );
    Fixture {
        store,
        tokens,
        service,
        fetcher,
    }
}

impl Fixture {
    fn open(&self) -> StreamHandle {
        self.fetcher
            .open(UnitKey::from(KEY), KEY.to_string(), &CancellationToken::new())
    }

    fn section(&self) -> SectionState {
        self.store.snapshot().section(KEY).cloned().unwrap()
    }

    fn outs(&self) -> Vec<String> {
        self.section().data.iter().map(|l| l.text.out.clone()).collect()
    }
}

fn send(tx: &StreamSender, out: &str) {
    tx.unbounded_send(Ok(StreamEvent::Message(line("info", "1", out))))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn publishes_at_most_once_per_interval_without_dropping_data() {
    let fx = fixture(Some(TOKEN));
    let tx = fx.service.channel(KEY);
    let handle = fx.open();

    send(&tx, "one");
    settle().await;
    assert_eq!(fx.outs(), vec!["one"]);
    assert_eq!(fx.section().status, SectionStatus::Queued);

    send(&tx, "two");
    send(&tx, "three");
    settle().await;
    assert_eq!(fx.outs(), vec!["one"]);

    tokio::time::sleep(THROTTLE + Duration::from_millis(100)).await;
    assert_eq!(fx.outs(), vec!["one", "two", "three"]);

    assert_eq!(
        fx.service.connects(),
        vec![StreamConnect {
            account_id: "acc".into(),
            log_key: KEY.into(),
            token: TOKEN.into(),
        }]
    );
    handle.close();
}

#[tokio::test(start_paused = true)]
async fn error_event_closes_and_resets() {
    let fx = fixture(Some(TOKEN));
    let tx = fx.service.channel(KEY);
    let handle = fx.open();

    send(&tx, "one");
    settle().await;
    send(&tx, "two");
    tx.unbounded_send(Ok(StreamEvent::Error("boom".into())))
        .unwrap();
    settle().await;

    assert!(handle.is_closed());
    assert!(tx.is_closed());
    let section = fx.section();
    assert_eq!(section.status, SectionStatus::Running);
    assert!(!section.is_open);
    assert_eq!(fx.outs(), vec!["one", "two"]);
}

#[tokio::test(start_paused = true)]
async fn transport_error_closes_and_resets() {
    let errors = [
        logview_fetch::FetchError::Stream("reset by peer".into()),
        logview_fetch::FetchError::InvalidEndpoint("ws://".into()),
    ];
    for err in errors {
        let fx = fixture(Some(TOKEN));
        let tx = fx.service.channel(KEY);
        let handle = fx.open();

        tx.unbounded_send(Err(err)).unwrap();
        settle().await;

        assert!(handle.is_closed());
        assert!(!fx.section().is_open);
    }
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent_and_nothing_publishes_after() {
    let fx = fixture(Some(TOKEN));
    let tx = fx.service.channel(KEY);
    let handle = fx.open();

    send(&tx, "one");
    settle().await;
    send(&tx, "two");
    settle().await;

    handle.close();
    handle.close();
    settle().await;
    tokio::time::sleep(THROTTLE * 2).await;

    assert!(handle.is_closed());
    assert_eq!(fx.outs(), vec!["one"]);
    handle.join().await;
}

#[tokio::test(start_paused = true)]
async fn stream_end_flushes_once() {
    let fx = fixture(Some(TOKEN));
    let tx = fx.service.channel(KEY);
    let handle = fx.open();

    send(&tx, "one");
    settle().await;
    send(&tx, "two");
    drop(tx);
    settle().await;

    assert_eq!(fx.outs(), vec!["one", "two"]);
    assert!(handle.is_closed());
    assert!(fx.section().is_open);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_resets() {
    let fx = fixture(Some(TOKEN));
    let handle = fx.open();
    settle().await;

    assert!(handle.is_closed());
    let section = fx.section();
    assert_eq!(section.status, SectionStatus::Running);
    assert!(!section.is_open);
}

#[tokio::test(start_paused = true)]
async fn waits_for_token_before_connecting() {
    let fx = fixture(None);
    let _tx = fx.service.channel(KEY);
    let handle = fx.open();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(fx.service.connects().is_empty());
    assert!(!handle.is_closed());

    fx.tokens.set(TOKEN);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fx.service.connects().len(), 1);
    assert_eq!(fx.section().status, SectionStatus::Queued);
    handle.close();
}
