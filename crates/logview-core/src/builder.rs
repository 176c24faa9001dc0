//! Section builder
//!
//! Derives the ordered section list and per-section state from an execution
//! node. Prior state is carried over only while the selected step stays the
//! same; a new step starts from scratch and drops every stale key.

use crate::node::{ExecutionNode, UnitProgress};
use crate::status::{self, ExecutionStatus, SectionStatus};
use crate::types::{DataSource, LogViewState, SectionState, UnitKey};
use std::collections::{HashMap, HashSet};

/// Input of [`create_sections`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSectionsPayload {
    /// Node to build from; `None` leaves the state untouched
    pub node: Option<ExecutionNode>,
    /// Step the node belongs to
    pub selected_step: String,
}

impl CreateSectionsPayload {
    /// Payload for a node of a step
    #[must_use]
    pub fn new(node: ExecutionNode, selected_step: impl Into<String>) -> Self {
        Self {
            node: Some(node),
            selected_step: selected_step.into(),
        }
    }
}

/// One unit resolved from the descriptor
struct UnitSpec<'a> {
    title: String,
    log_key: &'a str,
    status: ExecutionStatus,
    progress: Option<&'a UnitProgress>,
}

/// Rebuild sections for a node.
#[must_use]
pub fn create_sections(state: &LogViewState, payload: &CreateSectionsPayload) -> LogViewState {
    let Some(node) = payload.node.as_ref() else {
        return state.clone();
    };

    let is_same_step = state.selected_step.as_deref() == Some(payload.selected_step.as_str());
    let specs = resolve_units(node);

    let mut units = im::Vector::new();
    let mut data_map = im::HashMap::new();
    let mut seen = HashSet::new();

    for spec in specs {
        if !seen.insert(spec.log_key) {
            continue;
        }

        let key = UnitKey::new(spec.log_key);
        let prev = if is_same_step {
            state.data_map.get(&key)
        } else {
            None
        };

        let unit_status = SectionStatus::from(spec.status);
        let is_running = status::is_running_like(spec.status);

        let section_status = match prev {
            Some(p) if p.status.is_non_mutate() && is_running => p.status,
            _ => unit_status,
        };

        let section = SectionState {
            title: spec.title,
            status: section_status,
            unit_status,
            is_open: match prev {
                Some(p) if p.manually_toggled => p.is_open,
                _ => is_running,
            },
            manually_toggled: prev.is_some_and(|p| p.manually_toggled),
            data_source: if is_running {
                DataSource::Stream
            } else {
                DataSource::Blob
            },
            log_key: spec.log_key.to_string(),
            data: prev.map(|p| p.data.clone()).unwrap_or_default(),
            start_time: spec.progress.and_then(|p| p.start_time),
            end_time: spec.progress.and_then(|p| p.end_time),
        };

        units.push_back(key.clone());
        data_map.insert(key, section);
    }

    if let Some(key) = pick_auto_open(node.status, &units, &data_map) {
        if let Some(section) = data_map.get_mut(&key) {
            if section.status != SectionStatus::Queued {
                section.status = SectionStatus::Loading;
            }
        }
    }

    tracing::debug!(
        step = %payload.selected_step,
        units = units.len(),
        same_step = is_same_step,
        "rebuilt log sections"
    );

    LogViewState {
        units,
        data_map,
        selected_step: Some(payload.selected_step.clone()),
        search: state.search.clone(),
    }
}

/// Resolve unit names, keys and statuses from the first executable response.
fn resolve_units(node: &ExecutionNode) -> Vec<UnitSpec<'_>> {
    let Some(descriptor) = node.descriptor() else {
        return Vec::new();
    };

    if descriptor.units.is_empty() {
        return descriptor
            .log_keys
            .iter()
            .enumerate()
            .map(|(i, key)| UnitSpec {
                title: format!("Section {}", i + 1),
                log_key: key,
                status: node.status,
                progress: None,
            })
            .collect();
    }

    let progress: HashMap<&str, &UnitProgress> = node
        .unit_progresses
        .iter()
        .map(|p| (p.unit_name.as_str(), p))
        .collect();

    descriptor
        .units
        .iter()
        .zip(descriptor.log_keys.iter())
        .map(|(name, key)| {
            let entry = progress.get(name.as_str()).copied();
            UnitSpec {
                title: name.clone(),
                log_key: key,
                status: entry.map_or(ExecutionStatus::NotStarted, |p| p.status),
                progress: entry,
            }
        })
        .collect()
}

/// Pick the single unit whose data is fetched automatically.
///
/// Complete and successful: the first unit. Complete and unsuccessful: the
/// first failed unit. Otherwise the last running unit.
#[must_use]
pub fn pick_auto_open(
    node_status: ExecutionStatus,
    units: &im::Vector<UnitKey>,
    data_map: &im::HashMap<UnitKey, SectionState>,
) -> Option<UnitKey> {
    let unit_status = |key: &UnitKey| data_map.get(key).map(|s| s.unit_status);

    if status::is_complete(node_status) {
        if status::is_success(node_status) {
            units.front().cloned()
        } else {
            units
                .iter()
                .find(|key| unit_status(key) == Some(SectionStatus::Failure))
                .cloned()
        }
    } else {
        units
            .iter()
            .rev()
            .find(|key| unit_status(key) == Some(SectionStatus::Running))
            .cloned()
    }
}
