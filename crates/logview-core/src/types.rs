//! Core types for the log view state
//!
//! Defines:
//! - Unit keys and log lines
//! - Per-section state
//! - Global search state
//! - The complete [`LogViewState`] snapshot
//!
//! Collections are `im` persistent structures so every reducer call can
//! return a new snapshot while sharing unchanged sections with the old one.

use crate::status::SectionStatus;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Opaque identifier of one log section, unique within a selected step
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitKey(String);

impl UnitKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UnitKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UnitKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Searchable field of a log line, in match-numbering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogField {
    /// Log level
    Level,
    /// Timestamp text
    Time,
    /// Message
    Out,
}

impl LogField {
    /// Fixed scan order used by search
    pub const ORDER: [LogField; 3] = [LogField::Level, LogField::Time, LogField::Out];
}

/// Sanitized text fields of one line
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineText {
    /// Log level
    pub level: String,
    /// Timestamp text
    pub time: String,
    /// Message
    pub out: String,
}

impl LineText {
    /// Field value
    #[inline]
    #[must_use]
    pub fn field(&self, field: LogField) -> &str {
        match field {
            LogField::Level => &self.level,
            LogField::Time => &self.time,
            LogField::Out => &self.out,
        }
    }
}

/// Field to global match indices found in that field
pub type SearchIndices = BTreeMap<LogField, Vec<usize>>;

/// One rendered log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    /// Line fields
    pub text: LineText,
    /// Matches of the current query, absent when the line has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_indices: Option<SearchIndices>,
}

impl LogLine {
    /// Line without search markers
    #[must_use]
    pub fn new(
        level: impl Into<String>,
        time: impl Into<String>,
        out: impl Into<String>,
    ) -> Self {
        Self {
            text: LineText {
                level: level.into(),
                time: time.into(),
                out: out.into(),
            },
            search_indices: None,
        }
    }
}

/// Where a section's data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// One-shot archival retrieval
    #[default]
    Blob,
    /// Live push retrieval
    Stream,
}

/// State of one log section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionState {
    /// Display label
    pub title: String,
    /// Lifecycle status shown to the renderer
    pub status: SectionStatus,
    /// Last known execution status of the unit
    pub unit_status: SectionStatus,
    /// Expanded for rendering and search
    pub is_open: bool,
    /// A human toggled `is_open` at least once
    pub manually_toggled: bool,
    /// Retrieval strategy, fixed per rebuild
    pub data_source: DataSource,
    /// Backend retrieval key
    pub log_key: String,
    /// Parsed lines in arrival order
    pub data: im::Vector<LogLine>,
    /// Unit start, epoch millis
    pub start_time: Option<i64>,
    /// Unit end, epoch millis
    pub end_time: Option<i64>,
}

impl SectionState {
    /// Elapsed execution time measured against `now_ms` when the unit has
    /// no end time yet
    #[must_use]
    pub fn duration_at(&self, now_ms: i64) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or(now_ms);
        u64::try_from(end.saturating_sub(start))
            .ok()
            .map(Duration::from_millis)
    }

    /// Elapsed execution time, using the wall clock for running units
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration_at(chrono::Utc::now().timestamp_millis())
    }
}

/// Global search state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    /// Current query; empty disables search
    pub text: String,
    /// Index into the flattened match list
    pub current_index: usize,
    /// Line position of every match, in render order
    pub lines_with_results: im::Vector<usize>,
}

impl SearchState {
    /// Total number of matches
    #[inline]
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.lines_with_results.len()
    }

    /// Whether the match with this global index is the highlighted one
    #[inline]
    #[must_use]
    pub fn is_current(&self, global_index: usize) -> bool {
        !self.text.is_empty() && global_index == self.current_index
    }

    /// Line position of the highlighted match
    #[must_use]
    pub fn current_line(&self) -> Option<usize> {
        self.lines_with_results.get(self.current_index).copied()
    }
}

/// Complete log view state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogViewState {
    /// Section keys in declaration order
    pub units: im::Vector<UnitKey>,
    /// Section state by key
    pub data_map: im::HashMap<UnitKey, SectionState>,
    /// Step the sections were built for
    pub selected_step: Option<String>,
    /// Search state
    pub search: SearchState,
}

impl LogViewState {
    /// Empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Section by key
    #[inline]
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&SectionState> {
        self.data_map.get(key)
    }

    /// Sections in declaration order
    pub fn sections(&self) -> impl Iterator<Item = (&UnitKey, &SectionState)> {
        self.units
            .iter()
            .filter_map(|key| self.data_map.get(key).map(|section| (key, section)))
    }

    /// Every unit settled: no fetch in flight
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.sections().all(|(_, s)| !s.status.is_non_mutate())
    }
}
