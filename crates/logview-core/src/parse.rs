//! Log text parsing
//!
//! Raw section text is newline delimited; each non-empty line is a JSON
//! record with `level`, `time` and `out`. Lines that fail to parse are
//! dropped and never reach the state.

use crate::sanitize::escape_markup;
use crate::types::{LineText, LogLine};
use serde_json::Value;

/// Errors parsing a single log record
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Not valid JSON
    #[error("invalid log record: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON but not an object
    #[error("log record is not an object")]
    NotAnObject,
}

/// Parse one record into a sanitized line.
///
/// # Errors
/// Returns [`ParseError`] when the line is not a JSON object.
pub fn parse_line(raw: &str) -> Result<LogLine, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(record) = value else {
        return Err(ParseError::NotAnObject);
    };

    let field = |name: &str| -> String {
        match record.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => escape_markup(s),
            Some(other) => escape_markup(&other.to_string()),
        }
    };

    Ok(LogLine {
        text: LineText {
            level: field("level"),
            time: field("time"),
            out: field("out"),
        },
        search_indices: None,
    })
}

/// Parse newline-delimited section text, skipping malformed lines.
#[must_use]
pub fn parse_log_text(raw: &str) -> Vec<LogLine> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_line(line) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::trace!(error = %err, "dropping malformed log line");
                None
            }
        })
        .collect()
}
