//! Render-window support
//!
//! Flattens the state into the row order a grouped, virtualized list
//! displays. Line positions count lines of open sections only, matching
//! the positions recorded in [`SearchState::lines_with_results`].
//!
//! [`SearchState::lines_with_results`]: crate::types::SearchState::lines_with_results

use crate::types::{LogLine, LogViewState, SectionState, UnitKey};

/// One displayable row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    /// Section header, shown for every section
    Header {
        /// Section key
        key: &'a UnitKey,
        /// Section state
        section: &'a SectionState,
    },
    /// Line of an open section
    Line {
        /// Owning section
        key: &'a UnitKey,
        /// Index within the section
        index: usize,
        /// Position across all open sections
        position: usize,
        /// The line
        line: &'a LogLine,
    },
}

/// Every row in render order.
#[must_use]
pub fn rows(state: &LogViewState) -> Vec<Row<'_>> {
    let mut out = Vec::new();
    let mut position = 0usize;
    for (key, section) in state.sections() {
        out.push(Row::Header { key, section });
        if !section.is_open {
            continue;
        }
        for (index, line) in section.data.iter().enumerate() {
            out.push(Row::Line {
                key,
                index,
                position,
                line,
            });
            position += 1;
        }
    }
    out
}

/// Rows `start..start + len`, clamped to what exists.
#[must_use]
pub fn window(state: &LogViewState, start: usize, len: usize) -> Vec<Row<'_>> {
    rows(state).into_iter().skip(start).take(len).collect()
}

/// Visible line count per section, in declaration order.
#[must_use]
pub fn group_counts(state: &LogViewState) -> Vec<usize> {
    state
        .sections()
        .map(|(_, s)| if s.is_open { s.data.len() } else { 0 })
        .collect()
}

/// Row index of the line at `position`, for scrolling to a search hit.
#[must_use]
pub fn row_of_position(state: &LogViewState, position: usize) -> Option<usize> {
    rows(state).iter().position(|row| {
        matches!(row, Row::Line { position: p, .. } if *p == position)
    })
}
