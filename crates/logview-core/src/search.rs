//! Cross-section search
//!
//! Matches are numbered in render order: open sections in declaration
//! order, lines in order, then the fields `level`, `time`, `out`. The
//! numbering never depends on when a section's data arrived.
//!
//! Stored fields are markup-escaped; queries match the unescaped text, so
//! `<` finds `&lt;` and `amp` does not find `&amp;`.

use crate::sanitize::unescape_markup;
use crate::types::{LogField, LogLine, LogViewState, SearchIndices, SearchState};
use regex::{Regex, RegexBuilder};

/// Build the case-insensitive literal pattern for a query.
fn build_pattern(query: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
}

/// Run a search over every open section.
///
/// An empty query behaves like [`reset_search`].
#[must_use]
pub fn search(state: &LogViewState, query: &str) -> LogViewState {
    if query.is_empty() {
        return reset_search(state);
    }

    let pattern = match build_pattern(query) {
        Ok(pattern) => pattern,
        Err(err) => {
            tracing::warn!(error = %err, "search pattern rejected");
            return reset_search(state);
        }
    };

    let mut next = state.clone();
    let mut line_position = 0usize;
    let mut match_index = 0usize;
    let mut lines_with_results = im::Vector::new();

    for key in &state.units {
        let Some(section) = next.data_map.get_mut(key) else {
            continue;
        };

        if !section.is_open {
            clear_indices(&mut section.data);
            continue;
        }

        for line in section.data.iter_mut() {
            let mut indices = SearchIndices::new();
            for field in LogField::ORDER {
                let haystack = unescape_markup(line.text.field(field));
                let found: Vec<usize> = pattern
                    .find_iter(&haystack)
                    .map(|_| {
                        let index = match_index;
                        match_index += 1;
                        lines_with_results.push_back(line_position);
                        index
                    })
                    .collect();
                if !found.is_empty() {
                    indices.insert(field, found);
                }
            }
            line.search_indices = (!indices.is_empty()).then_some(indices);
            line_position += 1;
        }
    }

    tracing::debug!(query, matches = match_index, "search complete");

    next.search = SearchState {
        text: query.to_string(),
        current_index: 0,
        lines_with_results,
    };
    next
}

/// Re-run the active query after section lines or visibility changed.
///
/// Unlike a new search the highlighted match is kept, clamped to the new
/// result count.
#[must_use]
pub fn refresh(state: &LogViewState) -> LogViewState {
    if state.search.text.is_empty() {
        return state.clone();
    }
    let mut next = search(state, &state.search.text);
    let last = next.search.result_count().saturating_sub(1);
    next.search.current_index = state.search.current_index.min(last);
    next
}

/// Clear the query and every per-line marker.
#[must_use]
pub fn reset_search(state: &LogViewState) -> LogViewState {
    let mut next = state.clone();
    for key in &state.units {
        if let Some(section) = next.data_map.get_mut(key) {
            clear_indices(&mut section.data);
        }
    }
    next.search = SearchState::default();
    next
}

/// Step to the next match, wrapping to the first.
#[must_use]
pub fn go_to_next(state: &LogViewState) -> LogViewState {
    step(state, |current, len| (current + 1) % len)
}

/// Step to the previous match, wrapping to the last.
#[must_use]
pub fn go_to_prev(state: &LogViewState) -> LogViewState {
    step(state, |current, len| (current + len - 1) % len)
}

fn step(state: &LogViewState, advance: impl Fn(usize, usize) -> usize) -> LogViewState {
    let len = state.search.lines_with_results.len();
    if len == 0 {
        return state.clone();
    }
    let mut next = state.clone();
    next.search.current_index = advance(state.search.current_index % len, len);
    next
}

fn clear_indices(lines: &mut im::Vector<LogLine>) {
    if lines.iter().all(|l| l.search_indices.is_none()) {
        return;
    }
    for line in lines.iter_mut() {
        line.search_indices = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SectionState, UnitKey};

    fn state_with(sections: &[(&str, bool, &[&str])]) -> LogViewState {
        let mut state = LogViewState::new();
        for (key, open, outs) in sections {
            state.units.push_back(UnitKey::from(*key));
            state.data_map.insert(
                UnitKey::from(*key),
                SectionState {
                    is_open: *open,
                    data: outs.iter().map(|o| LogLine::new("info", "t", *o)).collect(),
                    ..SectionState::default()
                },
            );
        }
        state
    }

    #[test]
    fn two_matching_lines() {
        let state = state_with(&[("a", true, &["step failed", "also failed"])]);
        let result = search(&state, "failed");
        assert_eq!(result.search.lines_with_results, im::vector![0, 1]);
        assert_eq!(result.search.current_index, 0);

        let line = &result.section("a").unwrap().data[1];
        assert_eq!(line.search_indices.as_ref().unwrap()[&LogField::Out], vec![1]);
    }

    #[test]
    fn one_entry_per_occurrence() {
        let state = state_with(&[("a", true, &["x", "err err"])]);
        let result = search(&state, "ERR");
        assert_eq!(result.search.lines_with_results, im::vector![1, 1]);
        let line = &result.section("a").unwrap().data[1];
        assert_eq!(line.search_indices.as_ref().unwrap()[&LogField::Out], vec![0, 1]);
    }

    #[test]
    fn field_order_defines_numbering() {
        let mut state = LogViewState::new();
        state.units.push_back(UnitKey::from("a"));
        state.data_map.insert(
            UnitKey::from("a"),
            SectionState {
                is_open: true,
                data: im::vector![LogLine::new("warn", "warn-time", "warn")],
                ..SectionState::default()
            },
        );
        let result = search(&state, "warn");
        let indices = result.section("a").unwrap().data[0].search_indices.clone().unwrap();
        assert_eq!(indices[&LogField::Level], vec![0]);
        assert_eq!(indices[&LogField::Time], vec![1]);
        assert_eq!(indices[&LogField::Out], vec![2]);
    }

    #[test]
    fn closed_sections_are_skipped() {
        let state = state_with(&[("a", false, &["hit"]), ("b", true, &["miss", "hit"])]);
        let result = search(&state, "hit");
        assert_eq!(result.search.lines_with_results, im::vector![1]);
        assert!(result.section("a").unwrap().data[0].search_indices.is_none());
    }

    #[test]
    fn metacharacters_are_literal() {
        let state = state_with(&[("a", true, &["a.b", "axb", "(x)"])]);
        assert_eq!(search(&state, "a.b").search.result_count(), 1);
        assert_eq!(search(&state, "(x)").search.result_count(), 1);
    }

    #[test]
    fn query_matches_escaped_text() {
        let state = state_with(&[("a", true, &["&lt;tag&gt;"])]);
        assert_eq!(search(&state, "<tag>").search.result_count(), 1);
        assert_eq!(search(&state, "lt").search.result_count(), 0);
    }

    #[test]
    fn entity_names_do_not_match() {
        let state = state_with(&[("a", true, &["fish &amp; chips", "sample"])]);
        let result = search(&state, "amp");
        assert_eq!(result.search.lines_with_results, im::vector![1]);
        assert_eq!(search(&state, "&").search.lines_with_results, im::vector![0]);
        assert_eq!(search(&state, "h & c").search.result_count(), 1);
    }

    #[test]
    fn refresh_keeps_the_current_match() {
        let state = state_with(&[("a", true, &["x", "x", "x"])]);
        let state = go_to_next(&go_to_next(&search(&state, "x")));
        assert_eq!(state.search.current_index, 2);

        let mut grown = state.clone();
        if let Some(section) = grown.data_map.get_mut(&UnitKey::from("a")) {
            section.data.push_back(LogLine::new("info", "t", "x"));
        }
        let grown = refresh(&grown);
        assert_eq!(grown.search.result_count(), 4);
        assert_eq!(grown.search.current_index, 2);

        let mut shrunk = state;
        if let Some(section) = shrunk.data_map.get_mut(&UnitKey::from("a")) {
            section.data.truncate(1);
        }
        let shrunk = refresh(&shrunk);
        assert_eq!(shrunk.search.result_count(), 1);
        assert_eq!(shrunk.search.current_index, 0);
    }

    #[test]
    fn refresh_without_query_is_noop() {
        let state = state_with(&[("a", true, &["x"])]);
        assert_eq!(refresh(&state), state);
    }

    #[test]
    fn reset_clears_markers_only() {
        let state = state_with(&[("a", true, &["hit"])]);
        let searched = search(&state, "hit");
        let reset = reset_search(&searched);
        assert_eq!(reset, state);
    }

    #[test]
    fn navigation_wraps() {
        let state = search(&state_with(&[("a", true, &["x", "x", "x"])]), "x");
        let prev = go_to_prev(&state);
        assert_eq!(prev.search.current_index, 2);
        let back = go_to_next(&prev);
        assert_eq!(back.search.current_index, 0);
    }

    #[test]
    fn navigation_without_results_is_noop() {
        let state = state_with(&[("a", true, &["x"])]);
        assert_eq!(go_to_next(&state), state);
        assert_eq!(go_to_prev(&state), state);
    }
}
