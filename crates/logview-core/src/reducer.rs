//! Reducer: `(state, action) -> state`
//!
//! Each action has its own pure transform. Transforms that target a
//! section return the input unchanged when the key is unknown, which is
//! what makes late results from a previous step harmless.
//!
//! An active search is re-run whenever the lines it covers change.

use crate::actions::{Action, UpdateSectionData};
use crate::builder::create_sections;
use crate::parse::parse_log_text;
use crate::search;
use crate::status::SectionStatus;
use crate::types::{DataSource, LogViewState, SectionState, UnitKey};

/// Apply an action and return the next state.
#[must_use]
pub fn reduce(state: &LogViewState, action: &Action) -> LogViewState {
    match action {
        Action::CreateSections(payload) => search::refresh(&create_sections(state, payload)),
        Action::FetchSectionData(id) => fetch_section_data(state, id),
        Action::FetchingSectionData(id) => fetching_section_data(state, id),
        Action::UpdateSectionData(update) => update_section_data(state, update),
        Action::ResetSection(id) => reset_section(state, id),
        Action::ToggleSection(id) => toggle_section(state, id),
        Action::Search(query) => search::search(state, query),
        Action::ResetSearch => search::reset_search(state),
        Action::GoToNextSearchResult => search::go_to_next(state),
        Action::GoToPrevSearchResult => search::go_to_prev(state),
    }
}

/// Copy the state with one section rewritten, or return it unchanged when
/// the section does not exist.
fn with_section(
    state: &LogViewState,
    id: &UnitKey,
    update: impl FnOnce(&mut SectionState),
) -> LogViewState {
    if !state.data_map.contains_key(id) {
        tracing::trace!(unit = %id, "action targets unknown section");
        return state.clone();
    }
    let mut next = state.clone();
    if let Some(section) = next.data_map.get_mut(id) {
        update(section);
    }
    next
}

/// [`with_section`] for changes to a section's lines or visibility.
fn with_section_lines(
    state: &LogViewState,
    id: &UnitKey,
    update: impl FnOnce(&mut SectionState),
) -> LogViewState {
    if !state.data_map.contains_key(id) {
        return with_section(state, id, update);
    }
    search::refresh(&with_section(state, id, update))
}

/// Mark a section as requested.
#[must_use]
pub fn fetch_section_data(state: &LogViewState, id: &UnitKey) -> LogViewState {
    with_section(state, id, |section| section.status = SectionStatus::Loading)
}

/// Mark a section's request as issued.
#[must_use]
pub fn fetching_section_data(state: &LogViewState, id: &UnitKey) -> LogViewState {
    with_section(state, id, |section| section.status = SectionStatus::Queued)
}

/// Store parsed section text.
///
/// Blob sections are resolved by the update and get their unit status
/// back. A section opens on data unless a human closed it.
#[must_use]
pub fn update_section_data(state: &LogViewState, update: &UpdateSectionData) -> LogViewState {
    with_section_lines(state, &update.id, |section| {
        let lines = parse_log_text(&update.data);
        if update.append {
            section.data.extend(lines);
        } else {
            section.data = lines.into_iter().collect();
        }
        if section.data_source == DataSource::Blob {
            section.status = section.unit_status;
        }
        if !section.manually_toggled {
            section.is_open = true;
        }
    })
}

/// Restore the unit status after a failed fetch and close the section.
#[must_use]
pub fn reset_section(state: &LogViewState, id: &UnitKey) -> LogViewState {
    with_section_lines(state, id, |section| {
        section.status = section.unit_status;
        section.is_open = false;
    })
}

/// Flip a section open or closed on behalf of a human.
#[must_use]
pub fn toggle_section(state: &LogViewState, id: &UnitKey) -> LogViewState {
    with_section_lines(state, id, |section| {
        section.is_open = !section.is_open;
        section.manually_toggled = true;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CreateSectionsPayload;
    use crate::node::{ExecutionNode, TaskDescriptor};
    use crate::status::ExecutionStatus;
    use crate::types::{LogField, LogLine};
    use pretty_assertions::assert_eq;

    const LINE: &str = r#"{"out":"Line1","level":"log","time":"123"}"#;

    fn built(status: ExecutionStatus) -> LogViewState {
        let node = ExecutionNode::new(status)
            .with_task(TaskDescriptor::new(Vec::<String>::new(), ["logKey1"]));
        reduce(
            &LogViewState::new(),
            &Action::CreateSections(CreateSectionsPayload::new(node, "step")),
        )
    }

    #[test]
    fn blob_scenario() {
        let state = built(ExecutionStatus::Success);
        assert_eq!(state.section("logKey1").unwrap().status, SectionStatus::Loading);

        let state = reduce(
            &state,
            &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", LINE)),
        );
        let section = state.section("logKey1").unwrap();
        assert_eq!(section.data, im::vector![LogLine::new("log", "123", "Line1")]);
        assert_eq!(section.status, SectionStatus::Success);
        assert!(section.is_open);
    }

    #[test]
    fn running_node_streams() {
        let state = built(ExecutionStatus::Running);
        assert_eq!(state.section("logKey1").unwrap().data_source, DataSource::Stream);
    }

    #[test]
    fn stream_update_keeps_fetch_status() {
        let state = built(ExecutionStatus::Running);
        let id = UnitKey::from("logKey1");
        let state = reduce(&state, &Action::FetchingSectionData(id));
        let state = reduce(
            &state,
            &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", LINE)),
        );
        assert_eq!(state.section("logKey1").unwrap().status, SectionStatus::Queued);
    }

    #[test]
    fn fetch_then_fetching() {
        let id = UnitKey::from("logKey1");
        let state = reduce(&built(ExecutionStatus::Success), &Action::ResetSection(id.clone()));
        let state = reduce(&state, &Action::FetchSectionData(id.clone()));
        assert_eq!(state.section("logKey1").unwrap().status, SectionStatus::Loading);
        let state = reduce(&state, &Action::FetchingSectionData(id));
        assert_eq!(state.section("logKey1").unwrap().status, SectionStatus::Queued);
    }

    #[test]
    fn reset_restores_unit_status_and_closes() {
        let id = UnitKey::from("logKey1");
        let state = built(ExecutionStatus::Failed);
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", LINE)));
        let state = reduce(&state, &Action::FetchSectionData(id.clone()));
        let state = reduce(&state, &Action::ResetSection(id));
        let section = state.section("logKey1").unwrap();
        assert_eq!(section.status, SectionStatus::Failure);
        assert!(!section.is_open);
        assert_eq!(section.data.len(), 1);
    }

    #[test]
    fn toggle_marks_manual() {
        let id = UnitKey::from("logKey1");
        let state = reduce(&built(ExecutionStatus::Success), &Action::ToggleSection(id));
        let section = state.section("logKey1").unwrap();
        assert!(section.is_open);
        assert!(section.manually_toggled);
        assert_eq!(section.status, SectionStatus::Loading);
    }

    #[test]
    fn manual_close_survives_data_arrival() {
        let id = UnitKey::from("logKey1");
        let state = built(ExecutionStatus::Success);
        let state = reduce(&state, &Action::ToggleSection(id.clone()));
        let state = reduce(&state, &Action::ToggleSection(id));
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", LINE)));
        assert!(!state.section("logKey1").unwrap().is_open);
    }

    #[test]
    fn append_concatenates() {
        let state = built(ExecutionStatus::Success);
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", LINE)));
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::append("logKey1", LINE)));
        assert_eq!(state.section("logKey1").unwrap().data.len(), 2);
    }

    #[test]
    fn search_follows_new_data() {
        let failed = |out: &str| format!(r#"{{"out":"{out}","level":"error","time":"1"}}"#);
        let state = built(ExecutionStatus::Success);
        let state = reduce(
            &state,
            &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", failed("build failed"))),
        );
        let state = reduce(&state, &Action::Search("failed".into()));
        assert_eq!(state.search.result_count(), 1);

        let text = format!("{}\n{}", failed("build failed"), failed("deploy failed"));
        let state = reduce(
            &state,
            &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", text)),
        );
        assert_eq!(state.search.lines_with_results, im::vector![0, 1]);
        let section = state.section("logKey1").unwrap();
        assert!(section.data.iter().all(|line| line.search_indices.is_some()));
        assert_eq!(
            section.data[1].search_indices.as_ref().unwrap()[&LogField::Out],
            vec![1]
        );
    }

    #[test]
    fn search_follows_toggles_and_keeps_position() {
        let id = UnitKey::from("logKey1");
        let text = [LINE, LINE, LINE].join("\n");
        let state = built(ExecutionStatus::Success);
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("logKey1", text)));
        let state = reduce(&state, &Action::Search("line1".into()));
        let state = reduce(&state, &Action::GoToNextSearchResult);
        assert_eq!(state.search.current_index, 1);

        let closed = reduce(&state, &Action::ToggleSection(id.clone()));
        assert_eq!(closed.search.result_count(), 0);
        assert_eq!(closed.search.text, "line1");
        assert!(closed.section("logKey1").unwrap().data.iter().all(|l| l.search_indices.is_none()));

        let reopened = reduce(&closed, &Action::ToggleSection(id.clone()));
        assert_eq!(reopened.search.result_count(), 3);
        assert_eq!(reopened.search.current_index, 0);

        let kept = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::append("logKey1", LINE)));
        assert_eq!(kept.search.result_count(), 4);
        assert_eq!(kept.search.current_index, 1);

        let reset = reduce(&state, &Action::ResetSection(id));
        assert_eq!(reset.search.result_count(), 0);
    }

    #[test]
    fn unknown_key_is_noop() {
        let state = built(ExecutionStatus::Success);
        let missing = UnitKey::from("missing");
        for action in [
            Action::FetchSectionData(missing.clone()),
            Action::FetchingSectionData(missing.clone()),
            Action::ResetSection(missing.clone()),
            Action::ToggleSection(missing.clone()),
            Action::UpdateSectionData(UpdateSectionData::replace(missing.clone(), LINE)),
        ] {
            assert_eq!(reduce(&state, &action), state, "{}", action.name());
        }
    }
}
