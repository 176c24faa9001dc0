//! Property tests for the reducer.
//!
//! Run with: cargo test --package logview-core --test reducer_properties

use logview_core::prelude::*;
use logview_core::LogField;
use proptest::prelude::*;

fn record(level: &str, out: &str) -> String {
    serde_json::json!({ "level": level, "time": "t", "out": out }).to_string()
}

fn section_state(keys: &[&str], status: ExecutionStatus) -> LogViewState {
    let node = ExecutionNode::new(status).with_task(TaskDescriptor::new(Vec::<String>::new(), keys.iter().copied()));
    reduce(
        &LogViewState::new(),
        &Action::CreateSections(CreateSectionsPayload::new(node, "step")),
    )
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z]{1,6}", "[ -~]{0,20}"), 0..8).prop_map(|lines| {
        lines
            .iter()
            .map(|(level, out)| record(level, out))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

proptest! {
    #[test]
    fn prop_replace_is_idempotent(text in text_strategy()) {
        let state = section_state(&["k"], ExecutionStatus::Success);
        let update = Action::UpdateSectionData(UpdateSectionData::replace("k", text));
        let once = reduce(&state, &update);
        let twice = reduce(&once, &update);
        prop_assert_eq!(&once.section("k").unwrap().data, &twice.section("k").unwrap().data);
    }

    #[test]
    fn prop_append_concatenates_in_order(chunks in prop::collection::vec(text_strategy(), 1..6)) {
        let mut state = section_state(&["k"], ExecutionStatus::Success);
        let mut expected = Vec::new();
        for chunk in &chunks {
            expected.extend(logview_core::parse_log_text(chunk));
            state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::append("k", chunk.clone())));
        }
        let data: Vec<LogLine> = state.section("k").unwrap().data.iter().cloned().collect();
        prop_assert_eq!(data, expected);
    }

    #[test]
    fn prop_unknown_key_is_noop(key in "[a-z]{3,8}", text in text_strategy()) {
        let state = section_state(&["present-key"], ExecutionStatus::Success);
        prop_assume!(key != "present-key");
        let id = UnitKey::new(key.clone());
        for action in [
            Action::FetchSectionData(id.clone()),
            Action::FetchingSectionData(id.clone()),
            Action::ResetSection(id.clone()),
            Action::ToggleSection(id.clone()),
            Action::UpdateSectionData(UpdateSectionData::replace(id.clone(), text.clone())),
        ] {
            prop_assert_eq!(reduce(&state, &action), state.clone());
        }
    }

    #[test]
    fn prop_navigation_wraps(n in 1usize..30) {
        let text = (0..n).map(|i| record("info", &format!("hit {i}"))).collect::<Vec<_>>().join("\n");
        let state = section_state(&["k"], ExecutionStatus::Success);
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("k", text)));
        let searched = reduce(&state, &Action::Search("hit".into()));
        prop_assert_eq!(searched.search.result_count(), n);

        let mut walked = searched.clone();
        for _ in 0..n {
            walked = reduce(&walked, &Action::GoToNextSearchResult);
        }
        prop_assert_eq!(walked.search.current_index, 0);

        let back = reduce(&searched, &Action::GoToPrevSearchResult);
        prop_assert_eq!(back.search.current_index, n - 1);
    }

    #[test]
    fn prop_search_is_deterministic(text in text_strategy(), query in "[a-z]{1,3}") {
        let state = section_state(&["a", "b"], ExecutionStatus::Success);
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("a", text.clone())));
        let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("b", text)));

        let first = reduce(&state, &Action::Search(query.clone()));
        let second = reduce(&first, &Action::Search(query));
        prop_assert_eq!(&first.search, &second.search);
        prop_assert_eq!(&first.data_map, &second.data_map);

        let a: Vec<_> = first.section("a").unwrap().data.iter().map(|l| l.search_indices.is_some()).collect();
        let b: Vec<_> = first.section("b").unwrap().data.iter().map(|l| l.search_indices.is_some()).collect();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn search_scenario_two_lines() {
    let state = section_state(&["k"], ExecutionStatus::Success);
    let text = [record("error", "build failed"), record("error", "deploy failed")].join("\n");
    let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("k", text)));
    let state = reduce(&state, &Action::Search("failed".into()));

    assert_eq!(state.search.lines_with_results, im::vector![0, 1]);
    assert_eq!(state.search.current_index, 0);
    let second = &state.section("k").unwrap().data[1];
    assert_eq!(second.search_indices.as_ref().unwrap()[&LogField::Out], vec![1]);
}

#[test]
fn new_search_restarts_navigation() {
    let state = section_state(&["k"], ExecutionStatus::Success);
    let text = [record("info", "a"), record("info", "a")].join("\n");
    let state = reduce(&state, &Action::UpdateSectionData(UpdateSectionData::replace("k", text)));
    let state = reduce(&state, &Action::Search("a".into()));
    let state = reduce(&state, &Action::GoToNextSearchResult);
    assert_eq!(state.search.current_index, 1);
    let state = reduce(&state, &Action::Search("a".into()));
    assert_eq!(state.search.current_index, 0);
}
