//! End-to-end merge scenarios over a real working area.

mod common;

use common::fixtures::{IssueBuilder, at, line};
use common::{TestArea, test_log};
use plaintrack::config::Settings;
use plaintrack::ledger::ConflictLedger;
use plaintrack::merge::{self, MergeOptions, merge_duplicates};
use plaintrack::model::{ConflictValue, Issue, IssueField, Status};
use plaintrack::record;
use serde_json::Value;

fn primary_issues(area: &TestArea) -> Vec<Issue> {
    area.read("issues.jsonl")
        .lines()
        .map(|l| record::decode::<Issue>(l, 1).expect("primary line").record)
        .collect()
}

#[test]
fn branch_edits_to_different_fields_both_survive() {
    let _log = test_log("branch_edits_to_different_fields_both_survive");
    let area = TestArea::new();

    let base = IssueBuilder::new("pt-1", "Original")
        .changed(IssueField::Title, 0)
        .changed(IssueField::Status, 0);
    area.write("issues.jsonl", &[base.line()]);

    let main = IssueBuilder::new("pt-1", "Renamed on main")
        .changed(IssueField::Title, 100)
        .changed(IssueField::Status, 0);
    let topic = IssueBuilder::new("pt-1", "Original")
        .with(|i| i.status = Status::InProgress)
        .changed(IssueField::Title, 0)
        .changed(IssueField::Status, 200);
    area.write("issues.main.jsonl", &[main.line()]);
    area.write("issues.topic.jsonl", &[topic.line()]);

    let result = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(1_000))).unwrap();
    assert_eq!(result.merged_ids, vec!["pt-1"]);

    let issues = primary_issues(&area);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "Renamed on main");
    assert_eq!(issues[0].status, Status::InProgress);
    assert_eq!(issues[0].last_changed(IssueField::Title), Some(at(100)));
    assert_eq!(issues[0].last_changed(IssueField::Status), Some(at(200)));

    assert!(!area.exists("issues.main.jsonl"));
    assert!(!area.exists("issues.topic.jsonl"));
}

#[test]
fn every_overwritten_value_is_in_the_ledger() {
    let _log = test_log("every_overwritten_value_is_in_the_ledger");
    let area = TestArea::new();

    area.write(
        "issues.a.jsonl",
        &[IssueBuilder::new("pt-1", "Alpha")
            .with(|i| i.assignee = Some("robin".to_string()))
            .changed(IssueField::Title, 10)
            .changed(IssueField::Assignee, 30)
            .line()],
    );
    area.write(
        "issues.b.jsonl",
        &[IssueBuilder::new("pt-1", "Beta")
            .with(|i| i.assignee = Some("sam".to_string()))
            .changed(IssueField::Title, 20)
            .changed(IssueField::Assignee, 5)
            .line()],
    );

    let result = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(500))).unwrap();
    let issues = primary_issues(&area);
    assert_eq!(issues[0].title, "Beta");
    assert_eq!(issues[0].assignee.as_deref(), Some("robin"));

    let ledger = ConflictLedger::new(&area.store, &area.area.ledger);
    let recorded = ledger.for_issue("pt-1").unwrap();
    assert_eq!(recorded, result.conflicts);

    let losers: Vec<(IssueField, Value, Option<String>)> = recorded
        .iter()
        .filter_map(|r| match &r.loser {
            ConflictValue::Field { field, value, .. } => Some((*field, value.clone(), r.source.clone())),
            ConflictValue::Snapshot { .. } => None,
        })
        .collect();
    assert!(losers.contains(&(IssueField::Title, Value::from("Alpha"), Some("issues.a.jsonl".to_string()))));
    assert!(losers.contains(&(IssueField::Assignee, Value::from("sam"), Some("issues.b.jsonl".to_string()))));
    assert!(recorded.iter().all(|r| r.superseded_at == at(500)));
}

#[test]
fn second_merge_changes_nothing() {
    let _log = test_log("second_merge_changes_nothing");
    let area = TestArea::new();
    area.write("issues.jsonl", &[IssueBuilder::new("pt-1", "Primary").line()]);
    area.write(
        "issues.b.jsonl",
        &[
            IssueBuilder::new("pt-1", "Branch").changed(IssueField::Title, 50).line(),
            IssueBuilder::new("pt-2", "New on branch").line(),
        ],
    );

    merge_duplicates(&area.store, &area.area, MergeOptions::new(at(1))).unwrap();
    let primary = area.read("issues.jsonl");
    let ledger = area.read("conflicts.jsonl");

    let again = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(2))).unwrap();
    assert!(again.is_noop());
    assert!(again.conflicts.is_empty());
    assert_eq!(area.read("issues.jsonl"), primary);
    assert_eq!(area.read("conflicts.jsonl"), ledger);
}

#[test]
fn equal_timestamps_resolve_by_container_order() {
    let _log = test_log("equal_timestamps_resolve_by_container_order");
    let area = TestArea::new();
    for (name, title) in [("issues.a.jsonl", "From a"), ("issues.b.jsonl", "From b")] {
        area.write(
            name,
            &[IssueBuilder::new("pt-1", title).changed(IssueField::Title, 10).line()],
        );
    }

    let result = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(99))).unwrap();
    assert_eq!(primary_issues(&area)[0].title, "From b");
    assert_eq!(result.conflicts.len(), 2);
    assert_eq!(result.conflicts[0].source.as_deref(), Some("issues.a.jsonl"));
    assert_eq!(result.conflicts[0].field(), Some(IssueField::Title));
    assert!(matches!(
        &result.conflicts[1].loser,
        ConflictValue::Snapshot { issue } if issue.title == "From a"
    ));
}

#[test]
fn primary_is_sorted_and_hash_matches() {
    let _log = test_log("primary_is_sorted_and_hash_matches");
    let area = TestArea::new();
    area.write("issues.jsonl", &[IssueBuilder::new("pt-3", "Three").line()]);
    area.write(
        "issues.b.jsonl",
        &[IssueBuilder::new("pt-2", "Two").line(), IssueBuilder::new("pt-1", "One").line()],
    );

    let result = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(1))).unwrap();
    let ids: Vec<String> = primary_issues(&area).into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["pt-1", "pt-2", "pt-3"]);
    assert_eq!(result.copied_count, 3);
    assert_eq!(
        result.content_hash.as_deref(),
        Some(plaintrack::util::content_hash(&area.read("issues.jsonl")).as_str())
    );
}

#[test]
fn unparseable_lines_are_never_lost() {
    let _log = test_log("unparseable_lines_are_never_lost");
    let area = TestArea::new();
    area.write(
        "issues.jsonl",
        &[IssueBuilder::new("pt-1", "Kept").line(), "<<<<<<< HEAD".to_string()],
    );
    area.write(
        "issues.b.jsonl",
        &[IssueBuilder::new("pt-2", "Two").line(), "{\"id\":".to_string()],
    );

    let result = merge_duplicates(&area.store, &area.area, MergeOptions::new(at(1))).unwrap();
    assert_eq!(result.retained, vec![area.path("issues.b.jsonl")]);
    assert_eq!(area.read("issues.b.jsonl"), "{\"id\":\n");
    assert!(area.read("issues.jsonl").contains("<<<<<<< HEAD"));
    assert_eq!(result.diagnostics.len(), 2);
}

#[test]
fn dry_run_reports_without_writing() {
    let _log = test_log("dry_run_reports_without_writing");
    let area = TestArea::new();
    let original = IssueBuilder::new("pt-1", "Primary").line();
    area.write("issues.jsonl", &[original.clone()]);
    area.write("issues.b.jsonl", &[IssueBuilder::new("pt-1", "Branch").line()]);

    let result = merge_duplicates(
        &area.store,
        &area.area,
        MergeOptions::new(at(1)).dry_run(true),
    )
    .unwrap();
    assert_eq!(result.merged_count, 1);
    assert_eq!(result.consumed, vec![area.path("issues.b.jsonl")]);
    assert_eq!(area.read("issues.jsonl"), format!("{original}\n"));
    assert!(area.exists("issues.b.jsonl"));
    assert!(!area.exists("conflicts.jsonl"));
}

#[test]
fn auto_merge_only_runs_when_enabled_and_needed() {
    let _log = test_log("auto_merge_only_runs_when_enabled_and_needed");
    let area = TestArea::new();
    area.write("issues.a.jsonl", &[line(&Issue::new("pt-1", "A"))]);
    area.write("issues.b.jsonl", &[line(&Issue::new("pt-1", "B"))]);

    let disabled = Settings::default();
    assert!(merge::auto_merge(&area.store, &area.area, &disabled, at(1)).unwrap().is_none());
    assert!(area.exists("issues.a.jsonl"));

    let enabled = Settings { auto_merge: true };
    let merged = merge::auto_merge(&area.store, &area.area, &enabled, at(1)).unwrap();
    assert!(merged.is_some());
    assert!(merge::detect(&area.store, &area.area).unwrap().pending().is_empty());
}
