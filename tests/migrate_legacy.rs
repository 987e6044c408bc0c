//! Migration of legacy history across a working area.

mod common;

use common::fixtures::{IssueBuilder, at};
use common::{TestArea, test_log};
use plaintrack::merge::{MergeOptions, merge_duplicates};
use plaintrack::migrate::{MigrateOptions, migrate};
use plaintrack::model::{ChangeKind, Issue, IssueField, PropertyChange, Status};
use plaintrack::record;

fn legacy(id: &str, title: &str, updated: Option<i64>) -> IssueBuilder {
    IssueBuilder::new(id, title).with(|issue| issue.updated_at = updated.map(at))
}

fn read_issue(area: &TestArea, name: &str, idx: usize) -> Issue {
    let text = area.read(name);
    let line = text.lines().nth(idx).expect("line present");
    record::decode::<Issue>(line, idx + 1).expect("decodes").record
}

#[test]
fn migration_enables_field_level_merge() {
    let _log = test_log("migration_enables_field_level_merge");
    let area = TestArea::new();
    area.write("issues.jsonl", &[legacy("pt-1", "Base", Some(0)).line()]);
    area.write(
        "issues.main.jsonl",
        &[legacy("pt-1", "Renamed", Some(100)).line()],
    );
    area.write(
        "issues.topic.jsonl",
        &[legacy("pt-1", "Base", Some(50))
            .with(|i| i.status = Status::Complete)
            .line()],
    );

    let summary = migrate(&area.store, &area.area, &MigrateOptions::default()).unwrap();
    assert_eq!(summary.migrated_ids.len(), 3);
    assert_eq!(summary.rewritten.len(), 3);

    let main = read_issue(&area, "issues.main.jsonl", 0);
    assert_eq!(main.last_changed(IssueField::Title), Some(at(100)));
    assert_eq!(main.last_changed(IssueField::Status), None);

    merge_duplicates(&area.store, &area.area, MergeOptions::new(at(1_000))).unwrap();
    let merged = read_issue(&area, "issues.jsonl", 0);
    assert_eq!(merged.title, "Renamed");
    assert_eq!(merged.status, Status::Complete);
}

#[test]
fn running_twice_adds_nothing() {
    let _log = test_log("running_twice_adds_nothing");
    let area = TestArea::new();
    let mut whole = legacy("pt-2", "Whole record", None).build();
    whole.history.push(PropertyChange {
        at: at(42),
        field: None,
        kind: ChangeKind::Update,
        by: None,
    });
    area.write(
        "issues.jsonl",
        &[
            legacy("pt-1", "Dated", Some(7)).line(),
            record::encode(&whole).unwrap(),
            legacy("pt-3", "Undated", None).line(),
        ],
    );

    let options = MigrateOptions {
        dry_run: false,
        actor: Some("migrator".to_string()),
    };
    let first = migrate(&area.store, &area.area, &options).unwrap();
    assert_eq!(first.migrated_ids, vec!["pt-1", "pt-2"]);
    assert_eq!(first.skipped_ids, vec!["pt-3"]);
    let migrated = read_issue(&area, "issues.jsonl", 1);
    assert!(migrated.history.iter().all(|c| c.field.is_some()));
    assert_eq!(migrated.last_changed(IssueField::Title), Some(at(42)));

    let snapshot = area.read("issues.jsonl");
    let second = migrate(&area.store, &area.area, &options).unwrap();
    assert!(second.migrated_ids.is_empty());
    assert_eq!(second.changes_added, 0);
    assert_eq!(area.read("issues.jsonl"), snapshot);
}

#[test]
fn ledger_is_left_alone() {
    let _log = test_log("ledger_is_left_alone");
    let area = TestArea::new();
    let ledger_text = r#"{"id":"pt-1","superseded_at":"2025-01-01T00:00:00Z","kind":"field","field":"title","value":"Old","winning_value":"New"}"#;
    area.write("conflicts.jsonl", &[ledger_text.to_string()]);
    area.write("issues.jsonl", &[legacy("pt-1", "New", Some(1)).line()]);

    let summary = migrate(&area.store, &area.area, &MigrateOptions::default()).unwrap();
    assert_eq!(summary.scanned, 1);
    assert_eq!(area.read("conflicts.jsonl"), format!("{ledger_text}\n"));
}
