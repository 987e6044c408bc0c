//! Per-field reconciliation of divergent copies of one issue.
//!
//! The unit of reconciliation is a whole field value. For each field the
//! copy whose latest change to that field is strictly later keeps its value;
//! on a tie (or when neither copy has a change for the field) the candidate
//! enumerated later wins. Every value that loses is returned as a
//! [`ConflictRecord`].

use crate::ingest::Located;
use crate::model::{ConflictRecord, ConflictValue, Issue, IssueField};
use crate::storage::container_name;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Outcome of reconciling one identifier.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub issue: Issue,
    pub conflicts: Vec<ConflictRecord>,
}

/// Which side kept a differing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Current,
    Incoming,
}

/// Decide which side keeps `field`. Callers only ask for differing fields.
#[must_use]
pub fn field_winner(current: &Issue, incoming: &Issue, field: IssueField) -> Winner {
    // None sorts before any timestamp, and a tie goes to the incoming side.
    if incoming.last_changed(field) >= current.last_changed(field) {
        Winner::Incoming
    } else {
        Winner::Current
    }
}

fn field_conflict(
    id: &str,
    field: IssueField,
    loser: &Issue,
    winner: &Issue,
    source: &Path,
    now: DateTime<Utc>,
) -> ConflictRecord {
    ConflictRecord {
        issue_id: id.to_string(),
        superseded_at: now,
        source: Some(container_name(source)),
        loser: ConflictValue::Field {
            field,
            value: loser.field_value(field),
            changed_at: loser.last_changed(field),
            winning_value: winner.field_value(field),
        },
    }
}

/// Left-fold every candidate of one identifier into a single issue.
///
/// A candidate that differs but keeps none of its values is also recorded
/// as a snapshot. The first candidate is judged after the whole fold.
///
/// Returns `None` for an empty candidate list.
#[must_use]
pub fn reconcile(candidates: &[Located<Issue>], now: DateTime<Utc>) -> Option<Reconciled> {
    let (first, _) = candidates.split_first()?;
    let id = first.record.id.as_str();
    let mut winner = first.record.clone();
    // Index of the candidate each current field value came from.
    let mut origin: BTreeMap<IssueField, usize> =
        IssueField::ALL.iter().map(|field| (*field, 0)).collect();
    let mut contested: BTreeSet<IssueField> = BTreeSet::new();
    let mut conflicts = Vec::new();

    for (index, candidate) in candidates.iter().enumerate().skip(1) {
        let incoming = &candidate.record;
        let mut won_any = false;
        let mut lost_any = false;

        for field in IssueField::ALL {
            if winner.field_eq(incoming, field) {
                continue;
            }
            contested.insert(field);
            match field_winner(&winner, incoming, field) {
                Winner::Incoming => {
                    let source = origin
                        .get(&field)
                        .and_then(|owner| candidates.get(*owner))
                        .map_or(first.container.as_path(), |owner| owner.container.as_path());
                    conflicts.push(field_conflict(id, field, &winner, incoming, source, now));
                    winner.copy_field_from(incoming, field);
                    origin.insert(field, index);
                    won_any = true;
                }
                Winner::Current => {
                    conflicts.push(field_conflict(
                        id,
                        field,
                        incoming,
                        &winner,
                        &candidate.container,
                        now,
                    ));
                    lost_any = true;
                }
            }
        }

        // After the field pass so timestamps are compared pre-union.
        winner.absorb_history(&incoming.history);
        winner.updated_at = winner.updated_at.max(incoming.updated_at);

        if lost_any && !won_any {
            conflicts.push(snapshot(id, candidate, now));
        }
    }

    let first_kept_any = contested
        .iter()
        .any(|field| origin.get(field) == Some(&0));
    if !contested.is_empty() && !first_kept_any {
        conflicts.push(snapshot(id, first, now));
    }

    tracing::debug!(
        issue_id = id,
        candidates = candidates.len(),
        conflicts = conflicts.len(),
        "Reconciled duplicate issue"
    );

    Some(Reconciled {
        issue: winner,
        conflicts,
    })
}

fn snapshot(id: &str, candidate: &Located<Issue>, now: DateTime<Utc>) -> ConflictRecord {
    ConflictRecord {
        issue_id: id.to_string(),
        superseded_at: now,
        source: Some(container_name(&candidate.container)),
        loser: ConflictValue::Snapshot {
            issue: Box::new(candidate.record.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeKind, PropertyChange, Status};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::path::PathBuf;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn located(issue: Issue, container: &str) -> Located<Issue> {
        Located {
            record: issue,
            container: PathBuf::from(container),
            line: 1,
        }
    }

    fn changed(mut issue: Issue, field: IssueField, secs: i64) -> Issue {
        issue.record_change(PropertyChange::field(field, ChangeKind::Update, at(secs)));
        issue
    }

    #[test]
    fn disjoint_newer_fields_both_survive() {
        let mut a = Issue::new("pt-1", "Title from A");
        a = changed(a, IssueField::Title, 200);
        a = changed(a, IssueField::Status, 100);

        let mut b = Issue::new("pt-1", "Old title");
        b.status = Status::Complete;
        b = changed(b, IssueField::Title, 100);
        b = changed(b, IssueField::Status, 200);

        let result = reconcile(&[located(a, "a.jsonl"), located(b, "b.jsonl")], at(999)).unwrap();
        assert_eq!(result.issue.title, "Title from A");
        assert_eq!(result.issue.status, Status::Complete);
        assert_eq!(result.conflicts.len(), 2);
        assert_eq!(result.issue.last_changed(IssueField::Title), Some(at(200)));
        assert_eq!(result.issue.last_changed(IssueField::Status), Some(at(200)));
    }

    #[test]
    fn tie_goes_to_later_candidate() {
        let a = changed(Issue::new("pt-1", "First"), IssueField::Title, 100);
        let b = changed(Issue::new("pt-1", "Second"), IssueField::Title, 100);

        let result = reconcile(&[located(a, "a.jsonl"), located(b, "b.jsonl")], at(999)).unwrap();
        assert_eq!(result.issue.title, "Second");

        let conflict = &result.conflicts[0];
        assert_eq!(conflict.source.as_deref(), Some("a.jsonl"));
        assert_eq!(conflict.superseded_at, at(999));
        match &conflict.loser {
            ConflictValue::Field {
                field,
                value,
                changed_at,
                winning_value,
            } => {
                assert_eq!(*field, IssueField::Title);
                assert_eq!(value, &Value::from("First"));
                assert_eq!(*changed_at, Some(at(100)));
                assert_eq!(winning_value, &Value::from("Second"));
            }
            ConflictValue::Snapshot { .. } => panic!("expected a field conflict"),
        }
    }

    #[test]
    fn no_history_means_later_candidate_wins() {
        let a = Issue::new("pt-1", "First");
        let b = Issue::new("pt-1", "Second");
        let result = reconcile(&[located(a, "a.jsonl"), located(b, "b.jsonl")], at(1)).unwrap();
        assert_eq!(result.issue.title, "Second");
        assert_eq!(result.conflicts.len(), 2);
    }

    #[test]
    fn identical_candidates_produce_no_conflicts() {
        let a = changed(Issue::new("pt-1", "Same"), IssueField::Title, 10);
        let b = a.clone();
        let result = reconcile(&[located(a.clone(), "a.jsonl"), located(b, "b.jsonl")], at(5)).unwrap();
        assert!(result.conflicts.is_empty());
        assert_eq!(result.issue, a);
    }

    #[test]
    fn total_loser_is_snapshotted() {
        let winner = changed(Issue::new("pt-1", "Newer"), IssueField::Title, 300);
        let loser = changed(Issue::new("pt-1", "Older"), IssueField::Title, 100);

        let result =
            reconcile(&[located(winner, "a.jsonl"), located(loser.clone(), "b.jsonl")], at(999)).unwrap();
        assert_eq!(result.issue.title, "Newer");
        assert_eq!(result.conflicts.len(), 2);
        assert_eq!(result.conflicts[0].source.as_deref(), Some("b.jsonl"));
        assert!(matches!(
            &result.conflicts[1].loser,
            ConflictValue::Snapshot { issue } if **issue == loser
        ));
    }

    #[test]
    fn displaced_first_candidate_is_snapshotted() {
        let older = changed(Issue::new("pt-1", "Older"), IssueField::Title, 100);
        let newer = changed(Issue::new("pt-1", "Newer"), IssueField::Title, 300);

        let result =
            reconcile(&[located(older.clone(), "a.jsonl"), located(newer, "b.jsonl")], at(999)).unwrap();
        assert_eq!(result.issue.title, "Newer");
        assert_eq!(result.conflicts.len(), 2);
        assert_eq!(result.conflicts[0].field(), Some(IssueField::Title));
        let snapshot = &result.conflicts[1];
        assert_eq!(snapshot.source.as_deref(), Some("a.jsonl"));
        assert!(matches!(
            &snapshot.loser,
            ConflictValue::Snapshot { issue } if **issue == older
        ));
    }

    #[test]
    fn first_candidate_keeping_a_field_is_not_snapshotted() {
        let mut a = changed(Issue::new("pt-1", "Title from A"), IssueField::Title, 200);
        a = changed(a, IssueField::Status, 100);
        let mut b = Issue::new("pt-1", "Old title");
        b.status = Status::Complete;
        b = changed(b, IssueField::Title, 100);
        b = changed(b, IssueField::Status, 200);

        let result = reconcile(&[located(a, "a.jsonl"), located(b, "b.jsonl")], at(999)).unwrap();
        assert!(result
            .conflicts
            .iter()
            .all(|c| !matches!(c.loser, ConflictValue::Snapshot { .. })));
    }

    #[test]
    fn three_way_fold_tracks_value_origin() {
        let a = Issue::new("pt-1", "A");
        let b = changed(Issue::new("pt-1", "B"), IssueField::Title, 500);
        let c = changed(Issue::new("pt-1", "C"), IssueField::Title, 100);

        let result = reconcile(
            &[located(a, "a.jsonl"), located(b, "b.jsonl"), located(c, "c.jsonl")],
            at(999),
        )
        .unwrap();
        assert_eq!(result.issue.title, "B");
        let sources: Vec<_> = result
            .conflicts
            .iter()
            .filter(|c| c.field() == Some(IssueField::Title))
            .map(|c| c.source.clone().unwrap_or_default())
            .collect();
        assert_eq!(sources, vec!["a.jsonl", "c.jsonl"]);
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        assert!(reconcile(&[], at(0)).is_none());
    }
}
