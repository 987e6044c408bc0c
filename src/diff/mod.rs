//! Read-only field-level comparisons.
//!
//! Nothing here writes to a container; every function returns a report that
//! callers can print or serialize.

use crate::error::Result;
use crate::ingest::{self, ParseDiagnostic};
use crate::ledger::ConflictLedger;
use crate::merge::{self, Detection};
use crate::model::{ConflictValue, Issue, IssueField};
use crate::storage::{ContainerStore, WorkingArea};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One field holding different values on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDelta {
    pub field: IssueField,
    pub left: Value,
    pub right: Value,
}

/// Where an identifier was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Both,
    LeftOnly,
    RightOnly,
}

/// Differences for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDelta {
    pub id: String,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDelta>,
}

/// Result of a container or working-area diff.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffReport {
    pub deltas: Vec<IssueDelta>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl DiffReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Fields whose values differ between `left` and `right`, in field order.
#[must_use]
pub fn diff_issues(left: &Issue, right: &Issue) -> Vec<FieldDelta> {
    IssueField::ALL
        .iter()
        .filter(|field| !left.field_eq(right, **field))
        .map(|field| FieldDelta {
            field: *field,
            left: left.field_value(*field),
            right: right.field_value(*field),
        })
        .collect()
}

fn first_by_id(issues: Vec<ingest::Located<Issue>>) -> BTreeMap<String, Issue> {
    let mut by_id = BTreeMap::new();
    for located in issues {
        by_id
            .entry(located.record.id.clone())
            .or_insert(located.record);
    }
    by_id
}

/// Compare two containers identifier by identifier.
///
/// When an identifier repeats inside one container its first occurrence is
/// used. Identifiers present on both sides with equal fields are omitted.
///
/// # Errors
///
/// Returns an error if either container cannot be read.
pub fn diff_containers(store: &impl ContainerStore, a: &Path, b: &Path) -> Result<DiffReport> {
    let left = ingest::load_container::<Issue>(store, a)?;
    let right = ingest::load_container::<Issue>(store, b)?;

    let mut report = DiffReport::default();
    for diagnostic in [&left.diagnostic, &right.diagnostic] {
        if diagnostic.has_issues() {
            report.diagnostics.push(diagnostic.clone());
        }
    }

    let left_issues = first_by_id(left.records);
    let mut right_issues = first_by_id(right.records);

    for (id, left_issue) in left_issues {
        match right_issues.remove(&id) {
            Some(right_issue) => {
                let fields = diff_issues(&left_issue, &right_issue);
                if !fields.is_empty() {
                    report.deltas.push(IssueDelta {
                        id,
                        presence: Presence::Both,
                        left: Some(a.to_path_buf()),
                        right: Some(b.to_path_buf()),
                        fields,
                    });
                }
            }
            None => report.deltas.push(IssueDelta {
                id,
                presence: Presence::LeftOnly,
                left: Some(a.to_path_buf()),
                right: None,
                fields: Vec::new(),
            }),
        }
    }
    for id in right_issues.into_keys() {
        report.deltas.push(IssueDelta {
            id,
            presence: Presence::RightOnly,
            left: None,
            right: Some(b.to_path_buf()),
            fields: Vec::new(),
        });
    }
    report.deltas.sort_by(|x, y| x.id.cmp(&y.id));

    tracing::debug!(
        left = %a.display(),
        right = %b.display(),
        deltas = report.deltas.len(),
        "Diffed containers"
    );
    Ok(report)
}

/// For every unresolved duplicate, each later candidate against the first.
///
/// # Errors
///
/// Returns an error if a pending container cannot be read.
pub fn diff_working_area(store: &impl ContainerStore, area: &WorkingArea) -> Result<DiffReport> {
    let mut report = DiffReport::default();
    let Detection::Unmerged { duplicates, .. } = merge::detect(store, area)? else {
        return Ok(report);
    };

    for (id, candidates) in duplicates {
        let Some((first, rest)) = candidates.split_first() else {
            continue;
        };
        for candidate in rest {
            let fields = diff_issues(&first.record, &candidate.record);
            if fields.is_empty() {
                continue;
            }
            report.deltas.push(IssueDelta {
                id: id.clone(),
                presence: Presence::Both,
                left: Some(first.container.clone()),
                right: Some(candidate.container.clone()),
                fields,
            });
        }
    }
    Ok(report)
}

/// A recorded losing value next to what the primary holds now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictDelta {
    pub id: String,
    pub field: IssueField,
    /// The value that lost.
    pub recorded: Value,
    /// The primary's current value, `null` if the issue is gone.
    pub current: Value,
    pub superseded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Ledger values against the primary container, optionally for one issue.
///
/// Recorded values that already equal the current value are omitted.
/// Snapshot records contribute one entry per field that differs, unless a
/// field record from the same merge already reported that value.
///
/// # Errors
///
/// Returns an error if the ledger or primary container cannot be read.
pub fn diff_conflicts(
    store: &impl ContainerStore,
    area: &WorkingArea,
    issue_id: Option<&str>,
) -> Result<Vec<ConflictDelta>> {
    let primary = first_by_id(ingest::load_container::<Issue>(store, &area.primary)?.records);
    let ledger = ConflictLedger::new(store, &area.ledger).load()?;

    let current_value = |id: &str, field: IssueField| {
        primary
            .get(id)
            .map_or(Value::Null, |issue| issue.field_value(field))
    };

    let mut deltas = Vec::new();
    for record in ledger.records.into_iter().map(|located| located.record) {
        if issue_id.is_some_and(|wanted| wanted != record.issue_id) {
            continue;
        }
        let recorded: Vec<(IssueField, Value)> = match &record.loser {
            ConflictValue::Field { field, value, .. } => vec![(*field, value.clone())],
            ConflictValue::Snapshot { issue } => IssueField::ALL
                .iter()
                .map(|field| (*field, issue.field_value(*field)))
                .collect(),
        };
        for (field, value) in recorded {
            let current = current_value(&record.issue_id, field);
            if current == value {
                continue;
            }
            let reported = deltas.iter().any(|seen: &ConflictDelta| {
                seen.id == record.issue_id
                    && seen.field == field
                    && seen.superseded_at == record.superseded_at
                    && seen.recorded == value
            });
            if reported {
                continue;
            }
            deltas.push(ConflictDelta {
                id: record.issue_id.clone(),
                field,
                recorded: value,
                current,
                superseded_at: record.superseded_at,
                source: record.source.clone(),
            });
        }
    }
    Ok(deltas)
}
