//! Legacy history migration.
//!
//! Older records carry either no history at all or only whole-record
//! entries (no field name), which gives the merge engine nothing to compare
//! per field. Migration replaces those entries with one synthesized `update`
//! change per field, stamped with the best legacy timestamp available.
//! Issues that already carry per-field history are left alone, so running
//! the migration twice changes nothing.

use crate::error::Result;
use crate::model::{ChangeKind, Issue, IssueField, PropertyChange};
use crate::record::{self, Record};
use crate::storage::{ContainerStore, WorkingArea};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Options for [`migrate`].
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Report what would change without rewriting any container.
    pub dry_run: bool,
    /// Recorded as `by` on synthesized changes.
    pub actor: Option<String>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    /// Issues examined across all containers.
    pub scanned: usize,
    /// Identifiers that received synthesized history.
    pub migrated_ids: Vec<String>,
    pub changes_added: usize,
    /// Legacy identifiers with no usable timestamp.
    pub skipped_ids: Vec<String>,
    /// Containers rewritten (or that would be, on a dry run).
    pub rewritten: Vec<PathBuf>,
    pub dry_run: bool,
}

/// What [`migrate_issue`] did to one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Per-field history already present.
    AlreadyMigrated,
    /// Neither `updated_at` nor a whole-record entry gives a timestamp.
    NoTimestamp,
    /// Nothing differs from the prior version; the issue was left as is.
    Unchanged,
    /// History replaced with this many synthesized changes.
    Migrated(usize),
}

/// True when `issue` has no per-field history.
#[must_use]
pub fn needs_migration(issue: &Issue) -> bool {
    !issue.has_field_history()
}

/// Synthesize per-field history for one issue.
///
/// With a `prior` version only the fields that differ from it get a change;
/// without one every non-empty field does.
pub fn migrate_issue(issue: &mut Issue, prior: Option<&Issue>, actor: Option<&str>) -> MigrationOutcome {
    if !needs_migration(issue) {
        return MigrationOutcome::AlreadyMigrated;
    }
    let Some(at) = issue
        .updated_at
        .or_else(|| issue.history.iter().map(|change| change.at).max())
    else {
        return MigrationOutcome::NoTimestamp;
    };

    let fields: Vec<IssueField> = IssueField::ALL
        .into_iter()
        .filter(|field| match prior {
            Some(prior) => !issue.field_eq(prior, *field),
            None => !issue.is_field_empty(*field),
        })
        .collect();
    if fields.is_empty() {
        return MigrationOutcome::Unchanged;
    }

    issue.history.clear();
    for field in &fields {
        let change = PropertyChange::field(*field, ChangeKind::Update, at);
        issue.record_change(match actor {
            Some(by) => change.with_actor(by),
            None => change,
        });
    }
    MigrationOutcome::Migrated(fields.len())
}

/// Migrate every issue container of `area`: the primary first, then the
/// pending containers. The ledger is never touched.
///
/// Lines that do not parse, and issues that need no change, keep their
/// original text.
///
/// # Errors
///
/// Returns an error if a container cannot be read or rewritten.
pub fn migrate(
    store: &impl ContainerStore,
    area: &WorkingArea,
    options: &MigrateOptions,
) -> Result<MigrationSummary> {
    let mut summary = MigrationSummary {
        dry_run: options.dry_run,
        ..MigrationSummary::default()
    };
    // Version of each identifier as first seen, for prior comparisons.
    let mut seen: HashMap<String, Issue> = HashMap::new();

    for container in area.issue_containers(store)? {
        let text = store.read_container(&container)?;
        let mut rewritten = String::with_capacity(text.len());
        let mut changed = false;

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(decoded) = record::decode::<Issue>(line, idx + 1) else {
                rewritten.push_str(line);
                rewritten.push('\n');
                continue;
            };

            let mut issue = decoded.record;
            summary.scanned += 1;
            let prior = seen.get(issue.record_id());
            match migrate_issue(&mut issue, prior, options.actor.as_deref()) {
                MigrationOutcome::Migrated(count) => {
                    summary.changes_added += count;
                    summary.migrated_ids.push(issue.id.clone());
                    rewritten.push_str(&record::encode(&issue)?);
                    changed = true;
                }
                MigrationOutcome::NoTimestamp => {
                    tracing::warn!(
                        container = %container.display(),
                        issue_id = %issue.id,
                        "No timestamp to migrate history from"
                    );
                    summary.skipped_ids.push(issue.id.clone());
                    rewritten.push_str(line);
                }
                MigrationOutcome::AlreadyMigrated | MigrationOutcome::Unchanged => {
                    rewritten.push_str(line);
                }
            }
            rewritten.push('\n');
            seen.entry(issue.id.clone()).or_insert(issue);
        }

        if changed {
            if !options.dry_run {
                store.write_container_atomically(&container, &rewritten)?;
            }
            summary.rewritten.push(container);
        }
    }

    tracing::info!(
        scanned = summary.scanned,
        migrated = summary.migrated_ids.len(),
        changes = summary.changes_added,
        skipped = summary.skipped_ids.len(),
        dry_run = summary.dry_run,
        "Migrated history"
    );
    Ok(summary)
}
