//! Merge engine.
//!
//! Converges every pending container of a working area into the primary
//! container. The write sequence is ordered so that an interruption never
//! loses data:
//!
//! 1. Conflict records are appended to the ledger.
//! 2. The reconciled issues are written to the primary container.
//! 3. Consumed pending containers are deleted.
//!
//! A pending container that holds lines which could not be parsed is not
//! deleted; it is rewritten to contain only those lines.

pub mod detect;
pub mod reconcile;

pub use detect::{CandidateGroups, Detection, detect, group_by_id};
pub use reconcile::{Reconciled, reconcile};

use crate::config::Settings;
use crate::error::Result;
use crate::ingest::{self, ParseDiagnostic};
use crate::ledger::ConflictLedger;
use crate::model::{ConflictRecord, Issue};
use crate::record;
use crate::storage::{ContainerStore, WorkingArea};
use crate::util::content_hash;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Options for [`merge_duplicates`].
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Report what would happen without touching any container.
    pub dry_run: bool,
    /// Stamp used as `superseded_at` on every conflict record.
    pub now: DateTime<Utc>,
}

impl MergeOptions {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            dry_run: false,
            now,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

/// Result of a merge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeResult {
    /// Identifiers that had several candidates.
    pub merged_count: usize,
    /// Identifiers copied through unchanged.
    pub copied_count: usize,
    pub merged_ids: Vec<String>,
    /// Values discarded during reconciliation.
    pub conflicts: Vec<ConflictRecord>,
    /// Pending containers deleted after the merge.
    pub consumed: Vec<PathBuf>,
    /// Pending containers kept because they hold unparseable lines.
    pub retained: Vec<PathBuf>,
    /// Containers written with merged issues.
    pub produced: Vec<PathBuf>,
    /// SHA-256 of the primary container text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Per-container parse outcomes that had something to report.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ParseDiagnostic>,
    pub dry_run: bool,
}

impl MergeResult {
    /// True when no issue needed merging. Empty pending containers may still
    /// have been consumed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.produced.is_empty()
    }
}

/// Converge the pending containers of `area` into its primary container.
///
/// Candidates are the primary's issues followed by those of each pending
/// container in sorted order. When no pending container holds a parsed
/// issue, nothing is written and an empty result is returned.
///
/// # Errors
///
/// Returns an error if a container cannot be read or written. Malformed
/// lines are not errors; they are reported in `diagnostics`.
pub fn merge_duplicates(
    store: &impl ContainerStore,
    area: &WorkingArea,
    options: MergeOptions,
) -> Result<MergeResult> {
    let pending = area.pending_containers(store)?;
    let mut containers = Vec::with_capacity(pending.len() + 1);
    containers.push(area.primary.clone());
    containers.extend(pending.iter().cloned());

    let loaded = ingest::load_issues(store, &containers)?;
    let mut result = MergeResult {
        dry_run: options.dry_run,
        diagnostics: loaded
            .diagnostics
            .iter()
            .filter(|d| d.has_issues())
            .cloned()
            .collect(),
        ..MergeResult::default()
    };

    // A pending container without malformed lines is consumed, even when it
    // holds no issues at all.
    let mut residues = Vec::new();
    for container in &pending {
        match loaded.diagnostic(container) {
            Some(diagnostic) if !diagnostic.malformed.is_empty() => {
                let mut residue = diagnostic.malformed.join("\n");
                residue.push('\n');
                residues.push((container.clone(), residue));
                result.retained.push(container.clone());
            }
            _ => result.consumed.push(container.clone()),
        }
    }

    let pending_issues = loaded
        .issues
        .iter()
        .filter(|located| located.container != area.primary)
        .count();
    if pending_issues == 0 {
        tracing::debug!(pending = pending.len(), "Nothing to merge");
        if !options.dry_run {
            for container in &result.consumed {
                tracing::debug!(container = %container.display(), "Removing empty pending container");
                store.delete_container(container)?;
            }
        }
        return Ok(result);
    }

    let mut merged: Vec<Issue> = Vec::new();
    for (id, candidates) in group_by_id(loaded.issues.iter().cloned()) {
        if candidates.len() == 1 {
            result.copied_count += 1;
            merged.extend(candidates.into_iter().map(|located| located.record));
            continue;
        }
        if let Some(reconciled) = reconcile(&candidates, options.now) {
            result.merged_count += 1;
            result.merged_ids.push(id);
            result.conflicts.extend(reconciled.conflicts);
            merged.push(reconciled.issue);
        }
    }

    let mut primary_text = record::encode_all(&merged)?;
    // Unparseable primary lines are carried forward rather than dropped.
    if let Some(diagnostic) = loaded.diagnostic(&area.primary) {
        for line in &diagnostic.malformed {
            primary_text.push_str(line);
            primary_text.push('\n');
        }
    }
    result.content_hash = Some(content_hash(&primary_text));
    result.produced.push(area.primary.clone());

    if options.dry_run {
        tracing::info!(
            merged = result.merged_count,
            copied = result.copied_count,
            conflicts = result.conflicts.len(),
            "Dry run: no containers modified"
        );
        return Ok(result);
    }

    ConflictLedger::new(store, &area.ledger).append(&result.conflicts)?;
    store.write_container_atomically(&area.primary, &primary_text)?;
    for container in &result.consumed {
        store.delete_container(container)?;
    }
    for (container, residue) in &residues {
        tracing::warn!(
            container = %container.display(),
            lines = residue.lines().count(),
            "Keeping unparseable lines in pending container"
        );
        store.write_container_atomically(container, residue)?;
    }

    tracing::info!(
        merged = result.merged_count,
        copied = result.copied_count,
        conflicts = result.conflicts.len(),
        consumed = result.consumed.len(),
        retained = result.retained.len(),
        "Merged working area"
    );
    Ok(result)
}

/// Run [`merge_duplicates`] when auto-merge is enabled and the working area
/// is unmerged. Returns `None` when no merge was attempted.
///
/// # Errors
///
/// Returns an error if detection or the merge fails.
pub fn auto_merge(
    store: &impl ContainerStore,
    area: &WorkingArea,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Option<MergeResult>> {
    if !settings.auto_merge {
        return Ok(None);
    }
    if !detect(store, area)?.is_unmerged() {
        return Ok(None);
    }
    tracing::info!("Auto-merging unmerged working area");
    merge_duplicates(store, area, MergeOptions::new(now)).map(Some)
}
