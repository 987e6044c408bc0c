//! Unmerged-state detection.

use crate::error::Result;
use crate::ingest::{self, Located};
use crate::model::Issue;
use crate::storage::{ContainerStore, WorkingArea};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Candidates sharing one identifier, in enumeration order.
pub type CandidateGroups = BTreeMap<String, Vec<Located<Issue>>>;

/// Whether the pending containers need a merge.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Detection {
    /// Every identifier appears at most once across the pending containers.
    Clean { pending: Vec<PathBuf> },
    /// At least one identifier has several candidates.
    Unmerged {
        pending: Vec<PathBuf>,
        duplicates: CandidateGroups,
    },
}

impl Detection {
    #[must_use]
    pub const fn is_unmerged(&self) -> bool {
        matches!(self, Self::Unmerged { .. })
    }

    /// Non-primary, non-ledger containers that were inspected.
    #[must_use]
    pub fn pending(&self) -> &[PathBuf] {
        match self {
            Self::Clean { pending } | Self::Unmerged { pending, .. } => pending,
        }
    }

    /// Identifiers with more than one candidate, sorted.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<&str> {
        match self {
            Self::Clean { .. } => Vec::new(),
            Self::Unmerged { duplicates, .. } => duplicates.keys().map(String::as_str).collect(),
        }
    }
}

/// Group issues by identifier, keeping enumeration order within each group.
#[must_use]
pub fn group_by_id(issues: impl IntoIterator<Item = Located<Issue>>) -> CandidateGroups {
    let mut groups = CandidateGroups::new();
    for located in issues {
        groups
            .entry(located.record.id.clone())
            .or_default()
            .push(located);
    }
    groups
}

/// Inspect the pending containers of `area` for duplicate identifiers.
///
/// An identifier counts as duplicated when it appears in more than one
/// container or more than once within the same container.
///
/// # Errors
///
/// Returns an error if a container cannot be listed or read.
pub fn detect(store: &impl ContainerStore, area: &WorkingArea) -> Result<Detection> {
    let pending = area.pending_containers(store)?;
    let loaded = ingest::load_issues(store, &pending)?;

    let duplicates: CandidateGroups = group_by_id(loaded.issues)
        .into_iter()
        .filter(|(_, candidates)| candidates.len() > 1)
        .collect();

    tracing::debug!(
        pending = pending.len(),
        duplicates = duplicates.len(),
        "Detected working area state"
    );

    if duplicates.is_empty() {
        Ok(Detection::Clean { pending })
    } else {
        Ok(Detection::Unmerged {
            pending,
            duplicates,
        })
    }
}
