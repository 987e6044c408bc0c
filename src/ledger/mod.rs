//! Conflict ledger.
//!
//! An append-only JSONL container of values discarded during
//! reconciliation. Records are never expired; they leave the ledger only
//! through [`ConflictLedger::clear`], scoped to one issue identifier.

use crate::error::Result;
use crate::ingest::{self, Loaded};
use crate::model::ConflictRecord;
use crate::record::{self, Record};
use crate::storage::ContainerStore;
use std::path::{Path, PathBuf};

/// Handle on the ledger container of a working area.
pub struct ConflictLedger<'a, S: ContainerStore> {
    store: &'a S,
    path: PathBuf,
}

impl<'a, S: ContainerStore> ConflictLedger<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, path: &Path) -> Self {
        Self {
            store,
            path: path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record, with a diagnostic for malformed lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub fn load(&self) -> Result<Loaded<ConflictRecord>> {
        ingest::load_container(self.store, &self.path)
    }

    /// Records belonging to one issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub fn for_issue(&self, issue_id: &str) -> Result<Vec<ConflictRecord>> {
        Ok(self
            .load()?
            .records
            .into_iter()
            .map(|located| located.record)
            .filter(|record| record.issue_id == issue_id)
            .collect())
    }

    /// Append records to the end of the ledger.
    ///
    /// Existing text is kept byte-for-byte, including lines that no longer
    /// parse.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or rewritten.
    pub fn append(&self, records: &[ConflictRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut text = self.store.read_container(&self.path)?;
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&record::encode_all(records)?);
        self.store.write_container_atomically(&self.path, &text)?;

        tracing::info!(
            ledger = %self.path.display(),
            appended = records.len(),
            "Recorded conflicts"
        );
        Ok(())
    }

    /// Remove every record for `issue_id`, returning how many were removed.
    ///
    /// Lines that do not parse are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or rewritten.
    pub fn clear(&self, issue_id: &str) -> Result<usize> {
        let text = self.store.read_container(&self.path)?;
        let mut kept = String::with_capacity(text.len());
        let mut removed = 0;

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let belongs = record::decode::<ConflictRecord>(line, idx + 1)
                .is_ok_and(|decoded| decoded.record.record_id() == issue_id);
            if belongs {
                removed += 1;
            } else {
                kept.push_str(line);
                kept.push('\n');
            }
        }

        if removed > 0 {
            self.store.write_container_atomically(&self.path, &kept)?;
            tracing::info!(
                ledger = %self.path.display(),
                issue_id,
                removed,
                "Cleared conflicts"
            );
        }
        Ok(removed)
    }
}
