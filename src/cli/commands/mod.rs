//! Subcommand implementations.
//!
//! Each command resolves a [`Context`], calls one core entry point, and
//! prints its structured result as JSON or plain text.

pub mod conflicts;
pub mod diff;
pub mod merge;
pub mod migrate;
pub mod status;

use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::merge::MergeResult;
use crate::storage::FsStore;
use chrono::Utc;
use serde::Serialize;

/// Resolved configuration plus the store it points at.
pub struct Context {
    pub config: Config,
    pub store: FsStore,
}

impl Context {
    /// Load configuration and open the working-area store.
    ///
    /// # Errors
    ///
    /// Returns an error if no working area is found or config is invalid.
    pub fn open(overrides: &CliOverrides) -> Result<Self> {
        let config = Config::load(overrides)?;
        let store = FsStore::new(&config.dir);
        Ok(Self { config, store })
    }

    /// Run the auto-merge entry point, if enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge fails.
    pub fn auto_merge(&self) -> Result<Option<MergeResult>> {
        let result = crate::merge::auto_merge(
            &self.store,
            &self.config.working_area,
            &self.config.settings,
            Utc::now(),
        )?;
        if let Some(result) = &result {
            tracing::info!(
                merged = result.merged_count,
                conflicts = result.conflicts.len(),
                "Auto-merge completed"
            );
        }
        Ok(result)
    }
}

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
