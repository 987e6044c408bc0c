//! CLI definitions and entry point.

use crate::config::CliOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Plaintext issue tracker with field-level merge of divergent copies
#[derive(Parser, Debug)]
#[command(name = "pt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Working-area directory (auto-discover .plaintrack if not set)
    #[arg(long, global = true, env = "PLAINTRACK_DIR")]
    pub dir: Option<PathBuf>,

    /// Merge pending containers before running the command
    #[arg(long, global = true)]
    pub auto_merge: bool,

    /// Actor name recorded on synthesized history
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            dir: self.dir.clone(),
            auto_merge: self.auto_merge.then_some(true),
            actor: self.actor.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report whether the working area holds unmerged duplicates
    Status,

    /// Merge pending containers into the primary container
    Merge(MergeArgs),

    /// Show field-level differences
    Diff(DiffArgs),

    /// Synthesize per-field history for legacy records
    Migrate(MigrateArgs),

    /// List or clear recorded conflicts
    Conflicts(ConflictsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct MergeArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiffArgs {
    /// First container (name inside the working area, or a path)
    #[arg(requires = "right")]
    pub left: Option<PathBuf>,

    /// Second container
    pub right: Option<PathBuf>,

    /// Compare recorded conflicts with current values, optionally for one issue
    #[arg(
        long,
        value_name = "ID",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "left"
    )]
    pub conflicts: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConflictsArgs {
    /// Only show conflicts for this issue
    pub id: Option<String>,

    /// Remove the issue's conflicts from the ledger
    #[arg(long, requires = "id")]
    pub clear: bool,
}
