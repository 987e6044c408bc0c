//! Migrate command implementation.

use super::{Context, print_json};
use crate::cli::MigrateArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::migrate::{MigrateOptions, migrate};
use crate::storage::container_name;

/// Execute the migrate command.
///
/// # Errors
///
/// Returns an error if a container cannot be read or rewritten.
pub fn execute(args: &MigrateArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let ctx = Context::open(overrides)?;
    ctx.auto_merge()?;

    let options = MigrateOptions {
        dry_run: args.dry_run,
        actor: Some(ctx.config.actor.clone()),
    };
    let summary = migrate(&ctx.store, &ctx.config.working_area, &options)?;

    if json {
        return print_json(&summary);
    }

    let verb = if summary.dry_run { "Would migrate" } else { "Migrated" };
    println!(
        "{verb} {} of {} issue(s), {} change(s) synthesized.",
        summary.migrated_ids.len(),
        summary.scanned,
        summary.changes_added
    );
    for container in &summary.rewritten {
        println!("  {}", container_name(container));
    }
    if !summary.skipped_ids.is_empty() {
        println!(
            "Skipped (no timestamp): {}",
            summary.skipped_ids.join(", ")
        );
    }
    Ok(())
}
