//! Merge command implementation.

use super::{Context, print_json};
use crate::cli::MergeArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::merge::{MergeOptions, MergeResult, merge_duplicates};
use crate::storage::container_name;
use chrono::Utc;

/// Execute the merge command.
///
/// # Errors
///
/// Returns an error if a container cannot be read or written.
pub fn execute(args: &MergeArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let ctx = Context::open(overrides)?;
    let options = MergeOptions::new(Utc::now()).dry_run(args.dry_run);
    let result = merge_duplicates(&ctx.store, &ctx.config.working_area, options)?;

    if json {
        return print_json(&result);
    }
    print_text(&result);
    Ok(())
}

fn print_text(result: &MergeResult) {
    if result.is_noop() {
        println!("Nothing to merge.");
        for container in &result.consumed {
            println!("Removed empty {}", container_name(container));
        }
        return;
    }

    let prefix = if result.dry_run { "Would merge" } else { "Merged" };
    println!(
        "{prefix} {} duplicate issue(s), copied {} unchanged, {} conflict(s) recorded.",
        result.merged_count,
        result.copied_count,
        result.conflicts.len()
    );
    for id in &result.merged_ids {
        println!("  {id}");
    }
    for container in &result.consumed {
        println!("Consumed {}", container_name(container));
    }
    for container in &result.retained {
        println!("Kept unparseable lines in {}", container_name(container));
    }
}
