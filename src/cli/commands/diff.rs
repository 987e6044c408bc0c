//! Diff command implementation.

use super::{Context, print_json};
use crate::cli::DiffArgs;
use crate::config::CliOverrides;
use crate::diff::{self, ConflictDelta, DiffReport, Presence};
use crate::error::Result;
use crate::storage::container_name;
use std::path::{Path, PathBuf};

/// Execute the diff command.
///
/// With two containers, compares them. With `--conflicts`, compares the
/// ledger against the primary container. Otherwise shows the unresolved
/// duplicates of the working area.
///
/// # Errors
///
/// Returns an error if a container cannot be read.
pub fn execute(args: &DiffArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let ctx = Context::open(overrides)?;
    ctx.auto_merge()?;
    let area = &ctx.config.working_area;

    if let Some(id) = &args.conflicts {
        let id = Some(id.as_str()).filter(|id| !id.is_empty());
        let deltas = diff::diff_conflicts(&ctx.store, area, id)?;
        if json {
            return print_json(&deltas);
        }
        print_conflict_deltas(&deltas);
        return Ok(());
    }

    let report = match (&args.left, &args.right) {
        (Some(left), Some(right)) => diff::diff_containers(
            &ctx.store,
            &resolve(&ctx.config.dir, left),
            &resolve(&ctx.config.dir, right),
        )?,
        _ => diff::diff_working_area(&ctx.store, area)?,
    };
    if json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

/// Container names are looked up in the working area unless they exist as given.
fn resolve(dir: &Path, container: &Path) -> PathBuf {
    if container.is_absolute() || container.exists() {
        container.to_path_buf()
    } else {
        dir.join(container)
    }
}

fn side(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "-".to_string(), |p| container_name(p))
}

fn print_report(report: &DiffReport) {
    if report.is_empty() {
        println!("No differences.");
    }
    for delta in &report.deltas {
        match delta.presence {
            Presence::LeftOnly => println!("{} only in {}", delta.id, side(delta.left.as_ref())),
            Presence::RightOnly => println!("{} only in {}", delta.id, side(delta.right.as_ref())),
            Presence::Both => {
                println!(
                    "{} ({} vs {})",
                    delta.id,
                    side(delta.left.as_ref()),
                    side(delta.right.as_ref())
                );
                for field in &delta.fields {
                    println!("  {}: {} -> {}", field.field, field.left, field.right);
                }
            }
        }
    }
    for diagnostic in &report.diagnostics {
        for error in &diagnostic.errors {
            println!("Warning: {} {error}", container_name(&diagnostic.container));
        }
    }
}

fn print_conflict_deltas(deltas: &[ConflictDelta]) {
    if deltas.is_empty() {
        println!("No recorded values differ from the current ones.");
    }
    for delta in deltas {
        println!(
            "{} {}: recorded {} / current {}",
            delta.id, delta.field, delta.recorded, delta.current
        );
    }
}
