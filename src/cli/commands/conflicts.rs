//! Conflicts command implementation.

use super::{Context, print_json};
use crate::cli::ConflictsArgs;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::ledger::ConflictLedger;
use crate::model::{ConflictRecord, ConflictValue};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ClearOutput<'a> {
    id: &'a str,
    removed: usize,
}

/// Execute the conflicts command.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read or rewritten.
pub fn execute(args: &ConflictsArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let ctx = Context::open(overrides)?;
    ctx.auto_merge()?;
    let ledger = ConflictLedger::new(&ctx.store, &ctx.config.working_area.ledger);

    if args.clear {
        // clap enforces `requires = "id"`
        let id = args.id.as_deref().unwrap_or_default();
        let removed = ledger.clear(id)?;
        if json {
            return print_json(&ClearOutput { id, removed });
        }
        println!("Cleared {removed} conflict(s) for {id}");
        return Ok(());
    }

    let records: Vec<ConflictRecord> = match &args.id {
        Some(id) => ledger.for_issue(id)?,
        None => ledger
            .load()?
            .records
            .into_iter()
            .map(|located| located.record)
            .collect(),
    };

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No recorded conflicts.");
        return Ok(());
    }
    for record in &records {
        let source = record.source.as_deref().unwrap_or("?");
        let when = record.superseded_at.to_rfc3339();
        match &record.loser {
            ConflictValue::Field {
                field,
                value,
                winning_value,
                ..
            } => println!(
                "{} {field}: {value} lost to {winning_value} ({source}, {when})",
                record.issue_id
            ),
            ConflictValue::Snapshot { .. } => {
                println!("{} whole copy superseded ({source}, {when})", record.issue_id);
            }
        }
    }
    Ok(())
}
