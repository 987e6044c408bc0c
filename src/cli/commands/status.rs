//! Status command implementation.

use super::{Context, print_json};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::ingest::{self, ParseDiagnostic};
use crate::ledger::ConflictLedger;
use crate::merge::{self, Detection};
use crate::model::Issue;
use crate::storage::container_name;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct StatusOutput {
    dir: PathBuf,
    primary: PathBuf,
    issues: usize,
    conflicts: usize,
    detection: Detection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<ParseDiagnostic>,
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the working area cannot be read.
pub fn execute(json: bool, overrides: &CliOverrides) -> Result<()> {
    let ctx = Context::open(overrides)?;
    ctx.auto_merge()?;

    let area = &ctx.config.working_area;
    let primary = ingest::load_container::<Issue>(&ctx.store, &area.primary)?;
    let ledger = ConflictLedger::new(&ctx.store, &area.ledger).load()?;
    let detection = merge::detect(&ctx.store, area)?;

    let mut diagnostics = Vec::new();
    for diagnostic in [primary.diagnostic, ledger.diagnostic] {
        if diagnostic.has_issues() {
            diagnostics.push(diagnostic);
        }
    }

    let output = StatusOutput {
        dir: ctx.config.dir.clone(),
        primary: area.primary.clone(),
        issues: primary.records.len(),
        conflicts: ledger.records.len(),
        detection,
        diagnostics,
    };

    if json {
        return print_json(&output);
    }

    println!("Working area: {}", output.dir.display());
    println!("Issues: {}", output.issues);
    println!("Recorded conflicts: {}", output.conflicts);
    match &output.detection {
        Detection::Clean { pending } if pending.is_empty() => println!("State: clean"),
        Detection::Clean { pending } => {
            println!("State: clean ({} pending container(s) without duplicates)", pending.len());
        }
        Detection::Unmerged {
            pending,
            duplicates,
        } => {
            println!(
                "State: unmerged ({} duplicate id(s) across {} container(s))",
                duplicates.len(),
                pending.len()
            );
            for (id, candidates) in duplicates {
                let sources: Vec<String> = candidates
                    .iter()
                    .map(|c| format!("{}:{}", container_name(&c.container), c.line))
                    .collect();
                println!("  {id}: {}", sources.join(", "));
            }
        }
    }
    for diagnostic in &output.diagnostics {
        for error in &diagnostic.errors {
            println!("Warning: {} {error}", container_name(&diagnostic.container));
        }
        if !diagnostic.unknown_fields.is_empty() {
            let fields: Vec<&str> = diagnostic.unknown_fields.iter().map(String::as_str).collect();
            println!(
                "Warning: {} has unknown fields: {}",
                container_name(&diagnostic.container),
                fields.join(", ")
            );
        }
    }
    Ok(())
}
