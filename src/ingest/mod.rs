//! Tolerant container ingestion.
//!
//! Each non-blank line is decoded on its own, so one malformed or
//! schema-drifted line never discards the rest of a container. What could
//! not be parsed is summarized in a [`ParseDiagnostic`].

use crate::error::Result;
use crate::model::Issue;
use crate::record::{self, Record};
use crate::storage::{ContainerStore, container_name};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Ingestion outcome for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub container: PathBuf,
    /// Non-blank lines seen.
    pub total_lines: usize,
    pub parsed_lines: usize,
    pub failed_lines: usize,
    pub unknown_fields: BTreeSet<String>,
    /// Human-readable parse errors, `line N: reason`.
    pub errors: Vec<String>,
    /// Raw text of the lines that failed, in order.
    #[serde(skip)]
    pub malformed: Vec<String>,
}

impl ParseDiagnostic {
    fn new(container: &Path) -> Self {
        Self {
            container: container.to_path_buf(),
            ..Self::default()
        }
    }

    /// True if any unknown property or parse error was recorded.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.unknown_fields.is_empty() || !self.errors.is_empty()
    }

    #[must_use]
    pub const fn skipped_rows(&self) -> usize {
        self.total_lines - self.parsed_lines
    }
}

/// A parsed record and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located<T> {
    pub record: T,
    pub container: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

/// Records parsed from one container.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<Located<T>>,
    pub diagnostic: ParseDiagnostic,
}

/// Decode container text that has already been read.
#[must_use]
pub fn parse_container<T: Record>(container: &Path, text: &str) -> Loaded<T> {
    let mut diagnostic = ParseDiagnostic::new(container);
    let mut records = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = idx + 1;
        diagnostic.total_lines += 1;

        match record::decode::<T>(line, line_number) {
            Ok(decoded) => {
                diagnostic.parsed_lines += 1;
                diagnostic.unknown_fields.extend(decoded.unknown_fields);
                records.push(Located {
                    record: decoded.record,
                    container: container.to_path_buf(),
                    line: line_number,
                });
            }
            Err(failure) => {
                tracing::warn!(
                    container = %container.display(),
                    line = failure.line,
                    reason = %failure.reason,
                    "Skipping unparseable record"
                );
                diagnostic.failed_lines += 1;
                diagnostic.errors.push(failure.to_string());
                diagnostic.malformed.push(line.to_string());
            }
        }
    }

    Loaded {
        records,
        diagnostic,
    }
}

/// Read and decode one container.
///
/// # Errors
///
/// Returns an error only if the container cannot be read; malformed lines
/// are reported in the diagnostic.
pub fn load_container<T: Record>(store: &impl ContainerStore, container: &Path) -> Result<Loaded<T>> {
    let text = store.read_container(container)?;
    let loaded = parse_container(container, &text);

    tracing::debug!(
        container = %container.display(),
        total = loaded.diagnostic.total_lines,
        parsed = loaded.diagnostic.parsed_lines,
        failed = loaded.diagnostic.failed_lines,
        "Loaded container"
    );
    Ok(loaded)
}

/// Aggregate ingestion outcome over several containers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadIssuesResult {
    #[serde(skip)]
    pub issues: Vec<Located<Issue>>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl LoadIssuesResult {
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.diagnostics.iter().map(|d| d.total_lines).sum()
    }

    #[must_use]
    pub fn parsed_lines(&self) -> usize {
        self.diagnostics.iter().map(|d| d.parsed_lines).sum()
    }

    #[must_use]
    pub fn failed_lines(&self) -> usize {
        self.diagnostics.iter().map(|d| d.failed_lines).sum()
    }

    #[must_use]
    pub fn skipped_rows(&self) -> usize {
        self.total_lines() - self.parsed_lines()
    }

    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.diagnostics.iter().any(ParseDiagnostic::has_issues)
    }

    #[must_use]
    pub fn unknown_fields(&self) -> BTreeSet<String> {
        self.diagnostics
            .iter()
            .flat_map(|d| d.unknown_fields.iter().cloned())
            .collect()
    }

    /// Every parse error, prefixed with its container name.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .flat_map(|d| {
                let name = container_name(&d.container);
                d.errors.iter().map(move |e| format!("{name} {e}"))
            })
            .collect()
    }

    /// Diagnostic for one container, if it was loaded.
    #[must_use]
    pub fn diagnostic(&self, container: &Path) -> Option<&ParseDiagnostic> {
        self.diagnostics.iter().find(|d| d.container == container)
    }
}

/// Load issues from several containers, in the given order.
///
/// # Errors
///
/// Returns an error if any container cannot be read.
pub fn load_issues(store: &impl ContainerStore, containers: &[PathBuf]) -> Result<LoadIssuesResult> {
    let mut result = LoadIssuesResult::default();
    for container in containers {
        let loaded = load_container::<Issue>(store, container)?;
        result.issues.extend(loaded.records);
        result.diagnostics.push(loaded.diagnostic);
    }
    Ok(result)
}
