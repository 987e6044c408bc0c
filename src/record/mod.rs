//! Record codec: one record per JSONL line.
//!
//! Decoding is forward-compatible. Keys outside a record type's field table
//! are reported back as unknown fields and dropped instead of failing the
//! line, and legacy enumeration values are remapped by the model's `FromStr`
//! impls. A line that cannot be decoded yields a [`ParseFailure`], never a
//! panic or an aborted load.

use crate::error::{Result, TrackError};
use crate::model::{ConflictRecord, Issue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

const CONFLICT_MARKERS: &[&str] = &["<<<<<<<", "=======", ">>>>>>>"];

/// A type stored one-per-line in a container.
pub trait Record: Serialize + DeserializeOwned {
    /// Wire names of every field this record understands.
    const FIELDS: &'static [&'static str];

    /// Identifier the record is keyed by.
    fn record_id(&self) -> &str;
}

impl Record for Issue {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "title",
        "description",
        "status",
        "type",
        "priority",
        "group",
        "assignee",
        "tags",
        "pr",
        "linked",
        "parents",
        "updated_at",
        "history",
    ];

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for ConflictRecord {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "superseded_at",
        "source",
        "kind",
        "field",
        "value",
        "changed_at",
        "winning_value",
        "issue",
    ];

    fn record_id(&self) -> &str {
        &self.issue_id
    }
}

/// A successfully decoded line.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub record: T,
    /// Keys present on the line but absent from the field table.
    pub unknown_fields: Vec<String>,
}

/// Why a line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// 1-based line number within the container.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl From<ParseFailure> for TrackError {
    fn from(failure: ParseFailure) -> Self {
        Self::RecordParse {
            line: failure.line,
            reason: failure.reason,
        }
    }
}

/// Encode one record as a single line (without the trailing newline).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode<T: Record>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Encode records as container text, one line each.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_all<'a, T: Record + 'a>(records: impl IntoIterator<Item = &'a T>) -> Result<String> {
    let mut text = String::new();
    for record in records {
        text.push_str(&encode(record)?);
        text.push('\n');
    }
    Ok(text)
}

/// Decode one line.
///
/// # Errors
///
/// Returns a [`ParseFailure`] when the line is not a JSON object or a known
/// field holds an invalid value.
pub fn decode<T: Record>(line: &str, line_number: usize) -> std::result::Result<Decoded<T>, ParseFailure> {
    let fail = |reason: String| ParseFailure {
        line: line_number,
        reason,
    };

    let trimmed = line.trim();
    if CONFLICT_MARKERS
        .iter()
        .any(|marker| trimmed.starts_with(marker))
    {
        return Err(fail("merge conflict marker".to_string()));
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| fail(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(fail("expected a JSON object".to_string()));
    };

    let mut known = Map::new();
    let mut unknown_fields = Vec::new();
    for (key, value) in object {
        if T::FIELDS.contains(&key.as_str()) {
            known.insert(key, value);
        } else {
            unknown_fields.push(key);
        }
    }

    let record = serde_json::from_value(Value::Object(known)).map_err(|e| fail(e.to_string()))?;
    Ok(Decoded {
        record,
        unknown_fields,
    })
}
