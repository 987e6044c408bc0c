//! Error types and handling for `plaintrack`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Line-level parse failures are NOT errors here; they are collected into
//!   diagnostics by the ingestion layer. Only failures fatal to an operation
//!   (storage, configuration, invalid user input) surface as `TrackError`.
//! - Provides recovery hints for user-facing errors

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `plaintrack` operations.
#[derive(Error, Debug)]
pub enum TrackError {
    // === Storage Errors ===
    /// A container could not be read, written, listed or removed.
    #[error("Storage error on '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tracker directory not found.
    #[error("Tracker not initialized: no .plaintrack directory found")]
    NotInitialized,

    // === Record Errors ===
    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid issue type value.
    #[error("Invalid issue type: {issue_type}")]
    InvalidType { issue_type: String },

    /// Priority must be a small positive integer.
    #[error("Priority must be 1-9, got: {priority}")]
    InvalidPriority { priority: i64 },

    /// A record line could not be decoded.
    #[error("Record parse error at line {line}: {reason}")]
    RecordParse { line: usize, reason: String },

    // === Ordering Errors ===
    /// A parent reference token is malformed.
    #[error("Invalid parent reference '{token}': {reason}")]
    InvalidParentRef { token: String, reason: String },

    /// A sort key contains characters outside `a`-`z`.
    #[error("Invalid sort key '{key}'")]
    InvalidSortKey { key: String },

    /// No key exists strictly between the two neighbours.
    #[error("No sort key fits between '{before}' and '{after}'")]
    NoSortKeyBetween { before: String, after: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackError {
    /// Wrap an I/O error with the container path it happened on.
    #[must_use]
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::InvalidStatus { .. }
                | Self::InvalidType { .. }
                | Self::InvalidPriority { .. }
                | Self::InvalidParentRef { .. }
                | Self::InvalidSortKey { .. }
                | Self::NoSortKeyBetween { .. }
                | Self::Config(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Create a .plaintrack directory or set PLAINTRACK_DIR"),
            Self::InvalidStatus { .. } => Some(
                "Valid statuses: open, draft, in-progress, in-review, complete, closed, archived, deleted",
            ),
            Self::InvalidType { .. } => Some("Valid types: task, bug, chore, idea, feature"),
            Self::InvalidPriority { .. } => Some("Use a priority between 1 (urgent) and 9"),
            Self::InvalidParentRef { .. } => Some("Use <id> or <id>:<sortkey>"),
            Self::InvalidSortKey { .. } => Some("Sort keys use lowercase letters a-z only"),
            Self::NoSortKeyBetween { .. } => Some("Rekey the sibling list to make room"),
            _ => None,
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Storage { .. } | Self::Io(_) => 2,
            _ => 1,
        }
    }
}

/// Result type using `TrackError`.
pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackError::InvalidStatus {
            status: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid status: bogus");
    }

    #[test]
    fn test_storage_error_keeps_path() {
        let err = TrackError::storage(
            "/tmp/issues.jsonl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/issues.jsonl"));
        assert_eq!(err.exit_code(), 2);
        assert!(!err.is_user_recoverable());
    }

    #[test]
    fn test_suggestion() {
        let err = TrackError::InvalidSortKey {
            key: "ABC".to_string(),
        };
        assert_eq!(err.suggestion(), Some("Sort keys use lowercase letters a-z only"));
        assert!(err.is_user_recoverable());
    }
}
