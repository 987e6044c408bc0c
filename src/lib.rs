//! `plaintrack` - plaintext, version-control-friendly issue tracking
//!
//! Issues live one-per-line in JSONL containers so ordinary source-control
//! tooling can diff and merge them. When a merge leaves several divergent
//! copies of the same issue behind, this crate reconciles them field by
//! field and records every discarded value in a conflict ledger.
//!
//! # Architecture
//!
//! - [`model`] - Issue, property change and conflict record types
//! - [`record`] - One record per JSONL line, tolerant of schema drift
//! - [`ingest`] - Container loading with per-line diagnostics
//! - [`storage`] - Container store boundary and working-area roles
//! - [`merge`] - Duplicate detection and per-field reconciliation
//! - [`ledger`] - Append-only conflict ledger
//! - [`diff`] - Read-only field-level comparisons
//! - [`migrate`] - Synthesis of per-field history for legacy records
//! - [`config`] - Layered configuration
//! - [`cli`] - Command-line interface using clap
//! - [`util`] - Sort keys for ordered parent references, hashing

#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod logging;
pub mod merge;
pub mod migrate;
pub mod model;
pub mod record;
pub mod storage;
pub mod util;

pub use error::{Result, TrackError};
