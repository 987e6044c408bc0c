//! Shared utilities for `plaintrack`.
//!
//! - Sort-key allocation for ordered parent references
//! - Content hashing (SHA256) of container text

pub mod sort_key;

pub use sort_key::{FIRST_SORT_KEY, next_sort_key, parse_many, parse_one, rekey, sort_key_between};

use sha2::{Digest, Sha256};

/// SHA256 hex digest of container text.
#[must_use]
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}
