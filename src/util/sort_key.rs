//! Ordered parent references.
//!
//! Sort keys are lowercase `a`-`z` strings compared lexicographically. New
//! keys are always allocated so that existing siblings never need to be
//! renumbered: sequential allocation counts upward from [`FIRST_SORT_KEY`],
//! and [`sort_key_between`] finds room between any two neighbours.

use crate::error::{Result, TrackError};
use crate::model::ParentIssueRef;
use once_cell::sync::Lazy;
use regex::Regex;

/// Seed of the sequential key space.
pub const FIRST_SORT_KEY: &str = "aaa";

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)(?::([^:]*))?$").expect("valid parent token regex")
});

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_lowercase())
}

fn require_valid_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(TrackError::InvalidSortKey {
            key: key.to_string(),
        })
    }
}

/// The key after `key` in the base-26 sequence.
///
/// Carries left like an odometer (`aaz` -> `aba`). When every position is
/// `z` a new position is appended (`zzz` -> `zzza`) so the result stays
/// lexicographically greater.
#[must_use]
pub fn next_sort_key(key: &str) -> String {
    let mut bytes = key.as_bytes().to_vec();
    for idx in (0..bytes.len()).rev() {
        if bytes[idx] < b'z' {
            bytes[idx] += 1;
            for tail in &mut bytes[idx + 1..] {
                *tail = b'a';
            }
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    bytes.push(b'a');
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse `"<id>"` or `"<id>:<key>"`, using `fallback_key` when no key is given.
///
/// # Errors
///
/// Returns `InvalidParentRef` for a malformed token and `InvalidSortKey`
/// for a key outside `a`-`z`.
pub fn parse_one(token: &str, fallback_key: &str) -> Result<ParentIssueRef> {
    let token = token.trim();
    let caps = TOKEN_RE
        .captures(token)
        .ok_or_else(|| TrackError::InvalidParentRef {
            token: token.to_string(),
            reason: "expected <id> or <id>:<sortkey>".to_string(),
        })?;

    let id = &caps[1];
    let key = caps.get(2).map_or(fallback_key, |m| m.as_str());
    require_valid_key(key)?;
    Ok(ParentIssueRef::new(id, key))
}

/// Parse a comma-separated list of parent tokens.
///
/// Tokens without an explicit key take the next key of the sequential
/// space, starting at [`FIRST_SORT_KEY`]. Explicit keys do not advance the
/// sequence.
///
/// # Errors
///
/// Returns an error if any token is malformed.
pub fn parse_many(tokens: Option<&str>) -> Result<Vec<ParentIssueRef>> {
    let Some(tokens) = tokens else {
        return Ok(Vec::new());
    };

    let mut next_key = FIRST_SORT_KEY.to_string();
    let mut refs = Vec::new();
    for token in tokens.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let parsed = parse_one(token, &next_key)?;
        if !token.contains(':') {
            next_key = next_sort_key(&next_key);
        }
        refs.push(parsed);
    }
    Ok(refs)
}

/// A key strictly between `before` and `after`.
///
/// `None` means "no neighbour on that side". With no neighbours at all the
/// seed key is returned.
///
/// # Errors
///
/// Returns `InvalidSortKey` for malformed neighbours and `NoSortKeyBetween`
/// when `before >= after` or no string fits (e.g. between `aa` and `aaa`).
pub fn sort_key_between(before: Option<&str>, after: Option<&str>) -> Result<String> {
    if let Some(key) = before {
        require_valid_key(key)?;
    }
    if let Some(key) = after {
        require_valid_key(key)?;
    }

    let no_room = || TrackError::NoSortKeyBetween {
        before: before.unwrap_or_default().to_string(),
        after: after.unwrap_or_default().to_string(),
    };

    let Some(hi) = after else {
        return Ok(before.map_or_else(|| FIRST_SORT_KEY.to_string(), next_sort_key));
    };
    let lo = before.unwrap_or_default();
    if lo >= hi {
        return Err(no_room());
    }

    let lo_bytes = lo.as_bytes();
    let hi_bytes = hi.as_bytes();
    // lo < hi, so hi has a byte at the first differing position.
    let split = (0..hi_bytes.len())
        .position(|i| lo_bytes.get(i) != hi_bytes.get(i))
        .ok_or_else(no_room)?;
    let prefix = &hi[..split];
    let h = hi_bytes[split];

    match lo_bytes.get(split).copied() {
        // lo is exhausted: lo == prefix.
        // When h is 'a', prefix + "a" only fits if it is a proper prefix of hi.
        None if h > b'a' || hi_bytes.len() > split + 1 => Ok(format!("{prefix}a")),
        None => Err(no_room()),
        Some(l) if h - l >= 2 => Ok(format!("{prefix}{}", char::from(l + 1))),
        Some(l) => {
            let rest = &lo[split + 1..];
            let tail = if rest.is_empty() {
                "n".to_string()
            } else {
                next_sort_key(rest)
            };
            Ok(format!("{prefix}{}{tail}", char::from(l)))
        }
    }
}

/// Assign fresh sequential keys to `refs` in their current order.
pub fn rekey(refs: &mut [ParentIssueRef]) {
    let mut key = FIRST_SORT_KEY.to_string();
    for parent in refs {
        parent.key.clone_from(&key);
        key = next_sort_key(&key);
    }
}
