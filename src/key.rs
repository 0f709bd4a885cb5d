//! Composite lookup keys
//!
//! Some resources are only addressable by several identifiers (a Cloud SQL
//! database needs its instance name and its own name). Those parts are
//! folded into one query string so every adapter keeps a single-string
//! `get` contract.

use crate::error::KeyError;

/// Reserved separator between composite key parts.
pub const SEPARATOR: char = '|';

/// Join `parts` into a single key, preserving order.
///
/// Rejects an empty part list, empty parts and parts containing
/// [`SEPARATOR`]; each would make [`decompose`] ambiguous.
pub fn compose<S: AsRef<str>>(parts: &[S]) -> Result<String, KeyError> {
    if parts.is_empty() {
        return Err(KeyError::encoding("", "a composite key needs at least one part"));
    }

    let mut key = String::new();
    for (i, part) in parts.iter().enumerate() {
        let part = part.as_ref();
        if part.is_empty() {
            return Err(KeyError::encoding(part, "parts must not be empty"));
        }
        if part.contains(SEPARATOR) {
            return Err(KeyError::encoding(
                part,
                format!("contains the reserved separator '{SEPARATOR}'"),
            ));
        }
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(part);
    }

    Ok(key)
}

/// Split `key` back into exactly `n` parts.
pub fn decompose(key: &str, n: usize) -> Result<Vec<String>, KeyError> {
    let parts: Vec<&str> = key.split(SEPARATOR).collect();

    if parts.len() != n || parts.iter().any(|p| p.is_empty()) {
        return Err(KeyError::decoding(key, n, parts.len()));
    }

    Ok(parts.into_iter().map(String::from).collect())
}

/// [`decompose`] for the common two-part case.
pub fn decompose_pair(key: &str) -> Result<(String, String), KeyError> {
    let mut parts = decompose(key, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(KeyError::decoding(key, 2, 0)),
    }
}
