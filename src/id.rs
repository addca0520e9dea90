//! Deterministic, content-addressed identifiers shaped like UUID v4
//!
//! The id is derived from a SHA-256 digest of the joined parts, so the same
//! parts always give the same id. It is not a secret: inputs are usually
//! low-entropy business keys.

use std::fmt::Display;

use sha2::{Digest, Sha256};

/// Derive a stable `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` id from `parts`
///
/// Parts are joined with `-` before hashing, so `["a", "b"]` and `["a-b"]`
/// produce the same id.
///
/// # Example
///
/// ```rust
/// use template_binder::compute_id;
///
/// let id = compute_id(["account", "42"]);
/// assert_eq!(id, compute_id(["account", "42"]));
/// assert_eq!(id.len(), 36);
/// ```
pub fn compute_id<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let joined = parts
        .into_iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("-");
    let digest = Sha256::digest(joined.as_bytes());

    let hex = digest[..16]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();

    let group = |range: std::ops::Range<usize>| u16::from_str_radix(&hex[range], 16).unwrap_or(0);
    let version = (group(12..16) & 0x0fff) | 0x4000;
    let variant = (group(16..20) & 0x3fff) | 0x8000;

    format!(
        "{}-{}-{:04x}-{:04x}-{}",
        &hex[0..8],
        &hex[8..12],
        version,
        variant,
        &hex[20..32]
    )
}
