//! The two ETag derivations.
//!
//! A PUT response reports a real content digest. HEAD and LIST responses
//! use a pseudo-hash of `key + mtime` instead, so a listing walk never has
//! to re-read file bodies. The two are not equal for the same object;
//! S3 clients treat ETags as opaque, which makes this divergence from real
//! S3 observable but harmless.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Content ETag returned by PUT: the first 32 hex characters of the
/// SHA-256 of the stored bytes, wrapped in double quotes.
///
/// # Examples
///
/// ```
/// use syncbox_store::content_etag;
///
/// let etag = content_etag(b"hello world");
/// assert!(etag.starts_with('"') && etag.ends_with('"'));
/// assert_eq!(etag.len(), 34); // 32 hex chars plus quotes
/// ```
#[must_use]
pub fn content_etag(data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!("\"{}\"", &digest[..32])
}

/// Metadata ETag used by HEAD and LIST: the full SHA-256 hex of the key
/// concatenated with the modification time (RFC 3339, nanoseconds, UTC),
/// wrapped in double quotes.
#[must_use]
pub fn metadata_etag(key: &str, modified: &DateTime<Utc>) -> String {
    let stamp = modified.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let digest = Sha256::digest(format!("{key}{stamp}").as_bytes());
    format!("\"{}\"", hex::encode(digest))
}
