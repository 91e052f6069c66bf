//! Canonical request construction.
//!
//! The canonical request format, per the SigV4 specification:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! `CanonicalHeaders` is one `name:value\n` line per signed header in
//! ascii-sorted order (its trailing newline yields the blank line the
//! format requires). Header values are taken verbatim from the request —
//! first value, surrounding whitespace trimmed — except `host`, which is
//! resolved from the `Host` header or the request URI. The query string is
//! canonicalized by sorting the already-percent-encoded `k=v` pairs; values
//! are never re-encoded, because the server must sign exactly the bytes the
//! client signed.

use http::request::Parts;

/// Payload hash substituted when the client did not send
/// `x-amz-content-sha256`.
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Build the canonical request string for an incoming request.
///
/// `signed_headers` is the raw `SignedHeaders` value from the
/// `Authorization` header (semicolon-separated, reproduced verbatim in the
/// canonical request).
#[must_use]
pub fn canonical_request(parts: &Parts, signed_headers: &str) -> String {
    let mut names: Vec<&str> = signed_headers.split(';').collect();
    names.sort_unstable();

    let mut canonical_headers = String::new();
    for name in names {
        let value = if name == "host" {
            host_value(parts)
        } else {
            header_value(parts, name)
        };
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(&value);
        canonical_headers.push('\n');
    }

    let payload_hash = parts
        .headers
        .get("x-amz-content-sha256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNSIGNED_PAYLOAD);

    let uri = match parts.uri.path() {
        "" => "/",
        path => path,
    };
    let query = sort_query_string(parts.uri.query().unwrap_or(""));

    format!(
        "{method}\n{uri}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        method = parts.method,
    )
}

/// Build the string to sign from the request timestamp, credential scope,
/// and the hex-encoded SHA-256 of the canonical request.
#[must_use]
pub fn string_to_sign(amz_date: &str, credential_scope: &str, canonical_hash: &str) -> String {
    format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{canonical_hash}")
}

/// Sort an already-percent-encoded query string.
///
/// The `k=v` pairs are ordered lexicographically as raw strings and
/// rejoined with `&`. No decoding or re-encoding happens.
///
/// # Examples
///
/// ```
/// use syncbox_auth::sort_query_string;
///
/// assert_eq!(sort_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(sort_query_string(""), "");
/// ```
#[must_use]
pub fn sort_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<&str> = query.split('&').collect();
    pairs.sort_unstable();
    pairs.join("&")
}

/// The `host` value for the canonical request: the `Host` header when
/// present, otherwise the authority from the request URI.
fn host_value(parts: &Parts) -> String {
    if let Some(host) = parts
        .headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
    {
        return host.trim().to_owned();
    }
    parts
        .uri
        .authority()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// First value of the named header, surrounding whitespace trimmed.
/// Missing headers contribute an empty value, matching what a client that
/// signed a blank header would have produced.
fn header_value(parts: &Parts, name: &str) -> String {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_owned())
        .unwrap_or_default()
}
