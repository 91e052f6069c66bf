//! Verification failure variants.
//!
//! These never cross the HTTP boundary — every variant collapses to a plain
//! `false` from [`verify`](crate::verify) — but they keep the internal
//! pipeline honest and make failures observable in debug logs.

/// Reasons a SigV4 verification can fail.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing or not valid UTF-8.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header does not follow the
    /// `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`
    /// shape.
    #[error("malformed Authorization header")]
    MalformedAuthHeader,

    /// The credential scope does not name the configured access key and
    /// region.
    #[error("credential does not match configured key or region")]
    CredentialMismatch,

    /// The recomputed signature differs from the received one.
    #[error("signature does not match")]
    SignatureMismatch,
}
