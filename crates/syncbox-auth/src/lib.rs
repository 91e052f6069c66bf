//! AWS Signature Version 4 verification for syncbox.
//!
//! The server accepts exactly one static credential, so verification is a
//! closed computation: re-derive the `AWS4-HMAC-SHA256` signature for the
//! incoming request from the configured `(access_key, secret_key, region)`
//! and compare it to the received signature in constant time.
//!
//! The public contract is deliberately boolean — [`verify`] returns `true`
//! or `false` and the HTTP layer maps `false` to `403 AccessDenied`. The
//! finer-grained [`AuthError`] taxonomy exists for logging and tests only.
//!
//! # Modules
//!
//! - [`canonical`] - canonical request and string-to-sign construction
//! - [`error`] - verification failure variants
//! - [`sigv4`] - header parsing, key derivation, and the [`verify`] entry point

pub mod canonical;
pub mod error;
pub mod sigv4;

pub use canonical::sort_query_string;
pub use error::AuthError;
pub use sigv4::{derive_signing_key, parse_authorization_header, sign_hex, verify};
