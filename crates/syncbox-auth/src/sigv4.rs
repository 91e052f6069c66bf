//! SigV4 header parsing, key derivation, and request verification.
//!
//! Verification flow:
//!
//! 1. Parse the `Authorization` header into credential scope, signed
//!    headers, and signature.
//! 2. Check the credential names the configured access key and region.
//! 3. Rebuild the canonical request and the string to sign.
//! 4. Derive the signing key with the four-step HMAC chain and recompute
//!    the signature.
//! 5. Compare against the received signature in constant time.
//!
//! There is no clock-skew check on `x-amz-date`, and the `service` field of
//! the credential is treated as opaque input to the key derivation —
//! conformant S3 clients send `s3`.

use hmac::{Hmac, Mac};
use http::request::Parts;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{canonical_request, string_to_sign};
use crate::error::AuthError;

/// The required `Authorization` prefix, including its single trailing space.
const ALGORITHM_PREFIX: &str = "AWS4-HMAC-SHA256 ";

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of a SigV4 `Authorization` header.
#[derive(Debug, Clone)]
pub struct ParsedAuth {
    /// Access key ID from the credential scope.
    pub access_key: String,
    /// Date stamp (`YYYYMMDD`) from the credential scope.
    pub date: String,
    /// Region from the credential scope.
    pub region: String,
    /// Service from the credential scope (opaque, normally `s3`).
    pub service: String,
    /// The `SignedHeaders` value, verbatim (semicolon-separated).
    pub signed_headers: String,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse a SigV4 `Authorization` header value.
///
/// The header must start with the literal `AWS4-HMAC-SHA256 ` and carry
/// non-empty `Credential`, `SignedHeaders`, and `Signature` fields separated
/// by `, `. The credential must split on `/` into exactly five parts.
///
/// # Errors
///
/// Returns [`AuthError::MalformedAuthHeader`] when any of the above fails.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    let rest = header
        .strip_prefix(ALGORITHM_PREFIX)
        .ok_or(AuthError::MalformedAuthHeader)?;

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for field in rest.split(", ") {
        if let Some((key, value)) = field.split_once('=') {
            match key.trim() {
                "Credential" => credential = Some(value.trim()),
                "SignedHeaders" => signed_headers = Some(value.trim()),
                "Signature" => signature = Some(value.trim()),
                _ => {}
            }
        }
    }

    let credential = credential.filter(|v| !v.is_empty());
    let signed_headers = signed_headers.filter(|v| !v.is_empty());
    let signature = signature.filter(|v| !v.is_empty());
    let (Some(credential), Some(signed_headers), Some(signature)) =
        (credential, signed_headers, signature)
    else {
        return Err(AuthError::MalformedAuthHeader);
    };

    // Credential scope: AKID/date/region/service/aws4_request
    let cred_parts: Vec<&str> = credential.split('/').collect();
    if cred_parts.len() != 5 {
        return Err(AuthError::MalformedAuthHeader);
    }

    Ok(ParsedAuth {
        access_key: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        signed_headers: signed_headers.to_owned(),
        signature: signature.to_owned(),
    })
}

/// Derive the SigV4 signing key with the four-step HMAC-SHA256 chain:
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, date)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
///
/// The result is always 32 bytes.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// HMAC-SHA256 of `data` under `key`, hex-encoded.
#[must_use]
pub fn sign_hex(key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(key, data.as_bytes()))
}

/// SHA-256 of `data`, hex-encoded.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify a SigV4-signed request against the single configured credential.
///
/// Returns `false` on any parse failure, credential mismatch, or signature
/// mismatch — the HTTP layer does not distinguish between them.
#[must_use]
pub fn verify(parts: &Parts, access_key: &str, secret_key: &str, region: &str) -> bool {
    match check(parts, access_key, secret_key, region) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "rejected request signature");
            false
        }
    }
}

fn check(
    parts: &Parts,
    access_key: &str,
    secret_key: &str,
    region: &str,
) -> Result<(), AuthError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let auth = parse_authorization_header(header)?;
    if auth.access_key != access_key || auth.region != region {
        return Err(AuthError::CredentialMismatch);
    }

    let canonical = canonical_request(parts, &auth.signed_headers);
    let canonical_hash = sha256_hex(canonical.as_bytes());

    let amz_date = parts
        .headers
        .get("x-amz-date")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let scope = format!(
        "{}/{}/{}/aws4_request",
        auth.date, auth.region, auth.service
    );
    let sts = string_to_sign(amz_date, &scope, &canonical_hash);

    let signing_key = derive_signing_key(secret_key, &auth.date, &auth.region, &auth.service);
    let expected = sign_hex(&signing_key, &sts);

    if expected.as_bytes().ct_eq(auth.signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(AuthError::SignatureMismatch)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
