//! S3 error codes and the error type carried to the response layer.

use http::StatusCode;
use syncbox_store::StoreError;

/// The error codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3ErrorCode {
    /// Signature invalid or missing, or a key escaping the store root.
    AccessDenied,
    /// The first path segment is not the configured bucket.
    NoSuchBucket,
    /// GET/HEAD on a missing object.
    NoSuchKey,
    /// Unexpected filesystem failure.
    InternalError,
}

impl S3ErrorCode {
    /// The code string placed in `<Code>` of the error XML.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::InternalError => "InternalError",
        }
    }

    /// The HTTP status this code maps to.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NoSuchBucket | Self::NoSuchKey => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for S3ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error destined for an XML `<Error>` response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct S3Error {
    /// The S3 error code.
    pub code: S3ErrorCode,
    /// Human-readable message placed in `<Message>`.
    pub message: String,
}

impl S3Error {
    /// Create an error with an explicit code and message.
    #[must_use]
    pub fn new(code: S3ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `403 AccessDenied`.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::AccessDenied, message)
    }

    /// `404 NoSuchBucket`.
    #[must_use]
    pub fn no_such_bucket() -> Self {
        Self::new(S3ErrorCode::NoSuchBucket, "Bucket not found")
    }

    /// `404 NoSuchKey`.
    #[must_use]
    pub fn no_such_key() -> Self {
        Self::new(S3ErrorCode::NoSuchKey, "Object not found")
    }

    /// `500 InternalError`. The message may include the underlying
    /// filesystem error; acceptable for single-tenant use.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(S3ErrorCode::InternalError, message)
    }
}

impl From<StoreError> for S3Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey => Self::access_denied(err.to_string()),
            StoreError::NotFound => Self::no_such_key(),
            StoreError::Io(e) => Self::internal_error(e.to_string()),
        }
    }
}
