//! Object store error types.

/// Errors produced by [`ObjectStore`](crate::ObjectStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key's cleaned form escapes the store root (e.g. contains `..`
    /// segments). Mapped to `AccessDenied` by the HTTP layer.
    #[error("object key escapes the store root")]
    InvalidKey,

    /// No object exists at the key. Mapped to `NoSuchKey`.
    #[error("object not found")]
    NotFound,

    /// An underlying filesystem failure. Mapped to `InternalError`; the
    /// message may name local paths, which is accepted for single-tenant
    /// use.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
