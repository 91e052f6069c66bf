//! S3-compatible HTTP protocol handling for syncbox.
//!
//! The request lifecycle, in order:
//!
//! 1. CORS headers on every response; `OPTIONS` short-circuits
//! 2. SigV4 verification when an access key is configured
//! 3. Routing: `/{bucket}` or `/{bucket}/{key...}`, single configured bucket
//! 4. Dispatch to the object store (PUT/GET/HEAD/DELETE/ListObjectsV2)
//! 5. A `trigger()` on the sync capability after every mutating operation
//! 6. XML responses with the element names S3 clients expect
//! 7. One access-log line per request (method, path, status, elapsed)
//!
//! # Modules
//!
//! - [`body`] - the [`ResponseBody`] type (buffered or empty)
//! - [`error`] - [`S3Error`] and its XML error codes
//! - [`handler`] - routing, auth gate, and operation dispatch
//! - [`response`] - response construction helpers and CORS
//! - [`service`] - the hyper [`Service`](hyper::service::Service) wrapper
//! - [`xml`] - `ListBucketResult` and `Error` serialization

pub mod body;
pub mod error;
pub mod handler;
pub mod response;
pub mod service;
pub mod xml;

pub use body::ResponseBody;
pub use error::{S3Error, S3ErrorCode};
pub use handler::S3Handler;
pub use service::S3Service;
