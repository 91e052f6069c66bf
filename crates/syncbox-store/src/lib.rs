//! Filesystem-backed object store.
//!
//! Object keys are forward-slash-delimited paths below a single root
//! directory. A key `a/b/c.ext` lives at `<root>/a/b/c.ext`; parent
//! directories are created lazily on PUT and pruned on DELETE once empty.
//! A `.git` directory under the root holds version-control metadata and is
//! invisible to listings.
//!
//! # ETags
//!
//! Two deliberately distinct derivations (see [`etag`]): PUT responses carry
//! a digest of the stored content, while HEAD and listings use a cheap
//! pseudo-hash of key and modification time so a walk never re-reads file
//! bodies. Clients must treat ETags as opaque.
//!
//! # Modules
//!
//! - [`error`] - the [`StoreError`] taxonomy
//! - [`etag`] - the two ETag derivations
//! - [`store`] - [`ObjectStore`] and its PUT/GET/HEAD/DELETE/LIST operations

pub mod error;
pub mod etag;
pub mod store;

pub use error::StoreError;
pub use etag::{content_etag, metadata_etag};
pub use store::{ObjectInfo, ObjectMeta, ObjectStore, STORAGE_CLASS};
