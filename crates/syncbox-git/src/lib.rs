//! Git mirroring for the syncbox object store.
//!
//! Every mutating S3 request ends with a [`SyncTrigger::trigger`] call on
//! the [`Syncer`], which coalesces bursts of writes into at most one
//! commit-and-push cycle per quiet interval. An independent loop pulls from
//! the remote on a fixed interval so that changes made elsewhere hydrate the
//! local tree.
//!
//! The worker degrades gracefully: without a remote it still commits
//! locally, and when repository bootstrap fails entirely it runs as a
//! logged no-op — the HTTP path never observes a sync failure.
//!
//! # Modules
//!
//! - [`repo`] - repository bootstrap (open, clone, or init)
//! - [`syncer`] - the debounced [`Syncer`] worker
//!
//! [`SyncTrigger::trigger`]: syncbox_core::SyncTrigger::trigger

pub mod repo;
pub mod syncer;

pub use repo::init_repo;
pub use syncer::Syncer;
