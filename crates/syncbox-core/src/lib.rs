//! Core types shared by the syncbox crates.
//!
//! This crate holds the pieces that both the HTTP layer and the sync worker
//! need without depending on each other:
//!
//! - [`config::Config`] - process configuration loaded from environment variables
//! - [`trigger::SyncTrigger`] - the capability the HTTP handler uses to schedule
//!   a background sync after a mutating request

pub mod config;
pub mod trigger;

pub use config::Config;
pub use trigger::{NullTrigger, SyncTrigger};
