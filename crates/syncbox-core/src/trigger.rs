//! The sync-scheduling capability handed to the HTTP layer.
//!
//! The handler only ever needs to say "something changed"; everything else
//! (debouncing, committing, pushing) belongs to the sync worker. Keeping the
//! boundary to a single method keeps the HTTP code testable against an inert
//! stub and leaves the commit path swappable.

/// Capability for scheduling a background sync after a mutating operation.
///
/// Implementations must not block: the HTTP request path calls
/// [`trigger`](SyncTrigger::trigger) inline after every PUT and DELETE.
pub trait SyncTrigger: Send + Sync + 'static {
    /// Schedule a (debounced) sync of the object store.
    fn trigger(&self);
}

/// A [`SyncTrigger`] that does nothing.
///
/// Used when no remote repository is configured and as an inert stub in
/// handler tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrigger;

impl SyncTrigger for NullTrigger {
    fn trigger(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_trigger_on_null_implementation() {
        let trigger = NullTrigger;
        trigger.trigger();
        trigger.trigger();
    }
}
