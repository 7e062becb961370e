//! Exclusive lock for portal automation.
//!
//! The portal's cart is session-global, so at most one booking or
//! cancellation pipeline may touch it at a time. Release is tied to guard
//! drop, which makes it panic-safe and impossible to forget.

use tokio::sync::{Mutex, MutexGuard};

/// Serializes cart-mutating automation. Not reentrant: a holder that
/// re-acquires deadlocks, so pipelines take the lock exactly once at entry.
#[derive(Debug, Default)]
pub struct AutomationLock {
    inner: Mutex<()>,
}

/// Held for the duration of one pipeline run. Dropping it releases the lock.
#[derive(Debug)]
pub struct AutomationGuard<'a> {
    _inner: MutexGuard<'a, ()>,
}

impl AutomationLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> AutomationGuard<'_> {
        AutomationGuard {
            _inner: self.inner.lock().await,
        }
    }
}
