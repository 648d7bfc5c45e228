//! Garbage-collection lock.
//!
//! Content mutations (adding blocks, pinning) share the lock; a collector
//! takes it exclusively, so it never observes a half-written graph.

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
pub struct GcLock {
    inner: Arc<RwLock<()>>,
}

impl GcLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared lock held while mutating content.
    ///
    /// Not reentrant: operations nested under a holder use their `*_locked`
    /// variants.
    pub async fn read_lock(&self) -> OwnedRwLockReadGuard<()> {
        self.inner.clone().read_owned().await
    }

    /// Exclusive lock held while collecting garbage.
    pub async fn write_lock(&self) -> OwnedRwLockWriteGuard<()> {
        self.inner.clone().write_owned().await
    }
}
