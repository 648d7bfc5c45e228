//! In-memory prefetcher.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;

use crate::subsystems::Prefetcher;
use crate::types::Cid;

/// Records preload hints while running.
pub struct MemoryPrefetcher {
    started: AtomicBool,
    hinted: DashSet<Cid>,
}

impl MemoryPrefetcher {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            hinted: DashSet::new(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether `cid` has been hinted since the prefetcher was created.
    pub fn was_hinted(&self, cid: &Cid) -> bool {
        self.hinted.contains(cid)
    }
}

impl Default for MemoryPrefetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Prefetcher for MemoryPrefetcher {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn preload(&self, cid: &Cid) {
        if self.is_started() {
            tracing::trace!(cid = %cid, "Preload hint");
            self.hinted.insert(*cid);
        }
    }
}
