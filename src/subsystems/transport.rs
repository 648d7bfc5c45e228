//! In-memory network transport.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use futures_util::FutureExt;

use crate::error::{Subsystem, SubsystemError};
use crate::subsystems::{Lifecycle, Transport};
use crate::types::PeerId;

/// Transport tracking a set of connected peers.
///
/// Connections are dropped on stop.
pub struct MemoryTransport {
    started: AtomicBool,
    peers: DashSet<PeerId>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            peers: DashSet::new(),
        }
    }

    /// Record a connection to `peer`.
    pub fn connect(&self, peer: PeerId) -> Result<(), SubsystemError> {
        if !self.is_started() {
            return Err(SubsystemError::new(Subsystem::Transport, "transport is not running"));
        }
        self.peers.insert(peer);
        Ok(())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn start(&self) -> Lifecycle<'_> {
        async move {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn stop(&self) -> Lifecycle<'_> {
        async move {
            if self.started.swap(false, Ordering::SeqCst) {
                tracing::debug!(peers = self.peers.len(), "Transport stopped, dropping connections");
                self.peers.clear();
            }
            Ok(())
        }
        .boxed()
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.peers.iter().map(|p| p.key().clone()).collect();
        peers.sort_by(|a, b| a.0.cmp(&b.0));
        peers
    }
}
