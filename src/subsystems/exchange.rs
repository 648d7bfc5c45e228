//! In-memory block exchange.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;

use crate::error::{NodeError, NodeResult};
use crate::subsystems::Exchange;
use crate::types::{Block, Cid};

/// Exchange counters exposed on the online surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeStat {
    pub started: bool,
    pub wantlist_len: usize,
    pub blocks_received: u64,
}

/// Exchange whose "network" is a table of blocks other peers provide.
pub struct MemoryExchange {
    started: AtomicBool,
    remote: DashMap<Cid, Vec<u8>>,
    wants: DashSet<Cid>,
    blocks_received: AtomicU64,
}

impl MemoryExchange {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            remote: DashMap::new(),
            wants: DashSet::new(),
            blocks_received: AtomicU64::new(0),
        }
    }

    /// Make a block available from remote peers.
    pub fn provide(&self, block: Block) {
        self.remote.insert(block.cid, block.data);
    }
}

impl Default for MemoryExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange for MemoryExchange {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            let dropped = self.wants.len();
            self.wants.clear();
            tracing::debug!(dropped_wants = dropped, "Exchange stopped");
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn fetch(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Option<Block>>> {
        async move {
            if !self.is_started() {
                return Err(NodeError::NotStarted);
            }
            match self.remote.get(&cid) {
                Some(data) => {
                    self.wants.remove(&cid);
                    self.blocks_received.fetch_add(1, Ordering::Relaxed);
                    Ok(Some(Block {
                        cid,
                        data: data.value().clone(),
                    }))
                }
                None => {
                    self.wants.insert(cid);
                    Ok(None)
                }
            }
        }
        .boxed()
    }

    fn wantlist(&self) -> Vec<Cid> {
        let mut wants: Vec<Cid> = self.wants.iter().map(|c| *c.key()).collect();
        wants.sort();
        wants
    }

    fn stat(&self) -> ExchangeStat {
        ExchangeStat {
            started: self.is_started(),
            wantlist_len: self.wants.len(),
            blocks_received: self.blocks_received.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_block_stays_wanted_until_stop() {
        let exchange = MemoryExchange::new();
        let cid = Cid::of(b"elsewhere");
        assert_eq!(exchange.fetch(cid).await, Err(NodeError::NotStarted));

        exchange.start();
        assert_eq!(exchange.fetch(cid).await, Ok(None));
        assert_eq!(exchange.wantlist(), vec![cid]);

        exchange.stop();
        assert!(exchange.wantlist().is_empty());
        assert!(!exchange.stat().started);
    }

    #[tokio::test]
    async fn test_provided_block_is_received() {
        let exchange = MemoryExchange::new();
        let block = Block::new(b"shared".to_vec());
        exchange.provide(block.clone());
        exchange.start();

        assert_eq!(exchange.fetch(block.cid).await, Ok(Some(block)));
        assert_eq!(exchange.stat().blocks_received, 1);
    }
}
