//! In-memory repository.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use dashmap::DashMap;
use futures_util::FutureExt;
use serde_json::{json, Value};

use crate::error::{NodeError, NodeResult};
use crate::subsystems::{Lifecycle, Repository};
use crate::types::{Block, Cid};

/// Repository holding blocks and the config document in memory.
///
/// Contents survive `close()`; only access is refused until reopened.
pub struct MemoryRepo {
    open: AtomicBool,
    blocks: DashMap<Cid, Vec<u8>>,
    config: RwLock<Value>,
}

impl MemoryRepo {
    /// Create an open, empty repository with a default config document.
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            blocks: DashMap::new(),
            config: RwLock::new(json!({
                "Addresses": { "Swarm": ["/ip4/0.0.0.0/tcp/4001"] },
                "Bootstrap": [],
                "Datastore": { "StorageMax": "10GB" },
            })),
        }
    }

    /// Number of stored blocks, regardless of open state.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn ensure_open(&self) -> NodeResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NodeError::NotStarted)
        }
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MemoryRepo {
    fn open(&self) -> Lifecycle<'_> {
        async move {
            if !self.open.swap(true, Ordering::SeqCst) {
                tracing::debug!(blocks = self.blocks.len(), "Repository opened");
            }
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> Lifecycle<'_> {
        async move {
            if self.open.swap(false, Ordering::SeqCst) {
                tracing::debug!(blocks = self.blocks.len(), "Repository closed");
            }
            Ok(())
        }
        .boxed()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn get_block(&self, cid: &Cid) -> NodeResult<Option<Block>> {
        self.ensure_open()?;
        Ok(self.blocks.get(cid).map(|data| Block {
            cid: *cid,
            data: data.value().clone(),
        }))
    }

    fn put_block(&self, block: Block) -> NodeResult<()> {
        self.ensure_open()?;
        self.blocks.insert(block.cid, block.data);
        Ok(())
    }

    fn delete_block(&self, cid: &Cid) -> NodeResult<bool> {
        self.ensure_open()?;
        Ok(self.blocks.remove(cid).is_some())
    }

    fn config(&self) -> NodeResult<Value> {
        self.ensure_open()?;
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| NodeError::Repo("config lock poisoned".to_string()))
    }

    fn replace_config(&self, config: Value) -> NodeResult<()> {
        self.ensure_open()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| NodeError::Repo("config lock poisoned".to_string()))?;
        *current = config;
        Ok(())
    }
}
