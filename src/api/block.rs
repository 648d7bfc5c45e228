//! Raw block operations.

use std::sync::Arc;

use crate::api::pin::PinApi;
use crate::api::Preload;
use crate::error::{NodeError, NodeResult};
use crate::subsystems::{BlockService, GcLock};
use crate::types::{Block, BlockStat, Cid};

pub struct BlockApi {
    blocks: Arc<dyn BlockService>,
    gc_lock: GcLock,
    pin: Arc<PinApi>,
    preload: Preload,
}

impl BlockApi {
    pub(crate) fn new(
        blocks: Arc<dyn BlockService>,
        gc_lock: GcLock,
        pin: Arc<PinApi>,
        preload: Preload,
    ) -> Self {
        Self {
            blocks,
            gc_lock,
            pin,
            preload,
        }
    }

    pub async fn get(&self, cid: &Cid) -> NodeResult<Block> {
        self.preload.hint(cid);
        self.blocks.get(*cid).await
    }

    pub async fn put(&self, data: Vec<u8>) -> NodeResult<Cid> {
        let _lock = self.gc_lock.read_lock().await;
        let block = Block::new(data);
        let cid = block.cid;
        self.blocks.put(block)?;
        self.preload.hint(&cid);
        Ok(cid)
    }

    /// Delete a block. Blocks retained by any pin, indirect ones included,
    /// are refused.
    pub async fn rm(&self, cid: &Cid) -> NodeResult<()> {
        let _lock = self.gc_lock.read_lock().await;
        if self.pin.is_pinned(cid).await? {
            return Err(NodeError::Pinned(*cid));
        }
        self.blocks.delete(cid)
    }

    pub async fn stat(&self, cid: &Cid) -> NodeResult<BlockStat> {
        let block = self.get(cid).await?;
        Ok(BlockStat {
            cid: block.cid,
            size: block.data.len(),
        })
    }
}
