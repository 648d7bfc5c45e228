//! Content import.
//!
//! Bytes are split into `chunk_size` leaves stored as raw blocks. Content
//! fitting one chunk is its own root, unless those bytes would decode as a
//! structured node; otherwise a file node links the leaves in order:
//!
//! ```text
//! { "type": "file", "size": <total bytes>, "chunks": [{"/": <cid>}, ...] }
//! ```

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::dag::{DagApi, PutOptions};
use crate::api::pin::PinApi;
use crate::api::Preload;
use crate::error::{NodeError, NodeResult};
use crate::subsystems::resolver::FILE_CHUNKS;
use crate::subsystems::{BlockService, DagNode, GcLock, PinMode, Resolver};
use crate::types::Cid;

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddResult {
    pub cid: Cid,
    pub size: usize,
    /// Number of leaf blocks written.
    pub chunks: usize,
}

pub struct AddApi {
    blocks: Arc<dyn BlockService>,
    resolver: Arc<dyn Resolver>,
    dag: Arc<DagApi>,
    pin: Arc<PinApi>,
    gc_lock: GcLock,
    chunk_size: usize,
    pin_on_add: bool,
    preload: Preload,
}

impl AddApi {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        blocks: Arc<dyn BlockService>,
        resolver: Arc<dyn Resolver>,
        dag: Arc<DagApi>,
        pin: Arc<PinApi>,
        gc_lock: GcLock,
        chunk_size: usize,
        pin_on_add: bool,
        preload: Preload,
    ) -> Self {
        Self {
            blocks,
            resolver,
            dag,
            pin,
            gc_lock,
            chunk_size: chunk_size.max(1),
            pin_on_add,
            preload,
        }
    }

    pub async fn add(&self, data: &[u8]) -> NodeResult<AddResult> {
        let _lock = self.gc_lock.read_lock().await;

        let mut leaves = Vec::new();
        for chunk in data.chunks(self.chunk_size) {
            leaves.push(self.resolver.put(&DagNode::Raw(chunk.to_vec()))?);
        }
        if leaves.is_empty() {
            leaves.push(self.resolver.put(&DagNode::Raw(Vec::new()))?);
        }

        let cid = match leaves.as_slice() {
            [single] if matches!(DagNode::decode(data), DagNode::Raw(_)) => *single,
            _ => {
                let root = json!({
                    "type": "file",
                    "size": data.len(),
                    "chunks": leaves.iter().map(DagNode::link_to).collect::<Vec<_>>(),
                });
                self.dag.put_locked(&DagNode::Json(root), PutOptions::default()).await?
            }
        };

        if self.pin_on_add {
            self.pin.add_locked(cid, PinMode::Recursive).await?;
        }
        self.preload.hint(&cid);

        tracing::debug!(cid = %cid, size = data.len(), chunks = leaves.len(), "Added content");
        Ok(AddResult {
            cid,
            size: data.len(),
            chunks: leaves.len(),
        })
    }

    /// Reassemble content written by [`AddApi::add`].
    pub async fn cat(&self, cid: &Cid) -> NodeResult<Vec<u8>> {
        self.preload.hint(cid);
        let root = self.blocks.get(*cid).await?;
        let node = DagNode::decode(&root.data);
        let DagNode::Json(value) = &node else {
            return Ok(root.data);
        };
        if !node.is_file() {
            return Ok(root.data);
        }

        let chunks = value
            .get(FILE_CHUNKS)
            .and_then(Value::as_array)
            .ok_or_else(|| NodeError::Codec(format!("{} has no chunk list", cid)))?;
        let mut out = Vec::new();
        for chunk in chunks {
            let leaf = DagNode::as_link(chunk).ok_or_else(|| NodeError::Codec(format!("bad chunk link in {}", cid)))?;
            out.extend_from_slice(&self.blocks.get(leaf).await?.data);
        }
        Ok(out)
    }
}
