//! Pin operations.
//!
//! Pinning verifies the graph is locally complete before recording the pin,
//! so a recursive pin never protects a graph with holes in it.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::api::dag::DagReader;
use crate::api::object::ObjectApi;
use crate::error::NodeResult;
use crate::subsystems::{GcLock, PinManager, PinMode};
use crate::types::Cid;

/// How a listed CID is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Direct,
    Recursive,
    /// Reachable from a recursive pin.
    Indirect,
}

impl From<PinMode> for PinType {
    fn from(mode: PinMode) -> Self {
        match mode {
            PinMode::Direct => PinType::Direct,
            PinMode::Recursive => PinType::Recursive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinFilter {
    #[default]
    All,
    Direct,
    Recursive,
    Indirect,
}

impl PinFilter {
    fn admits(self, kind: PinType) -> bool {
        matches!(
            (self, kind),
            (PinFilter::All, _)
                | (PinFilter::Direct, PinType::Direct)
                | (PinFilter::Recursive, PinType::Recursive)
                | (PinFilter::Indirect, PinType::Indirect)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinInfo {
    pub cid: Cid,
    #[serde(rename = "type")]
    pub kind: PinType,
}

pub struct PinApi {
    pins: Arc<dyn PinManager>,
    gc_lock: GcLock,
    dag: Arc<DagReader>,
    object: Arc<ObjectApi>,
}

impl PinApi {
    pub(crate) fn new(
        pins: Arc<dyn PinManager>,
        gc_lock: GcLock,
        dag: Arc<DagReader>,
        object: Arc<ObjectApi>,
    ) -> Self {
        Self {
            pins,
            gc_lock,
            dag,
            object,
        }
    }

    /// Pin the object at `path`.
    pub async fn add(&self, path: &str, recursive: bool) -> NodeResult<Cid> {
        let _lock = self.gc_lock.read_lock().await;
        let cid = self.dag.resolve_path(path).await?;
        let mode = if recursive { PinMode::Recursive } else { PinMode::Direct };
        self.add_locked(cid, mode).await?;
        Ok(cid)
    }

    /// Pin with the gc lock already held by the caller.
    pub(crate) async fn add_locked(&self, cid: Cid, mode: PinMode) -> NodeResult<()> {
        match mode {
            PinMode::Direct => {
                self.object.get(&cid).await?;
            }
            PinMode::Recursive => {
                self.descendants(cid).await?;
            }
        }
        self.pins.pin(cid, mode)?;
        tracing::debug!(cid = %cid, mode = %mode, "Pinned");
        Ok(())
    }

    pub async fn ls(&self, filter: PinFilter) -> NodeResult<Vec<PinInfo>> {
        let explicit = self.pins.list()?;
        let mut listed: BTreeMap<Cid, PinType> =
            explicit.iter().map(|(cid, mode)| (*cid, PinType::from(*mode))).collect();

        if filter.admits(PinType::Indirect) {
            for (root, mode) in &explicit {
                if *mode != PinMode::Recursive {
                    continue;
                }
                for cid in self.descendants(*root).await? {
                    if cid != *root {
                        listed.entry(cid).or_insert(PinType::Indirect);
                    }
                }
            }
        }

        Ok(listed
            .into_iter()
            .filter(|(_, kind)| filter.admits(*kind))
            .map(|(cid, kind)| PinInfo { cid, kind })
            .collect())
    }

    /// Unpin the object at `path`.
    pub async fn rm(&self, path: &str) -> NodeResult<Cid> {
        let _lock = self.gc_lock.read_lock().await;
        let cid = self.dag.resolve_path(path).await?;
        let mode = self.pins.unpin(&cid)?;
        tracing::debug!(cid = %cid, mode = %mode, "Unpinned");
        Ok(cid)
    }

    /// Whether `cid` is retained by a pin, including as a descendant of a
    /// recursive pin.
    pub(crate) async fn is_pinned(&self, cid: &Cid) -> NodeResult<bool> {
        let explicit = self.pins.list()?;
        if explicit.iter().any(|(pinned, _)| pinned == cid) {
            return Ok(true);
        }
        for (root, mode) in &explicit {
            if *mode == PinMode::Recursive && self.descendants(*root).await?.contains(cid) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every CID reachable from `root`, root included. Fails on the first
    /// block that is not available.
    ///
    /// File chunks are raw leaves: their presence is checked but their bytes
    /// are never read as links, whatever they look like.
    async fn descendants(&self, root: Cid) -> NodeResult<Vec<Cid>> {
        let mut seen = HashSet::from([root]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([(root, false)]);
        while let Some((cid, leaf)) = queue.pop_front() {
            order.push(cid);
            let node = self.object.get(&cid).await?;
            if leaf {
                continue;
            }
            for link in node.links() {
                if seen.insert(link.cid) {
                    queue.push_back((link.cid, node.is_file_chunk(&link)));
                }
            }
        }
        Ok(order)
    }
}
