//! Linked-data operations.
//!
//! The group is built in two halves. `DagReader` (get, resolve, tree) only
//! needs the resolver; `DagPut` needs the pin group, and the pin group needs
//! the reader. Building the reader first and attaching `put` afterwards keeps
//! the dependency graph acyclic.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;

use crate::api::pin::PinApi;
use crate::api::Preload;
use crate::error::{NodeError, NodeResult};
use crate::subsystems::resolver::join_path;
use crate::subsystems::{DagNode, GcLock, PinMode, Resolver};
use crate::types::Cid;

const IPFS_PREFIX: &str = "/ipfs/";

/// Split `<cid>[/path...]`, optionally prefixed with `/ipfs/`.
pub fn split_path(path: &str) -> NodeResult<(Cid, String)> {
    let trimmed = path.strip_prefix(IPFS_PREFIX).unwrap_or(path);
    let trimmed = trimmed.trim_start_matches('/');
    let (root, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    Ok((root.parse()?, rest.to_string()))
}

/// Where a path ends up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// Last node reached by following links.
    pub cid: Cid,
    /// Path left to walk inside that node.
    pub remainder: String,
}

struct Walk {
    cid: Cid,
    node: DagNode,
    remainder: Vec<String>,
}

/// Read half of the dag group.
pub struct DagReader {
    resolver: Arc<dyn Resolver>,
    preload: Preload,
}

impl DagReader {
    pub(crate) fn new(resolver: Arc<dyn Resolver>, preload: Preload) -> Self {
        Self { resolver, preload }
    }

    async fn walk(&self, cid: Cid, path: &str) -> NodeResult<Walk> {
        let mut current = cid;
        let mut node = self.resolver.get(cid).await?;
        let mut remainder = Vec::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let child = node.child(segment).ok_or_else(|| NodeError::InvalidPath {
                cid: current,
                segment: segment.to_string(),
            })?;
            match DagNode::as_link(&child) {
                Some(next) => {
                    current = next;
                    node = self.resolver.get(next).await?;
                    remainder.clear();
                }
                None => {
                    node = DagNode::Json(child);
                    remainder.push(segment.to_string());
                }
            }
        }

        Ok(Walk {
            cid: current,
            node,
            remainder,
        })
    }

    /// The value at `path` inside `cid`, following links.
    pub async fn get(&self, cid: &Cid, path: &str) -> NodeResult<DagNode> {
        self.preload.hint(cid);
        Ok(self.walk(*cid, path).await?.node)
    }

    pub async fn resolve(&self, cid: &Cid, path: &str) -> NodeResult<Resolved> {
        self.preload.hint(cid);
        let walk = self.walk(*cid, path).await?;
        Ok(Resolved {
            cid: walk.cid,
            remainder: walk.remainder.join("/"),
        })
    }

    /// Resolve `<cid>[/path]` to the object it names.
    ///
    /// The path must end on a link target; a path ending inside a node's
    /// own data does not name an object.
    pub async fn resolve_path(&self, path: &str) -> NodeResult<Cid> {
        let (root, rest) = split_path(path)?;
        let resolved = self.resolve(&root, &rest).await?;
        if !resolved.remainder.is_empty() {
            return Err(NodeError::InvalidPath {
                cid: resolved.cid,
                segment: resolved.remainder,
            });
        }
        Ok(resolved.cid)
    }

    /// Every path below `path`; with `recursive`, links are followed too.
    pub async fn tree(&self, cid: &Cid, path: &str, recursive: bool) -> NodeResult<Vec<String>> {
        self.preload.hint(cid);
        let start = self.walk(*cid, path).await?;

        let mut paths = Vec::new();
        let mut queue = VecDeque::from([(String::new(), start.node)]);
        while let Some((prefix, node)) = queue.pop_front() {
            paths.extend(node.paths().into_iter().map(|p| join_path(&prefix, &p)));
            if recursive {
                for link in node.links() {
                    let target = self.resolver.get(link.cid).await?;
                    queue.push_back((join_path(&prefix, &link.name), target));
                }
            }
        }
        Ok(paths)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Pin the stored node recursively.
    pub pin: bool,
}

/// Write half of the dag group.
pub struct DagPut {
    resolver: Arc<dyn Resolver>,
    pin: Arc<PinApi>,
    gc_lock: GcLock,
    preload: Preload,
}

impl DagPut {
    pub(crate) fn new(resolver: Arc<dyn Resolver>, pin: Arc<PinApi>, gc_lock: GcLock, preload: Preload) -> Self {
        Self {
            resolver,
            pin,
            gc_lock,
            preload,
        }
    }

    async fn put(&self, node: &DagNode, options: PutOptions) -> NodeResult<Cid> {
        let _lock = self.gc_lock.read_lock().await;
        self.put_locked(node, options).await
    }

    /// Store with the gc lock already held by the caller.
    async fn put_locked(&self, node: &DagNode, options: PutOptions) -> NodeResult<Cid> {
        let cid = self.resolver.put(node)?;
        if options.pin {
            self.pin.add_locked(cid, PinMode::Recursive).await?;
        }
        self.preload.hint(&cid);
        Ok(cid)
    }
}

/// The assembled dag group.
pub struct DagApi {
    reader: Arc<DagReader>,
    writer: DagPut,
}

impl DagApi {
    pub(crate) fn new(reader: Arc<DagReader>, writer: DagPut) -> Self {
        Self { reader, writer }
    }

    pub async fn get(&self, cid: &Cid, path: &str) -> NodeResult<DagNode> {
        self.reader.get(cid, path).await
    }

    pub async fn resolve(&self, cid: &Cid, path: &str) -> NodeResult<Resolved> {
        self.reader.resolve(cid, path).await
    }

    pub async fn tree(&self, cid: &Cid, path: &str, recursive: bool) -> NodeResult<Vec<String>> {
        self.reader.tree(cid, path, recursive).await
    }

    pub async fn put(&self, node: &DagNode, options: PutOptions) -> NodeResult<Cid> {
        self.writer.put(node, options).await
    }

    pub(crate) async fn put_locked(&self, node: &DagNode, options: PutOptions) -> NodeResult<Cid> {
        self.writer.put_locked(node, options).await
    }
}
