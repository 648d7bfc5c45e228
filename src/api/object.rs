//! Node-level views: links and sizes of a single object.

use std::sync::Arc;

use serde::Serialize;

use crate::api::dag::DagReader;
use crate::error::NodeResult;
use crate::subsystems::{DagNode, Link, Resolver};
use crate::types::Cid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectStat {
    pub cid: Cid,
    pub num_links: usize,
    /// Encoded size of the node itself, children excluded.
    pub data_size: usize,
}

pub struct ObjectApi {
    resolver: Arc<dyn Resolver>,
    dag: Arc<DagReader>,
}

impl ObjectApi {
    pub(crate) fn new(resolver: Arc<dyn Resolver>, dag: Arc<DagReader>) -> Self {
        Self { resolver, dag }
    }

    pub async fn get(&self, cid: &Cid) -> NodeResult<DagNode> {
        self.resolver.get(*cid).await
    }

    pub async fn links(&self, cid: &Cid) -> NodeResult<Vec<Link>> {
        Ok(self.get(cid).await?.links())
    }

    pub async fn stat(&self, cid: &Cid) -> NodeResult<ObjectStat> {
        let node = self.get(cid).await?;
        Ok(ObjectStat {
            cid: *cid,
            num_links: node.links().len(),
            data_size: node.encode()?.len(),
        })
    }

    /// Resolve `<cid>[/path]` to the object it names.
    pub async fn resolve(&self, path: &str) -> NodeResult<Cid> {
        self.dag.resolve_path(path).await
    }
}
