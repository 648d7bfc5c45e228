//! Linked-data nodes and their resolution over the block service.
//!
//! Structured nodes are JSON documents; a link is an object of the exact
//! shape `{"/": "<cid>"}`. Anything that does not decode to a JSON object or
//! array is a raw leaf with no links.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::NodeResult;
use crate::subsystems::{BlockService, Resolver};
use crate::types::{Block, Cid};

const LINK_KEY: &str = "/";
const FILE_TYPE: &str = "file";
/// Field of a file node listing its raw leaves in order.
pub(crate) const FILE_CHUNKS: &str = "chunks";

/// A decoded block.
#[derive(Debug, Clone, PartialEq)]
pub enum DagNode {
    Raw(Vec<u8>),
    Json(Value),
}

/// A named edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Slash-separated path of the link within its parent.
    pub name: String,
    pub cid: Cid,
}

impl DagNode {
    /// Build a link value pointing at `cid`.
    pub fn link_to(cid: &Cid) -> Value {
        let mut map = Map::new();
        map.insert(LINK_KEY.to_string(), Value::String(cid.to_string()));
        Value::Object(map)
    }

    /// The target of `value` if it is a link.
    pub fn as_link(value: &Value) -> Option<Cid> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.get(LINK_KEY)?.as_str()?.parse().ok()
    }

    /// A file node written by content import; its chunks are raw leaves.
    pub fn is_file(&self) -> bool {
        matches!(self, DagNode::Json(value) if value.get("type").and_then(Value::as_str) == Some(FILE_TYPE))
    }

    /// Whether `link` of this node points at a raw file leaf.
    pub(crate) fn is_file_chunk(&self, link: &Link) -> bool {
        self.is_file() && link.name.split('/').next() == Some(FILE_CHUNKS)
    }

    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) if value.is_object() || value.is_array() => DagNode::Json(value),
            _ => DagNode::Raw(bytes.to_vec()),
        }
    }

    pub fn encode(&self) -> NodeResult<Vec<u8>> {
        match self {
            DagNode::Raw(bytes) => Ok(bytes.clone()),
            DagNode::Json(value) => Ok(serde_json::to_vec(value)?),
        }
    }

    /// Every link in the node, in document order.
    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::new();
        if let DagNode::Json(value) = self {
            collect_links(value, String::new(), &mut links);
        }
        links
    }

    /// Every path addressable inside the node, links not followed.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if let DagNode::Json(value) = self {
            collect_paths(value, String::new(), &mut paths);
        }
        paths
    }

    /// Step one path segment into the node.
    pub fn child(&self, segment: &str) -> Option<Value> {
        match self {
            DagNode::Json(Value::Object(map)) => map.get(segment).cloned(),
            DagNode::Json(Value::Array(items)) => segment.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
            _ => None,
        }
    }
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", prefix, segment)
    }
}

fn children(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        _ => Vec::new(),
    }
}

fn collect_links(value: &Value, prefix: String, out: &mut Vec<Link>) {
    if let Some(cid) = DagNode::as_link(value) {
        out.push(Link { name: prefix, cid });
        return;
    }
    for (segment, child) in children(value) {
        collect_links(child, join_path(&prefix, &segment), out);
    }
}

fn collect_paths(value: &Value, prefix: String, out: &mut Vec<String>) {
    for (segment, child) in children(value) {
        let path = join_path(&prefix, &segment);
        out.push(path.clone());
        if DagNode::as_link(child).is_none() {
            collect_paths(child, path, out);
        }
    }
}

/// Resolver storing encoded nodes as blocks.
pub struct JsonResolver {
    blocks: Arc<dyn BlockService>,
}

impl JsonResolver {
    pub fn new(blocks: Arc<dyn BlockService>) -> Self {
        Self { blocks }
    }
}

impl Resolver for JsonResolver {
    fn get(&self, cid: Cid) -> BoxFuture<'_, NodeResult<DagNode>> {
        async move {
            let block = self.blocks.get(cid).await?;
            Ok(DagNode::decode(&block.data))
        }
        .boxed()
    }

    fn put(&self, node: &DagNode) -> NodeResult<Cid> {
        let block = Block::new(node.encode()?);
        let cid = block.cid;
        self.blocks.put(block)?;
        Ok(cid)
    }
}
