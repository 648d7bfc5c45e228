//! Content identifiers, peer identity and block types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::NodeError;

/// Multibase-style prefix carried by every textual CID.
const CID_PREFIX: char = 'b';

/// Content identifier: the SHA-256 digest of a block's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid([u8; 32]);

impl Cid {
    /// Hash `data` into its content identifier.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn digest(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CID_PREFIX, hex::encode(self.0))
    }
}

impl FromStr for Cid {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s
            .strip_prefix(CID_PREFIX)
            .ok_or_else(|| NodeError::InvalidCid(s.to_string()))?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digest, &mut bytes).map_err(|_| NodeError::InvalidCid(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Cid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of the local peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable block of bytes and its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl Block {
    /// Build a block, deriving the CID from its contents.
    pub fn new(data: Vec<u8>) -> Self {
        Self { cid: Cid::of(&data), data }
    }
}

/// Size information for a stored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockStat {
    pub cid: Cid,
    pub size: usize,
}
