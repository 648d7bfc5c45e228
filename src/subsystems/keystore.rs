//! In-memory key store.

use dashmap::DashMap;
use serde::Serialize;

use crate::subsystems::KeyStore;
use crate::types::PeerId;

/// Name of the key backing the node's own identity.
pub const SELF_KEY: &str = "self";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub name: String,
    pub id: PeerId,
}

pub struct MemoryKeyStore {
    keys: DashMap<String, PeerId>,
}

impl MemoryKeyStore {
    /// Create a store holding only the `self` key.
    pub fn new(self_id: PeerId) -> Self {
        let keys = DashMap::new();
        keys.insert(SELF_KEY.to_string(), self_id);
        Self { keys }
    }

    pub fn insert(&self, name: impl Into<String>, id: PeerId) {
        self.keys.insert(name.into(), id);
    }
}

impl KeyStore for MemoryKeyStore {
    fn list(&self) -> Vec<KeyInfo> {
        let mut keys: Vec<KeyInfo> = self
            .keys
            .iter()
            .map(|entry| KeyInfo {
                name: entry.key().clone(),
                id: entry.value().clone(),
            })
            .collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        keys
    }
}
