//! In-memory pin store.

use std::fmt;

use dashmap::DashMap;
use serde::Serialize;

use crate::error::{NodeError, NodeResult};
use crate::subsystems::PinManager;
use crate::types::Cid;

/// How a pin protects its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    /// Only the target block.
    Direct,
    /// The target and everything reachable from it.
    Recursive,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinMode::Direct => f.write_str("direct"),
            PinMode::Recursive => f.write_str("recursive"),
        }
    }
}

pub struct MemoryPinStore {
    pins: DashMap<Cid, PinMode>,
}

impl MemoryPinStore {
    pub fn new() -> Self {
        Self { pins: DashMap::new() }
    }
}

impl Default for MemoryPinStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PinManager for MemoryPinStore {
    fn pin(&self, cid: Cid, mode: PinMode) -> NodeResult<()> {
        // A recursive pin already covers a direct request.
        self.pins
            .entry(cid)
            .and_modify(|existing| {
                if mode == PinMode::Recursive {
                    *existing = PinMode::Recursive;
                }
            })
            .or_insert(mode);
        Ok(())
    }

    fn unpin(&self, cid: &Cid) -> NodeResult<PinMode> {
        self.pins
            .remove(cid)
            .map(|(_, mode)| mode)
            .ok_or(NodeError::PinNotFound(*cid))
    }

    fn mode(&self, cid: &Cid) -> NodeResult<Option<PinMode>> {
        Ok(self.pins.get(cid).map(|m| *m.value()))
    }

    fn list(&self) -> NodeResult<Vec<(Cid, PinMode)>> {
        let mut pins: Vec<(Cid, PinMode)> = self.pins.iter().map(|e| (*e.key(), *e.value())).collect();
        pins.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(pins)
    }
}
