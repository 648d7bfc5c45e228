//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PeerId;

/// Root configuration for a node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Local peer identity.
    pub identity: IdentityConfig,

    /// Content import settings.
    pub add: AddConfig,

    /// Prefetch hinting.
    pub preload: PreloadConfig,

    /// Name record republishing.
    pub republisher: RepublisherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub peer_id: String,
}

impl IdentityConfig {
    pub fn peer_id(&self) -> PeerId {
        PeerId(self.peer_id.clone())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            peer_id: "local-node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AddConfig {
    /// Leaf size in bytes.
    pub chunk_size: usize,

    /// Recursively pin imported content.
    pub pin: bool,
}

impl Default for AddConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            pin: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub enabled: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepublisherConfig {
    /// Seconds between republish rounds.
    pub interval_secs: u64,
}

impl RepublisherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RepublisherConfig {
    fn default() -> Self {
        Self { interval_secs: 4 * 60 * 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
