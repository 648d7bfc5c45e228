//! Node handle.
//!
//! Owns the surface manager. Every surface and controller holds only a weak
//! reference back, so dropping the last `Node` clone tears the graph down.

use std::sync::Arc;

use crate::api::registry::{self, CommandOptions};
use crate::api::ApiSurface;
use crate::config::NodeConfig;
use crate::error::NodeResult;
use crate::lifecycle::state::NodeState;
use crate::lifecycle::surface::SurfaceManager;
use crate::subsystems::Subsystems;

#[derive(Clone)]
pub struct Node {
    manager: SurfaceManager,
}

impl Node {
    /// Build a stopped node over `subsystems`, committing its offline surface.
    pub fn create(config: &NodeConfig, subsystems: Subsystems) -> Self {
        let options = CommandOptions::from(config);
        let manager = SurfaceManager::new(NodeState::Stopped, |weak| {
            registry::offline(weak, &subsystems, &options)
        });
        tracing::info!(peer = %subsystems.core.peer_id, "Node created");
        Self { manager }
    }

    /// Build a stopped node backed entirely by in-memory subsystems.
    pub fn in_memory(config: &NodeConfig) -> Self {
        let subsystems = Subsystems::in_memory(config.identity.peer_id(), config.republisher.interval());
        Self::create(config, subsystems)
    }

    /// The current surface, or the outcome of the transition pending now.
    pub async fn api(&self) -> NodeResult<Arc<ApiSurface>> {
        self.manager.surface().await
    }

    pub fn state(&self) -> NodeState {
        self.manager.state()
    }

    pub async fn start(&self) -> NodeResult<Arc<ApiSurface>> {
        self.api().await?.start().await
    }

    pub async fn stop(&self) -> NodeResult<Arc<ApiSurface>> {
        self.api().await?.stop().await
    }

    pub fn manager(&self) -> &SurfaceManager {
        &self.manager
    }
}
