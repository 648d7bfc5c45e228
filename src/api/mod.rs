//! API surfaces and the operation groups they expose.
//!
//! # Data Flow
//! ```text
//! subsystem handles
//!     → registry.rs (assemble groups, in dependency order)
//!     → ApiSurface (immutable, one per committed state)
//!     → published through the SurfaceManager
//! ```
//!
//! # Design Decisions
//! - A surface is never mutated; a state change builds a new one
//! - Groups that make no sense in a state are sentinels failing with a
//!   state-specific error rather than missing fields
//! - Surfaces reach the manager through a weak handle, never owning it

pub mod add;
pub mod block;
pub mod config;
pub mod dag;
pub mod key;
pub mod network;
pub mod object;
pub mod pin;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use crate::error::{NodeError, NodeResult};
use crate::lifecycle::start::StartController;
use crate::lifecycle::state::NodeState;
use crate::lifecycle::stop::StopController;
use crate::lifecycle::surface::WeakSurfaceManager;
use crate::subsystems::Prefetcher;
use crate::types::{Cid, PeerId};

pub use add::{AddApi, AddResult};
pub use block::BlockApi;
pub use config::ConfigApi;
pub use dag::{DagApi, PutOptions, Resolved};
pub use key::KeyApi;
pub use network::{BitswapApi, SwarmApi};
pub use object::{ObjectApi, ObjectStat};
pub use pin::{PinApi, PinFilter, PinInfo, PinType};
pub use registry::CommandOptions;

/// An operation group that may be unavailable in the current state.
pub enum Group<T> {
    Available(T),
    Unavailable(NodeError),
}

impl<T> Group<T> {
    pub fn get(&self) -> NodeResult<&T> {
        match self {
            Group::Available(group) => Ok(group),
            Group::Unavailable(err) => Err(err.clone()),
        }
    }
}

/// Lifecycle operation bound into a surface.
pub(crate) enum LifecycleOp {
    Start(StartController),
    Stop(StopController),
    /// The node is already in the requested state.
    Current(WeakSurfaceManager),
}

impl LifecycleOp {
    async fn invoke(&self) -> NodeResult<Arc<ApiSurface>> {
        match self {
            LifecycleOp::Start(controller) => controller.start().await,
            LifecycleOp::Stop(controller) => controller.stop().await,
            LifecycleOp::Current(manager) => manager.upgrade()?.surface().await,
        }
    }
}

/// Preload hints sent to the prefetcher when enabled.
#[derive(Clone)]
pub(crate) struct Preload {
    prefetcher: Arc<dyn Prefetcher>,
    enabled: bool,
}

impl Preload {
    pub(crate) fn new(prefetcher: Arc<dyn Prefetcher>, enabled: bool) -> Self {
        Self { prefetcher, enabled }
    }

    pub(crate) fn hint(&self, cid: &Cid) {
        if self.enabled {
            self.prefetcher.preload(cid);
        }
    }
}

/// The complete set of operations a node exposes in one state.
pub struct ApiSurface {
    state: NodeState,
    peer_id: PeerId,
    pub add: AddApi,
    pub block: BlockApi,
    pub config: ConfigApi,
    pub dag: Arc<DagApi>,
    pub key: KeyApi,
    pub object: Arc<ObjectApi>,
    pub pin: Arc<PinApi>,
    swarm: Group<SwarmApi>,
    bitswap: Group<BitswapApi>,
    start: LifecycleOp,
    stop: LifecycleOp,
}

impl ApiSurface {
    /// The committed state this surface was built for.
    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Connected peers; online only.
    pub fn swarm(&self) -> NodeResult<&SwarmApi> {
        self.swarm.get()
    }

    /// Block exchange status; online only.
    pub fn bitswap(&self) -> NodeResult<&BitswapApi> {
        self.bitswap.get()
    }

    /// Every built surface belongs to an initialised node.
    pub fn init(&self) -> NodeResult<()> {
        Err(NodeError::AlreadyInitialized)
    }

    pub async fn start(&self) -> NodeResult<Arc<ApiSurface>> {
        self.start.invoke().await
    }

    pub async fn stop(&self) -> NodeResult<Arc<ApiSurface>> {
        self.stop.invoke().await
    }
}

impl fmt::Debug for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSurface")
            .field("state", &self.state)
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}
