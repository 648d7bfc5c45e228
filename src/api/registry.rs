//! Surface assembly.
//!
//! # Build Order
//! ```text
//! DagReader(resolver)
//!     → ObjectApi(resolver, reader)
//!     → PinApi(pins, gc lock, reader, object)
//!     → DagPut(resolver, pin)          second pass, closes over pin
//!     → DagApi(reader, put)
//!     → AddApi(resolver, dag, pin)
//!     → BlockApi(block service, pin)
//! ```
//!
//! `pin` needs the dag reader and `dag.put` needs `pin`; splitting the dag
//! group in two keeps every reference pointing at an already-built value.

use std::sync::Arc;

use crate::api::add::AddApi;
use crate::api::block::BlockApi;
use crate::api::config::ConfigApi;
use crate::api::dag::{DagApi, DagPut, DagReader};
use crate::api::key::KeyApi;
use crate::api::network::{BitswapApi, SwarmApi};
use crate::api::object::ObjectApi;
use crate::api::pin::PinApi;
use crate::api::{ApiSurface, Group, LifecycleOp, Preload};
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::lifecycle::start::StartController;
use crate::lifecycle::state::NodeState;
use crate::lifecycle::stop::StopController;
use crate::lifecycle::surface::WeakSurfaceManager;
use crate::subsystems::{CoreHandles, Subsystems};

/// Default leaf size for imported content.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Options bound into the operation groups at build time.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub chunk_size: usize,
    /// Recursively pin the root of every import.
    pub pin_on_add: bool,
    /// Send preload hints to the prefetcher.
    pub preload: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pin_on_add: true,
            preload: true,
        }
    }
}

impl From<&NodeConfig> for CommandOptions {
    fn from(config: &NodeConfig) -> Self {
        Self {
            chunk_size: config.add.chunk_size,
            pin_on_add: config.add.pin,
            preload: config.preload.enabled,
        }
    }
}

/// Groups shared by both surface variants.
struct Groups {
    add: AddApi,
    block: BlockApi,
    config: ConfigApi,
    dag: Arc<DagApi>,
    key: KeyApi,
    object: Arc<ObjectApi>,
    pin: Arc<PinApi>,
}

fn assemble(core: &CoreHandles, options: &CommandOptions) -> Groups {
    let preload = Preload::new(core.prefetcher.clone(), options.preload);

    let reader = Arc::new(DagReader::new(core.resolver.clone(), preload.clone()));
    let object = Arc::new(ObjectApi::new(core.resolver.clone(), reader.clone()));
    let pin = Arc::new(PinApi::new(
        core.pin_manager.clone(),
        core.gc_lock.clone(),
        reader.clone(),
        object.clone(),
    ));
    let put = DagPut::new(core.resolver.clone(), pin.clone(), core.gc_lock.clone(), preload.clone());
    let dag = Arc::new(DagApi::new(reader, put));

    let add = AddApi::new(
        core.block_service.clone(),
        core.resolver.clone(),
        dag.clone(),
        pin.clone(),
        core.gc_lock.clone(),
        options.chunk_size,
        options.pin_on_add,
        preload.clone(),
    );
    let block = BlockApi::new(
        core.block_service.clone(),
        core.gc_lock.clone(),
        pin.clone(),
        preload,
    );

    Groups {
        add,
        block,
        config: ConfigApi::new(core.repo.clone()),
        dag,
        key: KeyApi::new(core.key_store.clone()),
        object,
        pin,
    }
}

/// Surface of a stopped node: local operations only, `start` live.
pub fn offline(manager: WeakSurfaceManager, subsystems: &Subsystems, options: &CommandOptions) -> ApiSurface {
    let groups = assemble(&subsystems.core, options);
    ApiSurface {
        state: NodeState::Stopped,
        peer_id: subsystems.core.peer_id.clone(),
        add: groups.add,
        block: groups.block,
        config: groups.config,
        dag: groups.dag,
        key: groups.key,
        object: groups.object,
        pin: groups.pin,
        swarm: Group::Unavailable(NodeError::NotStarted),
        bitswap: Group::Unavailable(NodeError::NotStarted),
        start: LifecycleOp::Start(StartController::new(manager.clone(), subsystems.clone(), options.clone())),
        stop: LifecycleOp::Current(manager),
    }
}

/// Surface of a started node: network groups live, `stop` live.
pub fn online(manager: WeakSurfaceManager, subsystems: &Subsystems, options: &CommandOptions) -> ApiSurface {
    let groups = assemble(&subsystems.core, options);
    let network = &subsystems.network;
    ApiSurface {
        state: NodeState::Started,
        peer_id: subsystems.core.peer_id.clone(),
        add: groups.add,
        block: groups.block,
        config: groups.config,
        dag: groups.dag,
        key: groups.key,
        object: groups.object,
        pin: groups.pin,
        swarm: Group::Available(SwarmApi::new(
            network.transport.clone(),
            subsystems.core.peer_id.clone(),
        )),
        bitswap: Group::Available(BitswapApi::new(network.exchange.clone())),
        start: LifecycleOp::Current(manager.clone()),
        stop: LifecycleOp::Stop(StopController::new(manager, subsystems.clone(), options.clone())),
    }
}
