//! Collaborator subsystems the lifecycle core coordinates.
//!
//! # Data Flow
//! ```text
//! Core handles (used by every surface):
//!     repository ← block service ← resolver
//!     pin manager, prefetcher, key store, gc lock
//!
//! Network handles (live only while started):
//!     transport, exchange (attached to the block service), name publisher
//! ```
//!
//! # Design Decisions
//! - Every collaborator sits behind a trait so the core never sees an
//!   implementation; the in-memory versions here back the binary and tests
//! - Synchronous lifecycle hooks (`Exchange::stop`, `Prefetcher::stop`,
//!   `BlockService::unset_exchange`) cannot fail; asynchronous ones return a
//!   boxed future resolving to `Result<(), SubsystemError>`
//! - Handles are `Arc`ed and cloned freely; lifecycle state lives inside them

pub mod block_service;
pub mod exchange;
pub mod gc_lock;
pub mod keystore;
pub mod pins;
pub mod prefetch;
pub mod publisher;
pub mod repo;
pub mod resolver;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::error::{NodeResult, SubsystemError};
use crate::types::{Block, Cid, PeerId};

pub use block_service::RepoBlockService;
pub use exchange::{ExchangeStat, MemoryExchange};
pub use gc_lock::GcLock;
pub use keystore::{KeyInfo, MemoryKeyStore};
pub use pins::{MemoryPinStore, PinMode};
pub use prefetch::MemoryPrefetcher;
pub use publisher::IntervalRepublisher;
pub use repo::MemoryRepo;
pub use resolver::{DagNode, JsonResolver, Link};
pub use transport::MemoryTransport;

/// Completion signal for an asynchronous lifecycle call.
pub type Lifecycle<'a> = BoxFuture<'a, Result<(), SubsystemError>>;

/// Persisted block and config store.
pub trait Repository: Send + Sync {
    fn open(&self) -> Lifecycle<'_>;
    fn close(&self) -> Lifecycle<'_>;
    fn is_open(&self) -> bool;

    fn get_block(&self, cid: &Cid) -> NodeResult<Option<Block>>;
    fn put_block(&self, block: Block) -> NodeResult<()>;
    /// Returns whether the block was present.
    fn delete_block(&self, cid: &Cid) -> NodeResult<bool>;

    fn config(&self) -> NodeResult<serde_json::Value>;
    fn replace_config(&self, config: serde_json::Value) -> NodeResult<()>;
}

/// Block access fronting the repository and, while started, the exchange.
pub trait BlockService: Send + Sync {
    fn set_exchange(&self, exchange: Arc<dyn Exchange>);
    fn unset_exchange(&self);
    fn has_exchange(&self) -> bool;

    fn get(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Block>>;
    fn put(&self, block: Block) -> NodeResult<()>;
    fn delete(&self, cid: &Cid) -> NodeResult<()>;
}

/// Block-trading protocol.
pub trait Exchange: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn is_started(&self) -> bool;

    /// Ask the network for a block. `Ok(None)` leaves it on the wantlist.
    fn fetch(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Option<Block>>>;
    fn wantlist(&self) -> Vec<Cid>;
    fn stat(&self) -> ExchangeStat;
}

/// Network transport.
pub trait Transport: Send + Sync {
    fn start(&self) -> Lifecycle<'_>;
    fn stop(&self) -> Lifecycle<'_>;
    fn is_started(&self) -> bool;
    fn peers(&self) -> Vec<PeerId>;
}

/// Background content prefetcher.
pub trait Prefetcher: Send + Sync {
    fn start(&self);
    fn stop(&self);
    /// Hint that `cid` was touched locally. Ignored while stopped.
    fn preload(&self, cid: &Cid);
}

/// Background republisher of name records.
pub trait NamePublisher: Send + Sync {
    fn start(&self) -> Lifecycle<'_>;
    fn stop(&self) -> Lifecycle<'_>;
}

/// Retention markers preventing garbage collection.
pub trait PinManager: Send + Sync {
    fn pin(&self, cid: Cid, mode: PinMode) -> NodeResult<()>;
    /// Removes the pin and returns the mode it had.
    fn unpin(&self, cid: &Cid) -> NodeResult<PinMode>;
    fn mode(&self, cid: &Cid) -> NodeResult<Option<PinMode>>;
    fn list(&self) -> NodeResult<Vec<(Cid, PinMode)>>;
}

/// Linked-data resolution over blocks.
pub trait Resolver: Send + Sync {
    fn get(&self, cid: Cid) -> BoxFuture<'_, NodeResult<DagNode>>;
    fn put(&self, node: &DagNode) -> NodeResult<Cid>;
}

/// Named key material.
pub trait KeyStore: Send + Sync {
    fn list(&self) -> Vec<KeyInfo>;
}

/// Handles every surface operates on.
#[derive(Clone)]
pub struct CoreHandles {
    pub repo: Arc<dyn Repository>,
    pub block_service: Arc<dyn BlockService>,
    pub resolver: Arc<dyn Resolver>,
    pub pin_manager: Arc<dyn PinManager>,
    pub prefetcher: Arc<dyn Prefetcher>,
    pub key_store: Arc<dyn KeyStore>,
    pub gc_lock: GcLock,
    pub peer_id: PeerId,
}

/// Handles that only run while the node is started.
#[derive(Clone)]
pub struct NetworkHandles {
    pub transport: Arc<dyn Transport>,
    pub exchange: Arc<dyn Exchange>,
    pub name_publisher: Arc<dyn NamePublisher>,
}

/// Every collaborator of one node instance.
#[derive(Clone)]
pub struct Subsystems {
    pub core: CoreHandles,
    pub network: NetworkHandles,
}

impl Subsystems {
    /// Wire a node entirely from in-memory collaborators.
    ///
    /// The repository starts open, matching a freshly initialised node.
    pub fn in_memory(peer_id: PeerId, republish_interval: Duration) -> Self {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepo::new());
        let block_service: Arc<dyn BlockService> = Arc::new(RepoBlockService::new(repo.clone()));
        let key_store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new(peer_id.clone()));

        let core = CoreHandles {
            resolver: Arc::new(JsonResolver::new(block_service.clone())),
            pin_manager: Arc::new(MemoryPinStore::new()),
            prefetcher: Arc::new(MemoryPrefetcher::new()),
            gc_lock: GcLock::new(),
            repo,
            block_service,
            key_store: key_store.clone(),
            peer_id,
        };
        let network = NetworkHandles {
            transport: Arc::new(MemoryTransport::new()),
            exchange: Arc::new(MemoryExchange::new()),
            name_publisher: Arc::new(IntervalRepublisher::new(key_store, republish_interval)),
        };

        Self { core, network }
    }
}
