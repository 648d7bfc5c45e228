//! Shared recording fakes for integration tests.
//!
//! Every fake delegates to the in-memory subsystem and appends to a shared
//! event log, so tests can assert on call order across subsystems.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{watch, Barrier};

use content_node::config::NodeConfig;
use content_node::error::{NodeResult, Subsystem, SubsystemError};
use content_node::subsystems::{
    BlockService, CoreHandles, Exchange, ExchangeStat, GcLock, JsonResolver, Lifecycle, MemoryExchange,
    MemoryKeyStore, MemoryPinStore, MemoryPrefetcher, MemoryRepo, MemoryTransport, NamePublisher,
    NetworkHandles, Prefetcher, RepoBlockService, Repository, Subsystems, Transport,
};
use content_node::types::{Block, Cid, PeerId};
use content_node::Node;

pub const PEER: &str = "peer-under-test";

/// Ordered record of subsystem calls.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {event} not recorded in {:?}", self.events()))
    }
}

/// A latch held closed until `open()`.
#[derive(Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Scripted behaviour for a subsystem's lifecycle calls.
pub struct Hooks {
    name: &'static str,
    log: EventLog,
    fail_start: Mutex<Option<String>>,
    fail_stop: Mutex<Option<String>>,
    gate: Mutex<Option<Gate>>,
    start_gate: Mutex<Option<Gate>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
    stops: AtomicUsize,
}

impl Hooks {
    fn new(name: &'static str, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            log,
            fail_start: Mutex::new(None),
            fail_stop: Mutex::new(None),
            gate: Mutex::new(None),
            start_gate: Mutex::new(None),
            barrier: Mutex::new(None),
            stops: AtomicUsize::new(0),
        })
    }

    pub fn fail_start(&self, message: &str) {
        *self.fail_start.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_stop(&self, message: &str) {
        *self.fail_stop.lock().unwrap() = Some(message.to_string());
    }

    /// Hold stop completion until the gate opens.
    pub fn gate_stop(&self, gate: &Gate) {
        *self.gate.lock().unwrap() = Some(gate.clone());
    }

    /// Hold start completion until the gate opens.
    pub fn gate_start(&self, gate: &Gate) {
        *self.start_gate.lock().unwrap() = Some(gate.clone());
    }

    /// Stop completes only once every party of the barrier is waiting.
    pub fn join_stop(&self, barrier: &Arc<Barrier>) {
        *self.barrier.lock().unwrap() = Some(barrier.clone());
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn starting(&self, subsystem: Subsystem) -> impl Future<Output = Result<(), SubsystemError>> + Send + 'static {
        self.log.push(format!("{}.start", self.name));

        let fail = self.fail_start.lock().unwrap().clone();
        let gate = self.start_gate.lock().unwrap().clone();
        async move {
            if let Some(gate) = gate {
                gate.wait().await;
            }
            match fail {
                Some(message) => Err(SubsystemError::new(subsystem, message)),
                None => Ok(()),
            }
        }
    }

    /// Records the issue synchronously; the returned future records completion.
    fn stopping(&self, subsystem: Subsystem) -> impl Future<Output = Result<(), SubsystemError>> + Send + 'static {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("{}.stop.issued", self.name));

        let fail = self.fail_stop.lock().unwrap().clone();
        let gate = self.gate.lock().unwrap().clone();
        let barrier = self.barrier.lock().unwrap().clone();
        let log = self.log.clone();
        let name = self.name;
        async move {
            if let Some(barrier) = barrier {
                barrier.wait().await;
            }
            if let Some(gate) = gate {
                gate.wait().await;
            }
            log.push(format!("{name}.stop.done"));
            match fail {
                Some(message) => Err(SubsystemError::new(subsystem, message)),
                None => Ok(()),
            }
        }
    }
}

pub struct RecordingRepo {
    pub inner: Arc<MemoryRepo>,
    pub hooks: Arc<Hooks>,
}

impl Repository for RecordingRepo {
    fn open(&self) -> Lifecycle<'_> {
        let starting = self.hooks.starting(Subsystem::Repository);
        async move {
            starting.await?;
            self.inner.open().await
        }
        .boxed()
    }

    fn close(&self) -> Lifecycle<'_> {
        let stopping = self.hooks.stopping(Subsystem::Repository);
        async move {
            stopping.await?;
            self.inner.close().await
        }
        .boxed()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn get_block(&self, cid: &Cid) -> NodeResult<Option<Block>> {
        self.inner.get_block(cid)
    }

    fn put_block(&self, block: Block) -> NodeResult<()> {
        self.inner.put_block(block)
    }

    fn delete_block(&self, cid: &Cid) -> NodeResult<bool> {
        self.inner.delete_block(cid)
    }

    fn config(&self) -> NodeResult<serde_json::Value> {
        self.inner.config()
    }

    fn replace_config(&self, config: serde_json::Value) -> NodeResult<()> {
        self.inner.replace_config(config)
    }
}

pub struct RecordingBlockService {
    pub inner: RepoBlockService,
    log: EventLog,
}

impl BlockService for RecordingBlockService {
    fn set_exchange(&self, exchange: Arc<dyn Exchange>) {
        self.log.push("block_service.set_exchange");
        self.inner.set_exchange(exchange);
    }

    fn unset_exchange(&self) {
        self.log.push("block_service.unset_exchange");
        self.inner.unset_exchange();
    }

    fn has_exchange(&self) -> bool {
        self.inner.has_exchange()
    }

    fn get(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Block>> {
        self.inner.get(cid)
    }

    fn put(&self, block: Block) -> NodeResult<()> {
        self.inner.put(block)
    }

    fn delete(&self, cid: &Cid) -> NodeResult<()> {
        self.inner.delete(cid)
    }
}

pub struct RecordingExchange {
    pub inner: MemoryExchange,
    log: EventLog,
}

impl Exchange for RecordingExchange {
    fn start(&self) {
        self.log.push("exchange.start");
        self.inner.start();
    }

    fn stop(&self) {
        self.log.push("exchange.stop");
        self.inner.stop();
    }

    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    fn fetch(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Option<Block>>> {
        self.inner.fetch(cid)
    }

    fn wantlist(&self) -> Vec<Cid> {
        self.inner.wantlist()
    }

    fn stat(&self) -> ExchangeStat {
        self.inner.stat()
    }
}

pub struct RecordingPrefetcher {
    pub inner: MemoryPrefetcher,
    log: EventLog,
}

impl Prefetcher for RecordingPrefetcher {
    fn start(&self) {
        self.log.push("prefetcher.start");
        self.inner.start();
    }

    fn stop(&self) {
        self.log.push("prefetcher.stop");
        self.inner.stop();
    }

    fn preload(&self, cid: &Cid) {
        self.inner.preload(cid);
    }
}

pub struct RecordingTransport {
    pub inner: MemoryTransport,
    pub hooks: Arc<Hooks>,
}

impl Transport for RecordingTransport {
    fn start(&self) -> Lifecycle<'_> {
        let starting = self.hooks.starting(Subsystem::Transport);
        async move {
            starting.await?;
            self.inner.start().await
        }
        .boxed()
    }

    fn stop(&self) -> Lifecycle<'_> {
        let stopping = self.hooks.stopping(Subsystem::Transport);
        async move {
            stopping.await?;
            self.inner.stop().await
        }
        .boxed()
    }

    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    fn peers(&self) -> Vec<PeerId> {
        self.inner.peers()
    }
}

pub struct RecordingPublisher {
    pub hooks: Arc<Hooks>,
}

impl NamePublisher for RecordingPublisher {
    fn start(&self) -> Lifecycle<'_> {
        self.hooks.starting(Subsystem::NamePublisher).boxed()
    }

    fn stop(&self) -> Lifecycle<'_> {
        self.hooks.stopping(Subsystem::NamePublisher).boxed()
    }
}

/// A node wired to recording fakes.
pub struct Harness {
    pub log: EventLog,
    pub repo: Arc<RecordingRepo>,
    pub block_service: Arc<RecordingBlockService>,
    pub exchange: Arc<RecordingExchange>,
    pub prefetcher: Arc<RecordingPrefetcher>,
    pub transport: Arc<RecordingTransport>,
    pub publisher: Arc<RecordingPublisher>,
    pub subsystems: Subsystems,
}

impl Harness {
    pub fn new() -> Self {
        let log = EventLog::default();

        let repo = Arc::new(RecordingRepo {
            inner: Arc::new(MemoryRepo::new()),
            hooks: Hooks::new("repo", log.clone()),
        });
        let block_service = Arc::new(RecordingBlockService {
            inner: RepoBlockService::new(repo.clone()),
            log: log.clone(),
        });
        let exchange = Arc::new(RecordingExchange {
            inner: MemoryExchange::new(),
            log: log.clone(),
        });
        let prefetcher = Arc::new(RecordingPrefetcher {
            inner: MemoryPrefetcher::new(),
            log: log.clone(),
        });
        let transport = Arc::new(RecordingTransport {
            inner: MemoryTransport::new(),
            hooks: Hooks::new("transport", log.clone()),
        });
        let publisher = Arc::new(RecordingPublisher {
            hooks: Hooks::new("publisher", log.clone()),
        });

        let peer_id = PeerId::from(PEER);
        let subsystems = Subsystems {
            core: CoreHandles {
                repo: repo.clone(),
                block_service: block_service.clone(),
                resolver: Arc::new(JsonResolver::new(block_service.clone())),
                pin_manager: Arc::new(MemoryPinStore::new()),
                prefetcher: prefetcher.clone(),
                key_store: Arc::new(MemoryKeyStore::new(peer_id.clone())),
                gc_lock: GcLock::new(),
                peer_id,
            },
            network: NetworkHandles {
                transport: transport.clone(),
                exchange: exchange.clone(),
                name_publisher: publisher.clone(),
            },
        };

        Self {
            log,
            repo,
            block_service,
            exchange,
            prefetcher,
            transport,
            publisher,
            subsystems,
        }
    }

    pub fn node(&self) -> Node {
        self.node_with(&NodeConfig::default())
    }

    pub fn node_with(&self, config: &NodeConfig) -> Node {
        Node::create(config, self.subsystems.clone())
    }

    /// A started node with the start calls cleared from the log.
    pub async fn started_node(&self) -> Node {
        let node = self.node();
        node.start().await.unwrap();
        self.log.clear();
        node
    }
}

/// Fail the test instead of hanging on a lost wakeup.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation timed out")
}

/// Yield until `condition` holds.
pub async fn until(mut condition: impl FnMut() -> bool) {
    within(async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
}
