//! Surface manager: the published API surface and the in-flight transition.
//!
//! # Data Flow
//! ```text
//! register_transition ─┐
//!                      ├─▶ slot { state, committed, pending } ◀── surface() readers
//! commit / abort ──────┘        (single ArcSwap, lock-free reads)
//! ```
//!
//! # Design Decisions
//! - The committed surface and pending transition live in one immutable slot
//!   swapped atomically, so a reader never sees one updated without the other
//! - A transition's outcome is broadcast over a `watch` channel: one writer
//!   (the token holder), any number of readers, late readers still see it
//! - The token is consumed by commit/abort; dropping it unsettled aborts

use std::future::Future;
use std::sync::{Arc, Weak};

use arc_swap::{ArcSwap, Guard};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::ApiSurface;
use crate::error::{NodeError, NodeResult};
use crate::lifecycle::state::{NodeState, TransitionKind};
use crate::observability::metrics;

type Outcome = Option<NodeResult<Arc<ApiSurface>>>;

struct Slot {
    state: NodeState,
    committed: Arc<ApiSurface>,
    pending: Option<PendingTransition>,
}

struct Shared {
    slot: ArcSwap<Slot>,
}

/// Surface restored if a transition is aborted.
pub enum Fallback {
    /// Whatever was committed when the transition was registered.
    Restore,
    Surface(Arc<ApiSurface>),
}

/// Read side of an in-flight transition.
#[derive(Debug, Clone)]
pub struct PendingTransition {
    id: Uuid,
    kind: TransitionKind,
    rx: watch::Receiver<Outcome>,
}

impl PendingTransition {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Wait for the transition to commit or abort.
    pub async fn wait(mut self) -> NodeResult<Arc<ApiSurface>> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(NodeError::TransitionAbandoned)),
            Err(_) => Err(NodeError::TransitionAbandoned),
        }
    }
}

/// Why a transition could not be registered.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Another transition is in flight; await it instead.
    #[error("a {} transition is already pending", .0.kind())]
    InFlight(PendingTransition),

    /// The node is not in the state this transition starts from.
    #[error("cannot {kind} from state {state}")]
    WrongState { kind: TransitionKind, state: NodeState },
}

/// Write side of an in-flight transition. Exactly one exists per transition.
pub struct TransitionToken {
    id: Uuid,
    kind: TransitionKind,
    prior: NodeState,
    fallback: Arc<ApiSurface>,
    tx: Option<watch::Sender<Outcome>>,
    shared: Arc<Shared>,
}

impl TransitionToken {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    fn settle(&mut self, slot: Slot, outcome: NodeResult<Arc<ApiSurface>>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let state = slot.state;
        self.shared.slot.store(Arc::new(slot));
        metrics::record_state(state);
        tx.send_replace(Some(outcome));
    }

    fn rollback(&mut self, cause: NodeError) {
        let slot = Slot {
            state: self.prior,
            committed: self.fallback.clone(),
            pending: None,
        };
        self.settle(slot, Err(cause));
    }
}

impl Drop for TransitionToken {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(transition = %self.id, kind = %self.kind, "Transition dropped unsettled, rolling back");
            self.rollback(NodeError::TransitionAbandoned);
        }
    }
}

/// Owner of the node's single published surface.
#[derive(Clone)]
pub struct SurfaceManager {
    shared: Arc<Shared>,
}

/// Non-owning handle held by surfaces and controllers.
#[derive(Clone)]
pub struct WeakSurfaceManager {
    shared: Weak<Shared>,
}

impl WeakSurfaceManager {
    pub fn upgrade(&self) -> NodeResult<SurfaceManager> {
        self.shared
            .upgrade()
            .map(|shared| SurfaceManager { shared })
            .ok_or(NodeError::NodeDropped)
    }
}

impl SurfaceManager {
    /// Create a manager whose initial surface is built with a handle back to it.
    pub fn new(state: NodeState, build: impl FnOnce(WeakSurfaceManager) -> ApiSurface) -> Self {
        debug_assert!(!state.is_transient());
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let committed = Arc::new(build(WeakSurfaceManager { shared: weak.clone() }));
            Shared {
                slot: ArcSwap::from_pointee(Slot {
                    state,
                    committed,
                    pending: None,
                }),
            }
        });
        metrics::record_state(state);
        Self { shared }
    }

    pub fn downgrade(&self) -> WeakSurfaceManager {
        WeakSurfaceManager {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn state(&self) -> NodeState {
        self.shared.slot.load().state
    }

    /// The last committed surface, ignoring any pending transition.
    pub fn committed(&self) -> Arc<ApiSurface> {
        self.shared.slot.load().committed.clone()
    }

    pub fn pending(&self) -> Option<PendingTransition> {
        self.shared.slot.load().pending.clone()
    }

    /// Look up the surface.
    ///
    /// The lookup happens at call time: if a transition is pending then, the
    /// returned future resolves with its outcome, otherwise with the
    /// committed surface.
    pub fn surface(&self) -> impl Future<Output = NodeResult<Arc<ApiSurface>>> + Send + 'static {
        let slot = self.shared.slot.load_full();
        async move {
            match slot.pending.clone() {
                Some(pending) => pending.wait().await,
                None => Ok(slot.committed.clone()),
            }
        }
    }

    /// Install a pending transition.
    ///
    /// Fails with the in-flight transition if one exists, so the caller can
    /// await it instead of starting another.
    pub fn register_transition(
        &self,
        kind: TransitionKind,
        fallback: Fallback,
    ) -> Result<TransitionToken, RegisterError> {
        let (tx, rx) = watch::channel(None);
        let pending = PendingTransition {
            id: Uuid::new_v4(),
            kind,
            rx,
        };

        let mut current = self.shared.slot.load_full();
        loop {
            if let Some(in_flight) = &current.pending {
                return Err(RegisterError::InFlight(in_flight.clone()));
            }
            if current.state != kind.source() {
                return Err(RegisterError::WrongState {
                    kind,
                    state: current.state,
                });
            }

            let next = Arc::new(Slot {
                state: kind.pending(),
                committed: current.committed.clone(),
                pending: Some(pending.clone()),
            });
            let previous = self.shared.slot.compare_and_swap(&current, next);
            if Arc::ptr_eq(&previous, &current) {
                break;
            }
            current = Guard::into_inner(previous);
        }
        metrics::record_state(kind.pending());

        let fallback = match fallback {
            Fallback::Restore => current.committed.clone(),
            Fallback::Surface(surface) => surface,
        };

        Ok(TransitionToken {
            id: pending.id,
            kind,
            prior: current.state,
            fallback,
            tx: Some(tx),
            shared: self.shared.clone(),
        })
    }

    /// Publish `surface` and resolve every reader of the transition with it.
    pub fn commit(&self, mut token: TransitionToken, surface: Arc<ApiSurface>) {
        debug_assert!(Arc::ptr_eq(&token.shared, &self.shared));
        let slot = Slot {
            state: token.kind.target(),
            committed: surface.clone(),
            pending: None,
        };
        token.settle(slot, Ok(surface));
    }

    /// Restore the fallback surface and fail every reader with `cause`.
    pub fn abort(&self, mut token: TransitionToken, cause: NodeError) {
        debug_assert!(Arc::ptr_eq(&token.shared, &self.shared));
        token.rollback(cause);
    }
}
