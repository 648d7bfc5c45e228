//! Stop sequence: online surface → offline surface.
//!
//! # Sequence
//! ```text
//! register Stop transition (or join the one in flight)
//!     → block_service.unset_exchange()      ┐
//!     → exchange.stop()                     ├ sequential, infallible
//!     → prefetcher.stop()                   ┘
//!     → name_publisher.stop() ┐
//!       transport.stop()      ├ all issued, then joined
//!       repo.close()          ┘
//!     → build offline surface → commit
//! any join-point failure → abort (online surface restored) → error to caller
//! ```
//!
//! # Design Decisions
//! - Every join-point failure is reported, with the subsystems that did stop;
//!   nothing already stopped is restarted
//! - Dropping the `stop()` future mid-sequence abandons the token, which
//!   rolls the surface back

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::api::registry::{self, CommandOptions};
use crate::api::ApiSurface;
use crate::error::{NodeError, NodeResult, StopFailures, Subsystem, SubsystemError};
use crate::lifecycle::state::TransitionKind;
use crate::lifecycle::surface::{Fallback, RegisterError, SurfaceManager, TransitionToken, WeakSurfaceManager};
use crate::observability::metrics::{self, Outcome};
use crate::subsystems::Subsystems;

/// Controller bound into the online surface's `stop`.
#[derive(Clone)]
pub struct StopController {
    manager: WeakSurfaceManager,
    subsystems: Subsystems,
    options: CommandOptions,
}

impl StopController {
    pub fn new(manager: WeakSurfaceManager, subsystems: Subsystems, options: CommandOptions) -> Self {
        Self {
            manager,
            subsystems,
            options,
        }
    }

    /// Stop the node and return the offline surface.
    ///
    /// Concurrent callers share a single teardown and its outcome. Calling
    /// this on an already stopped node returns the current surface.
    pub async fn stop(&self) -> NodeResult<Arc<ApiSurface>> {
        let manager = self.manager.upgrade()?;
        let token = loop {
            match manager.register_transition(TransitionKind::Stop, Fallback::Restore) {
                Ok(token) => break token,
                Err(RegisterError::InFlight(pending)) if pending.kind() == TransitionKind::Stop => {
                    tracing::debug!(transition = %pending.id(), "Joining in-flight stop");
                    return pending.wait().await;
                }
                Err(RegisterError::InFlight(pending)) => {
                    // Let the start settle, then stop whatever it left behind.
                    let id = pending.id();
                    if let Err(e) = pending.wait().await {
                        tracing::debug!(transition = %id, error = %e, "Start settled with error before stop");
                    }
                }
                Err(RegisterError::WrongState { .. }) => return manager.surface().await,
            }
        };

        let span = tracing::info_span!(
            "transition",
            id = %token.id(),
            kind = %TransitionKind::Stop,
            peer = %self.subsystems.core.peer_id,
        );
        self.run(manager, token).instrument(span).await
    }

    async fn run(&self, manager: SurfaceManager, token: TransitionToken) -> NodeResult<Arc<ApiSurface>> {
        let started = Instant::now();
        tracing::info!("Stopping node");

        match self.teardown().await {
            Ok(()) => {
                let surface = Arc::new(registry::offline(
                    manager.downgrade(),
                    &self.subsystems,
                    &self.options,
                ));
                manager.commit(token, surface.clone());
                metrics::record_transition(TransitionKind::Stop, Outcome::Committed, started);
                tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Node stopped");
                Ok(surface)
            }
            Err(failures) => {
                for failure in &failures.failures {
                    metrics::record_subsystem_failure(failure.subsystem);
                }
                tracing::error!(
                    failures = %failures,
                    "Stop failed, restoring online surface"
                );
                let err = NodeError::SubsystemStop(failures);
                manager.abort(token, err.clone());
                metrics::record_transition(TransitionKind::Stop, Outcome::Aborted, started);
                Err(err)
            }
        }
    }

    async fn teardown(&self) -> Result<(), StopFailures> {
        let core = &self.subsystems.core;
        let network = &self.subsystems.network;

        core.block_service.unset_exchange();
        network.exchange.stop();
        core.prefetcher.stop();
        tracing::debug!("Exchange detached, prefetcher stopped");

        let publisher = network.name_publisher.stop();
        let transport = network.transport.stop();
        let repo = core.repo.close();
        let (publisher, transport, repo) = tokio::join!(publisher, transport, repo);

        collect([
            (Subsystem::NamePublisher, publisher),
            (Subsystem::Transport, transport),
            (Subsystem::Repository, repo),
        ])
    }
}

fn collect(results: [(Subsystem, Result<(), SubsystemError>); 3]) -> Result<(), StopFailures> {
    let mut failures = Vec::new();
    let mut stopped = Vec::new();
    for (subsystem, result) in results {
        match result {
            Ok(()) => stopped.push(subsystem),
            Err(e) => failures.push(e),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(StopFailures { failures, stopped })
    }
}
