//! Start sequence: offline surface → online surface.
//!
//! # Sequence
//! ```text
//! register Start transition (or join the one in flight)
//!     → repo.open() → transport.start()
//!     → exchange.start() → block_service.set_exchange() → prefetcher.start()
//!     → name_publisher.start()
//!     → build online surface → commit
//! any failure → unwind what was started → abort → error to caller
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::api::registry::{self, CommandOptions};
use crate::api::ApiSurface;
use crate::error::{NodeError, NodeResult, Subsystem, SubsystemError};
use crate::lifecycle::state::TransitionKind;
use crate::lifecycle::surface::{Fallback, RegisterError, SurfaceManager, TransitionToken, WeakSurfaceManager};
use crate::observability::metrics::{self, Outcome};
use crate::subsystems::Subsystems;

/// Steps completed so far, for unwinding.
#[derive(Debug, Default)]
struct Progress {
    opened_repo: bool,
    transport: bool,
    exchange: bool,
}

/// Controller bound into the offline surface's `start`.
#[derive(Clone)]
pub struct StartController {
    manager: WeakSurfaceManager,
    subsystems: Subsystems,
    options: CommandOptions,
}

impl StartController {
    pub fn new(manager: WeakSurfaceManager, subsystems: Subsystems, options: CommandOptions) -> Self {
        Self {
            manager,
            subsystems,
            options,
        }
    }

    /// Start the node and return the online surface.
    pub async fn start(&self) -> NodeResult<Arc<ApiSurface>> {
        let manager = self.manager.upgrade()?;
        let token = loop {
            match manager.register_transition(TransitionKind::Start, Fallback::Restore) {
                Ok(token) => break token,
                Err(RegisterError::InFlight(pending)) if pending.kind() == TransitionKind::Start => {
                    tracing::debug!(transition = %pending.id(), "Joining in-flight start");
                    return pending.wait().await;
                }
                Err(RegisterError::InFlight(pending)) => {
                    let id = pending.id();
                    if let Err(e) = pending.wait().await {
                        tracing::debug!(transition = %id, error = %e, "Stop settled with error before start");
                    }
                }
                Err(RegisterError::WrongState { .. }) => return manager.surface().await,
            }
        };

        let span = tracing::info_span!(
            "transition",
            id = %token.id(),
            kind = %TransitionKind::Start,
            peer = %self.subsystems.core.peer_id,
        );
        self.run(manager, token).instrument(span).await
    }

    async fn run(&self, manager: SurfaceManager, token: TransitionToken) -> NodeResult<Arc<ApiSurface>> {
        let started = Instant::now();
        tracing::info!("Starting node");

        let mut progress = Progress::default();
        match self.bring_up(&mut progress).await {
            Ok(()) => {
                let surface = Arc::new(registry::online(manager.downgrade(), &self.subsystems, &self.options));
                manager.commit(token, surface.clone());
                metrics::record_transition(TransitionKind::Start, Outcome::Committed, started);
                tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Node started");
                Ok(surface)
            }
            Err(failure) => {
                metrics::record_subsystem_failure(failure.subsystem);
                tracing::error!(error = %failure, "Start failed, unwinding");
                self.unwind(&progress).await;

                let err = NodeError::SubsystemStart(failure);
                manager.abort(token, err.clone());
                metrics::record_transition(TransitionKind::Start, Outcome::Aborted, started);
                Err(err)
            }
        }
    }

    async fn bring_up(&self, progress: &mut Progress) -> Result<(), SubsystemError> {
        let core = &self.subsystems.core;
        let network = &self.subsystems.network;

        if !core.repo.is_open() {
            core.repo.open().await?;
            progress.opened_repo = true;
        }

        network.transport.start().await?;
        progress.transport = true;

        network.exchange.start();
        core.block_service.set_exchange(network.exchange.clone());
        core.prefetcher.start();
        progress.exchange = true;

        network.name_publisher.start().await
    }

    /// Best-effort reversal of `bring_up`; failures are logged, not raised.
    async fn unwind(&self, progress: &Progress) {
        let core = &self.subsystems.core;
        let network = &self.subsystems.network;

        if progress.exchange {
            core.prefetcher.stop();
            core.block_service.unset_exchange();
            network.exchange.stop();
        }
        if progress.transport {
            if let Err(e) = network.transport.stop().await {
                metrics::record_subsystem_failure(Subsystem::Transport);
                tracing::warn!(error = %e, "Transport did not stop during unwind");
            }
        }
        if progress.opened_repo {
            if let Err(e) = core.repo.close().await {
                metrics::record_subsystem_failure(Subsystem::Repository);
                tracing::warn!(error = %e, "Repository did not close during unwind");
            }
        }
    }
}
