//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Surface manager (surface.rs):
//!     committed surface + pending transition, swapped atomically
//!
//! Start (start.rs):
//!     register → open repo → start network → commit online surface
//!
//! Stop (stop.rs):
//!     register → detach exchange → stop prefetch → join(publisher,
//!     transport, repo) → commit offline surface
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful stop
//! ```
//!
//! # Design Decisions
//! - One transition at a time; overlapping requests join the pending one
//! - A failed transition rolls back to the previously committed surface
//! - No timeouts: a transition runs to completion or failure

pub mod signals;
pub mod start;
pub mod state;
pub mod stop;
pub mod surface;

pub use state::{NodeState, TransitionKind};
pub use surface::{PendingTransition, SurfaceManager, WeakSurfaceManager};
