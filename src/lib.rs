//! Content-addressed storage node: lifecycle core and API surfaces.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                     NODE                     │
//!                  │                                              │
//!   node.api() ───▶│  SurfaceManager ── slot { state, committed,  │
//!                  │        ▲                  pending }          │
//!                  │        │ commit / abort                      │
//!                  │  ┌─────┴──────┐      ┌──────────────┐        │
//!   surface.stop()─┼─▶│ lifecycle  │─────▶│   registry   │        │
//!   surface.start()│  │ start/stop │      │ build groups │        │
//!                  │  └─────┬──────┘      └──────┬───────┘        │
//!                  │        ▼                    ▼                │
//!                  │  ┌────────────────────────────────────────┐  │
//!                  │  │ subsystems: repo, block service,       │  │
//!                  │  │ exchange, transport, prefetcher,       │  │
//!                  │  │ name publisher, pins, keys, resolver   │  │
//!                  │  └────────────────────────────────────────┘  │
//!                  └──────────────────────────────────────────────┘
//! ```

// Core
pub mod api;
pub mod lifecycle;
pub mod node;
pub mod subsystems;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;
pub mod types;

pub use api::ApiSurface;
pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use lifecycle::NodeState;
pub use node::Node;
pub use types::{Block, Cid, PeerId};
