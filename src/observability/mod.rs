//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle transitions and subsystems produce:
//!     → logging.rs (structured log events, one span per transition)
//!     → metrics.rs (transition counters, durations, state gauge)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric updates are fire-and-forget; without an installed recorder they
//!   are no-ops, so library users and tests pay nothing
//! - Every transition carries a UUID v4 in its span for correlation

pub mod logging;
pub mod metrics;
