//! Error types surfaced by the node and its API surfaces.

use std::fmt;

use thiserror::Error;

use crate::types::Cid;

/// Independently lifecycled collaborators the node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Repository,
    Transport,
    Exchange,
    Prefetcher,
    NamePublisher,
}

impl Subsystem {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Repository => "repository",
            Subsystem::Transport => "transport",
            Subsystem::Exchange => "exchange",
            Subsystem::Prefetcher => "prefetcher",
            Subsystem::NamePublisher => "name_publisher",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single collaborator failing to change lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{subsystem}: {message}")]
pub struct SubsystemError {
    pub subsystem: Subsystem,
    pub message: String,
}

impl SubsystemError {
    pub fn new(subsystem: Subsystem, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            message: message.into(),
        }
    }
}

/// Outcome of a stop join point that had at least one failure.
///
/// Stops already issued cannot be recalled, so the subsystems that did stop
/// are reported alongside every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFailures {
    pub failures: Vec<SubsystemError>,
    pub stopped: Vec<Subsystem>,
}

impl StopFailures {
    /// The first failure observed, in issue order.
    pub fn first(&self) -> Option<&SubsystemError> {
        self.failures.first()
    }

    /// Whether `subsystem` is among the failures.
    pub fn failed(&self, subsystem: Subsystem) -> bool {
        self.failures.iter().any(|f| f.subsystem == subsystem)
    }
}

impl fmt::Display for StopFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        if !self.stopped.is_empty() {
            write!(f, " (stopped: ")?;
            for (i, subsystem) in self.stopped.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", subsystem)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Errors returned by surface operations and lifecycle transitions.
///
/// Cloneable so that a single rejected transition can be delivered to every
/// caller awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// `init` invoked on a node that already has a repository.
    #[error("node is already initialized")]
    AlreadyInitialized,

    /// Operation requires a started node.
    #[error("node is not started")]
    NotStarted,

    /// One or more subsystems failed to stop.
    #[error("failed to stop subsystems: {0}")]
    SubsystemStop(StopFailures),

    /// A subsystem failed to start.
    #[error("failed to start subsystem {0}")]
    SubsystemStart(SubsystemError),

    /// The owner of a pending transition went away without settling it.
    #[error("transition was abandoned before completion")]
    TransitionAbandoned,

    /// The node owning this surface has been dropped.
    #[error("node has been shut down")]
    NodeDropped,

    #[error("block not found: {0}")]
    BlockNotFound(Cid),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("{0} is not pinned")]
    PinNotFound(Cid),

    #[error("block {0} is pinned")]
    Pinned(Cid),

    #[error("no link named {segment:?} under {cid}")]
    InvalidPath { cid: Cid, segment: String },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("repository error: {0}")]
    Repo(String),

    #[error("config key not found: {0}")]
    ConfigKeyNotFound(String),
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Codec(err.to_string())
    }
}

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
