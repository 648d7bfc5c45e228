//! Node state machine.
//!
//! # States
//! - Stopped: offline surface committed
//! - Starting: start transition pending
//! - Started: online surface committed
//! - Stopping: stop transition pending
//!
//! # State Transitions
//! ```text
//! Stopped  → Starting → Started   (start commits)
//! Starting → Stopped              (start aborts)
//! Started  → Stopping → Stopped   (stop commits)
//! Stopping → Started              (stop aborts, rollback)
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Stopped => "stopped",
            NodeState::Starting => "starting",
            NodeState::Started => "started",
            NodeState::Stopping => "stopping",
        }
    }

    /// Whether a transition is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(self, NodeState::Starting | NodeState::Stopping)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two surface swaps a node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Start,
    Stop,
}

impl TransitionKind {
    /// State the transition must begin from.
    pub fn source(&self) -> NodeState {
        match self {
            TransitionKind::Start => NodeState::Stopped,
            TransitionKind::Stop => NodeState::Started,
        }
    }

    /// State while the transition is pending.
    pub fn pending(&self) -> NodeState {
        match self {
            TransitionKind::Start => NodeState::Starting,
            TransitionKind::Stop => NodeState::Stopping,
        }
    }

    /// State once committed.
    pub fn target(&self) -> NodeState {
        match self {
            TransitionKind::Start => NodeState::Started,
            TransitionKind::Stop => NodeState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Start => "start",
            TransitionKind::Stop => "stop",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
