//! Execution status state machine

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by job and step executions
///
/// `Created` is the initial state. `Stopped`, `Failed`, `Completed` and
/// `Abandoned` are terminal and have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
    /// Reachable through the transition table, never requested by the engine.
    Paused,
    Failed,
    Completed,
    Abandoned,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 9] = [
        ExecutionStatus::Created,
        ExecutionStatus::Starting,
        ExecutionStatus::Started,
        ExecutionStatus::Stopping,
        ExecutionStatus::Stopped,
        ExecutionStatus::Paused,
        ExecutionStatus::Failed,
        ExecutionStatus::Completed,
        ExecutionStatus::Abandoned,
    ];

    /// Statuses reachable in one transition from `self`
    pub fn allowed_transitions(self) -> &'static [ExecutionStatus] {
        use ExecutionStatus::*;
        match self {
            Created => &[Starting, Abandoned],
            Starting => &[Started, Failed],
            Started => &[Paused, Stopping, Completed, Failed],
            Stopping => &[Stopped, Failed],
            Paused => &[Starting],
            Stopped | Failed | Completed | Abandoned => &[],
        }
    }

    pub fn can_transition_to(self, target: ExecutionStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Created => "CREATED",
            ExecutionStatus::Starting => "STARTING",
            ExecutionStatus::Started => "STARTED",
            ExecutionStatus::Stopping => "STOPPING",
            ExecutionStatus::Stopped => "STOPPED",
            ExecutionStatus::Paused => "PAUSED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Abandoned => "ABANDONED",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
