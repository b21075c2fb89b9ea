// Workflow lifecycle phases and the static transition table

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a tracked workflow
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Phase {
    /// Registered, nothing started yet
    #[default]
    Pending,
    /// Pre-flight checks before planning
    PreFlight,
    /// Computing the execution plan
    Planning,
    /// Actions are being dispatched
    Execution,
    /// Pause requested, executor is winding down
    Pausing,
    /// Paused at a checkpoint
    Paused,
    /// Resume requested, executor is restoring
    Resuming,
    /// Cancellation requested
    Cancelling,
    Cancelled,
    /// Completion requested
    Completing,
    Completed,
    Failed,
}

impl Phase {
    /// Every phase, in declaration order
    pub const ALL: [Phase; 12] = [
        Phase::Pending,
        Phase::PreFlight,
        Phase::Planning,
        Phase::Execution,
        Phase::Pausing,
        Phase::Paused,
        Phase::Resuming,
        Phase::Cancelling,
        Phase::Cancelled,
        Phase::Completing,
        Phase::Completed,
        Phase::Failed,
    ];

    /// Phases reachable from `self` in a single step.
    ///
    /// Terminal phases have no outgoing edges. `Failed` is reachable from
    /// every non-terminal phase.
    pub fn allowed_transitions(&self) -> &'static [Phase] {
        match self {
            Phase::Pending => &[Phase::PreFlight, Phase::Failed],
            Phase::PreFlight => &[Phase::Planning, Phase::Failed],
            Phase::Planning => &[Phase::Execution, Phase::Failed],
            Phase::Execution => &[
                Phase::Pausing,
                Phase::Cancelling,
                Phase::Completing,
                Phase::Failed,
            ],
            Phase::Pausing => &[Phase::Paused, Phase::Cancelling, Phase::Failed],
            Phase::Paused => &[Phase::Resuming, Phase::Cancelling, Phase::Failed],
            Phase::Resuming => &[Phase::Execution, Phase::Cancelling, Phase::Failed],
            Phase::Cancelling => &[Phase::Cancelled, Phase::Failed],
            Phase::Completing => &[Phase::Completed, Phase::Failed],
            Phase::Cancelled | Phase::Completed | Phase::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: Phase) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled | Phase::Failed)
    }

    /// Started and not yet finished
    pub fn is_active(&self) -> bool {
        *self != Phase::Pending && !self.is_terminal()
    }

    pub fn is_pausable(&self) -> bool {
        *self == Phase::Execution
    }

    pub fn is_resumable(&self) -> bool {
        *self == Phase::Paused
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::PreFlight => "pre_flight",
            Phase::Planning => "planning",
            Phase::Execution => "execution",
            Phase::Pausing => "pausing",
            Phase::Paused => "paused",
            Phase::Resuming => "resuming",
            Phase::Cancelling => "cancelling",
            Phase::Cancelled => "cancelled",
            Phase::Completing => "completing",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
