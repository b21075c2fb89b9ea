use thiserror::Error;

use super::types::Phase;

pub type PhaseResult<T> = Result<T, PhaseError>;

/// Errors returned by [`PhaseManager`](super::PhaseManager) operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("workflow not found: {workflow_id}")]
    NotFound { workflow_id: String },

    #[error("invalid phase transition for workflow {workflow_id}: {from} -> {to}")]
    InvalidTransition {
        workflow_id: String,
        from: Phase,
        to: Phase,
    },

    #[error("cannot {operation} workflow {workflow_id} in phase {phase}")]
    PreconditionFailed {
        workflow_id: String,
        operation: &'static str,
        phase: Phase,
    },

    #[error("workflow {workflow_id} is already in terminal phase {phase}")]
    AlreadyTerminal { workflow_id: String, phase: Phase },
}

impl PhaseError {
    pub(crate) fn not_found(workflow_id: &str) -> Self {
        Self::NotFound {
            workflow_id: workflow_id.to_string(),
        }
    }

    pub(crate) fn precondition(workflow_id: &str, operation: &'static str, phase: Phase) -> Self {
        Self::PreconditionFailed {
            workflow_id: workflow_id.to_string(),
            operation,
            phase,
        }
    }

    pub(crate) fn already_terminal(workflow_id: &str, phase: Phase) -> Self {
        Self::AlreadyTerminal {
            workflow_id: workflow_id.to_string(),
            phase,
        }
    }
}
