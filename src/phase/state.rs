use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Phase;

/// Per-workflow phase record.
///
/// The manager owns the live record; everything handed to callers or
/// callbacks is a clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub workflow_id: String,
    pub phase: Phase,
    pub previous_phase: Option<Phase>,
    pub changed_at: DateTime<Utc>,
    pub reason: String,
    pub checkpoint_id: Option<String>,
    /// Fraction complete, nominally 0..=1 but not validated
    pub progress: f64,
    pub current_action: Option<String>,
    pub parent_workflow_id: Option<String>,
    pub root_workflow_id: Option<String>,
}

impl PhaseState {
    pub(crate) fn pending(
        workflow_id: String,
        parent_workflow_id: Option<String>,
        root_workflow_id: Option<String>,
    ) -> Self {
        Self {
            workflow_id,
            phase: Phase::Pending,
            previous_phase: None,
            changed_at: Utc::now(),
            reason: String::new(),
            checkpoint_id: None,
            progress: 0.0,
            current_action: None,
            parent_workflow_id,
            root_workflow_id,
        }
    }
}

/// One recorded phase change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    pub reason: String,
    pub at: DateTime<Utc>,
}
