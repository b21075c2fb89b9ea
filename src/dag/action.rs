//! Action records as stored by the surrounding action store.
//!
//! The DAG engine only reads these; it never persists or mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStatus {
    #[default]
    #[serde(rename = "PendingActionStatus")]
    Pending,
    #[serde(rename = "RunningActionStatus")]
    Running,
    #[serde(rename = "CompletedActionStatus")]
    Completed,
    #[serde(rename = "FailedActionStatus")]
    Failed,
    #[serde(rename = "CancelledActionStatus")]
    Cancelled,
}

/// Smallest schedulable unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub identifier: String,
    /// Identifiers of the actions this one depends on, in declaration order
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub action_status: ActionStatus,
    /// Start of the most recent run
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// End of the most recent run
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Action {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn requires<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: ActionStatus) -> Self {
        self.action_status = status;
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.action_status == ActionStatus::Completed
    }
}
