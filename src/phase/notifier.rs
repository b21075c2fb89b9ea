// Ordered phase-change delivery.
//
// Each workflow owns one bounded queue drained by one task, so observers see
// that workflow's transitions in commit order. Different workflows never
// share a queue.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};

use super::state::PhaseState;

/// Observer invoked with a copy of the state after every phase change
pub type PhaseChangedCallback = Arc<dyn Fn(PhaseState) + Send + Sync>;

pub(crate) struct PhaseChange {
    pub(crate) state: PhaseState,
    pub(crate) callback: PhaseChangedCallback,
}

/// Why a change could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnqueueError {
    Full,
    Closed,
    /// No tokio runtime to run the delivery task on
    NoRuntime,
}

pub(crate) struct WorkflowNotifier {
    sender: mpsc::Sender<PhaseChange>,
}

impl WorkflowNotifier {
    /// Spawns the delivery task on the current tokio runtime
    pub(crate) fn spawn(workflow_id: &str, capacity: usize) -> Result<Self, EnqueueError> {
        let runtime = Handle::try_current().map_err(|_| EnqueueError::NoRuntime)?;
        let (sender, mut receiver) = mpsc::channel::<PhaseChange>(capacity.max(1));
        let workflow_id = workflow_id.to_string();

        runtime.spawn(async move {
            while let Some(change) = receiver.recv().await {
                let phase = change.state.phase;
                let callback = change.callback;
                let state = change.state;
                if catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
                    error!(
                        workflow_id = %workflow_id,
                        phase = %phase,
                        "Phase change callback panicked"
                    );
                }
            }
            debug!(workflow_id = %workflow_id, "Phase notifier drained and stopped");
        });

        Ok(Self { sender })
    }

    /// Queues without waiting; never blocks the transitioning caller.
    pub(crate) fn enqueue(&self, change: PhaseChange) -> Result<(), EnqueueError> {
        self.sender.try_send(change).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}
