// Phase Manager - concurrency-safe registry of workflow phase state
//
// One reader/writer lock guards the whole registry. Reads take the shared
// guard; every mutation, including callback installation, takes the exclusive
// guard. No operation performs I/O; durability belongs to callback consumers.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::error::{PhaseError, PhaseResult};
use super::notifier::{EnqueueError, PhaseChange, PhaseChangedCallback, WorkflowNotifier};
use super::state::{PhaseState, TransitionRecord};
use super::types::Phase;
use crate::config::NotificationConfig;
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// Opaque execution state handed to the checkpoint callback for persistence
pub type CheckpointData = HashMap<String, Value>;

/// Invoked synchronously with `(workflow_id, checkpoint_id, state)`
pub type CheckpointCallback = Arc<dyn Fn(&str, &str, &CheckpointData) + Send + Sync>;

/// Mint a checkpoint identifier for executors that do not bring their own
pub fn new_checkpoint_id() -> String {
    format!("ckpt-{}", Uuid::new_v4())
}

struct WorkflowEntry {
    state: PhaseState,
    history: Vec<TransitionRecord>,
    notifier: Option<WorkflowNotifier>,
}

impl WorkflowEntry {
    fn record(&mut self, to: Phase, reason: String) {
        let now = Utc::now();
        let from = self.state.phase;
        self.history.push(TransitionRecord {
            from,
            to,
            reason: reason.clone(),
            at: now,
        });
        self.state.previous_phase = Some(from);
        self.state.phase = to;
        self.state.changed_at = now;
        self.state.reason = reason;
    }
}

#[derive(Default)]
struct Registry {
    workflows: HashMap<String, WorkflowEntry>,
    on_phase_changed: Option<PhaseChangedCallback>,
    on_checkpoint: Option<CheckpointCallback>,
}

impl Registry {
    fn phase_of(&self, workflow_id: &str) -> PhaseResult<Phase> {
        self.workflows
            .get(workflow_id)
            .map(|entry| entry.state.phase)
            .ok_or_else(|| PhaseError::not_found(workflow_id))
    }

    fn entry_mut(&mut self, workflow_id: &str) -> PhaseResult<&mut WorkflowEntry> {
        self.workflows
            .get_mut(workflow_id)
            .ok_or_else(|| PhaseError::not_found(workflow_id))
    }
}

/// In-memory phase state machine for many workflows
pub struct PhaseManager {
    registry: RwLock<Registry>,
    queue_capacity: usize,
    dropped_notifications: AtomicU64,
}

impl std::fmt::Debug for PhaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseManager")
            .field("queue_capacity", &self.queue_capacity)
            .field(
                "dropped_notifications",
                &self.dropped_notifications.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseManager {
    pub fn new() -> Self {
        Self::with_config(&NotificationConfig::default())
    }

    pub fn with_config(config: &NotificationConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            queue_capacity: config.queue_capacity.max(1),
            dropped_notifications: AtomicU64::new(0),
        }
    }

    /// Start tracking a workflow in `Pending`.
    ///
    /// Registering an id that is already tracked replaces the old record and
    /// history. The delivery queue is kept, so changes still queued from the
    /// old record reach observers before any change of the new one.
    pub async fn register_workflow(
        &self,
        workflow_id: impl Into<String>,
        parent_workflow_id: Option<String>,
        root_workflow_id: Option<String>,
    ) -> PhaseState {
        let workflow_id = workflow_id.into();
        let state = PhaseState::pending(workflow_id.clone(), parent_workflow_id, root_workflow_id);

        let mut registry = self.registry.write().await;
        let mut replaced = registry.workflows.remove(&workflow_id);
        let notifier = replaced.as_mut().and_then(|old| old.notifier.take());
        registry.workflows.insert(
            workflow_id.clone(),
            WorkflowEntry {
                state: state.clone(),
                history: Vec::new(),
                notifier,
            },
        );

        if let Some(old) = replaced {
            warn!(
                workflow_id = %workflow_id,
                previous_phase = %old.state.phase,
                "Workflow re-registered, previous phase state discarded"
            );
        } else {
            info!(
                workflow_id = %workflow_id,
                parent = ?state.parent_workflow_id,
                root = ?state.root_workflow_id,
                "Workflow registered"
            );
        }

        state
    }

    pub async fn get_state(&self, workflow_id: &str) -> Option<PhaseState> {
        let registry = self.registry.read().await;
        registry
            .workflows
            .get(workflow_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn get_phase(&self, workflow_id: &str) -> Option<Phase> {
        let registry = self.registry.read().await;
        registry.phase_of(workflow_id).ok()
    }

    /// Recorded phase changes, oldest first
    pub async fn get_history(&self, workflow_id: &str) -> Option<Vec<TransitionRecord>> {
        let registry = self.registry.read().await;
        registry
            .workflows
            .get(workflow_id)
            .map(|entry| entry.history.clone())
    }

    /// Move a workflow along an edge of the transition table
    pub async fn transition_to(
        &self,
        workflow_id: &str,
        new_phase: Phase,
        reason: impl Into<String>,
    ) -> PhaseResult<()> {
        let reason = reason.into();
        let span = create_workflow_span("transition", workflow_id, &generate_correlation_id());

        async {
            let mut registry = self.registry.write().await;
            self.transition_locked(&mut registry, workflow_id, new_phase, reason)
        }
        .instrument(span)
        .await
    }

    /// Update progress bookkeeping. `progress` is stored as given.
    pub async fn set_progress(
        &self,
        workflow_id: &str,
        progress: f64,
        current_action: impl Into<String>,
    ) -> PhaseResult<()> {
        let current_action = current_action.into();
        let mut registry = self.registry.write().await;
        let entry = registry.entry_mut(workflow_id)?;

        entry.state.progress = progress;
        entry.state.current_action = (!current_action.is_empty()).then_some(current_action);

        debug!(
            workflow_id = %workflow_id,
            progress = progress,
            current_action = ?entry.state.current_action,
            "Workflow progress updated"
        );
        Ok(())
    }

    /// Request a pause. Only a workflow in `Execution` can be paused.
    pub async fn pause(&self, workflow_id: &str, reason: impl Into<String>) -> PhaseResult<()> {
        let mut registry = self.registry.write().await;
        let phase = registry.phase_of(workflow_id)?;
        if !phase.is_pausable() {
            return Err(PhaseError::precondition(workflow_id, "pause", phase));
        }
        self.transition_locked(&mut registry, workflow_id, Phase::Pausing, reason.into())
    }

    /// Finish a pause once the executor has persisted its state
    pub async fn complete_pause(&self, workflow_id: &str, checkpoint_id: &str) -> PhaseResult<()> {
        let mut registry = self.registry.write().await;
        let phase = registry.phase_of(workflow_id)?;
        if phase != Phase::Pausing {
            return Err(PhaseError::precondition(workflow_id, "complete pause of", phase));
        }

        registry.entry_mut(workflow_id)?.state.checkpoint_id = Some(checkpoint_id.to_string());
        self.commit(
            &mut registry,
            workflow_id,
            Phase::Paused,
            format!("paused at checkpoint {checkpoint_id}"),
        )?;

        info!(
            workflow_id = %workflow_id,
            checkpoint_id = %checkpoint_id,
            "Workflow paused"
        );
        Ok(())
    }

    /// Request a resume from `Paused`. A non-empty `from_checkpoint` replaces
    /// the recorded checkpoint.
    pub async fn resume(&self, workflow_id: &str, from_checkpoint: &str) -> PhaseResult<()> {
        let mut registry = self.registry.write().await;
        let phase = registry.phase_of(workflow_id)?;
        if !phase.is_resumable() {
            return Err(PhaseError::precondition(workflow_id, "resume", phase));
        }

        let entry = registry.entry_mut(workflow_id)?;
        if !from_checkpoint.is_empty() {
            entry.state.checkpoint_id = Some(from_checkpoint.to_string());
        }
        let reason = match &entry.state.checkpoint_id {
            Some(checkpoint) => format!("resuming from checkpoint {checkpoint}"),
            None => "resuming".to_string(),
        };

        self.transition_locked(&mut registry, workflow_id, Phase::Resuming, reason)
    }

    pub async fn complete_resume(&self, workflow_id: &str) -> PhaseResult<()> {
        self.transition_to(workflow_id, Phase::Execution, "resumed")
            .await
    }

    /// Request cancellation. Rejected once the workflow is terminal; phases
    /// without a `Cancelling` edge fail with `InvalidTransition`.
    pub async fn cancel(&self, workflow_id: &str, reason: impl Into<String>) -> PhaseResult<()> {
        let mut registry = self.registry.write().await;
        let phase = registry.phase_of(workflow_id)?;
        if phase.is_terminal() {
            return Err(PhaseError::already_terminal(workflow_id, phase));
        }
        self.transition_locked(&mut registry, workflow_id, Phase::Cancelling, reason.into())
    }

    pub async fn complete_cancellation(&self, workflow_id: &str) -> PhaseResult<()> {
        self.transition_to(workflow_id, Phase::Cancelled, "cancelled")
            .await
    }

    /// Drive any non-terminal workflow straight to `Failed`.
    ///
    /// Does not consult the transition table.
    pub async fn fail(&self, workflow_id: &str, reason: impl Into<String>) -> PhaseResult<()> {
        let reason = reason.into();
        let mut registry = self.registry.write().await;
        let phase = registry.phase_of(workflow_id)?;
        if phase.is_terminal() {
            return Err(PhaseError::already_terminal(workflow_id, phase));
        }

        self.commit(&mut registry, workflow_id, Phase::Failed, reason.clone())?;
        error!(
            workflow_id = %workflow_id,
            from = %phase,
            reason = %reason,
            "Workflow failed"
        );
        Ok(())
    }

    /// `Completing` then `Completed`. Stops at the first rejected step; a
    /// step already taken is not rolled back.
    pub async fn complete(&self, workflow_id: &str) -> PhaseResult<()> {
        let mut registry = self.registry.write().await;
        self.transition_locked(&mut registry, workflow_id, Phase::Completing, "completing".into())?;
        self.transition_locked(&mut registry, workflow_id, Phase::Completed, "completed".into())
    }

    pub async fn remove_workflow(&self, workflow_id: &str) {
        let mut registry = self.registry.write().await;
        if registry.workflows.remove(workflow_id).is_some() {
            debug!(workflow_id = %workflow_id, "Workflow removed");
        }
    }

    /// Non-terminal workflows, sorted by id
    pub async fn get_active_workflows(&self) -> Vec<PhaseState> {
        self.collect_sorted(|state| !state.phase.is_terminal()).await
    }

    /// All workflows, sorted by id
    pub async fn get_all_workflows(&self) -> Vec<PhaseState> {
        self.collect_sorted(|_| true).await
    }

    /// Direct children of `parent_workflow_id`, sorted by id
    pub async fn get_child_workflows(&self, parent_workflow_id: &str) -> Vec<PhaseState> {
        self.collect_sorted(|state| state.parent_workflow_id.as_deref() == Some(parent_workflow_id))
            .await
    }

    /// Record a checkpoint id and hand `state` to the checkpoint callback.
    ///
    /// The callback runs after the registry lock is released and blocks this
    /// call until it returns.
    pub async fn create_checkpoint(
        &self,
        workflow_id: &str,
        checkpoint_id: &str,
        reason: &str,
        state: CheckpointData,
    ) -> PhaseResult<()> {
        let span = create_workflow_span("checkpoint", workflow_id, &generate_correlation_id());

        async {
            let callback = {
                let mut registry = self.registry.write().await;
                registry.entry_mut(workflow_id)?.state.checkpoint_id =
                    Some(checkpoint_id.to_string());
                registry.on_checkpoint.clone()
            };

            info!(
                workflow_id = %workflow_id,
                checkpoint_id = %checkpoint_id,
                reason = %reason,
                keys = state.len(),
                "Checkpoint created"
            );

            if let Some(callback) = callback {
                callback(workflow_id, checkpoint_id, &state);
            }
            Ok::<(), PhaseError>(())
        }
        .instrument(span)
        .await
    }

    /// Install the phase-change observer. Replaces any previous one; changes
    /// already queued keep the observer that was current when they committed.
    pub async fn on_phase_changed<F>(&self, callback: F)
    where
        F: Fn(PhaseState) + Send + Sync + 'static,
    {
        self.registry.write().await.on_phase_changed = Some(Arc::new(callback));
    }

    /// Install the checkpoint observer. Replaces any previous one.
    pub async fn on_checkpoint<F>(&self, callback: F)
    where
        F: Fn(&str, &str, &CheckpointData) + Send + Sync + 'static,
    {
        self.registry.write().await.on_checkpoint = Some(Arc::new(callback));
    }

    /// Phase changes that could not be queued for delivery. Changes committed
    /// outside a tokio runtime have no delivery task and count here too.
    pub fn dropped_notifications(&self) -> u64 {
        self.dropped_notifications.load(Ordering::Relaxed)
    }

    fn transition_locked(
        &self,
        registry: &mut Registry,
        workflow_id: &str,
        new_phase: Phase,
        reason: String,
    ) -> PhaseResult<()> {
        let current = registry.phase_of(workflow_id)?;
        if !current.can_transition_to(new_phase) {
            warn!(
                workflow_id = %workflow_id,
                from = %current,
                to = %new_phase,
                "Rejected phase transition"
            );
            return Err(PhaseError::InvalidTransition {
                workflow_id: workflow_id.to_string(),
                from: current,
                to: new_phase,
            });
        }

        self.commit(registry, workflow_id, new_phase, reason)?;
        info!(
            workflow_id = %workflow_id,
            from = %current,
            to = %new_phase,
            "Workflow phase transition"
        );
        Ok(())
    }

    /// Apply a phase change and queue its notification while still holding
    /// the write guard, so queue order matches commit order.
    fn commit(
        &self,
        registry: &mut Registry,
        workflow_id: &str,
        new_phase: Phase,
        reason: String,
    ) -> PhaseResult<()> {
        let Registry {
            workflows,
            on_phase_changed,
            ..
        } = registry;
        let entry = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| PhaseError::not_found(workflow_id))?;

        entry.record(new_phase, reason);

        if let Some(callback) = on_phase_changed {
            self.notify(workflow_id, entry, callback.clone());
        }
        Ok(())
    }

    fn notify(&self, workflow_id: &str, entry: &mut WorkflowEntry, callback: PhaseChangedCallback) {
        if entry.notifier.is_none() {
            match WorkflowNotifier::spawn(workflow_id, self.queue_capacity) {
                Ok(notifier) => entry.notifier = Some(notifier),
                Err(reason) => {
                    self.count_dropped(workflow_id, entry.state.phase, reason);
                    return;
                }
            }
        }

        let change = PhaseChange {
            state: entry.state.clone(),
            callback,
        };

        let Some(notifier) = &entry.notifier else {
            return;
        };
        if let Err(reason) = notifier.enqueue(change) {
            self.count_dropped(workflow_id, entry.state.phase, reason);
            if reason == EnqueueError::Closed {
                entry.notifier = None;
            }
        }
    }

    fn count_dropped(&self, workflow_id: &str, phase: Phase, reason: EnqueueError) {
        self.dropped_notifications.fetch_add(1, Ordering::Relaxed);
        warn!(
            workflow_id = %workflow_id,
            phase = %phase,
            reason = ?reason,
            "Phase change notification dropped"
        );
    }

    async fn collect_sorted<P>(&self, predicate: P) -> Vec<PhaseState>
    where
        P: Fn(&PhaseState) -> bool,
    {
        let registry = self.registry.read().await;
        let mut states: Vec<PhaseState> = registry
            .workflows
            .values()
            .map(|entry| &entry.state)
            .filter(|state| predicate(state))
            .cloned()
            .collect();
        states.sort_by(|a, b| a.workflow_id.cmp(&b.workflow_id));
        states
    }
}
