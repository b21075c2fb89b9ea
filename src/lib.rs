// Phase Coordinator Library - workflow lifecycle and action dependency graph
// This exposes the core components for embedding and integration testing

pub mod config;
pub mod dag;
pub mod phase;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, init_config, CoordinatorConfig, NotificationConfig, ObservabilityConfig};
pub use dag::{
    check_dependencies, get_execution_order, validate_dag, Action, ActionRepository, ActionStatus,
    CycleAwareRepository, DagError, DagResult, InMemoryActionRepository, RepositoryError,
};
pub use phase::{
    new_checkpoint_id, CheckpointCallback, CheckpointData, Phase, PhaseChangedCallback,
    PhaseError, PhaseManager, PhaseResult, PhaseState, TransitionRecord,
};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
