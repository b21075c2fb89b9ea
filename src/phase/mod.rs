// Workflow Phase Module - lifecycle state machine for composite workflows
//
// Tracks each workflow through pending -> pre-flight -> planning -> execution
// and the pause/resume/cancel/complete/fail branches, and tells observers
// about every change.

pub mod error;
pub mod manager;
pub mod notifier;
pub mod state;
pub mod types;


pub use error::{PhaseError, PhaseResult};
pub use manager::{new_checkpoint_id, CheckpointCallback, CheckpointData, PhaseManager};
pub use notifier::PhaseChangedCallback;
pub use state::{PhaseState, TransitionRecord};
pub use types::Phase;
