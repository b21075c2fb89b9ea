// Action Dependency Graph Module - cycle validation, ordering and readiness
//
// Free functions over an action store or an in-memory batch of actions.
// Nothing here mutates the store; callers adding a dependency must serialise
// their own validate-then-insert sequence against it.

pub mod action;
pub mod error;
pub mod order;
pub mod readiness;
pub mod repository;
pub mod validate;

#[cfg(test)]
pub mod mocks;

pub use action::{Action, ActionStatus};
pub use error::{DagError, DagResult, RepositoryError};
pub use order::get_execution_order;
pub use readiness::check_dependencies;
pub use repository::{ActionRepository, CycleAwareRepository, InMemoryActionRepository};
pub use validate::validate_dag;
