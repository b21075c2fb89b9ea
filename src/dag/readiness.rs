//! Dependency readiness: may an action start now?
//!
//! An action is ready when every dependency in its transitive closure has
//! completed, and completed no earlier than the action's own most recent
//! start. A dependency that finished before that start is stale and must run
//! again first.
//!
//! Unlike cycle validation, a dependency that cannot be found is an error
//! here, not a leaf.

use tracing::{debug, debug_span};

use super::action::Action;
use super::error::{DagError, DagResult};
use super::repository::ActionRepository;

/// Whether every dependency of `action` is completed and fresh
pub fn check_dependencies(repository: &dyn ActionRepository, action: &Action) -> DagResult<bool> {
    let _span = debug_span!("check_dependencies", action = %action.identifier).entered();

    if action.requires.is_empty() {
        return Ok(true);
    }

    let dependencies = match repository.get_all_dependencies(&action.identifier) {
        Ok(closure) => closure,
        Err(error) => {
            debug!(error = %error, "Transitive lookup failed, checking direct dependencies only");
            action.requires.clone()
        }
    };

    for dependency_id in &dependencies {
        let dependency = repository
            .get_action(dependency_id)?
            .ok_or_else(|| DagError::dependency_not_found(&action.identifier, dependency_id))?;

        if !dependency.is_completed() {
            debug!(
                dependency = %dependency_id,
                status = ?dependency.action_status,
                "Dependency not completed"
            );
            return Ok(false);
        }

        if is_stale(&dependency, action) {
            debug!(dependency = %dependency_id, "Dependency completed before the action's last start");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Skipped when either timestamp is unknown
fn is_stale(dependency: &Action, action: &Action) -> bool {
    match (dependency.end_time, action.start_time) {
        (Some(finished), Some(started)) => finished < started,
        _ => false,
    }
}
