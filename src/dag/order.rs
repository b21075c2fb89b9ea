//! Topological ordering of a batch of actions.
//!
//! Kahn's algorithm with a FIFO queue seeded in input order, so ties resolve
//! by discovery order and the result is reproducible for a given input slice.
//! Requirements naming actions outside the batch are treated as satisfied
//! elsewhere and do not count toward in-degree.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use super::action::Action;
use super::error::{DagError, DagResult};

/// Order `actions` so that every action follows all of its dependencies
pub fn get_execution_order(actions: &[Action]) -> DagResult<Vec<Action>> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(actions.len());
    for (position, action) in actions.iter().enumerate() {
        if index.insert(action.identifier.as_str(), position).is_some() {
            return Err(DagError::DuplicateAction {
                id: action.identifier.clone(),
            });
        }
    }

    let mut in_degree = vec![0usize; actions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); actions.len()];

    for (position, action) in actions.iter().enumerate() {
        // Repeated entries in `requires` describe one edge
        let mut seen = HashSet::new();
        for dependency in &action.requires {
            if !seen.insert(dependency.as_str()) {
                continue;
            }
            match index.get(dependency.as_str()) {
                Some(&source) => {
                    dependents[source].push(position);
                    in_degree[position] += 1;
                }
                None => debug!(
                    action = %action.identifier,
                    dependency = %dependency,
                    "Ignoring dependency outside the batch"
                ),
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..actions.len())
        .filter(|&position| in_degree[position] == 0)
        .collect();
    let mut order = Vec::with_capacity(actions.len());

    while let Some(position) = queue.pop_front() {
        order.push(position);
        for &dependent in &dependents[position] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() != actions.len() {
        let remaining: Vec<String> = actions
            .iter()
            .zip(&in_degree)
            .filter(|(_, degree)| **degree > 0)
            .map(|(action, _)| action.identifier.clone())
            .collect();
        warn!(remaining = ?remaining, "Execution order blocked by circular dependency");
        return Err(DagError::UnresolvedOrder { remaining });
    }

    Ok(order.into_iter().map(|position| actions[position].clone()).collect())
}
