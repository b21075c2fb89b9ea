//! Cycle validation for a new or changed action.
//!
//! # Strategy
//!
//! 1. An action with no `requires` is trivially valid.
//! 2. If the repository advertises native cycle detection, every declared edge
//!    is checked with it. An `Unsupported` answer abandons the native path.
//! 3. Otherwise the whole graph reachable from the action is walked with a
//!    three-colour depth-first search.
//!
//! The action being validated need not be stored yet: its own `requires` list
//! overrides whatever the repository holds under the same identifier.
//!
//! # Algorithm
//!
//! The walk keeps an explicit stack of `(node, next_edge)` frames over an
//! arena of resolved nodes instead of recursing, so long linear chains cannot
//! exhaust the call stack.
//!
//! - White (unvisited): not yet in the arena or not yet entered
//! - Gray (visiting): on the current DFS path
//! - Black (done): fully explored
//!
//! Meeting a gray node closes a cycle. Identifiers unknown to the repository
//! are leaves: an action that is not stored cannot contribute edges yet.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::action::Action;
use super::error::{DagError, DagResult, RepositoryError};
use super::repository::{ActionRepository, CycleAwareRepository};

/// Reject `action` if its dependencies would close a cycle
pub fn validate_dag(repository: Option<&dyn ActionRepository>, action: &Action) -> DagResult<()> {
    if action.requires.is_empty() {
        return Ok(());
    }

    if action.requires.contains(&action.identifier) {
        warn!(action = %action.identifier, "Action depends on itself");
        return Err(DagError::cycle(&action.identifier, &action.identifier));
    }

    if let Some(native) = repository.and_then(|repo| repo.as_cycle_aware()) {
        match check_cycle_native(native, action) {
            Err(DagError::Repository(RepositoryError::Unsupported { operation })) => {
                debug!(
                    action = %action.identifier,
                    operation = operation,
                    "Native cycle detection unsupported, falling back to manual check"
                );
            }
            result => return result,
        }
    }

    check_cycle_manual(repository, action)
}

fn check_cycle_native(repository: &dyn CycleAwareRepository, action: &Action) -> DagResult<()> {
    for dependency in &action.requires {
        if repository.would_create_cycle(&action.identifier, dependency)? {
            warn!(
                action = %action.identifier,
                dependency = %dependency,
                "Dependency would create a cycle"
            );
            return Err(DagError::cycle(&action.identifier, dependency));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

struct Node {
    id: String,
    requires: Vec<String>,
    mark: Mark,
}

/// Lazily resolved view of the dependency graph around one action
struct GraphView<'a> {
    repository: Option<&'a dyn ActionRepository>,
    pending: &'a Action,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl<'a> GraphView<'a> {
    fn new(repository: Option<&'a dyn ActionRepository>, pending: &'a Action) -> Self {
        Self {
            repository,
            pending,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Arena index for `id`, resolving its outgoing edges on first sight
    fn resolve(&mut self, id: &str) -> DagResult<usize> {
        if let Some(&position) = self.index.get(id) {
            return Ok(position);
        }

        let requires = if id == self.pending.identifier {
            self.pending.requires.clone()
        } else {
            self.lookup_requires(id)?
        };

        let position = self.nodes.len();
        self.nodes.push(Node {
            id: id.to_string(),
            requires,
            mark: Mark::Unvisited,
        });
        self.index.insert(id.to_string(), position);
        Ok(position)
    }

    fn lookup_requires(&self, id: &str) -> DagResult<Vec<String>> {
        let Some(repository) = self.repository else {
            return Ok(Vec::new());
        };
        match repository.get_action(id) {
            Ok(Some(action)) => Ok(action.requires),
            Ok(None) => Ok(Vec::new()),
            Err(error) if error.is_unsupported() => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Depth-first walk from `action` over repository edges
pub(crate) fn check_cycle_manual(
    repository: Option<&dyn ActionRepository>,
    action: &Action,
) -> DagResult<()> {
    let mut graph = GraphView::new(repository, action);
    let root = graph.resolve(&action.identifier)?;
    graph.nodes[root].mark = Mark::Visiting;

    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
        let (node, edge) = *frame;

        if edge == graph.nodes[node].requires.len() {
            graph.nodes[node].mark = Mark::Done;
            stack.pop();
            continue;
        }
        frame.1 += 1;

        let dependency = graph.nodes[node].requires[edge].clone();
        let next = graph.resolve(&dependency)?;

        match graph.nodes[next].mark {
            Mark::Visiting => {
                let from = graph.nodes[node].id.clone();
                warn!(from = %from, to = %dependency, "Circular dependency detected");
                return Err(DagError::cycle(from, dependency));
            }
            Mark::Unvisited => {
                graph.nodes[next].mark = Mark::Visiting;
                stack.push((next, 0));
            }
            Mark::Done => {}
        }
    }

    Ok(())
}
