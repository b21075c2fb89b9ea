//! Action store interfaces consumed by the DAG engine.
//!
//! Native cycle detection is an optional capability: a store that can answer
//! "would this edge close a cycle?" itself implements [`CycleAwareRepository`]
//! and advertises it through [`ActionRepository::as_cycle_aware`]. Stores that
//! don't are validated with a manual graph walk instead.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use super::action::Action;
use super::error::RepositoryError;

/// Read access to persisted actions
pub trait ActionRepository {
    /// `Ok(None)` when no action with `id` exists
    fn get_action(&self, id: &str) -> Result<Option<Action>, RepositoryError>;

    /// Transitive dependency closure of `id`, excluding `id` itself
    fn get_all_dependencies(&self, id: &str) -> Result<Vec<String>, RepositoryError>;

    /// Capability check for native cycle detection
    fn as_cycle_aware(&self) -> Option<&dyn CycleAwareRepository> {
        None
    }
}

/// A store that can detect cycles itself
pub trait CycleAwareRepository: ActionRepository {
    /// Would recording `action_id -> dependency_id` close a cycle?
    fn would_create_cycle(
        &self,
        action_id: &str,
        dependency_id: &str,
    ) -> Result<bool, RepositoryError>;
}

/// Thread-safe in-memory action store
#[derive(Debug)]
pub struct InMemoryActionRepository {
    actions: RwLock<HashMap<String, Action>>,
    native_cycle_detection: bool,
}

impl Default for InMemoryActionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActionRepository {
    /// Store with native cycle detection enabled
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
            native_cycle_detection: true,
        }
    }

    /// Store that leaves cycle detection to the manual walk
    pub fn without_cycle_detection() -> Self {
        Self {
            native_cycle_detection: false,
            ..Self::new()
        }
    }

    pub fn with_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let repository = Self::new();
        repository.extend(actions);
        repository
    }

    /// Insert or replace, returning the previous record
    pub fn insert(&self, action: Action) -> Option<Action> {
        self.write_guard().insert(action.identifier.clone(), action)
    }

    pub fn extend(&self, actions: impl IntoIterator<Item = Action>) {
        let mut guard = self.write_guard();
        for action in actions {
            guard.insert(action.identifier.clone(), action);
        }
    }

    pub fn remove(&self, id: &str) -> Option<Action> {
        self.write_guard().remove(id)
    }

    pub fn len(&self) -> usize {
        self.read_guard().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_guard(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Action>>, RepositoryError> {
        self.actions
            .read()
            .map_err(|_| RepositoryError::backend("action store lock poisoned"))
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Action>> {
        // A panic mid-write leaves at most one stale record behind
        self.actions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ActionRepository for InMemoryActionRepository {
    fn get_action(&self, id: &str) -> Result<Option<Action>, RepositoryError> {
        Ok(self.read_guard()?.get(id).cloned())
    }

    /// Breadth-first, deduplicated, in discovery order. Unknown dependency ids
    /// are listed but not expanded.
    fn get_all_dependencies(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        let actions = self.read_guard()?;
        let root = actions
            .get(id)
            .ok_or_else(|| RepositoryError::backend(format!("action '{id}' not found")))?;

        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<&str> = root.requires.iter().map(String::as_str).collect();
        let mut closure = Vec::new();

        while let Some(dependency) = queue.pop_front() {
            if !seen.insert(dependency) {
                continue;
            }
            closure.push(dependency.to_string());
            if let Some(action) = actions.get(dependency) {
                queue.extend(action.requires.iter().map(String::as_str));
            }
        }

        Ok(closure)
    }

    fn as_cycle_aware(&self) -> Option<&dyn CycleAwareRepository> {
        self.native_cycle_detection
            .then_some(self as &dyn CycleAwareRepository)
    }
}

impl CycleAwareRepository for InMemoryActionRepository {
    /// The edge closes a cycle when `action_id` is reachable from
    /// `dependency_id` through stored edges.
    fn would_create_cycle(
        &self,
        action_id: &str,
        dependency_id: &str,
    ) -> Result<bool, RepositoryError> {
        if action_id == dependency_id {
            return Ok(true);
        }

        let actions = self.read_guard()?;
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![dependency_id];

        while let Some(current) = stack.pop() {
            if current == action_id {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(action) = actions.get(current) {
                stack.extend(action.requires.iter().map(String::as_str));
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> InMemoryActionRepository {
        InMemoryActionRepository::with_actions([
            Action::new("a").requires(["b"]),
            Action::new("b").requires(["c", "d"]),
            Action::new("c").requires(["d"]),
            Action::new("d"),
        ])
    }

    #[test]
    fn test_transitive_dependencies_in_discovery_order() {
        let repository = chain();
        assert_eq!(
            repository.get_all_dependencies("a").unwrap(),
            vec!["b", "c", "d"]
        );
        assert!(repository.get_all_dependencies("d").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_root_is_an_error() {
        let repository = chain();
        assert!(matches!(
            repository.get_all_dependencies("zzz"),
            Err(RepositoryError::Backend { .. })
        ));
    }

    #[test]
    fn test_unknown_dependency_listed_not_expanded() {
        let repository = InMemoryActionRepository::with_actions([
            Action::new("a").requires(["ghost", "b"]),
            Action::new("b"),
        ]);
        assert_eq!(
            repository.get_all_dependencies("a").unwrap(),
            vec!["ghost", "b"]
        );
    }

    #[test]
    fn test_native_cycle_detection() {
        let repository = chain();
        // d -> a would close d -> a -> b -> ... -> d
        assert!(repository.would_create_cycle("d", "a").unwrap());
        assert!(repository.would_create_cycle("c", "c").unwrap());
        assert!(!repository.would_create_cycle("a", "d").unwrap());
        assert!(!repository.would_create_cycle("new", "a").unwrap());
    }

    #[test]
    fn test_capability_toggle() {
        assert!(InMemoryActionRepository::new().as_cycle_aware().is_some());
        assert!(InMemoryActionRepository::without_cycle_detection()
            .as_cycle_aware()
            .is_none());
    }

    #[test]
    fn test_insert_and_remove() {
        let repository = InMemoryActionRepository::new();
        assert!(repository.is_empty());
        assert!(repository.insert(Action::new("a")).is_none());
        assert!(repository.insert(Action::new("a").requires(["b"])).is_some());
        assert_eq!(repository.len(), 1);
        assert_eq!(
            repository.get_action("a").unwrap().unwrap().requires,
            vec!["b"]
        );
        assert!(repository.remove("a").is_some());
        assert!(repository.get_action("a").unwrap().is_none());
    }
}
