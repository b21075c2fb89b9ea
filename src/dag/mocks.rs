// Mock action store for testing - records every call, no side effects

use std::cell::RefCell;
use std::collections::HashMap;

use super::action::Action;
use super::error::RepositoryError;
use super::repository::{ActionRepository, CycleAwareRepository};

/// How the mock answers native cycle checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCycleCheck {
    /// Always return this verdict
    Answer(bool),
    /// Report the operation as unsupported
    Unsupported,
    /// Report a backend failure
    Failing,
}

/// Action store with canned responses
#[derive(Debug, Default)]
pub struct MockActionRepository {
    pub actions: HashMap<String, Action>,
    /// `None` hides the native capability entirely
    pub native: Option<NativeCycleCheck>,
    /// `None` makes `get_all_dependencies` unsupported
    pub dependencies: Option<Vec<String>>,
    pub fail_lookups: bool,
    pub calls: RefCell<Vec<String>>,
}

impl MockActionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.insert(action.identifier.clone(), action);
        self
    }

    pub fn with_native(mut self, native: NativeCycleCheck) -> Self {
        self.native = Some(native);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Make every `get_action` call fail
    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ActionRepository for MockActionRepository {
    fn get_action(&self, id: &str) -> Result<Option<Action>, RepositoryError> {
        self.record(format!("get_action {id}"));
        if self.fail_lookups {
            return Err(RepositoryError::backend("mock lookup failure"));
        }
        Ok(self.actions.get(id).cloned())
    }

    fn get_all_dependencies(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        self.record(format!("get_all_dependencies {id}"));
        self.dependencies
            .clone()
            .ok_or_else(|| RepositoryError::unsupported("get_all_dependencies"))
    }

    fn as_cycle_aware(&self) -> Option<&dyn CycleAwareRepository> {
        self.native.map(|_| self as &dyn CycleAwareRepository)
    }
}

impl CycleAwareRepository for MockActionRepository {
    fn would_create_cycle(
        &self,
        action_id: &str,
        dependency_id: &str,
    ) -> Result<bool, RepositoryError> {
        self.record(format!("would_create_cycle {action_id} {dependency_id}"));
        match self.native {
            Some(NativeCycleCheck::Answer(verdict)) => Ok(verdict),
            Some(NativeCycleCheck::Failing) => Err(RepositoryError::backend("mock cycle check failure")),
            Some(NativeCycleCheck::Unsupported) | None => {
                Err(RepositoryError::unsupported("would_create_cycle"))
            }
        }
    }
}
