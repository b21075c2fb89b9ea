//! Error types for dependency graph operations

use thiserror::Error;

/// Result type for DAG operations
pub type DagResult<T> = Result<T, DagError>;

/// Failures reported by an [`ActionRepository`](super::ActionRepository)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The backing store does not implement the operation.
    ///
    /// Cycle validation treats this as a request to fall back to the manual
    /// check rather than as a failure.
    #[error("repository does not support {operation}")]
    Unsupported { operation: &'static str },

    /// The backing store failed
    #[error("repository error: {message}")]
    Backend { message: String },
}

impl RepositoryError {
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Errors that can occur during DAG operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DagError {
    /// Following `from -> to` closes a cycle
    #[error("circular dependency detected: {from} -> {to}")]
    CycleDetected { from: String, to: String },

    /// Topological ordering stalled; every listed action sits on or behind a cycle
    #[error("circular dependency detected among actions: {}", remaining.join(", "))]
    UnresolvedOrder { remaining: Vec<String> },

    /// A dependency of a scheduled action does not exist in the store
    #[error("dependency '{dependency}' of action '{action}' not found")]
    DependencyNotFound { action: String, dependency: String },

    /// The same identifier appears twice in one ordering request
    #[error("duplicate action identifier: {id}")]
    DuplicateAction { id: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DagError {
    pub fn cycle(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::CycleDetected {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn dependency_not_found(action: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            action: action.into(),
            dependency: dependency.into(),
        }
    }

    /// True for both cycle variants
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CycleDetected { .. } | Self::UnresolvedOrder { .. })
    }
}
