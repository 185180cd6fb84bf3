//! Environment repository trait and errors

use async_trait::async_trait;
use thiserror::Error;

use crate::backends::BackendError;
use crate::types::{ApplicationRequest, Environment};

/// Errors that can occur while resolving an environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A backend failed in a way no partial-result policy may absorb
    #[error("repository '{repository}' failed: {source}")]
    Backend {
        repository: String,
        #[source]
        source: BackendError,
    },

    /// Every configured backend or repository failed; carries the first cause
    #[error("all {attempted} sources failed, first error: {first}")]
    AllFailed {
        attempted: usize,
        first: Box<RepositoryError>,
    },

    /// Repository settings are invalid
    #[error("invalid repository configuration: {0}")]
    Config(String),
}

impl RepositoryError {
    pub fn backend(repository: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            repository: repository.into(),
            source,
        }
    }

    /// Whether the failure is transient and may be skipped under non-fail-fast policies
    pub fn is_transient(&self) -> bool {
        match self {
            RepositoryError::Backend { source, .. } => source.is_transient(),
            RepositoryError::AllFailed { first, .. } => first.is_transient(),
            RepositoryError::Config(_) => false,
        }
    }

    /// Short, low-cardinality name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryError::Backend { source, .. } => match source {
                BackendError::Unavailable { .. } => "backend-unavailable",
                BackendError::Config { .. } => "backend-config",
                BackendError::NoSuchLabel { .. } => "no-such-label",
                BackendError::InvalidDocument { .. } => "invalid-document",
            },
            RepositoryError::AllFailed { .. } => "all-failed",
            RepositoryError::Config(_) => "config",
        }
    }

    /// The underlying backend failure, if any
    pub fn root_cause(&self) -> Option<&BackendError> {
        match self {
            RepositoryError::Backend { source, .. } => Some(source),
            RepositoryError::AllFailed { first, .. } => first.root_cause(),
            RepositoryError::Config(_) => None,
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Something that resolves an application request into an [`Environment`]
///
/// Implemented by [`BackendRepository`](super::BackendRepository), by
/// [`CompositeResolver`](super::CompositeResolver) and by the observation
/// decorator, so they nest freely.
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    /// Repository name for logging and error messages
    fn name(&self) -> &str;

    /// Lower orders resolve first and win on conflicts
    fn order(&self) -> i32;

    /// Implementation class reported to observation handlers
    fn repository_class(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Resolve an environment for a request
    async fn find_environment(&self, request: &ApplicationRequest) -> RepositoryResult<Environment>;
}
