//! Environment repositories
//!
//! A [`BackendRepository`] resolves one environment from its backends; a
//! [`CompositeResolver`] merges several repositories by `order`. Both implement
//! [`EnvironmentRepository`].

mod backend_repository;
mod composite;
mod traits;

pub use backend_repository::{BackendRepository, DEFAULT_BACKEND_TIMEOUT};
pub use composite::CompositeResolver;
pub use traits::{EnvironmentRepository, RepositoryError, RepositoryResult};
