//! Composition of several repositories into one environment

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::traits::{EnvironmentRepository, RepositoryError, RepositoryResult};
use crate::backends::DEFAULT_ORDER;
use crate::logging::{noop_logger, SharedLogger};
use crate::types::{ApplicationRequest, Environment};
use crate::{log_debug, log_warn};

/// Merges the environments of several repositories
///
/// Repositories are sorted once, at construction, by ascending `order` with
/// ties kept in the order they were added. Every lookup queries all of them
/// concurrently and concatenates their property sources in that sorted order,
/// so the first source holding a key belongs to the lowest-order repository
/// that defines it.
pub struct CompositeResolver {
    name: String,
    order: i32,
    fail_fast: bool,
    repositories: Vec<Arc<dyn EnvironmentRepository>>,
    logger: SharedLogger,
}

impl CompositeResolver {
    pub fn new(repositories: Vec<Arc<dyn EnvironmentRepository>>) -> Self {
        let mut repositories = repositories;
        // sort_by_key is stable
        repositories.sort_by_key(|r| r.order());
        Self {
            name: "composite".to_string(),
            order: DEFAULT_ORDER,
            fail_fast: false,
            repositories,
            logger: noop_logger(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Propagate transient repository failures instead of skipping them
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Repositories in resolution order
    pub fn repositories(&self) -> &[Arc<dyn EnvironmentRepository>] {
        &self.repositories
    }

    /// Resolve a request against every repository and merge the results
    pub async fn resolve_all(&self, request: &ApplicationRequest) -> RepositoryResult<Environment> {
        let results = join_all(self.repositories.iter().map(|r| r.find_environment(request))).await;

        let mut merged = Environment::new(request.name.clone(), request.profiles.clone(), request.label.clone());
        let mut first_error: Option<RepositoryError> = None;
        let mut failures = 0;

        for (repository, result) in self.repositories.iter().zip(results) {
            match result {
                Ok(environment) => {
                    log_debug!(
                        self.logger,
                        "{}: repository '{}' (order {}) returned {} sources",
                        self.name,
                        repository.name(),
                        repository.order(),
                        environment.property_sources.len()
                    );
                    if merged.label.is_none() {
                        merged.label = environment.label;
                    }
                    if merged.version.is_none() {
                        merged.version = environment.version.filter(|v| !v.is_empty());
                    }
                    if merged.state.is_none() {
                        merged.state = environment.state.filter(|s| !s.is_empty());
                    }
                    merged.add_all(environment.property_sources);
                }
                Err(err) if err.is_transient() && !self.fail_fast => {
                    log_warn!(self.logger, "{}: skipping repository '{}': {}", self.name, repository.name(), err);
                    failures += 1;
                    first_error.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        if failures > 0 && failures == self.repositories.len() {
            if let Some(first) = first_error {
                return Err(RepositoryError::AllFailed {
                    attempted: failures,
                    first: Box::new(first),
                });
            }
        }
        Ok(merged)
    }
}

#[async_trait]
impl EnvironmentRepository for CompositeResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn find_environment(&self, request: &ApplicationRequest) -> RepositoryResult<Environment> {
        self.resolve_all(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendError, BackendKind};
    use crate::types::PropertySource;

    /// Repository returning a fixed environment or error
    struct Fixed {
        name: &'static str,
        order: i32,
        result: RepositoryResult<Environment>,
    }

    impl Fixed {
        fn value(name: &'static str, order: i32, key: &str, value: &str) -> Arc<dyn EnvironmentRepository> {
            let mut env = Environment::new("app", vec!["default".to_string()], None);
            env.add(PropertySource::new(name).with_property(key, value));
            Arc::new(Self { name, order, result: Ok(env) })
        }

        fn failing(name: &'static str, order: i32, transient: bool) -> Arc<dyn EnvironmentRepository> {
            let source = if transient {
                BackendError::unavailable(BackendKind::AwsS3, "down")
            } else {
                BackendError::config(BackendKind::AwsS3, "broken")
            };
            Arc::new(Self {
                name,
                order,
                result: Err(RepositoryError::backend(name, source)),
            })
        }
    }

    #[async_trait]
    impl EnvironmentRepository for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn find_environment(&self, _request: &ApplicationRequest) -> RepositoryResult<Environment> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_lower_order_wins() {
        let resolver = CompositeResolver::new(vec![
            Fixed::value("second", 1, "x.y", "from-1"),
            Fixed::value("first", 0, "x.y", "from-0"),
        ]);
        let env = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap();
        assert_eq!(env.get_property("x.y"), Some("from-0"));
        assert_eq!(env.property_sources[0].name, "first");
    }

    #[tokio::test]
    async fn test_ties_keep_configuration_order() {
        let resolver = CompositeResolver::new(vec![
            Fixed::value("a", 5, "k", "a"),
            Fixed::value("b", 5, "k", "b"),
            Fixed::value("c", 1, "k", "c"),
        ]);
        let names: Vec<_> = resolver.repositories().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_version_from_first_non_empty() {
        let mut unversioned = Environment::new("app", vec![], None);
        unversioned.add(PropertySource::new("u").with_property("k", "1"));
        let versioned = Environment::new("app", vec![], None).with_version("v2").with_state("s2");
        let resolver = CompositeResolver::new(vec![
            Arc::new(Fixed { name: "u", order: 0, result: Ok(unversioned.with_version("")) }),
            Arc::new(Fixed { name: "v", order: 1, result: Ok(versioned) }),
        ]);
        let env = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap();
        assert_eq!(env.version.as_deref(), Some("v2"));
        assert_eq!(env.state.as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let resolver = CompositeResolver::new(vec![
            Fixed::value("a", 0, "k", "1"),
            Fixed::value("b", 1, "j", "2"),
        ]);
        let request = ApplicationRequest::new("app");
        let first = resolver.resolve_all(&request).await.unwrap();
        let second = resolver.resolve_all(&request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_transient_repository_is_skipped() {
        let resolver = CompositeResolver::new(vec![
            Fixed::failing("down", 0, true),
            Fixed::value("up", 1, "k", "v"),
        ]);
        let env = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap();
        assert_eq!(env.get_property("k"), Some("v"));

        let strict = CompositeResolver::new(vec![
            Fixed::failing("down", 0, true),
            Fixed::value("up", 1, "k", "v"),
        ])
        .with_fail_fast(true);
        assert!(strict.resolve_all(&ApplicationRequest::new("app")).await.is_err());
    }

    #[tokio::test]
    async fn test_fatal_error_always_propagates() {
        let resolver = CompositeResolver::new(vec![
            Fixed::value("up", 0, "k", "v"),
            Fixed::failing("broken", 1, false),
        ]);
        let err = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Backend { ref repository, .. } if repository == "broken"));
    }

    #[tokio::test]
    async fn test_all_failed_keeps_first_cause() {
        let resolver = CompositeResolver::new(vec![
            Fixed::failing("one", 0, true),
            Fixed::failing("two", 1, true),
        ]);
        let err = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap_err();
        match err {
            RepositoryError::AllFailed { attempted, first } => {
                assert_eq!(attempted, 2);
                assert!(matches!(*first, RepositoryError::Backend { ref repository, .. } if repository == "one"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_composite_returns_empty_environment() {
        let resolver = CompositeResolver::new(Vec::new());
        let env = resolver.resolve_all(&ApplicationRequest::parse("app", "dev", Some("main"))).await.unwrap();
        assert!(env.property_sources.is_empty());
        assert_eq!(env.label.as_deref(), Some("main"));
    }
}
