//! A repository that resolves environments from one or more backends

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use super::traits::{EnvironmentRepository, RepositoryError, RepositoryResult};
use crate::backends::{
    BackendAdapter, BackendConfig, BackendError, BackendRequest, FetchedSources, DEFAULT_ORDER,
};
use crate::logging::{noop_logger, SharedLogger};
use crate::types::{ApplicationRequest, Environment};
use crate::{log_debug, log_warn};

/// Read timeout applied to each backend call unless configured otherwise
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_millis(185_000);

struct Backend {
    adapter: Arc<dyn BackendAdapter>,
    config: BackendConfig,
}

/// Resolves an environment by querying its backends and concatenating their sources
///
/// Backends are queried concurrently; results are merged in ascending backend
/// `order` (ties keep configuration order) regardless of completion order.
/// Transient failures of individual backends are skipped unless the repository
/// is fail-fast; any other failure aborts the lookup.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cloudconf_core::backends::{BackendConfig, MemoryParameterStore, Parameter, ParameterStoreAdapter};
/// use cloudconf_core::repository::{BackendRepository, EnvironmentRepository};
///
/// let store = MemoryParameterStore::new();
/// store.put(Parameter::new("/config/app/db/url", "jdbc:x"));
///
/// let repository = BackendRepository::new("params")
///     .with_order(0)
///     .with_backend(Arc::new(ParameterStoreAdapter::new(Arc::new(store))), BackendConfig::parameter_store());
/// assert_eq!(repository.order(), 0);
/// ```
pub struct BackendRepository {
    name: String,
    order: i32,
    fail_fast: bool,
    timeout: Duration,
    backends: Vec<Backend>,
    logger: SharedLogger,
}

impl BackendRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: DEFAULT_ORDER,
            fail_fast: false,
            timeout: DEFAULT_BACKEND_TIMEOUT,
            backends: Vec::new(),
            logger: noop_logger(),
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Propagate transient backend failures instead of returning partial results
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Per-backend call timeout; an expired call counts as a transient failure
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backend(mut self, adapter: Arc<dyn BackendAdapter>, config: BackendConfig) -> Self {
        self.backends.push(Backend { adapter, config });
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Validate every backend's settings; nothing is contacted
    pub fn validate(&self) -> RepositoryResult<()> {
        for backend in &self.backends {
            if backend.adapter.kind() != backend.config.kind {
                return Err(RepositoryError::Config(format!(
                    "{} adapter configured with {} settings",
                    backend.adapter.kind(),
                    backend.config.kind
                )));
            }
            backend
                .config
                .validate()
                .map_err(|e| RepositoryError::backend(&self.name, e))?;
        }
        Ok(())
    }

    /// Label reported on the environment: the request label, else the first backend default
    fn effective_label(&self, request: &ApplicationRequest) -> Option<String> {
        request.label.clone().or_else(|| {
            self.backends
                .iter()
                .find_map(|b| b.config.default_label.clone())
        })
    }

    async fn fetch_one(&self, backend: &Backend, request: &ApplicationRequest) -> Result<FetchedSources, BackendError> {
        let backend_request = BackendRequest::new(request, backend.config.default_label.as_deref());
        match tokio::time::timeout(self.timeout, backend.adapter.fetch(&backend_request, &backend.config)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::unavailable(
                backend.config.kind,
                format!("no response within {:?}", self.timeout),
            )),
        }
    }
}

#[async_trait]
impl EnvironmentRepository for BackendRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn find_environment(&self, request: &ApplicationRequest) -> RepositoryResult<Environment> {
        self.validate()?;

        let results = join_all(self.backends.iter().map(|b| self.fetch_one(b, request))).await;

        let mut ranked: Vec<(i32, &Backend, Result<FetchedSources, BackendError>)> = self
            .backends
            .iter()
            .zip(results)
            .map(|(backend, result)| (backend.config.order, backend, result))
            .collect();
        ranked.sort_by_key(|(order, _, _)| *order);

        let mut environment = Environment::new(
            request.name.clone(),
            request.profiles.clone(),
            self.effective_label(request),
        );
        let mut first_error: Option<BackendError> = None;
        let mut failures = 0;

        for (_, backend, result) in ranked {
            match result {
                Ok(fetched) => {
                    log_debug!(
                        self.logger,
                        "{}: {} returned {} sources",
                        self.name,
                        backend.config.kind,
                        fetched.sources.len()
                    );
                    if environment.version.is_none() {
                        environment.version = fetched.version.filter(|v| !v.is_empty());
                    }
                    if environment.state.is_none() {
                        environment.state = fetched.state.filter(|s| !s.is_empty());
                    }
                    environment.add_all(fetched.sources);
                }
                Err(err) if err.is_transient() && !self.fail_fast => {
                    log_warn!(self.logger, "{}: skipping {} backend: {}", self.name, backend.config.kind, err);
                    failures += 1;
                    first_error.get_or_insert(err);
                }
                Err(err) => return Err(RepositoryError::backend(&self.name, err)),
            }
        }

        if failures > 0 && failures == self.backends.len() {
            if let Some(first) = first_error {
                return Err(RepositoryError::AllFailed {
                    attempted: failures,
                    first: Box::new(RepositoryError::backend(&self.name, first)),
                });
            }
        }
        Ok(environment)
    }
}
