//! Observation decorator for environment repositories

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::traits::{ObservationContext, SharedObservationHandler, CANCELLED_ERROR};
use crate::repository::{EnvironmentRepository, RepositoryResult};
use crate::types::{ApplicationRequest, Environment};

/// Wraps a repository so every lookup is reported to observation handlers
///
/// The wrapped repository's result is returned untouched; handlers only see
/// the context. Name, order and class are those of the wrapped repository.
pub struct ObservedRepository {
    inner: Arc<dyn EnvironmentRepository>,
    handlers: Vec<SharedObservationHandler>,
}

impl ObservedRepository {
    pub fn new(inner: Arc<dyn EnvironmentRepository>, handlers: Vec<SharedObservationHandler>) -> Self {
        Self { inner, handlers }
    }

    pub fn inner(&self) -> &Arc<dyn EnvironmentRepository> {
        &self.inner
    }
}

/// An observation in flight; handlers are stopped when it is dropped
///
/// A lookup dropped before [`finish`](ActiveObservation::finish) (a caller
/// timeout, a disconnected client) is stopped with the `cancelled` error tag.
struct ActiveObservation<'a> {
    handlers: &'a [SharedObservationHandler],
    context: ObservationContext,
    started: Instant,
    finished: bool,
}

impl<'a> ActiveObservation<'a> {
    fn start(handlers: &'a [SharedObservationHandler], context: ObservationContext) -> Self {
        for handler in handlers {
            handler.on_start(&context);
        }
        Self {
            handlers,
            context,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, error: Option<&str>) {
        if let Some(kind) = error {
            self.context.set_error(kind);
        }
        self.finished = true;
    }
}

impl Drop for ActiveObservation<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.context.set_error(CANCELLED_ERROR);
        }
        let elapsed = self.started.elapsed();
        for handler in self.handlers {
            handler.on_stop(&self.context, elapsed);
        }
    }
}

#[async_trait]
impl EnvironmentRepository for ObservedRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn order(&self) -> i32 {
        self.inner.order()
    }

    fn repository_class(&self) -> &'static str {
        self.inner.repository_class()
    }

    async fn find_environment(&self, request: &ApplicationRequest) -> RepositoryResult<Environment> {
        if self.handlers.is_empty() {
            return self.inner.find_environment(request).await;
        }

        let context = ObservationContext::for_request(self.inner.repository_class(), request);
        let observation = ActiveObservation::start(&self.handlers, context);
        let result = self.inner.find_environment(request).await;
        observation.finish(result.as_ref().err().map(|err| err.kind()));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendConfig, MemoryParameterStore, Parameter, ParameterStoreAdapter};
    use crate::observation::{tags, RecordingObservationHandler, SharedObservationHandler};
    use crate::repository::BackendRepository;
    use std::time::Duration;

    struct Stalled;

    #[async_trait]
    impl EnvironmentRepository for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn order(&self) -> i32 {
            0
        }

        async fn find_environment(&self, _request: &ApplicationRequest) -> RepositoryResult<Environment> {
            std::future::pending().await
        }
    }

    fn repository(store: Arc<MemoryParameterStore>) -> Arc<dyn EnvironmentRepository> {
        Arc::new(
            BackendRepository::new("params")
                .with_order(3)
                .with_fail_fast(true)
                .with_backend(Arc::new(ParameterStoreAdapter::new(store)), BackendConfig::parameter_store()),
        )
    }

    #[tokio::test]
    async fn test_successful_lookup_is_observed_without_changing_result() {
        let store = MemoryParameterStore::new();
        store.put(Parameter::new("/config/app/k", "v"));
        let store = Arc::new(store);

        let plain = repository(store.clone());
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observed = ObservedRepository::new(repository(store), vec![recorder.clone() as SharedObservationHandler]);
        assert_eq!(observed.order(), 3);
        assert_eq!(observed.name(), "params");

        let request = ApplicationRequest::parse("app", "dev", None);
        let expected = plain.find_environment(&request).await.unwrap();
        let actual = observed.find_environment(&request).await.unwrap();
        assert_eq!(actual, expected);

        let stopped = recorder.stopped();
        assert_eq!(stopped.len(), 1);
        assert!(stopped[0].tag(tags::CLASS).unwrap().ends_with("BackendRepository"));
        assert_eq!(stopped[0].tag(tags::PROFILE), Some("dev"));
        assert_eq!(stopped[0].tag(tags::LABEL), Some("none"));
        assert_eq!(stopped[0].tag(tags::APPLICATION), Some("app"));
        assert!(!stopped[0].is_error());
        assert_eq!(recorder.events().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_still_stopped_and_tagged() {
        let store = Arc::new(MemoryParameterStore::new());
        store.set_available(false);
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observed = ObservedRepository::new(repository(store), vec![recorder.clone() as SharedObservationHandler]);

        let err = observed
            .find_environment(&ApplicationRequest::new("app"))
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let stopped = recorder.stopped();
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].tag(tags::ERROR), Some("backend-unavailable"));
    }

    #[tokio::test]
    async fn test_cancelled_lookup_is_stopped() {
        let recorder = Arc::new(RecordingObservationHandler::new());
        let observed = ObservedRepository::new(Arc::new(Stalled), vec![recorder.clone() as SharedObservationHandler]);

        let request = ApplicationRequest::new("app");
        let outcome = tokio::time::timeout(Duration::from_millis(20), observed.find_environment(&request)).await;
        assert!(outcome.is_err());

        let stopped = recorder.stopped();
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].tag(tags::ERROR), Some(CANCELLED_ERROR));
        assert_eq!(recorder.events().len(), 2);
    }
}
