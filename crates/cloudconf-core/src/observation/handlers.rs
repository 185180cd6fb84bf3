//! Observation handlers

use std::time::Duration;

use parking_lot::Mutex;

use super::traits::{tags, ObservationContext, ObservationHandler};

/// Emits observations as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservationHandler;

impl ObservationHandler for TracingObservationHandler {
    fn on_start(&self, context: &ObservationContext) {
        tracing::debug!(
            observation = context.name,
            application = context.tag(tags::APPLICATION),
            profile = context.tag(tags::PROFILE),
            label = context.tag(tags::LABEL),
            class = context.tag(tags::CLASS),
            "{} started",
            context.contextual_name
        );
    }

    fn on_stop(&self, context: &ObservationContext, elapsed: Duration) {
        let elapsed_ms = elapsed_millis(elapsed);
        match context.tag(tags::ERROR) {
            Some(error) => tracing::warn!(
                observation = context.name,
                application = context.tag(tags::APPLICATION),
                profile = context.tag(tags::PROFILE),
                label = context.tag(tags::LABEL),
                class = context.tag(tags::CLASS),
                error,
                elapsed_ms,
                "{} failed",
                context.contextual_name
            ),
            None => tracing::info!(
                observation = context.name,
                application = context.tag(tags::APPLICATION),
                profile = context.tag(tags::PROFILE),
                label = context.tag(tags::LABEL),
                class = context.tag(tags::CLASS),
                elapsed_ms,
                "{} completed",
                context.contextual_name
            ),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// One lifecycle event captured by [`RecordingObservationHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationEvent {
    Started(ObservationContext),
    Stopped(ObservationContext),
}

/// Keeps every observation event in memory
#[derive(Debug, Default)]
pub struct RecordingObservationHandler {
    events: Mutex<Vec<ObservationEvent>>,
}

impl RecordingObservationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservationEvent> {
        self.events.lock().clone()
    }

    /// Contexts of finished observations, in completion order
    pub fn stopped(&self) -> Vec<ObservationContext> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObservationEvent::Stopped(context) => Some(context.clone()),
                ObservationEvent::Started(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ObservationHandler for RecordingObservationHandler {
    fn on_start(&self, context: &ObservationContext) {
        self.events.lock().push(ObservationEvent::Started(context.clone()));
    }

    fn on_stop(&self, context: &ObservationContext, _elapsed: Duration) {
        self.events.lock().push(ObservationEvent::Stopped(context.clone()));
    }
}
