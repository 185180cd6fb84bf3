//! Observation context and handler trait

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::types::ApplicationRequest;

/// Name of the environment lookup observation
pub const OBSERVATION_NAME: &str = "config.environment.find";

/// Short human-readable name of the lookup
pub const CONTEXTUAL_NAME: &str = "env find";

/// Value substituted for blank tags
pub const NONE_VALUE: &str = "none";

/// Error tag value for lookups dropped before they finished
pub const CANCELLED_ERROR: &str = "cancelled";

/// Low-cardinality tag keys
pub mod tags {
    pub const CLASS: &str = "config.environment.class";
    pub const LABEL: &str = "config.environment.label";
    pub const PROFILE: &str = "config.environment.profile";
    pub const APPLICATION: &str = "config.environment.application";
    pub const ERROR: &str = "error";
}

/// What an observation handler sees about one lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationContext {
    pub name: &'static str,
    pub contextual_name: &'static str,
    pub tags: BTreeMap<&'static str, String>,
}

impl ObservationContext {
    /// Build the context for a lookup made by a repository of the given class
    pub fn for_request(repository_class: &str, request: &ApplicationRequest) -> Self {
        let mut values = BTreeMap::new();
        values.insert(tags::CLASS, or_none(repository_class));
        values.insert(tags::LABEL, or_none(request.label.as_deref().unwrap_or_default()));
        values.insert(tags::PROFILE, or_none(&request.profile_string()));
        values.insert(tags::APPLICATION, or_none(&request.name));
        Self {
            name: OBSERVATION_NAME,
            contextual_name: CONTEXTUAL_NAME,
            tags: values,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Mark the lookup as failed
    pub fn set_error(&mut self, kind: &str) {
        self.tags.insert(tags::ERROR, or_none(kind));
    }

    pub fn is_error(&self) -> bool {
        self.tags.contains_key(tags::ERROR)
    }
}

fn or_none(value: &str) -> String {
    if value.trim().is_empty() {
        NONE_VALUE.to_string()
    } else {
        value.to_string()
    }
}

/// Receives observation lifecycle events
///
/// Handlers must not fail or block; they only record.
pub trait ObservationHandler: Send + Sync {
    /// Called before the lookup starts
    fn on_start(&self, context: &ObservationContext);

    /// Called after the lookup finished, successfully or not
    fn on_stop(&self, context: &ObservationContext, elapsed: Duration);
}

pub type SharedObservationHandler = Arc<dyn ObservationHandler>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_from_request() {
        let request = ApplicationRequest::parse("app", "dev,prod", Some("main"));
        let context = ObservationContext::for_request("BackendRepository", &request);
        assert_eq!(context.name, "config.environment.find");
        assert_eq!(context.contextual_name, "env find");
        assert_eq!(context.tag(tags::CLASS), Some("BackendRepository"));
        assert_eq!(context.tag(tags::LABEL), Some("main"));
        assert_eq!(context.tag(tags::PROFILE), Some("dev,prod"));
        assert_eq!(context.tag(tags::APPLICATION), Some("app"));
        assert!(!context.is_error());
    }

    #[test]
    fn test_blank_tags_become_none() {
        let request = ApplicationRequest::new("app");
        let context = ObservationContext::for_request("  ", &request);
        assert_eq!(context.tag(tags::CLASS), Some(NONE_VALUE));
        assert_eq!(context.tag(tags::LABEL), Some(NONE_VALUE));
    }

    #[test]
    fn test_error_tag() {
        let mut context = ObservationContext::for_request("R", &ApplicationRequest::new("app"));
        context.set_error("backend-unavailable");
        assert!(context.is_error());
        assert_eq!(context.tag(tags::ERROR), Some("backend-unavailable"));
    }
}
