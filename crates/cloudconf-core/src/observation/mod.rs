//! Observation of environment lookups
//!
//! [`ObservedRepository`] decorates any [`EnvironmentRepository`](crate::repository::EnvironmentRepository)
//! and reports each lookup, tagged with repository class, label, profiles and
//! application, to a list of [`ObservationHandler`]s.

mod handlers;
mod observed;
mod traits;

pub use handlers::{ObservationEvent, RecordingObservationHandler, TracingObservationHandler};
pub use observed::ObservedRepository;
pub use traits::{
    tags, ObservationContext, ObservationHandler, SharedObservationHandler, CANCELLED_ERROR, CONTEXTUAL_NAME,
    NONE_VALUE, OBSERVATION_NAME,
};
