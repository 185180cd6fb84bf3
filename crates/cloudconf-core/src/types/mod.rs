//! Core types shared by the client and the resolution pipeline
//!
//! This module contains the request and document types that flow between
//! backends, repositories and the client.

mod request;
mod environment;

pub use request::{ApplicationRequest, DEFAULT_APPLICATION, DEFAULT_PROFILE};
pub use environment::{Environment, PropertySource};
