//! cloudconf Core
//!
//! Environment resolution for a centralized configuration client/server.
//! This crate holds everything except the HTTP server itself: backend adapters,
//! repositories and their composition, observation, and the client that fetches
//! environments from a running server.
//!
//! ## Resolving on the server side
//!
//! ```rust,ignore
//! use cloudconf_core::config::{build_resolver, load_server_config, BackendClients};
//! use cloudconf_core::types::ApplicationRequest;
//!
//! let config = load_server_config("server.yaml")?;
//! let clients = BackendClients::new().with_parameter_store(ssm_client);
//! let resolver = build_resolver(&config, &clients, logger, vec![])?;
//!
//! let request = ApplicationRequest::parse("billing", "dev,prod", None);
//! let environment = resolver.resolve_all(&request).await?;
//! ```

pub mod types;
pub mod logging;
pub mod credentials;
pub mod backends;
pub mod repository;
pub mod observation;
pub mod client;
pub mod config;

// Re-export commonly used types
pub use types::{ApplicationRequest, Environment, PropertySource};

pub use logging::{ConsoleLogger, Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use credentials::{CredentialError, Credentials};

pub use backends::{BackendAdapter, BackendConfig, BackendError, BackendKind};

pub use repository::{
    BackendRepository, CompositeResolver, EnvironmentRepository, RepositoryError, RepositoryResult,
};

pub use observation::{ObservationHandler, ObservedRepository};

pub use client::{
    ClientError, ClientRequestBuilder, ConfigClient, ConfigClientProperties, MultipleUriStrategy,
};

pub use config::{ConfigError, ServerConfig};
