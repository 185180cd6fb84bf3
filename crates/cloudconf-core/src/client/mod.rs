//! Config server client
//!
//! [`ClientRequestBuilder`] turns [`ConfigClientProperties`] into concrete
//! lookups; [`ConfigClient`] sends them through a [`ConfigServerTransport`],
//! walking labels and server URIs according to the [`MultipleUriStrategy`].

mod config_client;
mod error;
mod mock;
mod properties;
mod request;
mod strategy;
mod transport;

pub use config_client::ConfigClient;
pub use error::{ClientError, ClientResult};
pub use mock::MockTransport;
pub use properties::{
    ConfigClientProperties, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MEDIA_TYPE, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_URI,
};
pub use request::{ClientRequestBuilder, SLASH_PLACEHOLDER, STATE_HEADER, TOKEN_HEADER};
pub use strategy::MultipleUriStrategy;
pub use transport::{
    ConfigServerTransport, EnvironmentRequest, ReqwestTransport, TransportError, TransportResult,
};
