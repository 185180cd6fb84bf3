//! Transport seam between the client and a config server

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::types::Environment;

/// A fully built environment lookup, ready to send
#[derive(Clone, PartialEq, Eq)]
pub struct EnvironmentRequest {
    /// Server base URI with userinfo stripped
    pub uri: String,
    /// Full lookup URL
    pub url: String,
    /// Headers in send order
    pub headers: Vec<(String, String)>,
    /// Username and password for HTTP Basic authentication
    pub basic_auth: Option<(String, String)>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl EnvironmentRequest {
    /// Look up a header value, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-config-token"];

impl fmt::Debug for EnvironmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                let sensitive = SENSITIVE_HEADERS.iter().any(|s| key.eq_ignore_ascii_case(s));
                (key.as_str(), if sensitive { "******" } else { value.as_str() })
            })
            .collect();
        f.debug_struct("EnvironmentRequest")
            .field("uri", &self.uri)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| (user, "******")))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// Errors that can occur while talking to a config server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response at all: DNS, connect or read failure, or timeout
    #[error("no response from {uri}: {message}")]
    NoResponse {
        uri: String,
        message: String,
        timed_out: bool,
    },

    /// The server answered with an error status
    #[error("{uri} answered {status}: {body}")]
    Status { uri: String, status: u16, body: String },

    /// The server answered but the body is not an environment document
    #[error("invalid response from {uri}: {message}")]
    Decode { uri: String, message: String },

    /// The request could not be built (bad header name or value, bad URL)
    #[error("invalid request to {uri}: {message}")]
    Invalid { uri: String, message: String },
}

impl TransportError {
    pub fn no_response(uri: impl Into<String>, message: impl Into<String>, timed_out: bool) -> Self {
        Self::NoResponse {
            uri: uri.into(),
            message: message.into(),
            timed_out,
        }
    }

    pub fn status(uri: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            uri: uri.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether the server produced any answer
    ///
    /// Invalid requests count as answered: no other server would accept them either.
    pub fn received_response(&self) -> bool {
        !matches!(self, TransportError::NoResponse { .. })
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Sends environment lookups to a server
#[async_trait]
pub trait ConfigServerTransport: Send + Sync {
    /// Send one lookup
    ///
    /// Returns `Ok(None)` when the server has no environment for the request (HTTP 404).
    async fn fetch(&self, request: &EnvironmentRequest) -> TransportResult<Option<Environment>>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose connections time out after `connect_timeout`
    pub fn new(connect_timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Invalid {
                uri: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Use an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(uri: &str, error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::Invalid {
            uri: uri.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::no_response(uri, error.to_string(), error.is_timeout())
    }
}

#[async_trait]
impl ConfigServerTransport for ReqwestTransport {
    async fn fetch(&self, request: &EnvironmentRequest) -> TransportResult<Option<Environment>> {
        let mut builder = self.client.get(&request.url).timeout(request.read_timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await.map_err(|e| classify(&request.uri, e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(&request.uri, status.as_u16(), body));
        }

        let body = response.bytes().await.map_err(|e| classify(&request.uri, e))?;
        serde_json::from_slice::<Environment>(&body)
            .map(Some)
            .map_err(|e| TransportError::Decode {
                uri: request.uri.clone(),
                message: e.to_string(),
            })
    }
}
