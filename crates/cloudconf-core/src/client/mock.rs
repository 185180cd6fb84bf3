//! Scripted transport for testing

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::transport::{ConfigServerTransport, EnvironmentRequest, TransportError, TransportResult};
use crate::types::Environment;

/// A transport that replays scripted outcomes per server URI
///
/// Outcomes for a URI are consumed in order; the last one is repeated once the
/// script runs out. URIs without a script behave like a refused connection.
/// Every request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<TransportResult<Option<Environment>>>>>,
    requests: Mutex<Vec<EnvironmentRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for a (credential-stripped) server URI
    pub fn push(&self, uri: impl Into<String>, outcome: TransportResult<Option<Environment>>) -> &Self {
        self.scripts.lock().entry(uri.into()).or_default().push_back(outcome);
        self
    }

    pub fn respond(&self, uri: impl Into<String>, environment: Environment) -> &Self {
        self.push(uri, Ok(Some(environment)))
    }

    pub fn not_found(&self, uri: impl Into<String>) -> &Self {
        self.push(uri, Ok(None))
    }

    pub fn fail(&self, uri: impl Into<String>, error: TransportError) -> &Self {
        self.push(uri, Err(error))
    }

    /// Requests sent so far, in order
    pub fn requests(&self) -> Vec<EnvironmentRequest> {
        self.requests.lock().clone()
    }

    /// URLs requested so far, in order
    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }
}

#[async_trait]
impl ConfigServerTransport for MockTransport {
    async fn fetch(&self, request: &EnvironmentRequest) -> TransportResult<Option<Environment>> {
        self.requests.lock().push(request.clone());

        let mut scripts = self.scripts.lock();
        let Some(script) = scripts.get_mut(&request.uri) else {
            return Err(TransportError::no_response(&request.uri, "connection refused", false));
        };
        match script.len() {
            0 => Err(TransportError::no_response(&request.uri, "connection refused", false)),
            1 => script.front().cloned().unwrap_or(Ok(None)),
            _ => script.pop_front().unwrap_or(Ok(None)),
        }
    }
}
