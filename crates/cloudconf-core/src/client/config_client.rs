//! Config server client with multi-URI failover

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{ClientError, ClientResult};
use super::properties::ConfigClientProperties;
use super::request::ClientRequestBuilder;
use super::transport::{ConfigServerTransport, ReqwestTransport};
use crate::credentials::strip_userinfo;
use crate::logging::{noop_logger, SharedLogger};
use crate::types::Environment;
use crate::{log_debug, log_info, log_warn};

/// Fetches environments from a config server
///
/// # Example
///
/// ```no_run
/// use cloudconf_core::client::{ConfigClient, ConfigClientProperties};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let properties = ConfigClientProperties::default()
///     .with_name("billing")
///     .with_profile("prod")
///     .with_uris(["http://config-1:8888", "http://config-2:8888"]);
/// let client = ConfigClient::from_properties(properties)?;
/// if let Some(environment) = client.load().await? {
///     println!("{:?}", environment.get_property("db.url"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct ConfigClient {
    properties: ConfigClientProperties,
    transport: Arc<dyn ConfigServerTransport>,
    logger: SharedLogger,
    last_state: Mutex<Option<String>>,
}

impl ConfigClient {
    pub fn new(properties: ConfigClientProperties, transport: Arc<dyn ConfigServerTransport>) -> Self {
        Self {
            properties,
            transport,
            logger: noop_logger(),
            last_state: Mutex::new(None),
        }
    }

    /// Client talking HTTP with the configured connect timeout
    pub fn from_properties(properties: ConfigClientProperties) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(properties.connect_timeout())?;
        Ok(Self::new(properties, Arc::new(transport)))
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn properties(&self) -> &ConfigClientProperties {
        &self.properties
    }

    /// State token of the last environment received
    pub fn last_state(&self) -> Option<String> {
        self.last_state.lock().clone()
    }

    /// Fetch the environment, trying labels in order and URIs per the failover strategy
    ///
    /// Returns `Ok(None)` when no server had an environment for any label. Errors
    /// from the last URI of a label, or from a URI the strategy refuses to move
    /// past, are returned as is.
    pub async fn fetch_environment(&self) -> ClientResult<Option<Environment>> {
        let builder = ClientRequestBuilder::new(&self.properties);
        let uri_count = self.properties.uri.len();
        if uri_count == 0 {
            return Err(ClientError::InvalidRequest("no config server URI configured".to_string()));
        }
        let state = if self.properties.send_state {
            self.last_state()
        } else {
            None
        };

        for label in builder.labels() {
            for index in 0..uri_count {
                let is_last = index + 1 == uri_count;
                let request = builder.build(index, label.as_deref(), state.as_deref())?;
                log_debug!(self.logger, "fetching config from {}", request.url);

                match self.transport.fetch(&request).await {
                    Ok(Some(environment)) => {
                        log_info!(
                            self.logger,
                            "located environment: name={}, profiles={:?}, label={:?}, version={:?}, state={:?}",
                            environment.name,
                            environment.profiles,
                            environment.label,
                            environment.version,
                            environment.state
                        );
                        if let Some(state) = environment.state.clone().filter(|s| !s.is_empty()) {
                            *self.last_state.lock() = Some(state);
                        }
                        return Ok(Some(environment));
                    }
                    Ok(None) => {
                        if !is_last && self.properties.multiple_uri_strategy.is_always() {
                            log_info!(self.logger, "no environment at {}, trying next uri", request.uri);
                            continue;
                        }
                        break;
                    }
                    Err(err) => {
                        if !is_last && self.properties.multiple_uri_strategy.should_advance(&err) {
                            log_info!(self.logger, "failed to fetch from {}: {}, trying next uri", request.uri, err);
                            continue;
                        }
                        return Err(err.into());
                    }
                }
            }
        }
        Ok(None)
    }

    /// Fetch the environment applying the enabled and fail-fast settings
    ///
    /// A disabled client returns `Ok(None)` without contacting any server. Without
    /// fail-fast, failures and missing environments are logged and yield `Ok(None)`
    /// so the caller falls back to local defaults.
    pub async fn load(&self) -> ClientResult<Option<Environment>> {
        if !self.properties.enabled {
            log_debug!(self.logger, "config client disabled");
            return Ok(None);
        }

        match self.fetch_environment().await {
            Ok(Some(environment)) => Ok(Some(environment)),
            Ok(None) => {
                let request = self.properties.to_request();
                let error = ClientError::NotFound {
                    name: request.name.clone(),
                    profiles: request.profile_string(),
                    label: self.properties.label.clone().unwrap_or_default(),
                };
                if self.properties.fail_fast {
                    return Err(error);
                }
                log_warn!(self.logger, "{}", error);
                Ok(None)
            }
            Err(err) => {
                if self.properties.fail_fast {
                    return Err(err);
                }
                let uris: Vec<_> = self.properties.uri.iter().map(|u| strip_userinfo(u).into_owned()).collect();
                log_warn!(self.logger, "could not locate config from {:?}: {}", uris, err);
                Ok(None)
            }
        }
    }

    /// The flattened key/value view of the loaded environment; empty when none was found
    pub async fn effective_properties(&self) -> ClientResult<BTreeMap<String, String>> {
        Ok(self
            .load()
            .await?
            .map(|environment| environment.flatten())
            .unwrap_or_default())
    }
}
