//! Client-side configuration surface

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use super::strategy::MultipleUriStrategy;
use crate::credentials::{resolve_at, CredentialResult, Credentials};
use crate::types::{ApplicationRequest, DEFAULT_APPLICATION, DEFAULT_PROFILE};

/// Server location used when none is configured
pub const DEFAULT_URI: &str = "http://localhost:8888";

/// Media type asking the server for the v2 environment document
pub const DEFAULT_MEDIA_TYPE: &str = "application/vnd.spring-cloud.config-server.v2+json";

/// Read timeout in milliseconds (3 minutes 5 seconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 185_000;

/// Connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Everything a client needs to locate and query a config server
///
/// Plain data, deserialized from a YAML file or built in code, and never
/// mutated while a lookup runs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConfigClientProperties {
    /// When false the client never contacts a server
    pub enabled: bool,
    /// Application name to request
    pub name: String,
    /// Comma-separated active profiles
    pub profile: String,
    /// Comma-separated labels, tried in order unless `send_all_labels` is set
    pub label: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Server URIs, tried in order according to `multiple_uri_strategy`
    #[serde(deserialize_with = "string_or_list")]
    pub uri: Vec<String>,
    pub multiple_uri_strategy: MultipleUriStrategy,
    /// Accept header value
    pub media_type: String,
    /// Treat a failed lookup as an error instead of falling back to local defaults
    pub fail_fast: bool,
    /// Security token sent as `X-Config-Token`
    pub token: Option<String>,
    /// Read timeout in milliseconds
    pub request_read_timeout: u64,
    /// Connect timeout in milliseconds
    pub request_connect_timeout: u64,
    /// Send the last known state token as `X-Config-State`
    pub send_state: bool,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Send the whole label list in one request and let the server pick
    pub send_all_labels: bool,
}

impl Default for ConfigClientProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            name: DEFAULT_APPLICATION.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            label: None,
            username: None,
            password: None,
            uri: vec![DEFAULT_URI.to_string()],
            multiple_uri_strategy: MultipleUriStrategy::default(),
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            fail_fast: false,
            token: None,
            request_read_timeout: DEFAULT_READ_TIMEOUT_MS,
            request_connect_timeout: DEFAULT_CONNECT_TIMEOUT_MS,
            send_state: true,
            headers: BTreeMap::new(),
            send_all_labels: false,
        }
    }
}

impl fmt::Debug for ConfigClientProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "******");
        f.debug_struct("ConfigClientProperties")
            .field("enabled", &self.enabled)
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("label", &self.label)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("uri", &self.uri)
            .field("multiple_uri_strategy", &self.multiple_uri_strategy)
            .field("media_type", &self.media_type)
            .field("fail_fast", &self.fail_fast)
            .field("token", &redacted(&self.token))
            .field("request_read_timeout", &self.request_read_timeout)
            .field("request_connect_timeout", &self.request_connect_timeout)
            .field("send_state", &self.send_state)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("send_all_labels", &self.send_all_labels)
            .finish()
    }
}

impl ConfigClientProperties {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uri = uris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_strategy(mut self, strategy: MultipleUriStrategy) -> Self {
        self.multiple_uri_strategy = strategy;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_send_all_labels(mut self, send_all_labels: bool) -> Self {
        self.send_all_labels = send_all_labels;
        self
    }

    /// The request this configuration describes, label list left unsplit
    pub fn to_request(&self) -> ApplicationRequest {
        ApplicationRequest::parse(&self.name, &self.profile, self.label.as_deref())
    }

    /// Effective credentials for the URI at `index`
    pub fn credentials(&self, index: usize) -> CredentialResult<Credentials> {
        resolve_at(&self.uri, index, self.username.as_deref(), self.password.as_deref())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.request_connect_timeout)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.request_read_timeout)
    }
}

/// Accept `uri: http://a,http://b` as well as a YAML list
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uris {
        One(String),
        Many(Vec<String>),
    }

    let uris = match Uris::deserialize(deserializer)? {
        Uris::One(value) => value.split(',').map(str::to_string).collect::<Vec<_>>(),
        Uris::Many(values) => values,
    };
    Ok(uris
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect())
}
