//! Core traits and types for configuration backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::BackendConfig;
use crate::types::{ApplicationRequest, PropertySource};

/// The kind of system a backend reads configuration from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Versioned tree (git repository), label selects branch/tag/commit
    #[serde(rename = "git")]
    Git,
    /// Local directory tree
    #[serde(rename = "native")]
    Native,
    /// Path-hierarchy key/value store
    #[serde(rename = "aws-parameter-store", alias = "awsparamstore")]
    AwsParameterStore,
    /// Secret store holding one JSON document per path
    #[serde(rename = "aws-secrets-manager", alias = "aws-secretsmanager")]
    AwsSecretsManager,
    /// Object store holding configuration documents
    #[serde(rename = "aws-s3", alias = "awss3")]
    AwsS3,
    /// Credential store organised by application/profile/label
    #[serde(rename = "credhub")]
    CredHub,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Git => "git",
            BackendKind::Native => "native",
            BackendKind::AwsParameterStore => "aws-parameter-store",
            BackendKind::AwsSecretsManager => "aws-secrets-manager",
            BackendKind::AwsS3 => "aws-s3",
            BackendKind::CredHub => "credhub",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while fetching from a backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure, timeout or throttling; the caller may retry or skip
    #[error("{backend} backend unavailable: {message}")]
    Unavailable { backend: BackendKind, message: String },

    /// Invalid backend settings; fails before any network call
    #[error("invalid {backend} backend configuration: {message}")]
    Config { backend: BackendKind, message: String },

    /// The requested label does not exist in the backend
    #[error("no such label '{label}' in {backend} backend")]
    NoSuchLabel { backend: BackendKind, label: String },

    /// A stored document could not be parsed
    #[error("invalid document at {location}: {message}")]
    InvalidDocument { location: String, message: String },
}

impl BackendError {
    pub fn unavailable(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            backend,
            message: message.into(),
        }
    }

    pub fn config(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::Config {
            backend,
            message: message.into(),
        }
    }

    pub fn invalid_document(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is transient and may be absorbed by partial-result policies
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Unavailable { .. })
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A request as seen by one backend
///
/// The profile list ends with an empty profile standing for the
/// profile-agnostic defaults, and the label has the backend default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub application: String,
    pub profiles: Vec<String>,
    pub label: Option<String>,
}

impl BackendRequest {
    /// Normalize an application request for a backend with the given default label
    pub fn new(request: &ApplicationRequest, default_label: Option<&str>) -> Self {
        let mut profiles = request.profiles.clone();
        profiles.push(String::new());
        Self {
            application: request.name.clone(),
            profiles,
            label: request
                .label
                .clone()
                .or_else(|| default_label.map(str::to_string)),
        }
    }

    /// The explicit profiles, without the trailing default slot
    pub fn explicit_profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles
            .iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }
}

/// What a backend returns for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedSources {
    /// Property sources, most specific first
    pub sources: Vec<PropertySource>,
    /// Revision identifier (commit id, object version)
    pub version: Option<String>,
    /// Backend-specific state token
    pub state: Option<String>,
}

impl FetchedSources {
    pub fn new(sources: Vec<PropertySource>) -> Self {
        Self {
            sources,
            version: None,
            state: None,
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }
}

/// One backend kind's way of turning a request into property sources
///
/// Implementations own their opaque client (SDK wrapper, tree provider) and are
/// selected by configuration when repositories are assembled. Settings are passed
/// in on every call.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Which backend kind this adapter serves
    fn kind(&self) -> BackendKind;

    /// Fetch the property sources for a request
    async fn fetch(
        &self,
        request: &BackendRequest,
        config: &BackendConfig,
    ) -> BackendResult<FetchedSources>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_request_appends_default_profile() {
        let request = ApplicationRequest::parse("app", "dev,prod", None);
        let backend_request = BackendRequest::new(&request, Some("main"));
        assert_eq!(backend_request.profiles, vec!["dev", "prod", ""]);
        assert_eq!(backend_request.label.as_deref(), Some("main"));
        assert_eq!(
            backend_request.explicit_profiles().collect::<Vec<_>>(),
            vec!["dev", "prod"]
        );
    }

    #[test]
    fn test_explicit_label_wins_over_default() {
        let request = ApplicationRequest::parse("app", "dev", Some("release"));
        let backend_request = BackendRequest::new(&request, Some("main"));
        assert_eq!(backend_request.label.as_deref(), Some("release"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::unavailable(BackendKind::AwsS3, "timeout").is_transient());
        assert!(!BackendError::config(BackendKind::AwsS3, "bad").is_transient());
        assert!(!BackendError::invalid_document("x", "y").is_transient());
    }
}
