//! Secret store backend: one JSON document per composed path

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::config::BackendConfig;
use super::document::{flatten_document, CIPHER_PREFIX};
use super::keys::{compose_paths, origin_for};
use super::traits::{
    BackendAdapter, BackendError, BackendKind, BackendRequest, BackendResult, FetchedSources,
};
use crate::types::PropertySource;

/// A secret as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
    pub name: String,
    pub secret_string: String,
    pub version_id: Option<String>,
}

/// The opaque "get secret value" operation of a secrets manager SDK
#[async_trait]
pub trait SecretsManagerClient: Send + Sync {
    /// Fetch a secret; `Ok(None)` when no secret exists under that id.
    ///
    /// `version_stage` selects a staging label; `None` means the store's current version.
    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_stage: Option<&str>,
    ) -> BackendResult<Option<SecretValue>>;
}

pub struct SecretsManagerAdapter {
    client: Arc<dyn SecretsManagerClient>,
}

impl SecretsManagerAdapter {
    pub fn new(client: Arc<dyn SecretsManagerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for SecretsManagerAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::AwsSecretsManager
    }

    async fn fetch(&self, request: &BackendRequest, config: &BackendConfig) -> BackendResult<FetchedSources> {
        let stage = if config.ignore_label {
            None
        } else {
            request.label.as_deref()
        };

        let mut sources = Vec::new();
        for path in compose_paths(request, config) {
            let Some(secret) = self.client.get_secret_value(&path, stage).await? else {
                continue;
            };

            let location = origin_for(config, &path);
            let document: Value = serde_json::from_str(&secret.secret_string)
                .map_err(|e| BackendError::invalid_document(&location, e.to_string()))?;
            if !document.is_object() {
                return Err(BackendError::invalid_document(
                    &location,
                    "secret must hold a JSON object",
                ));
            }
            let properties = flatten_document(&document)
                .map_err(|message| BackendError::invalid_document(&location, message))?;

            let mut source = PropertySource::new(path).with_origin(location.clone());
            for (key, value) in properties {
                if value.starts_with(CIPHER_PREFIX) {
                    source.mark_encrypted(key.clone());
                }
                source.insert_with_origin(key, value, location.clone());
            }
            if !source.is_empty() {
                sources.push(source);
            }
        }
        Ok(FetchedSources::new(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemorySecretsManager;
    use crate::types::ApplicationRequest;

    #[tokio::test]
    async fn test_secret_paths_and_flattening() {
        let store = MemorySecretsManager::new();
        store.put("/secret/app-dev", r#"{"db":{"password":"dev-pw"}}"#);
        store.put("/secret/app", r#"{"db":{"password":"default-pw","user":"app"}}"#);
        store.put("/secret", r#"{"shared":"yes"}"#);
        let adapter = SecretsManagerAdapter::new(Arc::new(store));

        let request = BackendRequest::new(&ApplicationRequest::parse("app", "dev,prod", None), None);
        let fetched = adapter.fetch(&request, &BackendConfig::secrets_manager()).await.unwrap();

        let names: Vec<_> = fetched.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["/secret/app-dev", "/secret/app", "/secret"]);
        assert_eq!(fetched.sources[0].get("db.password"), Some("dev-pw"));
        assert_eq!(
            fetched.sources[0].origin.as_deref(),
            Some("aws:secrets:/secret/app-dev")
        );
        assert_eq!(fetched.sources[1].get("db.user"), Some("app"));
        assert_eq!(fetched.sources[2].get("shared"), Some("yes"));
        assert_eq!(
            fetched.sources[1].origins.get("db.user").map(String::as_str),
            Some("aws:secrets:/secret/app")
        );
    }

    #[tokio::test]
    async fn test_label_selects_version_stage() {
        let store = Arc::new(MemorySecretsManager::new());
        store.put("/secret/app", r#"{"key":"current"}"#);
        store.put_staged("/secret/app", "AWSPREVIOUS", r#"{"key":"previous"}"#);
        let adapter = SecretsManagerAdapter::new(store.clone());

        let request = BackendRequest::new(&ApplicationRequest::parse("app", "", Some("AWSPREVIOUS")), None);
        let fetched = adapter.fetch(&request, &BackendConfig::secrets_manager()).await.unwrap();
        assert_eq!(fetched.sources[0].get("key"), Some("previous"));

        let ignoring = BackendConfig::secrets_manager().with_ignore_label(true);
        let fetched = adapter.fetch(&request, &ignoring).await.unwrap();
        assert_eq!(fetched.sources[0].get("key"), Some("current"));
    }

    #[tokio::test]
    async fn test_non_object_secret_is_invalid() {
        let store = MemorySecretsManager::new();
        store.put("/secret/app", "\"just a string\"");
        let adapter = SecretsManagerAdapter::new(Arc::new(store));
        let request = BackendRequest::new(&ApplicationRequest::new("app"), None);
        let err = adapter
            .fetch(&request, &BackendConfig::secrets_manager())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidDocument { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_cipher_values_flagged() {
        let store = MemorySecretsManager::new();
        store.put("/secret/app", r#"{"token":"{cipher}xyz","plain":"p"}"#);
        let adapter = SecretsManagerAdapter::new(Arc::new(store));
        let request = BackendRequest::new(&ApplicationRequest::new("app"), None);
        let fetched = adapter.fetch(&request, &BackendConfig::secrets_manager()).await.unwrap();
        assert!(fetched.sources[0].is_encrypted("token"));
        assert!(!fetched.sources[0].is_encrypted("plain"));
    }
}
