//! Building a resolver from server configuration

use std::sync::Arc;

use super::error::{ConfigError, ConfigResult};
use super::server::ServerConfig;
use crate::backends::{
    BackendAdapter, BackendConfig, BackendKind, CredHubAdapter, CredentialStoreClient, FileTree,
    ObjectStoreClient, ParameterStoreAdapter, ParameterStoreClient, S3Adapter,
    SecretsManagerAdapter, SecretsManagerClient, TreeAdapter, VersionedTree,
};
use crate::logging::SharedLogger;
use crate::observation::{ObservedRepository, SharedObservationHandler};
use crate::repository::{BackendRepository, CompositeResolver, EnvironmentRepository};

/// The opaque clients backends are built on
///
/// Native directory trees need no client; every other kind used in the
/// configuration must have one here.
#[derive(Clone, Default)]
pub struct BackendClients {
    pub parameter_store: Option<Arc<dyn ParameterStoreClient>>,
    pub secrets_manager: Option<Arc<dyn SecretsManagerClient>>,
    pub object_store: Option<Arc<dyn ObjectStoreClient>>,
    pub credential_store: Option<Arc<dyn CredentialStoreClient>>,
    pub git: Option<Arc<dyn VersionedTree>>,
}

impl BackendClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter_store(mut self, client: Arc<dyn ParameterStoreClient>) -> Self {
        self.parameter_store = Some(client);
        self
    }

    pub fn with_secrets_manager(mut self, client: Arc<dyn SecretsManagerClient>) -> Self {
        self.secrets_manager = Some(client);
        self
    }

    pub fn with_object_store(mut self, client: Arc<dyn ObjectStoreClient>) -> Self {
        self.object_store = Some(client);
        self
    }

    pub fn with_credential_store(mut self, client: Arc<dyn CredentialStoreClient>) -> Self {
        self.credential_store = Some(client);
        self
    }

    pub fn with_git(mut self, tree: Arc<dyn VersionedTree>) -> Self {
        self.git = Some(tree);
        self
    }

    /// The adapter serving a backend's kind
    pub fn adapter_for(&self, config: &BackendConfig) -> ConfigResult<Arc<dyn BackendAdapter>> {
        let missing = |kind: BackendKind| ConfigError::Other(format!("no {} client available", kind));
        let adapter: Arc<dyn BackendAdapter> = match config.kind {
            BackendKind::AwsParameterStore => Arc::new(ParameterStoreAdapter::new(
                self.parameter_store.clone().ok_or_else(|| missing(config.kind))?,
            )),
            BackendKind::AwsSecretsManager => Arc::new(SecretsManagerAdapter::new(
                self.secrets_manager.clone().ok_or_else(|| missing(config.kind))?,
            )),
            BackendKind::AwsS3 => Arc::new(S3Adapter::new(
                self.object_store.clone().ok_or_else(|| missing(config.kind))?,
            )),
            BackendKind::CredHub => Arc::new(CredHubAdapter::new(
                self.credential_store.clone().ok_or_else(|| missing(config.kind))?,
            )),
            BackendKind::Git => Arc::new(TreeAdapter::git(
                self.git.clone().ok_or_else(|| missing(config.kind))?,
            )),
            BackendKind::Native => {
                let root = config.uri.clone().ok_or_else(|| {
                    ConfigError::Other("native backend needs a uri".to_string())
                })?;
                let root = root.strip_prefix("file:").map(str::to_string).unwrap_or(root);
                Arc::new(TreeAdapter::native(Arc::new(FileTree::new(root))))
            }
        };
        Ok(adapter)
    }
}

/// Validate the configuration and build one observed repository per entry
pub fn build_resolver(
    config: &ServerConfig,
    clients: &BackendClients,
    logger: SharedLogger,
    handlers: Vec<SharedObservationHandler>,
) -> ConfigResult<CompositeResolver> {
    config.validate()?;

    let mut repositories: Vec<Arc<dyn EnvironmentRepository>> = Vec::with_capacity(config.repositories.len());
    for entry in &config.repositories {
        let mut repository = BackendRepository::new(entry.name.clone())
            .with_order(entry.order())
            .with_fail_fast(entry.fail_fast.unwrap_or(config.fail_fast))
            .with_timeout(config.read_timeout())
            .with_logger(logger.clone());
        for backend in entry.backend_configs() {
            let adapter = clients.adapter_for(&backend)?;
            repository = repository.with_backend(adapter, backend);
        }
        repositories.push(Arc::new(ObservedRepository::new(Arc::new(repository), handlers.clone())));
    }

    Ok(CompositeResolver::new(repositories)
        .with_fail_fast(config.fail_fast)
        .with_logger(logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryParameterStore, MemorySecretsManager, Parameter};
    use crate::logging::noop_logger;
    use crate::observation::RecordingObservationHandler;
    use crate::types::ApplicationRequest;

    const CONFIG: &str = r#"
repositories:
  - name: secrets
    order: 1
    backends:
      - type: aws-secrets-manager
  - name: params
    order: 0
    backends:
      - type: aws-parameter-store
"#;

    fn clients() -> BackendClients {
        let params = MemoryParameterStore::new();
        params.put(Parameter::new("/config/app/x.y", "params"));
        let secrets = MemorySecretsManager::new();
        secrets.put("/secret/app", r#"{"x":{"y":"secret"},"only":"secret"}"#);
        BackendClients::new()
            .with_parameter_store(Arc::new(params))
            .with_secrets_manager(Arc::new(secrets))
    }

    #[tokio::test]
    async fn test_resolver_from_yaml() {
        let config: ServerConfig = serde_yaml::from_str(CONFIG).unwrap();
        let recorder = Arc::new(RecordingObservationHandler::new());
        let handler: SharedObservationHandler = recorder.clone();
        let resolver = build_resolver(&config, &clients(), noop_logger(), vec![handler]).unwrap();

        let names: Vec<_> = resolver.repositories().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["params", "secrets"]);

        let env = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap();
        assert_eq!(env.get_property("x.y"), Some("params"));
        assert_eq!(env.get_property("only"), Some("secret"));
        assert_eq!(recorder.stopped().len(), 2);
    }

    #[test]
    fn test_missing_client_is_reported() {
        let config: ServerConfig = serde_yaml::from_str(
            "repositories:\n  - name: s3\n    backends:\n      - type: aws-s3\n        bucket: b\n",
        )
        .unwrap();
        let err = build_resolver(&config, &BackendClients::new(), noop_logger(), Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Other(ref m) if m.contains("aws-s3")));
    }

    #[tokio::test]
    async fn test_native_backend_needs_no_client() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.yml"), "k: v\n").unwrap();
        let yaml = format!(
            "repositories:\n  - name: local\n    backends:\n      - type: native\n        uri: file:{}\n",
            dir.path().display()
        );
        let config: ServerConfig = serde_yaml::from_str(&yaml).unwrap();
        let resolver = build_resolver(&config, &BackendClients::new(), noop_logger(), Vec::new()).unwrap();
        let env = resolver.resolve_all(&ApplicationRequest::new("app")).await.unwrap();
        assert_eq!(env.get_property("k"), Some("v"));
    }
}
