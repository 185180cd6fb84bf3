//! Server-side configuration: repositories and their backends

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::backends::{BackendConfig, BackendConfigFile, DEFAULT_ORDER};
use crate::client::DEFAULT_READ_TIMEOUT_MS;

/// One repository and the backends it reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryConfigFile {
    pub name: String,
    #[serde(default)]
    pub order: Option<i32>,
    /// Overrides the server-wide fail-fast setting
    #[serde(default)]
    pub fail_fast: Option<bool>,
    #[serde(default)]
    pub backends: Vec<BackendConfigFile>,
}

impl RepositoryConfigFile {
    pub fn order(&self) -> i32 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }

    /// Backend settings with per-kind defaults applied, in file order
    pub fn backend_configs(&self) -> Vec<BackendConfig> {
        self.backends.iter().cloned().map(BackendConfigFile::into_config).collect()
    }
}

/// Everything a server needs to assemble its resolver
///
/// Connect timeouts belong to the backend clients the host builds and passes
/// in through [`BackendClients`](crate::config::BackendClients); the resolver
/// only bounds each backend call as a whole with `read-timeout-ms`.
///
/// ```
/// use cloudconf_core::config::ServerConfig;
///
/// let config: ServerConfig = serde_yaml::from_str(r#"
/// fail-fast: false
/// repositories:
///   - name: aws
///     order: 0
///     backends:
///       - type: aws-parameter-store
///         prefix: /config
///       - type: aws-secrets-manager
/// "#).unwrap();
/// config.validate().unwrap();
/// assert_eq!(config.repositories[0].backends.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// Propagate transient failures instead of serving partial environments
    pub fail_fast: bool,
    /// Per-backend call timeout, in milliseconds
    pub read_timeout_ms: u64,
    pub repositories: Vec<RepositoryConfigFile>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            repositories: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Check every repository and backend before anything is contacted
    pub fn validate(&self) -> ConfigResult<()> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Other("read-timeout-ms must be positive".to_string()));
        }
        let mut names = HashSet::new();
        for repository in &self.repositories {
            if repository.name.trim().is_empty() {
                return Err(ConfigError::Other("repository name must not be blank".to_string()));
            }
            if !names.insert(repository.name.as_str()) {
                return Err(ConfigError::Other(format!(
                    "duplicate repository name '{}'",
                    repository.name
                )));
            }
            for backend in repository.backend_configs() {
                backend.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendError, BackendKind};

    #[test]
    fn test_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert!(!config.fail_fast);
        assert_eq!(config.read_timeout(), Duration::from_secs(185));
        assert!(config.repositories.is_empty());
    }

    #[test]
    fn test_only_read_timeout_is_exposed() {
        let yaml = serde_yaml::to_string(&ServerConfig::default()).unwrap();
        assert!(yaml.contains("read-timeout-ms: 185000"));
        assert!(!yaml.contains("connect-timeout"));
    }

    #[test]
    fn test_backend_defaults_applied() {
        let config: ServerConfig = serde_yaml::from_str(
            "repositories:\n  - name: r\n    backends:\n      - type: credhub\n        path: /team\n",
        )
        .unwrap();
        let repository = &config.repositories[0];
        assert_eq!(repository.order(), DEFAULT_ORDER);
        let backend = &repository.backend_configs()[0];
        assert_eq!(backend.kind, BackendKind::CredHub);
        assert_eq!(backend.prefix, "/team");
        assert_eq!(backend.default_label.as_deref(), Some("master"));
    }

    #[test]
    fn test_invalid_prefix_fails_validation() {
        let config: ServerConfig = serde_yaml::from_str(
            "repositories:\n  - name: r\n    backends:\n      - type: aws-parameter-store\n        prefix: /my config\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Backend(BackendError::Config { .. })));
    }

    #[test]
    fn test_duplicate_repository_names() {
        let config: ServerConfig = serde_yaml::from_str(
            "repositories:\n  - name: r\n  - name: r\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Other(_))));
    }
}
