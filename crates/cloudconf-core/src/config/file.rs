//! YAML configuration files
//!
//! Client settings live in `~/.config/cloudconf/client.yaml` and server settings
//! in `~/.config/cloudconf/server.yaml` unless a path is given explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};
use super::server::ServerConfig;
use crate::client::ConfigClientProperties;

const CONFIG_DIR_NAME: &str = "cloudconf";

/// `~/.config/cloudconf` on Linux, the platform equivalent elsewhere
pub fn user_config_dir() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
    config_dir.join(CONFIG_DIR_NAME)
}

pub fn default_client_config_path() -> PathBuf {
    user_config_dir().join("client.yaml")
}

pub fn default_server_config_path() -> PathBuf {
    user_config_dir().join("server.yaml")
}

/// Load client settings; a missing file yields the defaults
pub fn load_client_config(path: impl AsRef<Path>) -> ConfigResult<ConfigClientProperties> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ConfigClientProperties::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(ConfigClientProperties::default());
    }
    let properties: ConfigClientProperties = serde_yaml::from_str(&content)?;
    if properties.uri.is_empty() {
        return Err(ConfigError::Other(format!(
            "{}: at least one server uri is required",
            path.display()
        )));
    }
    Ok(properties)
}

/// Load and validate server settings; the file must exist
pub fn load_server_config(path: impl AsRef<Path>) -> ConfigResult<ServerConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    let config: ServerConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MultipleUriStrategy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_client_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let props = load_client_config(dir.path().join("client.yaml")).unwrap();
        assert_eq!(props, ConfigClientProperties::default());
    }

    #[test]
    fn test_client_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.yaml");
        fs::write(
            &path,
            "name: billing\nprofile: prod\nlabel: main\nuri:\n  - http://a:8888\n  - http://b:8888\nmultiple-uri-strategy: CONNECTION_TIMEOUT_ONLY\nheaders:\n  X-Team: payments\n",
        )
        .unwrap();
        let props = load_client_config(&path).unwrap();
        assert_eq!(props.name, "billing");
        assert_eq!(props.label.as_deref(), Some("main"));
        assert_eq!(props.uri.len(), 2);
        assert_eq!(props.multiple_uri_strategy, MultipleUriStrategy::ConnectionTimeoutOnly);
        assert_eq!(props.headers["X-Team"], "payments");
    }

    #[test]
    fn test_client_file_without_uris_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.yaml");
        fs::write(&path, "uri: []\n").unwrap();
        assert!(matches!(load_client_config(&path), Err(ConfigError::Other(_))));
    }

    #[test]
    fn test_server_file_is_validated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(
            &path,
            "repositories:\n  - name: aws\n    backends:\n      - type: aws-parameter-store\n        max-results: 50\n",
        )
        .unwrap();
        assert!(matches!(load_server_config(&path), Err(ConfigError::Backend(_))));

        assert!(matches!(
            load_server_config(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_default_paths() {
        assert!(default_client_config_path().ends_with("cloudconf/client.yaml"));
        assert!(default_server_config_path().ends_with("cloudconf/server.yaml"));
    }
}
