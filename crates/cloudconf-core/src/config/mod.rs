//! Configuration files and resolver assembly
//!
//! - [`load_client_config`]: client settings ([`ConfigClientProperties`](crate::client::ConfigClientProperties))
//! - [`load_server_config`]: repositories and backends ([`ServerConfig`])
//! - [`build_resolver`]: turns a [`ServerConfig`] plus backend clients into a
//!   [`CompositeResolver`](crate::repository::CompositeResolver)

mod assembly;
mod error;
mod file;
mod server;

pub use assembly::{build_resolver, BackendClients};
pub use error::{ConfigError, ConfigResult};
pub use file::{
    default_client_config_path, default_server_config_path, load_client_config, load_server_config,
    user_config_dir,
};
pub use server::{RepositoryConfigFile, ServerConfig};
