//! Configuration backends
//!
//! Each backend kind implements [`BackendAdapter`] over an opaque client
//! (SDK wrapper, credential store client, versioned tree). Adapters are chosen
//! by [`BackendKind`] when repositories are assembled from configuration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cloudconf_core::backends::{
//!     BackendAdapter, BackendConfig, BackendRequest, MemoryParameterStore, Parameter,
//!     ParameterStoreAdapter,
//! };
//! use cloudconf_core::types::ApplicationRequest;
//!
//! # tokio_test_block(async {
//! let store = MemoryParameterStore::new();
//! store.put(Parameter::new("/config/app/db/url", "jdbc:x"));
//! let adapter = ParameterStoreAdapter::new(Arc::new(store));
//!
//! let request = BackendRequest::new(&ApplicationRequest::new("app"), None);
//! let fetched = adapter.fetch(&request, &BackendConfig::parameter_store()).await.unwrap();
//! assert_eq!(fetched.sources[0].get("db.url"), Some("jdbc:x"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

mod config;
mod credhub;
mod document;
mod keys;
mod memory;
mod parameter_store;
mod s3;
mod secrets_manager;
mod traits;
mod tree;

pub use config::{BackendConfig, BackendConfigFile, DEFAULT_ORDER, MAX_PARAMETER_PAGE_SIZE};
pub use credhub::{CredHubAdapter, CredentialEntry, CredentialStoreClient};
pub use document::{parse_document, DocumentFormat, CIPHER_PREFIX};
pub use keys::{compose_paths, origin_for, relative_key};
pub use memory::{
    MemoryCredentialStore, MemoryObjectStore, MemoryParameterStore, MemorySecretsManager,
    MemoryTree, CURRENT_STAGE,
};
pub use parameter_store::{
    Parameter, ParameterPage, ParameterQuery, ParameterStoreAdapter, ParameterStoreClient,
};
pub use s3::{ObjectStoreClient, S3Adapter, S3Object};
pub use secrets_manager::{SecretValue, SecretsManagerAdapter, SecretsManagerClient};
pub use traits::{
    BackendAdapter, BackendError, BackendKind, BackendRequest, BackendResult, FetchedSources,
};
pub use tree::{FileTree, TreeAdapter, TreeSnapshot, VersionedTree};
