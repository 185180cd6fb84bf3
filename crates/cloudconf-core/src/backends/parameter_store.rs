//! Path-hierarchy parameter store backend

use std::sync::Arc;

use async_trait::async_trait;

use super::config::BackendConfig;
use super::document::CIPHER_PREFIX;
use super::keys::{compose_paths, origin_for, relative_key};
use super::traits::{BackendAdapter, BackendKind, BackendRequest, BackendResult, FetchedSources};
use crate::types::PropertySource;

/// One stored parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full hierarchical name, e.g. `/config/app-dev/db/url`
    pub name: String,
    pub value: String,
    /// The returned value is still ciphertext
    pub encrypted: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            encrypted: false,
        }
    }

    pub fn secure(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            encrypted: true,
            ..Self::new(name, value)
        }
    }
}

/// One listing call against a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterQuery {
    /// Path to list, always ending in `/`
    pub path: String,
    pub recursive: bool,
    pub with_decryption: bool,
    pub max_results: u32,
    pub next_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub parameters: Vec<Parameter>,
    pub next_token: Option<String>,
}

/// The opaque "list parameters by path" operation of a parameter store SDK
#[async_trait]
pub trait ParameterStoreClient: Send + Sync {
    async fn get_parameters_by_path(&self, query: ParameterQuery) -> BackendResult<ParameterPage>;
}

/// Adapter turning composed paths into one property source per populated path
pub struct ParameterStoreAdapter {
    client: Arc<dyn ParameterStoreClient>,
}

impl ParameterStoreAdapter {
    pub fn new(client: Arc<dyn ParameterStoreClient>) -> Self {
        Self { client }
    }

    /// List every parameter under a path, following pagination to the end
    async fn list_all(&self, path: &str, recursive: bool, config: &BackendConfig) -> BackendResult<Vec<Parameter>> {
        let mut parameters = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .get_parameters_by_path(ParameterQuery {
                    path: format!("{}/", path),
                    recursive,
                    with_decryption: config.decrypt_values,
                    max_results: config.max_results,
                    next_token: next_token.take(),
                })
                .await?;
            parameters.extend(page.parameters);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(parameters)
    }
}

#[async_trait]
impl BackendAdapter for ParameterStoreAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::AwsParameterStore
    }

    async fn fetch(&self, request: &BackendRequest, config: &BackendConfig) -> BackendResult<FetchedSources> {
        let mut sources = Vec::new();
        for path in compose_paths(request, config) {
            // The global prefix only contributes its direct children; a recursive
            // listing would sweep in every other application's parameters.
            let recursive = config.recursive && path != config.prefix;
            let parameters = self.list_all(&path, recursive, config).await?;

            let mut source = PropertySource::new(path.clone()).with_origin(origin_for(config, &path));
            for parameter in parameters {
                let key = relative_key(&parameter.name, &path);
                if parameter.encrypted || parameter.value.starts_with(CIPHER_PREFIX) {
                    source.mark_encrypted(key.clone());
                }
                source.insert_with_origin(key, parameter.value, origin_for(config, &parameter.name));
            }
            if !source.is_empty() {
                sources.push(source);
            }
        }
        Ok(FetchedSources::new(sources))
    }
}
