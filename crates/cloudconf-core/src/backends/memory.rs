//! In-memory backend clients
//!
//! Stand-ins for the cloud SDKs and git plumbing, used by tests and by local
//! setups that seed configuration programmatically. Each client can be switched
//! to an unavailable state to simulate network failures and counts its calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::credhub::{CredentialEntry, CredentialStoreClient};
use super::parameter_store::{Parameter, ParameterPage, ParameterQuery, ParameterStoreClient};
use super::s3::{ObjectStoreClient, S3Object};
use super::secrets_manager::{SecretValue, SecretsManagerClient};
use super::traits::{BackendError, BackendKind, BackendResult};
use super::tree::{TreeSnapshot, VersionedTree};

/// Staging label of a secret's current version
pub const CURRENT_STAGE: &str = "AWSCURRENT";

/// Availability switch and call counter shared by the memory clients
#[derive(Debug)]
struct Health {
    available: AtomicBool,
    calls: AtomicUsize,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Health {
    fn check(&self, kind: BackendKind) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::unavailable(kind, "simulated outage"))
        }
    }
}

/// In-memory parameter store with path listing and pagination
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    parameters: RwLock<BTreeMap<String, Parameter>>,
    health: Health,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, parameter: Parameter) {
        self.parameters.write().insert(parameter.name.clone(), parameter);
    }

    pub fn set_available(&self, available: bool) {
        self.health.available.store(available, Ordering::SeqCst);
    }

    /// Number of listing calls served, including failed ones
    pub fn calls(&self) -> usize {
        self.health.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterStoreClient for MemoryParameterStore {
    async fn get_parameters_by_path(&self, query: ParameterQuery) -> BackendResult<ParameterPage> {
        self.health.check(BackendKind::AwsParameterStore)?;

        let parameters = self.parameters.read();
        let matching: Vec<&Parameter> = parameters
            .values()
            .filter(|p| match p.name.strip_prefix(&query.path) {
                Some(rest) => !rest.is_empty() && (query.recursive || !rest.contains('/')),
                None => false,
            })
            .collect();

        // The token is the offset of the next page
        let start = query
            .next_token
            .as_deref()
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        let size = query.max_results.max(1) as usize;
        let end = (start + size).min(matching.len());
        let page = matching
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|p| {
                let mut p = (*p).clone();
                if p.encrypted && query.with_decryption {
                    p.encrypted = false;
                }
                p
            })
            .collect();

        Ok(ParameterPage {
            parameters: page,
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

/// In-memory secrets manager keyed by secret id and staging label
#[derive(Debug, Default)]
pub struct MemorySecretsManager {
    secrets: RwLock<HashMap<(String, String), String>>,
    health: Health,
}

impl MemorySecretsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the current version of a secret
    pub fn put(&self, id: impl Into<String>, secret: impl Into<String>) {
        self.put_staged(id, CURRENT_STAGE, secret);
    }

    pub fn put_staged(&self, id: impl Into<String>, stage: impl Into<String>, secret: impl Into<String>) {
        self.secrets
            .write()
            .insert((id.into(), stage.into()), secret.into());
    }

    pub fn set_available(&self, available: bool) {
        self.health.available.store(available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.health.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretsManagerClient for MemorySecretsManager {
    async fn get_secret_value(
        &self,
        secret_id: &str,
        version_stage: Option<&str>,
    ) -> BackendResult<Option<SecretValue>> {
        self.health.check(BackendKind::AwsSecretsManager)?;
        let stage = version_stage.unwrap_or(CURRENT_STAGE);
        Ok(self
            .secrets
            .read()
            .get(&(secret_id.to_string(), stage.to_string()))
            .map(|secret| SecretValue {
                name: secret_id.to_string(),
                secret_string: secret.clone(),
                version_id: Some(stage.to_string()),
            }))
    }
}

/// In-memory object store keyed by bucket and object key
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), S3Object>>,
    health: Health,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, content: impl Into<String>, version_id: Option<&str>) {
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            S3Object {
                content: content.into(),
                version_id: version_id.map(str::to_string),
            },
        );
    }

    pub fn set_available(&self, available: bool) {
        self.health.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Option<S3Object>> {
        self.health.check(BackendKind::AwsS3)?;
        Ok(self
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<BTreeMap<String, Value>>,
    health: Health,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, name: impl Into<String>, value: Value) {
        self.credentials.write().insert(name.into(), value);
    }

    pub fn set_available(&self, available: bool) {
        self.health.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStoreClient for MemoryCredentialStore {
    async fn find_by_path(&self, path: &str) -> BackendResult<Vec<CredentialEntry>> {
        self.health.check(BackendKind::CredHub)?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .credentials
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, value)| CredentialEntry {
                name: name.clone(),
                value: value.clone(),
            })
            .collect())
    }
}

/// In-memory versioned tree: one file map and optional version per label
#[derive(Debug, Default)]
pub struct MemoryTree {
    labels: RwLock<BTreeMap<String, TreeSnapshot>>,
    health: Health,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, label: &str, path: &str, content: impl Into<String>) {
        self.labels
            .write()
            .entry(label.to_string())
            .or_default()
            .files
            .insert(path.to_string(), content.into());
    }

    pub fn set_version(&self, label: &str, version: impl Into<String>) {
        self.labels
            .write()
            .entry(label.to_string())
            .or_default()
            .version = Some(version.into());
    }

    pub fn set_available(&self, available: bool) {
        self.health.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl VersionedTree for MemoryTree {
    async fn checkout(&self, label: Option<&str>) -> BackendResult<TreeSnapshot> {
        self.health.check(BackendKind::Git)?;
        let label = label.unwrap_or("main");
        self.labels
            .read()
            .get(label)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchLabel {
                backend: BackendKind::Git,
                label: label.to_string(),
            })
    }
}
