//! Credential store backend organised by application, profile and label

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::config::BackendConfig;
use super::document::flatten_value;
use super::traits::{BackendAdapter, BackendKind, BackendRequest, BackendResult, FetchedSources};
use crate::types::{PropertySource, DEFAULT_APPLICATION, DEFAULT_PROFILE};

/// One stored credential
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialEntry {
    /// Full credential name, e.g. `/app/dev/master/db`
    pub name: String,
    /// Credential body; objects are flattened into dotted keys
    pub value: Value,
}

/// The opaque "find credentials by path" operation of a credential store client
#[async_trait]
pub trait CredentialStoreClient: Send + Sync {
    async fn find_by_path(&self, path: &str) -> BackendResult<Vec<CredentialEntry>>;
}

pub struct CredHubAdapter {
    client: Arc<dyn CredentialStoreClient>,
}

impl CredHubAdapter {
    pub fn new(client: Arc<dyn CredentialStoreClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for CredHubAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::CredHub
    }

    async fn fetch(&self, request: &BackendRequest, config: &BackendConfig) -> BackendResult<FetchedSources> {
        let label = request.label.as_deref().unwrap_or("master");

        // The profile-agnostic slot maps onto the "default" profile folder
        let mut profiles: Vec<&str> = Vec::new();
        for profile in &request.profiles {
            let profile = if profile.is_empty() { DEFAULT_PROFILE } else { profile.as_str() };
            if !profiles.contains(&profile) {
                profiles.push(profile);
            }
        }
        let mut applications = vec![request.application.as_str()];
        if request.application != DEFAULT_APPLICATION {
            applications.push(DEFAULT_APPLICATION);
        }

        let mut sources = Vec::new();
        for profile in &profiles {
            for application in &applications {
                let path = format!("{}/{}/{}/{}", config.prefix, application, profile, label);
                let entries = self.client.find_by_path(&path).await?;
                let mut source =
                    PropertySource::new(format!("credhub-{}-{}-{}", application, profile, label));
                for entry in entries {
                    let origin = format!("{}{}", config.origin, entry.name);
                    let mut flattened = BTreeMap::new();
                    match &entry.value {
                        Value::Object(_) => flatten_value("", &entry.value, &mut flattened),
                        other => {
                            let key = entry
                                .name
                                .rsplit('/')
                                .next()
                                .unwrap_or(entry.name.as_str())
                                .to_string();
                            flatten_value(&key, other, &mut flattened);
                        }
                    }
                    for (key, value) in flattened {
                        source.insert_with_origin(key, value, origin.clone());
                    }
                }
                if !source.is_empty() {
                    sources.push(source);
                }
            }
        }
        Ok(FetchedSources::new(sources))
    }
}
