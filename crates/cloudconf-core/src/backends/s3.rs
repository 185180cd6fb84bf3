//! Object store backend reading configuration documents from a bucket

use std::sync::Arc;

use async_trait::async_trait;

use super::config::BackendConfig;
use super::document::{parse_document, DocumentFormat, CIPHER_PREFIX};
use super::keys::document_stem;
use super::traits::{
    BackendAdapter, BackendError, BackendKind, BackendRequest, BackendResult, FetchedSources,
};
use crate::types::{PropertySource, DEFAULT_APPLICATION};

/// An object body and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    pub content: String,
    pub version_id: Option<String>,
}

/// The opaque "get object" operation of an object store SDK
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Fetch an object; `Ok(None)` when the key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Option<S3Object>>;
}

pub struct S3Adapter {
    client: Arc<dyn ObjectStoreClient>,
}

impl S3Adapter {
    pub fn new(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self { client }
    }

    /// Object keys for one application and profile, one per supported extension
    fn object_keys(
        request: &BackendRequest,
        config: &BackendConfig,
        application: &str,
        profile: &str,
    ) -> Vec<String> {
        let mut base = String::new();
        if let Some(label) = request.label.as_deref().filter(|l| !l.is_empty()) {
            base.push_str(label);
            base.push('/');
        }
        if config.use_directory_layout {
            base.push_str(application);
            base.push('/');
        }
        base.push_str(&document_stem(application, &config.profile_separator, profile));

        DocumentFormat::EXTENSIONS
            .iter()
            .map(|extension| format!("{}.{}", base, extension))
            .collect()
    }
}

#[async_trait]
impl BackendAdapter for S3Adapter {
    fn kind(&self) -> BackendKind {
        BackendKind::AwsS3
    }

    async fn fetch(&self, request: &BackendRequest, config: &BackendConfig) -> BackendResult<FetchedSources> {
        let bucket = config
            .bucket
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| BackendError::config(BackendKind::AwsS3, "bucket is required"))?;

        let mut applications = vec![request.application.as_str()];
        if request.application != DEFAULT_APPLICATION {
            applications.push(DEFAULT_APPLICATION);
        }

        let mut sources = Vec::new();
        let mut version = None;
        for profile in &request.profiles {
            for application in &applications {
                for key in Self::object_keys(request, config, application, profile) {
                    let Some(object) = self.client.get_object(bucket, &key).await? else {
                        continue;
                    };
                    let location = format!("{}{}/{}", config.origin, bucket, key);
                    let format = DocumentFormat::from_path(&key)
                        .ok_or_else(|| BackendError::invalid_document(&location, "unknown format"))?;
                    let properties = parse_document(format, &object.content)
                        .map_err(|message| BackendError::invalid_document(&location, message))?;

                    if version.is_none() {
                        version = object.version_id.clone();
                    }
                    let mut source = PropertySource::new(location.clone()).with_origin(location.clone());
                    for (key, value) in properties {
                        if value.starts_with(CIPHER_PREFIX) {
                            source.mark_encrypted(key.clone());
                        }
                        source.insert_with_origin(key, value, location.clone());
                    }
                    if !source.is_empty() {
                        sources.push(source);
                    }
                    // first matching extension only
                    break;
                }
            }
        }
        Ok(FetchedSources::new(sources).with_version(version))
    }
}
