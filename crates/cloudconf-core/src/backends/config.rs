//! Per-backend settings and their validation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::traits::{BackendError, BackendKind, BackendResult};

/// Order given to backends and repositories that do not set one
pub const DEFAULT_ORDER: i32 = i32::MAX - 10;

/// Largest page the parameter store API accepts
pub const MAX_PARAMETER_PAGE_SIZE: u32 = 10;

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/[a-zA-Z0-9.\-_]+)*$").expect("prefix pattern is valid"));

static SEPARATOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-_]+$").expect("separator pattern is valid"));

static PARAMETER_SEPARATOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-_/]+$").expect("separator pattern is valid"));

/// Settings for one backend
///
/// Built with per-kind defaults through [`BackendConfig::for_kind`] or one of the
/// named constructors, then adjusted with the `with_*` builders. Immutable once
/// handed to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// First path level for every key, `""` or `/segment[/segment...]`
    pub prefix: String,
    /// Placed between application name and profile when composing keys
    pub profile_separator: String,
    /// Prepended to paths to build origin tags
    pub origin: String,
    /// Lower orders resolve first and win on conflicts
    pub order: i32,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    /// Label substituted when a request carries none
    pub default_label: Option<String>,
    /// Enumerate every descendant of a path (parameter store)
    pub recursive: bool,
    /// Ask the backend to return decrypted values (parameter store)
    pub decrypt_values: bool,
    /// Page size cap for hierarchical listing (parameter store)
    pub max_results: u32,
    /// Never pass the label to the backend (secrets manager)
    pub ignore_label: bool,
    /// Bucket holding configuration documents (S3)
    pub bucket: Option<String>,
    /// Use the application name as an intermediate directory (S3)
    pub use_directory_layout: bool,
    /// Repository location (git remote, native root directory)
    pub uri: Option<String>,
    /// Directories searched inside a tree; `{application}`, `{profile}` and `{label}` are expanded
    pub search_paths: Vec<String>,
}

impl BackendConfig {
    /// Settings with the defaults of a backend kind
    pub fn for_kind(kind: BackendKind) -> Self {
        let (prefix, origin, default_label) = match kind {
            BackendKind::AwsParameterStore => ("/config", "aws:ssm:parameter:", None),
            BackendKind::AwsSecretsManager => ("/secret", "aws:secrets:", None),
            BackendKind::AwsS3 => ("", "s3:", None),
            BackendKind::CredHub => ("", "credhub:", Some("master")),
            BackendKind::Git => ("", "git:", Some("main")),
            BackendKind::Native => ("", "file:", None),
        };
        Self {
            kind,
            prefix: prefix.to_string(),
            profile_separator: "-".to_string(),
            origin: origin.to_string(),
            order: DEFAULT_ORDER,
            region: None,
            endpoint: None,
            default_label: default_label.map(str::to_string),
            recursive: true,
            decrypt_values: true,
            max_results: MAX_PARAMETER_PAGE_SIZE,
            ignore_label: false,
            bucket: None,
            use_directory_layout: false,
            uri: None,
            search_paths: Vec::new(),
        }
    }

    pub fn parameter_store() -> Self {
        Self::for_kind(BackendKind::AwsParameterStore)
    }

    pub fn secrets_manager() -> Self {
        Self::for_kind(BackendKind::AwsSecretsManager)
    }

    pub fn s3(bucket: impl Into<String>) -> Self {
        let mut config = Self::for_kind(BackendKind::AwsS3);
        config.bucket = Some(bucket.into());
        config
    }

    pub fn credhub() -> Self {
        Self::for_kind(BackendKind::CredHub)
    }

    pub fn git(uri: impl Into<String>) -> Self {
        Self::for_kind(BackendKind::Git).with_uri(uri)
    }

    pub fn native(root: impl Into<String>) -> Self {
        Self::for_kind(BackendKind::Native).with_uri(root)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_profile_separator(mut self, separator: impl Into<String>) -> Self {
        self.profile_separator = separator.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_default_label(mut self, label: Option<String>) -> Self {
        self.default_label = label;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_decrypt_values(mut self, decrypt: bool) -> Self {
        self.decrypt_values = decrypt;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_ignore_label(mut self, ignore: bool) -> Self {
        self.ignore_label = ignore;
        self
    }

    pub fn with_directory_layout(mut self, enabled: bool) -> Self {
        self.use_directory_layout = enabled;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<String>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Check prefix and separator grammar and per-kind required settings
    ///
    /// Runs before any backend is contacted.
    pub fn validate(&self) -> BackendResult<()> {
        let fail = |message: String| Err(BackendError::config(self.kind, message));

        if !PREFIX_PATTERN.is_match(&self.prefix) {
            return fail(format!(
                "prefix '{}' must be empty or '/'-separated segments of [a-zA-Z0-9.-_]",
                self.prefix
            ));
        }
        if self.profile_separator.trim().is_empty() {
            return fail("profile separator must not be blank".to_string());
        }

        match self.kind {
            BackendKind::AwsParameterStore => {
                if !PARAMETER_SEPARATOR_PATTERN.is_match(&self.profile_separator)
                    || self.profile_separator.starts_with('/')
                {
                    return fail(format!(
                        "profile separator '{}' may only contain [a-zA-Z0-9.-_/] and must not start with '/'",
                        self.profile_separator
                    ));
                }
                if !(1..=MAX_PARAMETER_PAGE_SIZE).contains(&self.max_results) {
                    return fail(format!(
                        "max results {} must be between 1 and {}",
                        self.max_results, MAX_PARAMETER_PAGE_SIZE
                    ));
                }
            }
            _ if !SEPARATOR_PATTERN.is_match(&self.profile_separator) => {
                return fail(format!(
                    "profile separator '{}' may only contain [a-zA-Z0-9.-_]",
                    self.profile_separator
                ));
            }
            _ => {}
        }

        match self.kind {
            BackendKind::AwsS3 if is_blank(self.bucket.as_deref()) => {
                fail("bucket is required".to_string())
            }
            BackendKind::Native | BackendKind::Git if is_blank(self.uri.as_deref()) => {
                fail("uri is required".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Backend settings as written in a configuration file
///
/// Every field is optional; unset fields take the defaults of `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConfigFile {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    #[serde(default, alias = "path")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub profile_separator: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub default_label: Option<String>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub decrypt_values: Option<bool>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub ignore_label: Option<bool>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub use_directory_layout: Option<bool>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub search_paths: Option<Vec<String>>,
}

impl BackendConfigFile {
    /// Apply the kind defaults to every unset field
    pub fn into_config(self) -> BackendConfig {
        let defaults = BackendConfig::for_kind(self.kind);
        BackendConfig {
            kind: self.kind,
            prefix: self.prefix.unwrap_or(defaults.prefix),
            profile_separator: self.profile_separator.unwrap_or(defaults.profile_separator),
            origin: self.origin.unwrap_or(defaults.origin),
            order: self.order.unwrap_or(defaults.order),
            region: self.region,
            endpoint: self.endpoint,
            default_label: self.default_label.or(defaults.default_label),
            recursive: self.recursive.unwrap_or(defaults.recursive),
            decrypt_values: self.decrypt_values.unwrap_or(defaults.decrypt_values),
            max_results: self.max_results.unwrap_or(defaults.max_results),
            ignore_label: self.ignore_label.unwrap_or(defaults.ignore_label),
            bucket: self.bucket,
            use_directory_layout: self
                .use_directory_layout
                .unwrap_or(defaults.use_directory_layout),
            uri: self.uri,
            search_paths: self.search_paths.unwrap_or(defaults.search_paths),
        }
    }
}
