//! Environment document and property source types

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One named, ordered map of configuration keys to values with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySource {
    /// Source name, usually the backend path it was read from
    pub name: String,
    /// Key/value pairs
    #[serde(rename = "source", default, deserialize_with = "deserialize_source")]
    pub properties: BTreeMap<String, String>,
    /// Provenance tag for the whole source (e.g. `aws:ssm:parameter:/config/app`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Per-key provenance, when the backend can name the exact location of a value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub origins: BTreeMap<String, String>,
    /// Keys whose values are still encrypted and need an external decryptor
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub encrypted: BTreeSet<String>,
}

impl PropertySource {
    /// Create an empty property source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            origin: None,
            origins: BTreeMap::new(),
            encrypted: BTreeSet::new(),
        }
    }

    /// Set the source-level origin tag
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Add a property, builder style
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a property
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Insert a property together with the exact location it came from
    pub fn insert_with_origin(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        origin: impl Into<String>,
    ) {
        let key = key.into();
        self.origins.insert(key.clone(), origin.into());
        self.properties.insert(key, value.into());
    }

    /// Flag a key as holding a value that still needs decryption
    pub fn mark_encrypted(&mut self, key: impl Into<String>) {
        self.encrypted.insert(key.into());
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Where a key's value came from: its own origin if known, else the source origin
    pub fn origin_of(&self, key: &str) -> Option<&str> {
        if !self.properties.contains_key(key) {
            return None;
        }
        self.origins
            .get(key)
            .map(String::as_str)
            .or(self.origin.as_deref())
    }

    /// Whether a key was flagged as encrypted
    pub fn is_encrypted(&self, key: &str) -> bool {
        self.encrypted.contains(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// The merged, versioned configuration document for one request
///
/// `property_sources` order encodes precedence: the first source holding a key wins.
/// Sources are never merged key by key; merging happens at the list level only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub property_sources: Vec<PropertySource>,
}

impl Environment {
    /// Create an empty environment
    pub fn new(name: impl Into<String>, profiles: Vec<String>, label: Option<String>) -> Self {
        Self {
            name: name.into(),
            profiles,
            label,
            version: None,
            state: None,
            property_sources: Vec::new(),
        }
    }

    /// Set the version, builder style
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the state token, builder style
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Append a property source at the lowest precedence
    pub fn add(&mut self, source: PropertySource) {
        self.property_sources.push(source);
    }

    /// Append several property sources, keeping their order
    pub fn add_all(&mut self, sources: impl IntoIterator<Item = PropertySource>) {
        self.property_sources.extend(sources);
    }

    /// Look up a key: the first property source containing it wins
    pub fn get_property(&self, key: &str) -> Option<&str> {
        self.property_sources.iter().find_map(|s| s.get(key))
    }

    /// The property source that supplies the effective value of a key
    pub fn source_of(&self, key: &str) -> Option<&PropertySource> {
        self.property_sources
            .iter()
            .find(|s| s.properties.contains_key(key))
    }

    /// Collapse all sources into the effective key/value view
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flattened = BTreeMap::new();
        for source in &self.property_sources {
            for (key, value) in &source.properties {
                flattened
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        flattened
    }

    pub fn is_empty(&self) -> bool {
        self.property_sources.iter().all(PropertySource::is_empty)
    }
}

/// Servers may send numbers and booleans as JSON scalars; keep everything as text
fn deserialize_source<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
