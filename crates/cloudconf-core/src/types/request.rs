//! Application request type

/// Application name used when a request does not carry one
pub const DEFAULT_APPLICATION: &str = "application";

/// Profile used when a request does not name any
pub const DEFAULT_PROFILE: &str = "default";

/// A lookup key for one resolution call: application, profiles and label
///
/// Profiles are kept in request order, trimmed and deduplicated, and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRequest {
    /// Application name
    pub name: String,
    /// Active profiles, most specific first
    pub profiles: Vec<String>,
    /// Branch, tag or version selector
    pub label: Option<String>,
}

impl ApplicationRequest {
    /// Create a request for an application with the default profile and no label
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_APPLICATION.to_string()
        } else {
            name.trim().to_string()
        };
        Self {
            name,
            profiles: vec![DEFAULT_PROFILE.to_string()],
            label: None,
        }
    }

    /// Build a request from the wire form: a comma-separated profile list and an optional label
    pub fn parse(name: &str, profiles: &str, label: Option<&str>) -> Self {
        let mut request = Self::new(name).with_profiles(split_profiles(profiles));
        if let Some(label) = label {
            request = request.with_label(label);
        }
        request
    }

    /// Replace the profile list
    ///
    /// Blank entries are dropped and duplicates keep their first position. An empty
    /// result falls back to the default profile.
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for profile in profiles {
            let profile = profile.as_ref().trim();
            if profile.is_empty() || normalized.iter().any(|p| p == profile) {
                continue;
            }
            normalized.push(profile.to_string());
        }
        if normalized.is_empty() {
            normalized.push(DEFAULT_PROFILE.to_string());
        }
        self.profiles = normalized;
        self
    }

    /// Set the label; a blank label clears it
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = if label.trim().is_empty() {
            None
        } else {
            Some(label.trim().to_string())
        };
        self
    }

    /// Profiles joined with commas, as sent on the wire
    pub fn profile_string(&self) -> String {
        self.profiles.join(",")
    }
}

fn split_profiles(profiles: &str) -> Vec<&str> {
    profiles.split(',').collect()
}
