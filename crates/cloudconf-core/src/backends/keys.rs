//! Path-based key composition shared by the key/value backends

use super::config::BackendConfig;
use super::traits::BackendRequest;

/// Compose the backend paths for a request, most specific first
///
/// For each profile in request order this yields
/// `prefix + "/" + application + separator + profile`; the trailing empty profile
/// yields `prefix + "/" + application`. A non-empty prefix is finally added on its
/// own as the global variant. Duplicates keep their first position.
pub fn compose_paths(request: &BackendRequest, config: &BackendConfig) -> Vec<String> {
    let mut paths: Vec<String> = Vec::with_capacity(request.profiles.len() + 1);
    let mut push = |path: String| {
        if !paths.contains(&path) {
            paths.push(path);
        }
    };

    for profile in &request.profiles {
        push(application_path(&config.prefix, &request.application, &config.profile_separator, profile));
    }
    if !config.prefix.is_empty() {
        push(config.prefix.clone());
    }
    paths
}

/// `prefix/application[separator profile]`
pub fn application_path(prefix: &str, application: &str, separator: &str, profile: &str) -> String {
    if profile.is_empty() {
        format!("{}/{}", prefix, application)
    } else {
        format!("{}/{}{}{}", prefix, application, separator, profile)
    }
}

/// `application[separator profile]`, the file or document stem used by tree and object backends
pub fn document_stem(application: &str, separator: &str, profile: &str) -> String {
    if profile.is_empty() {
        application.to_string()
    } else {
        format!("{}{}{}", application, separator, profile)
    }
}

/// Origin tag for a path
pub fn origin_for(config: &BackendConfig, path: &str) -> String {
    format!("{}{}", config.origin, path)
}

/// Turn a full parameter name into a property key relative to the queried path
///
/// `/config/app-dev/db/url` under `/config/app-dev` becomes `db.url`.
pub fn relative_key(name: &str, path: &str) -> String {
    let relative = name
        .strip_prefix(path)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or_else(|| name.trim_start_matches('/'));
    relative.replace('/', ".")
}
