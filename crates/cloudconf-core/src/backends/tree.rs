//! Versioned-tree backends: git repositories and local directories
//!
//! Git plumbing stays behind [`VersionedTree`]; this module only decides which
//! files of a checked-out tree feed an environment and in which order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::config::BackendConfig;
use super::document::{parse_document, DocumentFormat, CIPHER_PREFIX};
use super::keys::document_stem;
use super::traits::{
    BackendAdapter, BackendError, BackendKind, BackendRequest, BackendResult, FetchedSources,
};
use crate::types::{PropertySource, DEFAULT_APPLICATION};

/// The files of a tree at one label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Revision the label resolved to (commit id)
    pub version: Option<String>,
    /// Relative path (always `/`-separated) to file content
    pub files: BTreeMap<String, String>,
}

impl TreeSnapshot {
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// An opaque provider of versioned file trees
#[async_trait]
pub trait VersionedTree: Send + Sync {
    /// Check out the tree at a label (branch, tag or commit)
    ///
    /// Fails with [`BackendError::NoSuchLabel`] when the label does not exist.
    async fn checkout(&self, label: Option<&str>) -> BackendResult<TreeSnapshot>;
}

/// A local directory used as an unversioned tree
///
/// A label naming an existing subdirectory selects that subdirectory; any
/// other label reads the root. Labels must be relative paths made of plain
/// segments, and symbolic links are never followed, so nothing outside the
/// root is read.
pub struct FileTree {
    root: PathBuf,
}

impl FileTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a label selects inside the root, if it names a real subdirectory
    fn label_dir(&self, label: &str) -> BackendResult<Option<PathBuf>> {
        let relative = Path::new(label);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(BackendError::NoSuchLabel {
                backend: BackendKind::Native,
                label: label.to_string(),
            });
        }
        let labelled = self.root.join(relative);
        let is_dir = fs::symlink_metadata(&labelled)
            .map(|m| m.file_type().is_dir())
            .unwrap_or(false);
        Ok(is_dir.then_some(labelled))
    }

    fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<String, String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                continue;
            }
            let path = entry.path();
            if file_type.is_dir() {
                Self::collect(base, &path, files)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(base) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if DocumentFormat::from_path(&relative).is_some() {
                files.insert(relative, fs::read_to_string(&path)?);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VersionedTree for FileTree {
    async fn checkout(&self, label: Option<&str>) -> BackendResult<TreeSnapshot> {
        if !self.root.is_dir() {
            return Err(BackendError::unavailable(
                BackendKind::Native,
                format!("{} is not a directory", self.root.display()),
            ));
        }
        let base = match label.filter(|l| !l.is_empty()) {
            Some(label) => self.label_dir(label)?.unwrap_or_else(|| self.root.clone()),
            None => self.root.clone(),
        };

        let files = tokio::task::spawn_blocking(move || {
            let mut files = BTreeMap::new();
            Self::collect(&base, &base, &mut files)?;
            Ok::<_, std::io::Error>(files)
        })
        .await
        .map_err(|e| BackendError::unavailable(BackendKind::Native, e.to_string()))?
        .map_err(|e| BackendError::unavailable(BackendKind::Native, e.to_string()))?;
        Ok(TreeSnapshot { version: None, files })
    }
}

/// Adapter reading `{application}-{profile}.{ext}` documents from a versioned tree
pub struct TreeAdapter {
    kind: BackendKind,
    tree: Arc<dyn VersionedTree>,
}

impl TreeAdapter {
    pub fn git(tree: Arc<dyn VersionedTree>) -> Self {
        Self {
            kind: BackendKind::Git,
            tree,
        }
    }

    pub fn native(tree: Arc<dyn VersionedTree>) -> Self {
        Self {
            kind: BackendKind::Native,
            tree,
        }
    }

    /// Directories to search: the tree root, then each configured search path
    /// with its placeholders expanded
    fn search_dirs(request: &BackendRequest, config: &BackendConfig) -> Vec<String> {
        let mut dirs = vec![String::new()];
        let label = request.label.as_deref().unwrap_or_default();
        let profiles: Vec<&str> = request.explicit_profiles().collect();

        for pattern in &config.search_paths {
            let base = pattern
                .replace("{application}", &request.application)
                .replace("{label}", label);
            let expanded: Vec<String> = if base.contains("{profile}") {
                profiles.iter().map(|p| base.replace("{profile}", p)).collect()
            } else {
                vec![base]
            };
            for dir in expanded {
                let dir = dir.trim_matches('/').to_string();
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

#[async_trait]
impl BackendAdapter for TreeAdapter {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn fetch(&self, request: &BackendRequest, config: &BackendConfig) -> BackendResult<FetchedSources> {
        let snapshot = self.tree.checkout(request.label.as_deref()).await?;
        let location = config.uri.as_deref().unwrap_or_default().trim_end_matches('/');
        let dirs = Self::search_dirs(request, config);

        let mut applications = vec![request.application.as_str()];
        if request.application != DEFAULT_APPLICATION {
            applications.push(DEFAULT_APPLICATION);
        }

        let mut sources = Vec::new();
        for profile in &request.profiles {
            for application in &applications {
                let stem = document_stem(application, &config.profile_separator, profile);
                for dir in &dirs {
                    let found = DocumentFormat::EXTENSIONS.iter().find_map(|extension| {
                        let path = if dir.is_empty() {
                            format!("{}.{}", stem, extension)
                        } else {
                            format!("{}/{}.{}", dir, stem, extension)
                        };
                        snapshot.file(&path).map(|content| (path, content))
                    });
                    let Some((path, content)) = found else {
                        continue;
                    };

                    let name = format!("{}{}/{}", config.origin, location, path);
                    let format = DocumentFormat::from_path(&path)
                        .ok_or_else(|| BackendError::invalid_document(&name, "unknown format"))?;
                    let properties = parse_document(format, content)
                        .map_err(|message| BackendError::invalid_document(&name, message))?;

                    let origin = name.clone();
                    let mut source = PropertySource::new(name).with_origin(origin.clone());
                    for (key, value) in properties {
                        if value.starts_with(CIPHER_PREFIX) {
                            source.mark_encrypted(key.clone());
                        }
                        source.insert_with_origin(key, value, origin.clone());
                    }
                    if !source.is_empty() {
                        sources.push(source);
                    }
                }
            }
        }
        Ok(FetchedSources::new(sources).with_version(snapshot.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryTree;
    use crate::types::ApplicationRequest;

    fn tree() -> MemoryTree {
        let tree = MemoryTree::new();
        tree.add_file("main", "app-dev.yml", "db:\n  url: jdbc:dev\n");
        tree.add_file("main", "app.properties", "db.url=jdbc:default\n");
        tree.add_file("main", "application.yml", "shared: true\n");
        tree.add_file("main", "config/app/app-dev.properties", "nested=yes\n");
        tree.set_version("main", "c0ffee");
        tree.add_file("release", "app.yml", "db:\n  url: jdbc:release\n");
        tree
    }

    #[tokio::test]
    async fn test_git_files_most_specific_first() {
        let adapter = TreeAdapter::git(Arc::new(tree()));
        let config = BackendConfig::git("https://example.com/config.git");
        let request = BackendRequest::new(&ApplicationRequest::parse("app", "dev", None), config.default_label.as_deref());
        let fetched = adapter.fetch(&request, &config).await.unwrap();

        let names: Vec<_> = fetched.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "git:https://example.com/config.git/app-dev.yml",
                "git:https://example.com/config.git/app.properties",
                "git:https://example.com/config.git/application.yml",
            ]
        );
        assert_eq!(fetched.version.as_deref(), Some("c0ffee"));
    }

    #[tokio::test]
    async fn test_search_paths_expand_placeholders() {
        let adapter = TreeAdapter::git(Arc::new(tree()));
        let config = BackendConfig::git("repo").with_search_paths(vec!["config/{application}".to_string()]);
        let request = BackendRequest::new(&ApplicationRequest::parse("app", "dev", None), Some("main"));
        let fetched = adapter.fetch(&request, &config).await.unwrap();
        assert_eq!(fetched.sources[1].name, "git:repo/config/app/app-dev.properties");
        assert_eq!(fetched.sources[1].get("nested"), Some("yes"));
    }

    #[tokio::test]
    async fn test_label_selects_branch() {
        let adapter = TreeAdapter::git(Arc::new(tree()));
        let config = BackendConfig::git("repo");
        let request = BackendRequest::new(&ApplicationRequest::parse("app", "", Some("release")), Some("main"));
        let fetched = adapter.fetch(&request, &config).await.unwrap();
        assert_eq!(fetched.sources.len(), 1);
        assert_eq!(fetched.sources[0].get("db.url"), Some("jdbc:release"));

        let missing = BackendRequest::new(&ApplicationRequest::parse("app", "", Some("nope")), None);
        let err = adapter.fetch(&missing, &config).await.unwrap_err();
        assert!(matches!(err, BackendError::NoSuchLabel { ref label, .. } if label == "nope"));
    }

    #[tokio::test]
    async fn test_native_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-dev.properties"), "a=dev\n").unwrap();
        fs::write(dir.path().join("app.yml"), "a: default\nb: 2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("v2")).unwrap();
        fs::write(dir.path().join("v2").join("app.yml"), "a: v2\n").unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let adapter = TreeAdapter::native(Arc::new(FileTree::new(&root)));
        let config = BackendConfig::native(&root);

        let request = BackendRequest::new(&ApplicationRequest::parse("app", "dev", None), None);
        let fetched = adapter.fetch(&request, &config).await.unwrap();
        assert_eq!(fetched.sources.len(), 2);
        assert_eq!(fetched.sources[0].get("a"), Some("dev"));
        assert_eq!(fetched.sources[1].get("b"), Some("2"));
        assert!(fetched.sources[0].name.starts_with("file:"));

        let labelled = BackendRequest::new(&ApplicationRequest::parse("app", "", Some("v2")), None);
        let fetched = adapter.fetch(&labelled, &config).await.unwrap();
        assert_eq!(fetched.sources[0].get("a"), Some("v2"));
    }

    #[tokio::test]
    async fn test_label_cannot_leave_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let outside = dir.path().join("secret");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        fs::write(root.join("app.yml"), "password: none\n").unwrap();
        fs::write(outside.join("app.yml"), "password: hunter2\n").unwrap();

        let root = root.to_string_lossy().into_owned();
        let adapter = TreeAdapter::native(Arc::new(FileTree::new(&root)));
        let config = BackendConfig::native(&root);

        let absolute = outside.to_string_lossy().into_owned();
        for label in ["../secret", "v1/../../secret", absolute.as_str()] {
            let request = BackendRequest::new(&ApplicationRequest::parse("app", "", Some(label)), None);
            let err = adapter.fetch(&request, &config).await.unwrap_err();
            assert!(matches!(err, BackendError::NoSuchLabel { .. }), "{label}");
            assert!(!err.is_transient());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let outside = dir.path().join("secret");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("app.yml"), "password: hunter2\n").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("linked")).unwrap();
        std::os::unix::fs::symlink(outside.join("app.yml"), root.join("app.yml")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let tree = FileTree::new(&root);
        assert!(tree.checkout(None).await.unwrap().files.is_empty());
        let snapshot = tree.checkout(Some("linked")).await.unwrap();
        assert!(snapshot.files.is_empty());
    }

    #[tokio::test]
    async fn test_document_keys_carry_origins() {
        let adapter = TreeAdapter::git(Arc::new(tree()));
        let config = BackendConfig::git("repo");
        let request = BackendRequest::new(&ApplicationRequest::parse("app", "dev", None), Some("main"));
        let fetched = adapter.fetch(&request, &config).await.unwrap();
        assert_eq!(fetched.sources[0].origins.get("db.url").map(String::as_str), Some("git:repo/app-dev.yml"));
    }

    #[tokio::test]
    async fn test_missing_native_root_is_unavailable() {
        let tree = FileTree::new("/definitely/not/here");
        let err = tree.checkout(None).await.unwrap_err();
        assert!(err.is_transient());
    }
}
