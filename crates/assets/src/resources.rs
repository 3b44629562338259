//! # Resource Registry
//!
//! Backs the embedded-resources tier. Resources are addressed by their
//! extension-less stem (`ui/logo` for `ui/logo.png`), either registered
//! explicitly at start-up or discovered under an optional root directory.

use crate::path::{extension_of, strip_extension};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct Resource {
    bytes: Arc<[u8]>,
    extension: String,
}

/// A resolved embedded resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHit {
    /// Stem plus the resource's own extension
    pub resolved_name: String,
    pub bytes: Vec<u8>,
}

/// Stem-keyed map of embedded resources
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: DashMap<String, Resource>,
    root: Option<PathBuf>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also look for files under `root` whose stem matches
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { entries: DashMap::new(), root: Some(root.into()) }
    }

    /// Register `bytes` under `name`'s stem. A second registration with the
    /// same stem replaces the first.
    pub fn register(&self, name: &str, bytes: impl Into<Arc<[u8]>>) {
        let stem = strip_extension(name.trim_start_matches('/')).to_string();
        let resource = Resource { bytes: bytes.into(), extension: extension_of(name).to_string() };
        self.entries.insert(stem, resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.entries.contains_key(stem)
    }

    /// Look up a resource by stem, registered entries first
    pub async fn lookup(&self, stem: &str) -> std::io::Result<Option<ResourceHit>> {
        let stem = stem.trim_start_matches('/');
        if let Some(resource) = self.entries.get(stem) {
            return Ok(Some(ResourceHit {
                resolved_name: format!("{}{}", stem, resource.extension),
                bytes: resource.bytes.to_vec(),
            }));
        }

        let Some(root) = &self.root else {
            return Ok(None);
        };

        let Some(file) = find_by_stem(root, stem).await? else {
            debug!(stem = %stem, root = %root.display(), "no resource with matching stem");
            return Ok(None);
        };

        let bytes = tokio::fs::read(&file).await?;
        let extension = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Ok(Some(ResourceHit { resolved_name: format!("{}{}", stem, extension), bytes }))
    }
}

/// First file in `stem`'s directory whose own stem matches, in name order
async fn find_by_stem(root: &Path, stem: &str) -> std::io::Result<Option<PathBuf>> {
    let (dir, name) = match stem.rfind('/') {
        Some(i) => (root.join(&stem[..i]), &stem[i + 1..]),
        None => (root.to_path_buf(), stem),
    };

    let mut reader = match tokio::fs::read_dir(&dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut matches = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && path.file_stem().is_some_and(|s| s == name) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}
