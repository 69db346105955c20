//! Manifest discovery
//!
//! A manifest is an opaque `<project>.json` file in the manifest directory.
//! Its contents are only ever hashed, never parsed.

use crate::cache::hash::{hash_file, HashAlgorithm};
use crate::error::{CachetError, CachetResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A dependency manifest on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Project name (the file stem)
    pub project: String,
    /// Path to the manifest file
    pub path: PathBuf,
}

impl Manifest {
    /// Build a manifest from its path, if the path has a usable stem
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let project = path.file_stem()?.to_str()?.to_string();
        Some(Self { project, path })
    }

    /// Hash the manifest's current contents
    pub fn hash(&self, algorithm: HashAlgorithm) -> CachetResult<String> {
        hash_file(&self.path, algorithm)
    }
}

/// List all `*.json` manifests directly inside `dir`, sorted by project name
pub async fn list_manifests(dir: &Path) -> CachetResult<Vec<Manifest>> {
    if !fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return Err(CachetError::ManifestDirNotFound(dir.to_path_buf()));
    }

    let mut manifests = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CachetError::io(format!("reading manifest directory {}", dir.display()), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CachetError::io("reading manifest directory entry", e))?
    {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| CachetError::io("reading manifest entry type", e))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Some(manifest) = Manifest::from_path(path) {
            manifests.push(manifest);
        }
    }

    manifests.sort_by(|a, b| a.project.cmp(&b.project));
    debug!("Found {} manifest(s) in {}", manifests.len(), dir.display());
    Ok(manifests)
}

/// Pick manifests by project name, preserving the requested order
///
/// Fails naming every requested project that has no manifest.
pub fn select_manifests(manifests: &[Manifest], projects: &[String]) -> CachetResult<Vec<Manifest>> {
    let mut selected = Vec::new();
    let mut unknown = Vec::new();

    for project in projects {
        match manifests.iter().find(|m| &m.project == project) {
            Some(manifest) => {
                if !selected.contains(manifest) {
                    selected.push(manifest.clone());
                }
            }
            None => unknown.push(project.clone()),
        }
    }

    if !unknown.is_empty() {
        return Err(CachetError::UnknownProjects(unknown));
    }
    Ok(selected)
}
