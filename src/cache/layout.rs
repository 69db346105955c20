//! Asset cache directory layout
//!
//! The cache is a flat directory. Files named by a 128-character lowercase
//! hex digest are asset blobs, `_<project>.json` files are per-manifest
//! metadata records, and anything else is an unrecognized file.

use crate::error::{CachetError, CachetResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

/// Number of hash characters shown when an asset is listed
pub const SHORT_HASH_LEN: usize = 15;

static ASSET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{128}$").expect("asset name pattern is valid")
});

static METADATA_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^_(.+)\.json$").expect("metadata name pattern is valid")
});

/// Shape of a file name found in the cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Asset blob addressed by its hash
    Asset,
    /// Metadata record for the named project
    Metadata { project: String },
    /// Anything else
    Other,
}

impl FileKind {
    /// Classify a bare file name
    pub fn of_name(name: &str) -> Self {
        if ASSET_NAME.is_match(name) {
            return Self::Asset;
        }
        match METADATA_NAME.captures(name) {
            Some(caps) => Self::Metadata {
                project: caps[1].to_string(),
            },
            None => Self::Other,
        }
    }

    /// Classify a path by its file name
    pub fn of_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(Self::Other, Self::of_name)
    }
}

/// Check whether a string is shaped like an asset hash
pub fn is_asset_hash(name: &str) -> bool {
    ASSET_NAME.is_match(name)
}

/// Abbreviate an asset hash for display
pub fn short_hash(hash: &str) -> String {
    match hash.get(..SHORT_HASH_LEN) {
        Some(prefix) if hash.len() > SHORT_HASH_LEN => format!("{}...", prefix),
        _ => hash.to_string(),
    }
}

/// Paths inside an asset cache directory
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Create a layout rooted at the given cache directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata record for a project
    pub fn metadata_path(&self, project: &str) -> PathBuf {
        self.root.join(format!("_{}.json", project))
    }

    /// Path of an asset blob
    pub fn asset_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    /// List regular files directly inside the cache directory, sorted by name
    pub async fn list_files(&self) -> CachetResult<Vec<PathBuf>> {
        if !fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir()) {
            return Err(CachetError::CacheDirNotFound(self.root.clone()));
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            CachetError::io(format!("reading cache directory {}", self.root.display()), e)
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CachetError::io("reading cache directory entry", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CachetError::io("reading cache entry type", e))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }
}
