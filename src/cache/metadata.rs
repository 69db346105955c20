//! Per-manifest asset metadata records
//!
//! Each processed manifest leaves a `_<project>.json` record in the asset
//! cache holding the manifest hash it was recorded against and the assets
//! the installer served for it (asset hash -> source URL).

use crate::error::{CachetError, CachetResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Asset hash -> source URL
pub type AssetMap = BTreeMap<String, String>;

/// Persisted metadata for one manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestMetadata {
    /// Hash of the manifest contents at the time the assets were recorded
    pub manifest_hash: String,

    /// Assets served while installing the manifest
    pub assets: AssetMap,
}

impl ManifestMetadata {
    /// Create an empty record for the given manifest hash
    pub fn new(manifest_hash: impl Into<String>) -> Self {
        Self {
            manifest_hash: manifest_hash.into(),
            assets: AssetMap::new(),
        }
    }

    /// Load a record from disk
    ///
    /// A missing file is an error unless `missing_ok` is set, in which case
    /// an empty record is returned.
    pub async fn load(path: &Path, missing_ok: bool) -> CachetResult<Self> {
        if !fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
            if missing_ok {
                debug!("Metadata file {} not found, using empty record", path.display());
                return Ok(Self::default());
            }
            return Err(CachetError::MetadataNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CachetError::io(format!("reading metadata file {}", path.display()), e))?;

        serde_json::from_str(&content).map_err(|e| CachetError::MetadataInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load several records and union their asset maps
    ///
    /// Later files win on key collision. The manifest hash of the result is
    /// left empty since it does not describe any single manifest.
    pub async fn load_many(paths: &[PathBuf], missing_ok: bool) -> CachetResult<Self> {
        let mut combined = Self::default();
        for path in paths {
            let record = Self::load(path, missing_ok).await?;
            combined.merge(record.assets);
        }
        Ok(combined)
    }

    /// Save the record as pretty-printed JSON
    ///
    /// Writes to a sibling temporary file first and renames it over the
    /// target, so an interrupted write leaves the previous record intact.
    pub async fn save(&self, path: &Path) -> CachetResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = tmp_path_for(path);

        fs::write(&tmp_path, content)
            .await
            .map_err(|e| CachetError::io(format!("writing metadata file {}", tmp_path.display()), e))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| CachetError::io(format!("replacing metadata file {}", path.display()), e))?;

        debug!("Saved {} asset(s) to {}", self.assets.len(), path.display());
        Ok(())
    }

    /// Merge asset records into this one
    ///
    /// Last write wins per asset hash. The URL for a given hash is expected
    /// to be stable, so overwriting only ever refreshes provenance.
    pub fn merge(&mut self, update: impl IntoIterator<Item = (String, String)>) {
        self.assets.extend(update);
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ManifestMetadata {
        let mut record = ManifestMetadata::new("a9993e364706816aba3e25717850c26c9cd0d89d");
        record.merge([
            ("aa".repeat(64), "https://example.com/zlib-1.3.tar.gz".to_string()),
            ("bb".repeat(64), "https://example.com/fmt-10.2.zip".to_string()),
        ]);
        record
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_foo.json");

        let record = sample();
        record.save(&path).await.unwrap();
        let loaded = ManifestMetadata::load(&path, false).await.unwrap();

        assert_eq!(loaded, record);

        // Saving what was loaded reproduces the same document
        let first = std::fs::read_to_string(&path).unwrap();
        loaded.save(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
        assert!(!dir.path().join("_foo.json.tmp").exists());
    }

    #[tokio::test]
    async fn saved_document_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_foo.json");
        sample().save(&path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["manifest_hash"].is_string());
        assert_eq!(
            value["assets"]["aa".repeat(64)],
            "https://example.com/zlib-1.3.tar.gz"
        );
    }

    #[tokio::test]
    async fn load_missing_errors_unless_allowed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_missing.json");

        let err = ManifestMetadata::load(&path, false).await.unwrap_err();
        assert!(matches!(err, CachetError::MetadataNotFound(_)));

        let record = ManifestMetadata::load(&path, true).await.unwrap();
        assert_eq!(record, ManifestMetadata::default());
    }

    #[tokio::test]
    async fn load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_bad.json");
        std::fs::write(&path, "not json").unwrap();

        let err = ManifestMetadata::load(&path, false).await.unwrap_err();
        assert!(matches!(err, CachetError::MetadataInvalid { .. }));
    }

    #[tokio::test]
    async fn load_many_unions_assets() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("_a.json");
        let second = dir.path().join("_b.json");

        let mut a = ManifestMetadata::new("1");
        a.merge([
            ("x".to_string(), "https://old".to_string()),
            ("y".to_string(), "https://y".to_string()),
        ]);
        a.save(&first).await.unwrap();

        let mut b = ManifestMetadata::new("2");
        b.merge([("x".to_string(), "https://new".to_string())]);
        b.save(&second).await.unwrap();

        let combined = ManifestMetadata::load_many(&[first, second], false)
            .await
            .unwrap();

        assert_eq!(combined.manifest_hash, "");
        assert_eq!(combined.assets.len(), 2);
        assert_eq!(combined.assets["x"], "https://new");
        assert_eq!(combined.assets["y"], "https://y");
    }

    #[tokio::test]
    async fn load_many_with_absent_file() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("_a.json");
        let absent = dir.path().join("_gone.json");
        sample().save(&present).await.unwrap();
        let paths = [present, absent.clone()];

        let combined = ManifestMetadata::load_many(&paths, true).await.unwrap();
        assert_eq!(combined.assets, sample().assets);

        let err = ManifestMetadata::load_many(&paths, false).await.unwrap_err();
        assert!(matches!(err, CachetError::MetadataNotFound(ref p) if p == &absent));
    }

    #[test]
    fn merge_last_write_wins() {
        let mut record = ManifestMetadata::new("h");
        record.merge([("k".to_string(), "u1".to_string())]);
        record.merge([("k".to_string(), "u2".to_string())]);
        assert_eq!(record.assets["k"], "u2");
        assert_eq!(record.manifest_hash, "h");
    }
}
