//! Cache state reconciliation
//!
//! Cross-references the asset cache directory against the manifest
//! directory and sorts every cache file into exactly one category.
//! Only metadata whose manifest hash is current is trusted to say which
//! assets are needed; assets claimed by new or outdated projects are not.
//!
//! The result is a pure function of what is on disk right now, so it can
//! be recomputed at any time.

use crate::cache::hash::HashAlgorithm;
use crate::cache::layout::{is_asset_hash, CacheLayout, FileKind};
use crate::cache::metadata::ManifestMetadata;
use crate::error::{CachetError, CachetResult};
use crate::manifest::list_manifests;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Categorized snapshot of an asset cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheState {
    /// All asset-shaped files on disk
    pub asset_files: Vec<PathBuf>,
    /// Asset files referenced by trusted metadata
    pub good_asset_files: Vec<PathBuf>,
    /// Assets referenced by trusted metadata but absent on disk
    pub missing_asset_files: Vec<PathBuf>,
    /// Asset files no trusted metadata references
    pub extra_asset_files: Vec<PathBuf>,

    /// All metadata-shaped files on disk
    pub metadata_files: Vec<PathBuf>,
    /// Metadata recorded against the manifest's current contents
    pub good_metadata_files: Vec<PathBuf>,
    /// Metadata recorded against an older version of the manifest
    pub outdated_metadata_files: Vec<PathBuf>,
    /// Metadata expected for a manifest but absent on disk
    pub missing_metadata_files: Vec<PathBuf>,
    /// Metadata whose manifest no longer exists
    pub extra_metadata_files: Vec<PathBuf>,

    /// Files that are neither assets nor metadata
    pub other_files: Vec<PathBuf>,

    /// Union of asset maps from good metadata only
    pub trusted_assets: ManifestMetadata,
}

impl CacheState {
    /// Files that must be (re)processed before anything may be deleted
    pub fn files_to_process(&self) -> Vec<&PathBuf> {
        self.missing_asset_files
            .iter()
            .chain(&self.missing_metadata_files)
            .chain(&self.outdated_metadata_files)
            .collect()
    }

    /// Files that no current manifest needs
    pub fn files_to_delete(&self) -> Vec<&PathBuf> {
        self.extra_asset_files
            .iter()
            .chain(&self.extra_metadata_files)
            .chain(&self.other_files)
            .collect()
    }

    /// Whether every project's install state is confirmed
    pub fn is_resolved(&self) -> bool {
        self.missing_asset_files.is_empty()
            && self.missing_metadata_files.is_empty()
            && self.outdated_metadata_files.is_empty()
    }

    /// Source URL recorded for an asset by trusted metadata
    pub fn asset_url(&self, hash: &str) -> Option<&str> {
        self.trusted_assets.assets.get(hash).map(String::as_str)
    }
}

/// Classify every file in the asset cache against the current manifests
///
/// Fails without touching anything if either directory is absent.
pub async fn reconcile(
    cache: &CacheLayout,
    manifest_dir: &Path,
    algorithm: HashAlgorithm,
) -> CachetResult<CacheState> {
    if !fs::metadata(cache.root()).await.is_ok_and(|m| m.is_dir()) {
        return Err(CachetError::CacheDirNotFound(cache.root().to_path_buf()));
    }
    if !fs::metadata(manifest_dir).await.is_ok_and(|m| m.is_dir()) {
        return Err(CachetError::ManifestDirNotFound(manifest_dir.to_path_buf()));
    }

    let mut state = CacheState::default();
    for path in cache.list_files().await? {
        match FileKind::of_path(&path) {
            FileKind::Asset => state.asset_files.push(path),
            FileKind::Metadata { .. } => state.metadata_files.push(path),
            FileKind::Other => state.other_files.push(path),
        }
    }

    categorize_metadata(&mut state, cache, manifest_dir, algorithm).await?;

    state.trusted_assets = ManifestMetadata::load_many(&state.good_metadata_files, false).await?;
    categorize_assets(&mut state, cache);

    debug!(
        "Reconciled cache: {} good / {} extra asset(s), {} good / {} outdated / {} new / {} extra project(s), {} other file(s)",
        state.good_asset_files.len(),
        state.extra_asset_files.len(),
        state.good_metadata_files.len(),
        state.outdated_metadata_files.len(),
        state.missing_metadata_files.len(),
        state.extra_metadata_files.len(),
        state.other_files.len(),
    );

    Ok(state)
}

async fn categorize_metadata(
    state: &mut CacheState,
    cache: &CacheLayout,
    manifest_dir: &Path,
    algorithm: HashAlgorithm,
) -> CachetResult<()> {
    let mut unclaimed: BTreeSet<PathBuf> = state.metadata_files.iter().cloned().collect();

    for manifest in list_manifests(manifest_dir).await? {
        let metadata_file = cache.metadata_path(&manifest.project);

        if !unclaimed.remove(&metadata_file) {
            debug!("No metadata for project {}", manifest.project);
            state.missing_metadata_files.push(metadata_file);
            continue;
        }

        let current_hash = manifest.hash(algorithm)?;
        let recorded = ManifestMetadata::load(&metadata_file, false).await?;

        if recorded.manifest_hash == current_hash {
            state.good_metadata_files.push(metadata_file);
        } else {
            debug!(
                "Project {} changed since it was recorded ({} != {})",
                manifest.project, recorded.manifest_hash, current_hash
            );
            state.outdated_metadata_files.push(metadata_file);
        }
    }

    state.extra_metadata_files = unclaimed.into_iter().collect();
    Ok(())
}

fn categorize_assets(state: &mut CacheState, cache: &CacheLayout) {
    let mut unclaimed: BTreeSet<PathBuf> = state.asset_files.iter().cloned().collect();

    for hash in state.trusted_assets.assets.keys() {
        if !is_asset_hash(hash) {
            warn!("Ignoring malformed asset hash in metadata: {}", hash);
            continue;
        }

        let asset_file = cache.asset_path(hash);
        if unclaimed.remove(&asset_file) {
            state.good_asset_files.push(asset_file);
        } else {
            state.missing_asset_files.push(asset_file);
        }
    }

    state.extra_asset_files = unclaimed.into_iter().collect();
}
