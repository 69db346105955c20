//! Cache pruning
//!
//! Deletes files a reconciliation found no use for. Deletion is refused
//! while any project is new or outdated or any needed asset is missing,
//! because the "extra" categories are only meaningful once every project's
//! asset list is confirmed.

use crate::cache::reconcile::CacheState;
use crate::error::{CachetError, CachetResult};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// A file that could not be deleted
#[derive(Debug)]
pub struct PruneFailure {
    /// File that was not removed
    pub path: PathBuf,
    /// Underlying IO error
    pub error: std::io::Error,
}

/// Outcome of a prune pass
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Whether the pass only reported what it would delete
    pub dry_run: bool,
    /// Files removed (or that would be removed, in a dry run)
    pub deleted: Vec<PathBuf>,
    /// Files whose removal failed
    pub failed: Vec<PruneFailure>,
}

impl PruneReport {
    /// Whether every selected file was removed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Check that a state is safe to prune
pub fn ensure_prunable(state: &CacheState) -> CachetResult<()> {
    if state.is_resolved() {
        return Ok(());
    }
    Err(CachetError::UnsafePrune {
        missing_assets: state.missing_asset_files.len(),
        new_projects: state.missing_metadata_files.len(),
        outdated_projects: state.outdated_metadata_files.len(),
    })
}

/// Delete every extra asset, extra metadata file and unrecognized file
///
/// Nothing is deleted if the state has anything left to process. Removal
/// continues past individual failures, which are collected in the report.
pub async fn prune(state: &CacheState, dry_run: bool) -> CachetResult<PruneReport> {
    ensure_prunable(state)?;

    let mut report = PruneReport {
        dry_run,
        ..Default::default()
    };

    for path in state.files_to_delete() {
        if dry_run {
            debug!("Would delete {}", path.display());
            report.deleted.push(path.clone());
            continue;
        }

        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                report.deleted.push(path.clone());
            }
            Err(error) => {
                warn!("Failed to delete {}: {}", path.display(), error);
                report.failed.push(PruneFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    Ok(report)
}
