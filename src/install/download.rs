//! Per-manifest asset download
//!
//! Each manifest is installed in its own scratch directory with the
//! installer's download and binary-cache locations redirected there, so
//! every asset the manifest needs has to come through the shared asset
//! cache. The installer's output tells us which assets it used; those are
//! recorded in the manifest's metadata file.
//!
//! ```text
//! Preparing -> Running -> Success
//!                 |  \--> Failed
//!                 v
//!           MissingAsset --(retry)--> Running
//! ```

use crate::cache::hash::HashAlgorithm;
use crate::cache::layout::CacheLayout;
use crate::cache::metadata::ManifestMetadata;
use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use crate::install::capture::{AssetCapture, AssetRecord};
use crate::install::runner::{InstallRequest, InstallRunner};
use crate::manifest::Manifest;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Name of the raw installer output file in the work directory
pub const LOG_FILE_NAME: &str = "install.log";

/// Everything needed to run downloads, independent of any one manifest
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Shared asset cache
    pub cache: CacheLayout,
    /// Parent of the per-manifest scratch directories
    pub work_root: PathBuf,
    /// Installer program
    pub program: String,
    /// Installer arguments
    pub args: Vec<String>,
    /// File name the manifest is copied to inside the scratch directory
    pub manifest_file_name: String,
    /// Variable pointing the installer at its downloads directory
    pub downloads_env: String,
    /// Variable pointing the installer at its binary cache directory
    pub binary_cache_env: String,
    /// Additional installer environment
    pub extra_env: BTreeMap<String, String>,
    /// Algorithm used to fingerprint manifests
    pub algorithm: HashAlgorithm,
}

impl DownloadSettings {
    /// Build settings from the loaded configuration
    ///
    /// Directory paths are made absolute since the installer runs with the
    /// manifest's scratch directory as its working directory.
    pub fn from_config(config: &Config) -> CachetResult<Self> {
        let installer = &config.installer;
        Ok(Self {
            cache: CacheLayout::new(absolute(&config.asset_cache_dir())?),
            work_root: absolute(&config.work_dir())?,
            program: installer.program.clone(),
            args: installer.args.clone(),
            manifest_file_name: installer.manifest_file_name.clone(),
            downloads_env: installer.downloads_env.clone(),
            binary_cache_env: installer.binary_cache_env.clone(),
            extra_env: installer.extra_env.clone(),
            algorithm: config.hashing.manifest_algorithm,
        })
    }
}

fn absolute(path: &Path) -> CachetResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| CachetError::io(format!("resolving {}", path.display()), e))
}

/// Where a download currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    /// Scratch directory not set up yet
    Preparing,
    /// Prepared; the installer may be run
    Running,
    /// Installer finished cleanly
    Success,
    /// Installer stopped on an asset it could not obtain
    MissingAsset,
    /// Installer failed for some other reason
    Failed,
}

impl DownloadPhase {
    /// Whether the installer may be (re)started from this phase
    pub fn can_run(&self) -> bool {
        matches!(self, Self::Running | Self::MissingAsset)
    }
}

impl fmt::Display for DownloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::MissingAsset => write!(f, "missing-asset"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Installer exited with code 0
    Success {
        /// Installer run time
        elapsed: Duration,
        /// Assets recorded for the manifest so far
        assets: usize,
    },
    /// Installer failed on an asset missing from the cache
    MissingAsset {
        /// The asset that could not be obtained
        asset: AssetRecord,
        /// Installer run time
        elapsed: Duration,
    },
    /// Installer failed without naming an asset
    Failed {
        /// Installer exit code
        exit_code: i32,
        /// Raw installer output
        log: PathBuf,
        /// Installer run time
        elapsed: Duration,
    },
}

impl DownloadOutcome {
    /// Phase the downloader is left in
    pub fn phase(&self) -> DownloadPhase {
        match self {
            Self::Success { .. } => DownloadPhase::Success,
            Self::MissingAsset { .. } => DownloadPhase::MissingAsset,
            Self::Failed { .. } => DownloadPhase::Failed,
        }
    }

    /// Installer run time
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. }
            | Self::MissingAsset { elapsed, .. }
            | Self::Failed { elapsed, .. } => *elapsed,
        }
    }

    /// The error matching a non-success outcome
    pub fn error(&self, project: &str) -> Option<CachetError> {
        match self {
            Self::Success { .. } => None,
            Self::MissingAsset { asset, .. } => Some(CachetError::MissingAsset {
                project: project.to_string(),
                hash: asset.hash.clone(),
                url: asset.url.clone(),
            }),
            Self::Failed { log, .. } => Some(CachetError::AssetDownload {
                project: project.to_string(),
                log: log.clone(),
            }),
        }
    }
}

/// Decides whether to rerun the installer after a missing asset
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    /// Return true to run the installer again
    async fn should_retry(&self, project: &str, asset: &AssetRecord) -> CachetResult<bool>;
}

/// Never retries; every missing asset aborts the manifest
#[derive(Debug, Default)]
pub struct NeverRetry;

#[async_trait]
impl RetryPolicy for NeverRetry {
    async fn should_retry(&self, _project: &str, _asset: &AssetRecord) -> CachetResult<bool> {
        Ok(false)
    }
}

/// Hooks for reporting download progress
pub trait DownloadObserver: Send + Sync {
    /// An installer run is starting
    fn on_run_start(&self, _project: &str, _attempt: u32) {}
    /// The installer printed a line
    fn on_line(&self, _line: &str) {}
    /// An installer run finished
    fn on_run_end(&self, _project: &str, _outcome: &DownloadOutcome) {}
}

/// Observer that reports nothing
#[derive(Debug, Default)]
pub struct SilentObserver;

impl DownloadObserver for SilentObserver {}

/// Drives one manifest through prepare and installer runs
pub struct AssetDownloader<'a> {
    manifest: Manifest,
    settings: &'a DownloadSettings,
    runner: &'a dyn InstallRunner,
    work_dir: PathBuf,
    metadata_file: PathBuf,
    metadata: ManifestMetadata,
    phase: DownloadPhase,
}

impl<'a> AssetDownloader<'a> {
    /// Create a downloader for a manifest
    pub fn new(
        manifest: Manifest,
        settings: &'a DownloadSettings,
        runner: &'a dyn InstallRunner,
    ) -> Self {
        let work_dir = settings.work_root.join(&manifest.project);
        let metadata_file = settings.cache.metadata_path(&manifest.project);
        Self {
            manifest,
            settings,
            runner,
            work_dir,
            metadata_file,
            metadata: ManifestMetadata::default(),
            phase: DownloadPhase::Preparing,
        }
    }

    /// Project being downloaded
    pub fn project(&self) -> &str {
        &self.manifest.project
    }

    /// Current phase
    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    /// Metadata accumulated so far
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Scratch directory for this manifest
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Raw installer output of the latest run
    pub fn log_file(&self) -> PathBuf {
        self.work_dir.join(LOG_FILE_NAME)
    }

    fn downloads_dir(&self) -> PathBuf {
        self.work_dir.join("downloads")
    }

    fn binary_cache_dir(&self) -> PathBuf {
        self.work_dir.join("binary_cache")
    }

    /// Reset the scratch directory and metadata for a fresh install
    ///
    /// Removes any previous scratch directory and metadata file, recreates
    /// the directory layout, copies the manifest in and fingerprints it.
    pub async fn prepare(&mut self) -> CachetResult<()> {
        self.phase = DownloadPhase::Preparing;

        match fs::remove_dir_all(&self.work_dir).await {
            Ok(()) => debug!("Removed previous work dir {}", self.work_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CachetError::io(
                    format!("removing work dir {}", self.work_dir.display()),
                    e,
                ))
            }
        }
        match fs::remove_file(&self.metadata_file).await {
            Ok(()) => debug!("Removed stale metadata {}", self.metadata_file.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CachetError::io(
                    format!("removing metadata file {}", self.metadata_file.display()),
                    e,
                ))
            }
        }

        for dir in [
            self.settings.cache.root().to_path_buf(),
            self.work_dir.clone(),
            self.downloads_dir(),
            self.binary_cache_dir(),
        ] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| CachetError::io(format!("creating directory {}", dir.display()), e))?;
        }

        let target = self.work_dir.join(&self.settings.manifest_file_name);
        fs::copy(&self.manifest.path, &target).await.map_err(|e| {
            CachetError::io(
                format!("copying {} to {}", self.manifest.path.display(), target.display()),
                e,
            )
        })?;

        self.metadata = ManifestMetadata::new(self.manifest.hash(self.settings.algorithm)?);
        self.phase = DownloadPhase::Running;
        debug!("Prepared {} in {}", self.project(), self.work_dir.display());
        Ok(())
    }

    /// Build the installer invocation for this manifest
    pub fn request(&self) -> InstallRequest {
        let mut env = self.settings.extra_env.clone();
        env.insert(
            self.settings.downloads_env.clone(),
            self.downloads_dir().display().to_string(),
        );
        env.insert(
            self.settings.binary_cache_env.clone(),
            self.binary_cache_dir().display().to_string(),
        );

        InstallRequest {
            program: self.settings.program.clone(),
            args: self.settings.args.clone(),
            working_dir: self.work_dir.clone(),
            env,
        }
    }

    /// Run the installer once and record what it served
    ///
    /// The raw output is always written to the log file, and assets served
    /// before a failure are still merged and saved. Only a successful run
    /// stamps the record with the manifest hash; otherwise the record is
    /// left unstamped so the project stays outdated and blocks pruning.
    pub async fn run(&mut self, on_line: &(dyn Fn(&str) + Send + Sync)) -> CachetResult<DownloadOutcome> {
        if !self.phase.can_run() {
            return Err(CachetError::Internal(format!(
                "cannot run installer for {} while {}",
                self.project(),
                self.phase
            )));
        }
        self.phase = DownloadPhase::Running;

        let result = self.runner.run(&self.request(), on_line).await?;

        let log_file = self.log_file();
        fs::write(&log_file, &result.output)
            .await
            .map_err(|e| CachetError::io(format!("writing install log {}", log_file.display()), e))?;

        let capture = AssetCapture::parse(&result.output);
        debug!("{} served {} asset(s)", self.project(), capture.served.len());
        self.metadata.merge(capture.served);
        if result.success() {
            self.metadata.save(&self.metadata_file).await?;
        } else {
            ManifestMetadata {
                manifest_hash: String::new(),
                assets: self.metadata.assets.clone(),
            }
            .save(&self.metadata_file)
            .await?;
        }

        let outcome = if result.success() {
            info!(
                "Downloaded assets for {} ({} recorded)",
                self.project(),
                self.metadata.assets.len()
            );
            DownloadOutcome::Success {
                elapsed: result.elapsed,
                assets: self.metadata.assets.len(),
            }
        } else if let Some(asset) = capture.missing {
            warn!("{}: missing asset {} ({})", self.project(), asset.hash, asset.url);
            DownloadOutcome::MissingAsset {
                asset,
                elapsed: result.elapsed,
            }
        } else {
            warn!(
                "{}: installer exited with {} (see {})",
                self.project(),
                result.exit_code,
                log_file.display()
            );
            DownloadOutcome::Failed {
                exit_code: result.exit_code,
                log: log_file,
                elapsed: result.elapsed,
            }
        };

        self.phase = outcome.phase();
        Ok(outcome)
    }
}

/// Prepare a manifest and run the installer until it succeeds, fails, or
/// the retry policy gives up on a missing asset
///
/// Retries reuse the scratch directory so partial binary-cache state
/// carries over.
pub async fn download_manifest(
    manifest: Manifest,
    settings: &DownloadSettings,
    runner: &dyn InstallRunner,
    retry: &dyn RetryPolicy,
    observer: &dyn DownloadObserver,
) -> CachetResult<DownloadOutcome> {
    let mut downloader = AssetDownloader::new(manifest, settings, runner);
    downloader.prepare().await?;

    let on_line = |line: &str| observer.on_line(line);
    let mut attempt = 1;
    loop {
        observer.on_run_start(downloader.project(), attempt);
        let outcome = downloader.run(&on_line).await?;
        observer.on_run_end(downloader.project(), &outcome);

        let retry_asset = match &outcome {
            DownloadOutcome::MissingAsset { asset, .. } => Some(asset.clone()),
            _ => None,
        };
        match retry_asset {
            Some(asset) if retry.should_retry(downloader.project(), &asset).await? => {
                attempt += 1;
            }
            _ => return Ok(outcome),
        }
    }
}

/// Per-project results of a batch download
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Project name and its final result, in processing order
    pub results: Vec<(String, CachetResult<DownloadOutcome>)>,
}

impl BatchSummary {
    /// Projects that did not finish successfully
    pub fn failed_projects(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, result)| !matches!(result, Ok(DownloadOutcome::Success { .. })))
            .map(|(project, _)| project.as_str())
            .collect()
    }

    /// Fail if any project did not finish successfully
    pub fn into_result(self) -> CachetResult<()> {
        let failed = self.failed_projects().len();
        if failed == 0 {
            Ok(())
        } else {
            Err(CachetError::BatchIncomplete {
                failed,
                total: self.results.len(),
            })
        }
    }
}

/// Download every manifest in turn
///
/// A manifest that fails does not stop the ones after it.
pub async fn download_batch(
    manifests: &[Manifest],
    settings: &DownloadSettings,
    runner: &dyn InstallRunner,
    retry: &dyn RetryPolicy,
    observer: &dyn DownloadObserver,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for manifest in manifests {
        let project = manifest.project.clone();
        let result = download_manifest(manifest.clone(), settings, runner, retry, observer).await;
        if let Err(ref e) = result {
            warn!("Download for {} did not complete: {}", project, e);
        }
        summary.results.push((project, result));
    }
    summary
}

/// Format a duration as `1h 02m 03s`, `2m 05s` or `4.2s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
