//! Installer integration
//!
//! Runs the external installer once per manifest with its download and
//! binary-cache locations isolated, then scrapes its output to learn which
//! assets the manifest depends on.

pub mod capture;
pub mod download;
pub mod runner;

pub use capture::{parse_missing_asset, parse_served_assets, AssetCapture, AssetRecord};
pub use download::{
    download_batch, download_manifest, format_elapsed, AssetDownloader, BatchSummary,
    DownloadObserver, DownloadOutcome, DownloadPhase, DownloadSettings, NeverRetry, RetryPolicy,
    SilentObserver,
};
pub use runner::{InstallOutput, InstallRequest, InstallRunner, ProcessRunner};
