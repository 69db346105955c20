//! Error types for Cachet
//!
//! All modules use `CachetResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Cachet operations
pub type CachetResult<T> = Result<T, CachetError>;

/// All errors that can occur in Cachet
#[derive(Error, Debug)]
pub enum CachetError {
    // Workspace errors
    #[error("Asset cache directory not found: {0}")]
    CacheDirNotFound(PathBuf),

    #[error("Manifest directory not found: {0}")]
    ManifestDirNotFound(PathBuf),

    #[error("No manifest files found in {0}")]
    NoManifests(PathBuf),

    #[error("Unknown project(s): {}", .0.join(", "))]
    UnknownProjects(Vec<String>),

    #[error("Installer root not found: {0}")]
    InstallerRootNotFound(PathBuf),

    #[error("No VCPKG_TOOL_RELEASE_TAG in {0}")]
    ToolTagNotFound(PathBuf),

    // Metadata errors
    #[error("Asset metadata file not found: {0}")]
    MetadataNotFound(PathBuf),

    #[error("Invalid asset metadata file {path}: {reason}")]
    MetadataInvalid { path: PathBuf, reason: String },

    // Download errors
    #[error("Asset download failed for {project} (see log: {})", log.display())]
    AssetDownload { project: String, log: PathBuf },

    #[error("Cannot download asset for {project}:\n  hash: {hash}\n  url: {url}")]
    MissingAsset {
        project: String,
        hash: String,
        url: String,
    },

    #[error("{failed} of {total} manifest(s) did not finish successfully")]
    BatchIncomplete { failed: usize, total: usize },

    // Pruning errors
    #[error(
        "Refusing to delete: there are files to process \
         ({missing_assets} missing asset(s), {new_projects} new project(s), \
         {outdated_projects} outdated project(s))"
    )]
    UnsafePrune {
        missing_assets: usize,
        new_projects: usize,
        outdated_projects: usize,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CachetError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheDirNotFound(_) | Self::ManifestDirNotFound(_) => Some("Run: cachet init"),
            Self::InstallerRootNotFound(_) => {
                Some("Clone vcpkg there or set paths.installer_root")
            }
            Self::NoManifests(_) => Some("Add <project>.json manifests to the manifest directory"),
            Self::UnsafePrune { .. } => {
                Some("Run: cachet download (then cachet state) before cleaning up")
            }
            Self::MissingAsset { .. } => {
                Some("Make the asset available at its source, then retry the download")
            }
            Self::AssetDownload { .. } => Some("Inspect the install log for the failure cause"),
            _ => None,
        }
    }
}
