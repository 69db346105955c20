//! Configuration schema for Cachet
//!
//! Configuration is read from `./cachet.toml` when present, otherwise
//! from `~/.config/cachet/config.toml`.

use crate::cache::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Workspace directories
    pub paths: PathsConfig,

    /// Installer invocation
    pub installer: InstallerConfig,

    /// Hashing settings
    pub hashing: HashingConfig,
}

impl Config {
    /// Resolve a configured path against the workspace base directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.base_dir.join(path)
        }
    }

    /// Asset cache directory
    pub fn asset_cache_dir(&self) -> PathBuf {
        self.resolve(&self.paths.asset_cache_dir)
    }

    /// Manifest directory
    pub fn manifest_dir(&self) -> PathBuf {
        self.resolve(&self.paths.manifest_dir)
    }

    /// Parent of the per-manifest scratch directories
    pub fn work_dir(&self) -> PathBuf {
        self.resolve(&self.paths.work_dir)
    }

    /// Shared binary cache used outside of asset downloads
    pub fn binary_cache_dir(&self) -> PathBuf {
        self.resolve(&self.paths.binary_cache_dir)
    }

    /// Installer checkout root
    pub fn installer_root(&self) -> PathBuf {
        self.resolve(&self.paths.installer_root)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Workspace directory settings
///
/// Relative paths are resolved against `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Workspace root
    pub base_dir: PathBuf,

    /// Asset blobs and metadata records
    pub asset_cache_dir: PathBuf,

    /// `<project>.json` manifests
    pub manifest_dir: PathBuf,

    /// Per-manifest scratch directories
    pub work_dir: PathBuf,

    /// Binary cache for regular (non-download) installs
    pub binary_cache_dir: PathBuf,

    /// Installer checkout
    pub installer_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            asset_cache_dir: PathBuf::from("asset_cache"),
            manifest_dir: PathBuf::from("manifests"),
            work_dir: PathBuf::from("_temp"),
            binary_cache_dir: PathBuf::from("binary_cache"),
            installer_root: PathBuf::from("vcpkg_root"),
        }
    }
}

/// Installer invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer program
    pub program: String,

    /// Installer arguments
    pub args: Vec<String>,

    /// File name the manifest is copied to before installing
    pub manifest_file_name: String,

    /// Variable that sets the installer's downloads directory
    pub downloads_env: String,

    /// Variable that sets the installer's binary cache directory
    pub binary_cache_env: String,

    /// Additional environment passed to the installer
    pub extra_env: BTreeMap<String, String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "vcpkg".to_string(),
            args: vec!["install".to_string(), "--clean-after-build".to_string()],
            manifest_file_name: "vcpkg.json".to_string(),
            downloads_env: "VCPKG_DOWNLOADS".to_string(),
            binary_cache_env: "VCPKG_DEFAULT_BINARY_CACHE".to_string(),
            extra_env: BTreeMap::from([("VCPKG_KEEP_ENV_VARS".to_string(), "PATH".to_string())]),
        }
    }
}

/// Hashing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Algorithm used to detect manifest changes
    pub manifest_algorithm: HashAlgorithm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[installer]"));
        assert!(toml.contains("manifest_algorithm = \"sha1\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.installer.program, "vcpkg");
        assert_eq!(config.hashing.manifest_algorithm, HashAlgorithm::Sha1);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [paths]
            base_dir = "/srv/deps"

            [hashing]
            manifest_algorithm = "sha256"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.asset_cache_dir(), PathBuf::from("/srv/deps/asset_cache"));
        assert_eq!(config.hashing.manifest_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.installer.manifest_file_name, "vcpkg.json"); // default preserved
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut config = Config::default();
        config.paths.manifest_dir = PathBuf::from("/abs/manifests");
        assert_eq!(config.manifest_dir(), PathBuf::from("/abs/manifests"));
        assert_eq!(config.work_dir(), PathBuf::from("./_temp"));
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let toml = r#"
            [hashing]
            manifest_algorithm = "md5"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
