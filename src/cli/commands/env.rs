//! Env command - print the installer environment for this workspace

use crate::cli::args::EnvArgs;
use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use std::path::{Path, PathBuf};
use url::Url;

/// Execute the env command
///
/// Prints shell `export` lines; nothing is written to the user profile.
pub async fn execute(args: EnvArgs, config: &Config) -> CachetResult<()> {
    let root = absolute(&config.installer_root())?;
    println!("export PATH={}:\"$PATH\"", shell_quote(&root.display().to_string()));
    for (name, value) in installer_env(config, args.offline)? {
        println!("export {}={}", name, shell_quote(&value));
    }
    Ok(())
}

/// Variables that point the installer at this workspace
///
/// Online mode reads and writes the asset cache; offline mode only reads
/// it and blocks downloads from the original sources.
pub fn installer_env(config: &Config, offline: bool) -> CachetResult<Vec<(&'static str, String)>> {
    let cache = absolute(&config.asset_cache_dir())?;
    let cache_uri = Url::from_file_path(&cache)
        .map_err(|()| CachetError::User(format!("Cannot express {} as a file URI", cache.display())))?;

    let access = if offline { "read;x-block-origin" } else { "readwrite" };
    let sources = format!("clear;x-azurl,{},,{}", cache_uri, access);

    Ok(vec![
        ("VCPKG_ROOT", absolute(&config.installer_root())?.display().to_string()),
        (
            "VCPKG_DEFAULT_BINARY_CACHE",
            absolute(&config.binary_cache_dir())?.display().to_string(),
        ),
        ("VCPKG_DISABLE_METRICS", "1".to_string()),
        ("X_VCPKG_ASSET_SOURCES", sources),
    ])
}

fn absolute(path: &Path) -> CachetResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| CachetError::io(format!("resolving {}", path.display()), e))
}

/// Single-quote a value for POSIX shells
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.paths.base_dir = PathBuf::from("/srv/deps");
        config
    }

    fn lookup<'a>(env: &'a [(&str, String)], name: &str) -> &'a str {
        env.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn online_sources_allow_writes() {
        let env = installer_env(&config(), false).unwrap();
        assert_eq!(
            lookup(&env, "X_VCPKG_ASSET_SOURCES"),
            "clear;x-azurl,file:///srv/deps/asset_cache,,readwrite"
        );
        assert_eq!(lookup(&env, "VCPKG_ROOT"), "/srv/deps/vcpkg_root");
        assert_eq!(lookup(&env, "VCPKG_DEFAULT_BINARY_CACHE"), "/srv/deps/binary_cache");
        assert_eq!(lookup(&env, "VCPKG_DISABLE_METRICS"), "1");
    }

    #[cfg(unix)]
    #[test]
    fn offline_sources_block_origin() {
        let env = installer_env(&config(), true).unwrap();
        assert_eq!(
            lookup(&env, "X_VCPKG_ASSET_SOURCES"),
            "clear;x-azurl,file:///srv/deps/asset_cache,,read;x-block-origin"
        );
    }

    #[cfg(unix)]
    #[test]
    fn cache_uri_escapes_spaces() {
        let mut config = config();
        config.paths.base_dir = PathBuf::from("/srv/my deps");
        let env = installer_env(&config, false).unwrap();
        assert!(lookup(&env, "X_VCPKG_ASSET_SOURCES").contains("file:///srv/my%20deps/asset_cache"));
    }

    #[test]
    fn quotes_for_shell() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
