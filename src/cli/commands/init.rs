//! Init command - create the workspace directories and a local cachet.toml

use crate::cli::args::InitArgs;
use crate::config::{Config, LOCAL_CONFIG_FILE};
use crate::error::{CachetError, CachetResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for the workspace-local config
const INIT_TEMPLATE: &str = r#"# Cachet workspace configuration
# Relative paths resolve against paths.base_dir.

[paths]
# asset_cache_dir = "asset_cache"
# manifest_dir = "manifests"
# work_dir = "_temp"
# binary_cache_dir = "binary_cache"
# installer_root = "vcpkg_root"

[installer]
# program = "vcpkg"
# args = ["install", "--clean-after-build"]

[hashing]
# manifest_algorithm = "sha1"   # sha1, sha256, sha512
"#;

/// Execute the init command
pub async fn execute(args: InitArgs, config: &Config) -> CachetResult<()> {
    let ctx = UiContext::detect();

    for (label, dir) in [
        ("Asset cache", config.asset_cache_dir()),
        ("Binary cache", config.binary_cache_dir()),
        ("Manifests", config.manifest_dir()),
    ] {
        if ensure_dir(&dir).await? {
            ui::step_ok_detail(&ctx, &format!("Created {}", label), &dir.display().to_string());
        } else {
            ui::step_info(&ctx, &format!("{} exists: {}", label, dir.display()));
        }
    }

    let config_path = config.paths.base_dir.join(LOCAL_CONFIG_FILE);
    if config_path.exists() && !args.force {
        ui::step_warn_hint(
            &ctx,
            &format!("{} already exists", config_path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| CachetError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created workspace config",
        &config_path.display().to_string(),
    );

    Ok(())
}

/// Create `dir` if needed; true if it was created
async fn ensure_dir(dir: &Path) -> CachetResult<bool> {
    if fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return Ok(false);
    }
    fs::create_dir_all(dir)
        .await
        .map_err(|e| CachetError::io(format!("creating directory {}", dir.display()), e))?;
    Ok(true)
}
