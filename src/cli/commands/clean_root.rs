//! Clean-root command - remove installer scratch directories

use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use crate::ui::{self, UiContext};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Scratch directories the installer leaves in its root
const SCRATCH_DIRS: &[&str] = &["buildtrees", "downloads", "packages"];

/// What happened to one scratch directory
#[derive(Debug, PartialEq, Eq)]
enum Removal {
    Deleted,
    Missing,
}

/// Execute the clean-root command
pub async fn execute(config: &Config) -> CachetResult<()> {
    let ctx = UiContext::detect();
    let root = config.installer_root();
    if !fs::metadata(&root).await.is_ok_and(|m| m.is_dir()) {
        return Err(CachetError::InstallerRootNotFound(root));
    }

    for name in SCRATCH_DIRS {
        match remove_scratch_dir(&root, name).await? {
            Removal::Deleted => ui::step_ok(&ctx, &format!("Deleted {}", name)),
            Removal::Missing => ui::step_info(&ctx, &format!("{} missing", name)),
        }
    }
    Ok(())
}

async fn remove_scratch_dir(root: &Path, name: &str) -> CachetResult<Removal> {
    let dir = root.join(name);
    match fs::remove_dir_all(&dir).await {
        Ok(()) => Ok(Removal::Deleted),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Removal::Missing),
        Err(e) => Err(CachetError::io(format!("deleting {}", dir.display()), e)),
    }
}
