//! Tool-url command - print installer tool download URLs

use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use regex::Regex;
use std::sync::LazyLock;
use tokio::fs;

/// Release download base for the installer tool
const RELEASE_BASE: &str = "https://github.com/microsoft/vcpkg-tool/releases/download";

/// Tool metadata file inside the installer root
const TOOL_METADATA: &str = "scripts/vcpkg-tool-metadata.txt";

static RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"VCPKG_TOOL_RELEASE_TAG=(\S+)").expect("release tag pattern is valid")
});

/// Execute the tool-url command
pub async fn execute(config: &Config) -> CachetResult<()> {
    let root = config.installer_root();
    if !fs::metadata(&root).await.is_ok_and(|m| m.is_dir()) {
        return Err(CachetError::InstallerRootNotFound(root));
    }

    let metadata_file = root.join(TOOL_METADATA);
    let content = fs::read_to_string(&metadata_file)
        .await
        .map_err(|e| CachetError::io(format!("reading {}", metadata_file.display()), e))?;
    let tag = release_tag(&content).ok_or_else(|| CachetError::ToolTagNotFound(metadata_file.clone()))?;

    println!("vcpkg tool ({}):", tag);
    for (platform, url) in tool_urls(tag) {
        println!("  * ({}): {}", platform, url);
    }
    Ok(())
}

fn release_tag(content: &str) -> Option<&str> {
    RELEASE_TAG
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn tool_urls(tag: &str) -> [(&'static str, String); 2] {
    let base = format!("{}/{}", RELEASE_BASE, tag);
    [
        ("Windows", format!("{}/vcpkg.exe", base)),
        ("Linux", format!("{}/vcpkg-glibc", base)),
    ]
}
