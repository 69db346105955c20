//! Audit trail for cache mutations
//!
//! Appends JSON lines to `<state_dir>/cachet/audit.log` whenever a download
//! finishes or files are pruned, so cache history survives the terminal.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Event names written to the audit log
pub mod events {
    pub const DOWNLOAD_SUCCEEDED: &str = "download.succeeded";
    pub const DOWNLOAD_MISSING_ASSET: &str = "download.missing_asset";
    pub const DOWNLOAD_FAILED: &str = "download.failed";
    pub const PRUNE_COMPLETED: &str = "prune.completed";
}

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
        }
    }

    /// Create a logger writing to an explicit path
    pub fn at(path: PathBuf, enabled: bool) -> Self {
        Self { enabled, path }
    }

    /// Log an audit event as a JSON line
    ///
    /// IO failures are reported with `warn!` and otherwise ignored.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
