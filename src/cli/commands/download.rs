//! Download command - populate the asset cache from manifests

use crate::audit::{events, AuditLog};
use crate::cli::args::DownloadArgs;
use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use crate::install::{
    download_batch, format_elapsed, AssetRecord, BatchSummary, DownloadObserver, DownloadOutcome,
    DownloadSettings, NeverRetry, ProcessRunner, RetryPolicy,
};
use crate::manifest::{list_manifests, select_manifests, Manifest};
use crate::ui::{self, InstallProgress, UiContext};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

/// Execute the download command
pub async fn execute(args: DownloadArgs, config: &Config) -> CachetResult<()> {
    let ctx = UiContext::detect();

    let manifest_dir = config.manifest_dir();
    let manifests = list_manifests(&manifest_dir).await?;
    if manifests.is_empty() {
        return Err(CachetError::NoManifests(manifest_dir));
    }

    let selected = choose_manifests(&ctx, &args, &manifests).await?;
    debug!(
        "Selected {} of {} manifest(s)",
        selected.len(),
        manifests.len()
    );

    ui::intro(&ctx, "Cachet download");

    let settings = DownloadSettings::from_config(config)?;
    let runner = ProcessRunner::new();
    let retry: Box<dyn RetryPolicy> = if args.no_retry || !ctx.is_interactive() {
        Box::new(NeverRetry)
    } else {
        Box::new(PromptRetry { ctx: ctx.clone() })
    };
    let observer = UiObserver::new(ctx.clone());

    let summary = download_batch(&selected, &settings, &runner, retry.as_ref(), &observer).await;

    let audit = AuditLog::new(config);
    record_results(&audit, &summary).await;
    report_summary(&ctx, &summary);

    summary.into_result()
}

/// Resolve which manifests to process
///
/// Named projects win, then `--all`, then an interactive pick that
/// defaults to every manifest.
async fn choose_manifests(
    ctx: &UiContext,
    args: &DownloadArgs,
    manifests: &[Manifest],
) -> CachetResult<Vec<Manifest>> {
    if !args.projects.is_empty() {
        return select_manifests(manifests, &args.projects);
    }
    if args.all {
        return Ok(manifests.to_vec());
    }

    let all_hint = format!("{} manifest(s)", manifests.len());
    let mut options: Vec<(Option<String>, &str, &str)> = vec![(None, "ALL", all_hint.as_str())];
    options.extend(
        manifests
            .iter()
            .map(|m| (Some(m.project.clone()), m.project.as_str(), "")),
    );

    match ui::select(ctx, "Select manifests to download", &options).await? {
        Some(project) => select_manifests(manifests, &[project]),
        None => Ok(manifests.to_vec()),
    }
}

/// Asks the operator whether to rerun the installer after a missing asset
struct PromptRetry {
    ctx: UiContext,
}

#[async_trait]
impl RetryPolicy for PromptRetry {
    async fn should_retry(&self, project: &str, _asset: &AssetRecord) -> CachetResult<bool> {
        if !self.ctx.is_interactive() {
            return Ok(false);
        }
        let message = format!("Asset missing for {}", project);
        let options = [
            (true, "repeat", "run the installer again"),
            (false, "abort", "give up on this project"),
        ];
        ui::select(&self.ctx, &message, &options).await
    }
}

/// Reports installer runs through the UI
struct UiObserver {
    ctx: UiContext,
    progress: Mutex<Option<InstallProgress>>,
}

impl UiObserver {
    fn new(ctx: UiContext) -> Self {
        Self {
            ctx,
            progress: Mutex::new(None),
        }
    }

    fn finish_progress(&self) {
        if let Ok(mut progress) = self.progress.lock() {
            if let Some(progress) = progress.take() {
                progress.finish();
            }
        }
    }
}

impl DownloadObserver for UiObserver {
    fn on_run_start(&self, project: &str, attempt: u32) {
        if attempt > 1 {
            ui::step_info(&self.ctx, &format!("Retrying {} (attempt {})", project, attempt));
        }
        if let Ok(mut progress) = self.progress.lock() {
            *progress = Some(InstallProgress::new(&self.ctx, project));
        }
    }

    fn on_line(&self, line: &str) {
        if let Ok(progress) = self.progress.lock() {
            if let Some(ref progress) = *progress {
                progress.on_line(line);
            }
        }
    }

    fn on_run_end(&self, project: &str, outcome: &DownloadOutcome) {
        self.finish_progress();

        let elapsed = format_elapsed(outcome.elapsed());
        match outcome {
            DownloadOutcome::Success { assets, .. } => ui::step_ok_detail(
                &self.ctx,
                &format!("Downloaded assets ({})", project),
                &format!("{} asset(s), {}", assets, elapsed),
            ),
            DownloadOutcome::MissingAsset { asset, .. } => {
                ui::step_error(
                    &self.ctx,
                    &format!("Cannot download asset ({}, {})", project, elapsed),
                );
                ui::key_value(&self.ctx, "hash", &asset.hash);
                ui::key_value(&self.ctx, "url", &asset.url);
            }
            DownloadOutcome::Failed { exit_code, log, .. } => ui::step_error_detail(
                &self.ctx,
                &format!("Installer failed ({}, exit {}, {})", project, exit_code, elapsed),
                &log.display().to_string(),
            ),
        }
    }
}

async fn record_results(audit: &AuditLog, summary: &BatchSummary) {
    for (project, result) in &summary.results {
        match result {
            Ok(DownloadOutcome::Success { elapsed, assets }) => {
                audit
                    .log(
                        events::DOWNLOAD_SUCCEEDED,
                        &serde_json::json!({
                            "project": project,
                            "assets": assets,
                            "elapsed_secs": elapsed.as_secs_f64(),
                        }),
                    )
                    .await
            }
            Ok(DownloadOutcome::MissingAsset { asset, .. }) => {
                audit
                    .log(
                        events::DOWNLOAD_MISSING_ASSET,
                        &serde_json::json!({
                            "project": project,
                            "hash": asset.hash,
                            "url": asset.url,
                        }),
                    )
                    .await
            }
            Ok(DownloadOutcome::Failed { exit_code, log, .. }) => {
                audit
                    .log(
                        events::DOWNLOAD_FAILED,
                        &serde_json::json!({
                            "project": project,
                            "exit_code": exit_code,
                            "log": log,
                        }),
                    )
                    .await
            }
            Err(e) => {
                audit
                    .log(
                        events::DOWNLOAD_FAILED,
                        &serde_json::json!({
                            "project": project,
                            "error": e.to_string(),
                        }),
                    )
                    .await
            }
        }
    }
}

fn report_summary(ctx: &UiContext, summary: &BatchSummary) {
    for (project, result) in &summary.results {
        let error = match result {
            Ok(outcome) => outcome.error(project),
            Err(e) => {
                ui::step_error_detail(ctx, project, &e.to_string());
                continue;
            }
        };
        if let Some(error) = error {
            match error.hint() {
                Some(hint) => ui::step_warn_hint(ctx, &error.to_string(), hint),
                None => ui::step_error(ctx, &error.to_string()),
            }
        }
    }

    let failed = summary.failed_projects();
    if failed.is_empty() {
        ui::outro_success(
            ctx,
            &format!("Done ({} manifest(s))", summary.results.len()),
        );
    } else {
        ui::outro_error(ctx, &format!("Not finished: {}", failed.join(", ")));
    }
}
