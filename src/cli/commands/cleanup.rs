//! Cleanup command - delete cache files no manifest needs

use crate::audit::{events, AuditLog};
use crate::cache::{ensure_prunable, prune, CacheState, PruneReport};
use crate::cli::args::CleanupArgs;
use crate::cli::commands::state::{describe, load_state, print_section, to_delete_section, to_process_section};
use crate::config::Config;
use crate::error::{CachetError, CachetResult};
use crate::ui::{self, UiContext};

/// Execute the cleanup command
pub async fn execute(args: CleanupArgs, config: &Config) -> CachetResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let state = load_state(config).await?;

    if !state.is_resolved() {
        print_section(&ctx, &to_process_section(&state));
        return ensure_prunable(&state);
    }

    let to_delete = state.files_to_delete();
    if to_delete.is_empty() {
        ui::step_ok(&ctx, "No files to delete");
        return Ok(());
    }

    print_section(&ctx, &to_delete_section(&state));

    if args.dry_run {
        let report = prune(&state, true).await?;
        ui::outro_warn(
            &ctx,
            &format!("Dry run: {} file(s) would be deleted", report.deleted.len()),
        );
        return Ok(());
    }

    let prompt = format!("Delete {} file(s)?", to_delete.len());
    if ctx.is_interactive() && !ui::confirm(&ctx, &prompt, false).await? {
        ui::outro_warn(&ctx, "Cleanup cancelled");
        return Ok(());
    }

    let report = prune(&state, false).await?;
    AuditLog::new(config)
        .log(
            events::PRUNE_COMPLETED,
            &serde_json::json!({
                "deleted": report.deleted,
                "failed": report.failed.iter().map(|f| &f.path).collect::<Vec<_>>(),
            }),
        )
        .await;

    print_report(&ctx, &state, &report);

    if report.is_complete() {
        Ok(())
    } else {
        Err(CachetError::User(format!(
            "{} file(s) could not be deleted",
            report.failed.len()
        )))
    }
}

fn print_report(ctx: &UiContext, state: &CacheState, report: &PruneReport) {
    println!();
    println!("Deleted files ({}):", report.deleted.len());
    for path in &report.deleted {
        ui::item(ctx, &describe(state, path, false).label);
    }
    for failure in &report.failed {
        ui::step_error_detail(
            ctx,
            &format!("Could not delete {}", failure.path.display()),
            &failure.error.to_string(),
        );
    }
}
