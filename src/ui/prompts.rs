//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{CachetError, CachetResult};

/// Prompt for confirmation, returns default if non-interactive or auto-yes
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> CachetResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| CachetError::User(format!("Prompt task failed: {}", e)))?
    .map_err(|e| CachetError::User(format!("Prompt failed: {}", e)))
}

/// Prompt for selection from a list of `(value, label, hint)` options
///
/// Returns the first option if non-interactive.
pub async fn select<T: Clone + Send + Eq + 'static>(
    ctx: &UiContext,
    message: &str,
    options: &[(T, &str, &str)],
) -> CachetResult<T> {
    let first = options
        .first()
        .ok_or_else(|| CachetError::Internal("select called without options".to_string()))?;

    if !ctx.is_interactive() {
        return Ok(first.0.clone());
    }

    let message = message.to_string();
    let items: Vec<(T, String, String)> = options
        .iter()
        .map(|(v, l, h)| (v.clone(), l.to_string(), h.to_string()))
        .collect();

    tokio::task::spawn_blocking(move || {
        let mut select = cliclack::select(&message);
        for (value, label, hint) in items {
            select = select.item(value, label, hint);
        }
        select.interact()
    })
    .await
    .map_err(|e| CachetError::User(format!("Select task failed: {}", e)))?
    .map_err(|e| CachetError::User(format!("Select failed: {}", e)))
}
