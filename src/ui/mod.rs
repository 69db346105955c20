//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive prompts and log lines, falling back to
//! plain tagged output in CI and other non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use cachet::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! ui::intro(&ctx, "Cachet cleanup");
//! ui::step_warn_hint(&ctx, "2 project(s) outdated", "Run: cachet download");
//!
//! if ui::confirm(&ctx, "Delete 3 file(s)?", false).await? {
//!     // ...
//! }
//!
//! ui::outro_success(&ctx, "Deleted 3 file(s)");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, item, key_value, outro_error, outro_success, outro_warn, remark, section, step_error,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{InstallProgress, TaskSpinner};
pub use prompts::{confirm, select};
pub use theme::{init_theme, CachetTheme};
