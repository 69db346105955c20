//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Longest status message shown next to the install bar
const MAX_MESSAGE_LEN: usize = 60;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }
}

/// Progress bar for one installer run
///
/// Parses `Installing N/M <package>...` lines into an indicatif bar in
/// interactive mode. Plain mode prints only the install steps.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
}

impl InstallProgress {
    /// Create a progress indicator for `project`
    pub fn new(ctx: &UiContext, project: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(0);
            let bar_style = ProgressStyle::default_bar()
                .template("  {spinner:.blue} {prefix}  {bar:20.blue/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(bar_style);
            bar.set_prefix(project.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Downloading assets ({})...", project);
            None
        };
        Self { bar }
    }

    /// Process one line of installer output
    pub fn on_line(&self, line: &str) {
        if let Some((n, total, package)) = parse_install_line(line) {
            match self.bar {
                Some(ref bar) => {
                    bar.set_length(total);
                    bar.set_position(n);
                    bar.set_message(package.to_string());
                }
                None => println!("  Installing {}/{} {}", n, total, package),
            }
        } else if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                bar.set_message(truncate(trimmed));
            }
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_MESSAGE_LEN - 3).collect();
    format!("{}...", head)
}

/// Parse an installer step line like `Installing 3/12 zlib:x64-linux@1.3.1...`
fn parse_install_line(line: &str) -> Option<(u64, u64, &str)> {
    let rest = line.trim_start().strip_prefix("Installing ")?;
    let (counts, package) = rest.split_once(' ')?;
    let (n, total) = counts.split_once('/')?;
    let n: u64 = n.parse().ok()?;
    let total: u64 = total.parse().ok()?;
    Some((n, total, package.trim().trim_end_matches("...")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Testing...");
        spinner.clear();
    }

    #[test]
    fn parse_install_line_valid() {
        let (n, m, pkg) = parse_install_line("Installing 3/12 zlib:x64-linux@1.3.1...").unwrap();
        assert_eq!(n, 3);
        assert_eq!(m, 12);
        assert_eq!(pkg, "zlib:x64-linux@1.3.1");
    }

    #[test]
    fn parse_install_line_not_a_step() {
        assert!(parse_install_line("Installing zlib").is_none());
        assert!(parse_install_line("Computing installation plan...").is_none());
        assert!(parse_install_line("Installing a/b zlib").is_none());
        assert!(parse_install_line("").is_none());
    }

    #[test]
    fn truncates_long_messages() {
        let long = "x".repeat(100);
        assert_eq!(truncate(&long).chars().count(), MAX_MESSAGE_LEN);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn install_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = InstallProgress::new(&ctx, "demo");
        progress.on_line("Installing 1/2 zlib:x64-linux...");
        progress.on_line("-- Using cached zlib-1.3.1.tar.gz");
        progress.finish();
    }
}
