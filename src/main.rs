//! Cachet - Content-addressable vcpkg asset cache
//!
//! CLI entry point that dispatches to subcommands.

use cachet::cli::{commands, Cli, Commands};
use cachet::config::{Config, ConfigManager};
use cachet::error::{CachetError, CachetResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CachetResult<()> {
    let cli = Cli::parse();

    // Completions need neither logging nor config
    if let Commands::Completions { shell } = cli.command {
        commands::completions(shell);
        return Ok(());
    }

    let cwd = std::env::current_dir().map_err(|e| CachetError::io("getting current directory", e))?;
    let search_dir = cli.base_dir.as_deref().unwrap_or(&cwd);
    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::discover(search_dir),
    };
    let mut config = manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config: {}", manager.path().display());

    if let Some(base_dir) = cli.base_dir {
        config.paths.base_dir = base_dir;
    }

    cachet::ui::init_theme();

    match cli.command {
        Commands::Download(args) => commands::download(args, &config).await,
        Commands::State(args) => commands::state(args, &config).await,
        Commands::Cleanup(args) => commands::cleanup(args, &config).await,
        Commands::Init(args) => commands::init(args, &config).await,
        Commands::Env(args) => commands::env(args, &config).await,
        Commands::ToolUrl => commands::tool_url(&config).await,
        Commands::CleanRoot => commands::clean_root(&config).await,
        Commands::Config(args) => commands::config(args, &manager, &config).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.log_format = "json"` switches formatter
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("cachet=warn"),
        1 => EnvFilter::new("cachet=info"),
        _ => EnvFilter::new("cachet=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
