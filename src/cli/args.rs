//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Cachet - Content-addressable vcpkg asset cache
///
/// Populates an asset cache from project manifests, reports its
/// consistency and prunes files no manifest needs.
#[derive(Parser, Debug)]
#[command(name = "cachet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CACHET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace root (overrides paths.base_dir)
    #[arg(short = 'C', long, global = true, env = "CACHET_BASE_DIR")]
    pub base_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Populate the asset cache from project manifests
    Download(DownloadArgs),

    /// Report the consistency of the asset cache
    State(StateArgs),

    /// Delete cache files no manifest needs
    Cleanup(CleanupArgs),

    /// Create the workspace directories and a local cachet.toml
    Init(InitArgs),

    /// Print the installer environment for this workspace
    Env(EnvArgs),

    /// Print download URLs for the installer tool binaries
    ToolUrl,

    /// Remove installer scratch directories (buildtrees, downloads, packages)
    CleanRoot,

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the download command
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Projects to download (manifest file stems)
    pub projects: Vec<String>,

    /// Download every manifest without prompting
    #[arg(short, long, conflicts_with = "projects")]
    pub all: bool,

    /// Abort instead of offering to repeat after a missing asset
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the state command
#[derive(Parser, Debug)]
pub struct StateArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the cleanup command
#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Show what would be removed
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing cachet.toml
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the env command
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// Serve assets from the cache only and block origin downloads
    #[arg(long)]
    pub offline: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., installer.program)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for the state command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Grouped human-readable report
    Table,
    /// JSON output
    Json,
    /// Simple text (category and file, one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_download_projects() {
        let cli = Cli::parse_from(["cachet", "download", "foo", "bar"]);
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.projects, vec!["foo", "bar"]);
                assert!(!args.all);
                assert!(!args.no_retry);
            }
            _ => panic!("expected Download command"),
        }
    }

    #[test]
    fn cli_download_all_conflicts_with_projects() {
        assert!(Cli::try_parse_from(["cachet", "download", "--all", "foo"]).is_err());
        let cli = Cli::parse_from(["cachet", "download", "--all", "--no-retry"]);
        match cli.command {
            Commands::Download(args) => {
                assert!(args.all);
                assert!(args.no_retry);
            }
            _ => panic!("expected Download command"),
        }
    }

    #[test]
    fn cli_parses_state_format() {
        let cli = Cli::parse_from(["cachet", "state", "--format", "json"]);
        match cli.command {
            Commands::State(args) => assert!(matches!(args.format, OutputFormat::Json)),
            _ => panic!("expected State command"),
        }
    }

    #[test]
    fn cli_parses_cleanup_flags() {
        let cli = Cli::parse_from(["cachet", "cleanup", "--dry-run", "-y"]);
        match cli.command {
            Commands::Cleanup(args) => {
                assert!(args.dry_run);
                assert!(args.yes);
            }
            _ => panic!("expected Cleanup command"),
        }
    }

    #[test]
    fn cli_parses_env_offline() {
        let cli = Cli::parse_from(["cachet", "env", "--offline"]);
        assert!(matches!(cli.command, Commands::Env(EnvArgs { offline: true })));
    }

    #[test]
    fn cli_parses_tool_url_and_clean_root() {
        let cli = Cli::parse_from(["cachet", "tool-url"]);
        assert!(matches!(cli.command, Commands::ToolUrl));
        let cli = Cli::parse_from(["cachet", "clean-root"]);
        assert!(matches!(cli.command, Commands::CleanRoot));
    }

    #[test]
    fn cli_base_dir_flag() {
        let cli = Cli::parse_from(["cachet", "-C", "/srv/deps", "state"]);
        assert_eq!(cli.base_dir, Some(PathBuf::from("/srv/deps")));
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::parse_from(["cachet", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["cachet", "state"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["cachet", "-v", "state"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["cachet", "-vv", "state"]);
        assert_eq!(cli.verbose, 2);
    }
}
