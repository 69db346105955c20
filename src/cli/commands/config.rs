//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{CachetError, CachetResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`, besides `installer.extra_env.<NAME>`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "paths.base_dir",
    "paths.asset_cache_dir",
    "paths.manifest_dir",
    "paths.work_dir",
    "paths.binary_cache_dir",
    "paths.installer_root",
    "installer.program",
    "installer.args",
    "installer.manifest_file_name",
    "installer.downloads_env",
    "installer.binary_cache_env",
    "hashing.manifest_algorithm",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> CachetResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CachetResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> CachetResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Update one key in the file the manager points at
///
/// Starts from the file's own contents so command-line overrides such as
/// `--base-dir` are not persisted.
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> CachetResult<()> {
    let ctx = UiContext::detect();
    let mut config = manager.load().await?;

    if !is_valid_key(key) {
        ui::step_error_detail(&ctx, "Unknown config key", key);
        ui::remark(&ctx, "Valid keys:");
        for key in VALID_KEYS {
            eprintln!("  {}", key);
        }
        eprintln!("  installer.extra_env.<NAME>");
        return Err(CachetError::User(format!("Unknown config key: {}", key)));
    }

    apply_key(&mut config, key, value)?;
    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    Ok(())
}

fn is_valid_key(key: &str) -> bool {
    VALID_KEYS.contains(&key)
        || key
            .strip_prefix("installer.extra_env.")
            .is_some_and(|name| !name.is_empty() && !name.contains('.'))
}

fn apply_key(config: &mut Config, key: &str, value: &str) -> CachetResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["paths", "base_dir"] => config.paths.base_dir = PathBuf::from(value),
        ["paths", "asset_cache_dir"] => config.paths.asset_cache_dir = PathBuf::from(value),
        ["paths", "manifest_dir"] => config.paths.manifest_dir = PathBuf::from(value),
        ["paths", "work_dir"] => config.paths.work_dir = PathBuf::from(value),
        ["paths", "binary_cache_dir"] => config.paths.binary_cache_dir = PathBuf::from(value),
        ["paths", "installer_root"] => config.paths.installer_root = PathBuf::from(value),

        ["installer", "program"] => config.installer.program = value.to_string(),
        ["installer", "args"] => {
            config.installer.args = value.split_whitespace().map(str::to_string).collect()
        }
        ["installer", "manifest_file_name"] => {
            config.installer.manifest_file_name = value.to_string()
        }
        ["installer", "downloads_env"] => config.installer.downloads_env = value.to_string(),
        ["installer", "binary_cache_env"] => config.installer.binary_cache_env = value.to_string(),
        ["installer", "extra_env", name] if !name.is_empty() => {
            config
                .installer
                .extra_env
                .insert((*name).to_string(), value.to_string());
        }

        ["hashing", "manifest_algorithm"] => config.hashing.manifest_algorithm = value.parse()?,

        _ => return Err(CachetError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_log_format(value: &str) -> CachetResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(CachetError::User(format!(
            "Invalid log format: {}. Use text/json",
            value
        ))),
    }
}

fn parse_bool(value: &str) -> CachetResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(CachetError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}
