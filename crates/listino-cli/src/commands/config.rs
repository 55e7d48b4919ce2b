//! Config command - inspect and edit the reconciliation settings.
//!
//! Every subcommand works on the file named by the global `--config` flag,
//! falling back to the per-user config file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;
use tracing::debug;

use listino_core::models::config::ListinoConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with the default settings
    Init {
        /// Destination (defaults to the selected config file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one setting, e.g. "matching.threshold"
    Get {
        /// Dotted setting key
        key: String,
    },

    /// Change one setting; the result must pass validation before it is saved
    Set {
        /// Dotted setting key, e.g. "extraction.listing_code_pattern"
        key: String,
        /// New value; JSON for numbers, booleans and lists
        value: String,
    },

    /// Check the threshold range and that every pattern compiles
    Validate,

    /// Print the selected config file location
    Path,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show(&path),
        ConfigCommand::Init { output, force } => init(output.as_deref().unwrap_or(&path), force),
        ConfigCommand::Get { key } => get(&path, &key),
        ConfigCommand::Set { key, value } => set(&path, &key, &value),
        ConfigCommand::Validate => validate(&path),
        ConfigCommand::Path => show_path(&path),
    }
}

/// Location of the per-user config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("listino")
        .join("config.json")
}

/// The stored settings, or defaults when the file does not exist yet.
fn read_or_default(path: &Path) -> anyhow::Result<ListinoConfig> {
    if !path.exists() {
        debug!("{} does not exist, using defaults", path.display());
        return Ok(ListinoConfig::default());
    }
    ListinoConfig::from_file(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn show(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!("{} No config file at {}, showing defaults.", style("ℹ").blue(), path.display());
    }
    let config = read_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to replace it.", path.display());
    }
    write_config(path, &ListinoConfig::default())?;
    println!("{} Wrote default settings to {}", style("✓").green(), path.display());
    Ok(())
}

fn get(path: &Path, key: &str) -> anyhow::Result<()> {
    let settings = serde_json::to_value(read_or_default(path)?)?;
    let value = lookup(&settings, key)?;
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set(path: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let mut settings = serde_json::to_value(read_or_default(path)?)?;
    let slot = lookup_mut(&mut settings, key)?;
    let value = parse_value(slot, raw);
    *slot = value.clone();

    let config: ListinoConfig = serde_json::from_value(settings)
        .with_context(|| format!("Invalid value for {}: {}", key, raw))?;
    config
        .validate()
        .with_context(|| format!("Invalid value for {}", key))?;

    write_config(path, &config)?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
    read_or_default(path)?
        .validate()
        .with_context(|| format!("{} is not valid", path.display()))?;
    println!("{} {} is valid", style("✓").green(), path.display());
    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());
    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'listino config init' to create it.");
    }
    Ok(())
}

fn write_config(path: &Path, config: &ListinoConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    config
        .save(path)
        .with_context(|| format!("Cannot write {}", path.display()))
}

fn lookup<'a>(settings: &'a Value, key: &str) -> anyhow::Result<&'a Value> {
    key.split('.')
        .try_fold(settings, |node, part| node.get(part))
        .ok_or_else(|| anyhow::anyhow!("Unknown setting: {}", key))
}

/// Only existing settings can be changed; unknown keys would be dropped by
/// serde on the next load.
fn lookup_mut<'a>(settings: &'a mut Value, key: &str) -> anyhow::Result<&'a mut Value> {
    key.split('.')
        .try_fold(settings, |node, part| node.get_mut(part))
        .ok_or_else(|| anyhow::anyhow!("Unknown setting: {}", key))
}

/// Text settings take the raw string as is, so patterns and numeric-looking
/// names are never reinterpreted as JSON.
fn parse_value(current: &Value, raw: &str) -> Value {
    match current {
        Value::String(_) => Value::String(raw.to_string()),
        _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}
