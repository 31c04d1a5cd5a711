//! Configuration display and editing commands

use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use blackbook_core::config::{ConfigEditor, lookup, parse_value};

use super::resolver;
use crate::error::{CliError, Result};

/// Display the effective configuration
pub fn run_config_show(config_dir: Option<&Path>, json: bool) -> Result<()> {
    let config = resolver(config_dir)?.resolve()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}

/// Print the effective value at a dotted key
///
/// Known keys report their defaults; unknown keys are read from the raw
/// merged layers.
pub fn run_config_get(config_dir: Option<&Path>, key: &str) -> Result<()> {
    let resolver = resolver(config_dir)?;
    let raw = resolver.resolve_value()?;
    let typed = serde_json::to_value(resolver.resolve()?)?;
    let found = lookup(&typed, key)
        .or_else(|| lookup(&raw, key))
        .ok_or_else(|| CliError::user(format!("Key '{key}' is not set")))?;
    match found {
        Value::String(s) => println!("{s}"),
        Value::Bool(_) | Value::Number(_) => println!("{found}"),
        other => print!("{}", serde_yaml::to_string(other)?),
    }
    Ok(())
}

/// Set a dotted key in the primary config file
pub fn run_config_set(config_dir: Option<&Path>, key: &str, raw: &str) -> Result<()> {
    let resolver = resolver(config_dir)?;
    let editor = ConfigEditor::new(resolver.primary_path());
    editor.set(key, &parse_value(raw))?;
    println!(
        "{} Set {} in {}",
        "OK".green().bold(),
        key.cyan(),
        editor.path().display()
    );

    // The edit is kept either way; point out a value the engine will reject
    if let Err(e) = resolver.resolve() {
        println!("{} Configuration no longer resolves: {}", "warning".yellow().bold(), e);
    }
    Ok(())
}

/// Remove a dotted key from the primary config file
pub fn run_config_unset(config_dir: Option<&Path>, key: &str) -> Result<()> {
    let resolver = resolver(config_dir)?;
    let editor = ConfigEditor::new(resolver.primary_path());
    if !editor.path().exists() || !editor.unset(key)? {
        return Err(CliError::user(format!(
            "Key '{key}' is not set in {}",
            editor.path().display()
        )));
    }
    println!(
        "{} Removed {} from {}",
        "OK".green().bold(),
        key.cyan(),
        editor.path().display()
    );
    Ok(())
}

/// Print every layer path in merge order
pub fn run_config_path(config_dir: Option<&Path>) -> Result<()> {
    let resolver = resolver(config_dir)?;
    let layers = resolver.layer_paths();
    if layers.is_empty() {
        println!(
            "{} (would be created at {})",
            "No config layers".dimmed(),
            resolver.primary_path().display()
        );
    }
    for (index, layer) in layers.iter().enumerate() {
        println!("{}. {}", index + 1, layer.display());
    }
    Ok(())
}
