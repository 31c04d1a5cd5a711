//! Editing the primary configuration layer
//!
//! TOML layers are edited in place with `toml_edit`, so comments and key
//! order survive. YAML layers are re-serialized; mapping order is kept but
//! comments are lost. Every edit is a locked read-modify-write.

use std::path::{Path, PathBuf};

use blackbook_fs::{ConfigFormat, io, lock::with_lock};
use serde_json::Value;
use toml_edit::DocumentMut;

use crate::{Error, Result};

/// Edits dotted key paths (`settings.cache_dir`) in one config file.
#[derive(Debug, Clone)]
pub struct ConfigEditor {
    path: PathBuf,
}

impl ConfigEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `key` to `value`, creating intermediate tables as needed.
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        let segments = split_key(key)?;
        self.edit(|content, format| match format {
            ConfigFormat::Toml => toml_set(content, &segments, value),
            _ => yaml_set(content, &segments, value),
        })?;
        tracing::info!(path = %self.path.display(), key, "Updated config");
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn unset(&self, key: &str) -> Result<bool> {
        let segments = split_key(key)?;
        let mut removed = false;
        self.edit(|content, format| {
            let (rendered, was_present) = match format {
                ConfigFormat::Toml => toml_unset(content, &segments)?,
                _ => yaml_unset(content, &segments)?,
            };
            removed = was_present;
            Ok(rendered)
        })?;
        if removed {
            tracing::info!(path = %self.path.display(), key, "Removed config key");
        }
        Ok(removed)
    }

    fn edit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&str, ConfigFormat) -> Result<String>,
    {
        let format = ConfigFormat::from_path(&self.path)?;
        if format == ConfigFormat::Json {
            return Err(Error::invalid_config(format!(
                "{} is not an editable config layer",
                self.path.display()
            )));
        }
        with_lock(&self.path, || {
            let content = if self.path.exists() {
                io::read_text(&self.path)?
            } else {
                String::new()
            };
            let rendered = f(&content, format)?;
            io::write_text(&self.path, &rendered)?;
            Ok(())
        })
    }
}

/// Look up a dotted key path in a merged configuration value.
///
/// Numeric segments index into sequences.
pub fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Interpret a command-line value: YAML scalars and flow collections are
/// parsed, anything else is taken as a plain string.
pub fn parse_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::invalid_config(format!("invalid config key: {key:?}")));
    }
    Ok(segments)
}

fn not_a_table(key: &str) -> Error {
    Error::invalid_config(format!("{key} is not a table"))
}

fn toml_set(content: &str, segments: &[&str], value: &Value) -> Result<String> {
    let mut doc: DocumentMut = content.parse()?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| Error::invalid_config("empty config key"))?;

    let mut current = doc.as_item_mut();
    for segment in parents {
        current = current
            .as_table_like_mut()
            .ok_or_else(|| not_a_table(segment))?
            .entry(segment)
            .or_insert(toml_edit::table());
    }
    current
        .as_table_like_mut()
        .ok_or_else(|| not_a_table(last))?
        .insert(last, toml_item(value)?);
    Ok(doc.to_string())
}

fn toml_unset(content: &str, segments: &[&str]) -> Result<(String, bool)> {
    let mut doc: DocumentMut = content.parse()?;
    let removed = remove_toml_key(doc.as_item_mut(), segments);
    Ok((doc.to_string(), removed))
}

fn remove_toml_key(mut current: &mut toml_edit::Item, segments: &[&str]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    for segment in parents {
        match current.as_table_like_mut().and_then(|t| t.get_mut(segment)) {
            Some(next) => current = next,
            None => return false,
        }
    }
    current
        .as_table_like_mut()
        .and_then(|t| t.remove(last))
        .is_some()
}

fn toml_item(value: &Value) -> Result<toml_edit::Item> {
    match value {
        Value::Object(map) => {
            let mut table = toml_edit::Table::new();
            for (k, v) in map {
                table.insert(k, toml_item(v)?);
            }
            Ok(toml_edit::Item::Table(table))
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            let mut tables = toml_edit::ArrayOfTables::new();
            for item in items {
                if let toml_edit::Item::Table(table) = toml_item(item)? {
                    tables.push(table);
                }
            }
            Ok(toml_edit::Item::ArrayOfTables(tables))
        }
        other => Ok(toml_edit::Item::Value(toml_value(other)?)),
    }
}

fn toml_value(value: &Value) -> Result<toml_edit::Value> {
    match value {
        Value::Null => Err(Error::invalid_config(
            "TOML cannot store null; unset the key instead",
        )),
        Value::Bool(b) => Ok((*b).into()),
        Value::Number(n) => n
            .as_i64()
            .map(toml_edit::Value::from)
            .or_else(|| n.as_f64().map(toml_edit::Value::from))
            .ok_or_else(|| Error::invalid_config(format!("number out of range: {n}"))),
        Value::String(s) => Ok(s.as_str().into()),
        Value::Array(items) => {
            let mut array = toml_edit::Array::new();
            for item in items {
                array.push(toml_value(item)?);
            }
            Ok(toml_edit::Value::Array(array))
        }
        Value::Object(map) => {
            let mut table = toml_edit::InlineTable::new();
            for (k, v) in map {
                table.insert(k.as_str(), toml_value(v)?);
            }
            Ok(toml_edit::Value::InlineTable(table))
        }
    }
}

fn parse_yaml(content: &str) -> Result<serde_yaml::Value> {
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    Ok(serde_yaml::from_str(content)?)
}

fn yaml_set(content: &str, segments: &[&str], value: &Value) -> Result<String> {
    let mut doc = parse_yaml(content)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| Error::invalid_config("empty config key"))?;

    let mut current = &mut doc;
    for segment in parents {
        current = current
            .as_mapping_mut()
            .ok_or_else(|| not_a_table(segment))?
            .entry(serde_yaml::Value::String(segment.to_string()))
            .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }
    current
        .as_mapping_mut()
        .ok_or_else(|| not_a_table(last))?
        .insert(
            serde_yaml::Value::String(last.to_string()),
            serde_yaml::to_value(value)?,
        );
    Ok(serde_yaml::to_string(&doc)?)
}

fn yaml_unset(content: &str, segments: &[&str]) -> Result<(String, bool)> {
    let mut doc = parse_yaml(content)?;
    let removed = remove_yaml_key(&mut doc, segments);
    Ok((serde_yaml::to_string(&doc)?, removed))
}

fn remove_yaml_key(mut current: &mut serde_yaml::Value, segments: &[&str]) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    for segment in parents {
        match current.as_mapping_mut().and_then(|m| m.get_mut(*segment)) {
            Some(next) => current = next,
            None => return false,
        }
    }
    current
        .as_mapping_mut()
        .and_then(|m| m.remove(*last))
        .is_some()
}
