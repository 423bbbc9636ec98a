//! Typed key/value settings with write-through to a JSON file.
//!
//! # Responsibility
//! - Hold small user preferences (database path, log level, reconcile mode).
//! - Persist every mutation immediately.
//!
//! # Invariants
//! - Values are one of int/string/bool; typed getters never coerce.
//! - A failed write leaves both the file and the in-memory map unchanged.
//! - Constructed explicitly by the host and passed by reference.

use crate::fsutil::write_atomically;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Key for the SQLite database location.
pub const KEY_DATABASE_PATH: &str = "database_path";
/// Key for the log level used by front ends.
pub const KEY_LOG_LEVEL: &str = "log_level";
/// Key for the log directory used by front ends.
pub const KEY_LOG_DIR: &str = "log_dir";
/// Key for `ReconcileOptions::merge_semantic_duplicates`.
pub const KEY_MERGE_SEMANTIC: &str = "merge_semantic_duplicates";

/// One stored setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl SettingValue {
    /// Parses command-line text: `true`/`false`, then integers, else string.
    pub fn parse_loose(text: &str) -> Self {
        match text {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            other => other
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Str(other.to_string())),
        }
    }
}

impl Display for SettingValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
        }
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Encode(serde_json::Error),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "settings file `{}` unavailable: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "settings file `{}` is malformed: {source}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode settings: {err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
        }
    }
}

/// File-backed settings map.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl SettingsStore {
    /// Loads settings from `path`; a missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let values: BTreeMap<String, SettingValue> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                warn!("event=settings_load module=settings status=error error_code=parse_failed");
                SettingsError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        info!(
            "event=settings_load module=settings status=ok keys={}",
            values.len()
        );
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Returns the int stored at `key`, `None` when absent or not an int.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(SettingValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string stored at `key`, `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the bool stored at `key`, `None` when absent or not a bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(SettingValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Stores `value` and writes the file through.
    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) -> SettingsResult<()> {
        let mut next = self.values.clone();
        next.insert(key.to_string(), value.into());
        self.commit(next)
    }

    /// Removes `key`; returns whether it existed.
    pub fn remove(&mut self, key: &str) -> SettingsResult<bool> {
        if !self.values.contains_key(key) {
            return Ok(false);
        }
        let mut next = self.values.clone();
        next.remove(key);
        self.commit(next)?;
        Ok(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn commit(&mut self, next: BTreeMap<String, SettingValue>) -> SettingsResult<()> {
        let json = serde_json::to_string_pretty(&next).map_err(SettingsError::Encode)?;
        write_atomically(&self.path, json.as_bytes()).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.values = next;
        Ok(())
    }
}
