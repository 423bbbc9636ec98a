//! Resolves settings, database location and logging for one invocation.
//!
//! Precedence for every knob: command-line flag, then stored setting, then
//! the platform default.

use crate::cli::GlobalArgs;
use crate::error::{CliError, CliResult};
use feature_tracker_core::settings::{
    KEY_DATABASE_PATH, KEY_LOG_DIR, KEY_LOG_LEVEL, KEY_MERGE_SEMANTIC,
};
use feature_tracker_core::{init_logging, LogLevel, ReconcileOptions, SettingsStore};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "feature_tracker";
const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "tracker.sqlite3";

/// Per-invocation state shared by command handlers.
pub struct AppContext {
    pub global: GlobalArgs,
    pub settings: SettingsStore,
}

impl AppContext {
    /// Opens the settings file and starts logging when a log directory is known.
    pub fn load(global: GlobalArgs) -> CliResult<Self> {
        let settings_path = global
            .settings
            .clone()
            .unwrap_or_else(default_settings_path);
        let settings = SettingsStore::open(settings_path)?;
        let context = Self { global, settings };
        context.start_logging()?;
        Ok(context)
    }

    /// Database file, creating its parent directory when needed.
    pub fn database_path(&self) -> CliResult<PathBuf> {
        let path = match (&self.global.db, self.settings.get_str(KEY_DATABASE_PATH)) {
            (Some(path), _) => path.clone(),
            (None, Some(stored)) => PathBuf::from(stored),
            (None, None) => default_data_dir().join(DATABASE_FILE),
        };
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CliError::CreateDirectory {
                dir: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(path)
    }

    /// Reconcile options; `merge_semantic` forces semantic merging on.
    pub fn reconcile_options(&self, merge_semantic: bool) -> ReconcileOptions {
        ReconcileOptions {
            merge_semantic_duplicates: merge_semantic
                || self.settings.get_bool(KEY_MERGE_SEMANTIC).unwrap_or(false),
        }
    }

    fn start_logging(&self) -> CliResult<()> {
        let log_dir = match (&self.global.log_dir, self.settings.get_str(KEY_LOG_DIR)) {
            (Some(dir), _) => dir.clone(),
            (None, Some(stored)) => PathBuf::from(stored),
            (None, None) => return Ok(()),
        };
        let level = match (&self.global.log_level, self.settings.get_str(KEY_LOG_LEVEL)) {
            (Some(level), _) => level.parse()?,
            (None, Some(stored)) => stored.parse()?,
            (None, None) => LogLevel::build_default(),
        };
        init_logging(level, absolute(&log_dir))?;
        Ok(())
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(SETTINGS_FILE)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
