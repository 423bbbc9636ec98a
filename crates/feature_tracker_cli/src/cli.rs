//! CLI argument definitions.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Top-level CLI parser for `feature-tracker`.
#[derive(Debug, Parser)]
#[command(
    name = "feature-tracker",
    version,
    about = "Track hub features and keep the store free of duplicate ids"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand; they override stored settings.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// SQLite database file.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Settings JSON file.
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Directory for rolling log files; logging stays off when unset.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored pages.
    Pages,
    /// Add a page.
    AddPage {
        name: String,
        #[arg(long, default_value = "")]
        hub: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
        /// Mark the page as a one-off challenge.
        #[arg(long)]
        challenge: bool,
    },
    /// Add a feature to a page.
    AddFeature {
        page: Uuid,
        /// RFC 3339 timestamp or `YYYY-MM-DD`; defaults to now.
        #[arg(long, value_parser = parse_feature_date)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        raw: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete a page and its features.
    DeletePage { page: Uuid },
    /// Merge duplicates and reassign colliding ids in the store.
    Reconcile {
        /// Also merge same-name pages whose ids differ.
        #[arg(long)]
        merge_semantic: bool,
    },
    /// Replace the store with a JSON backup.
    Import {
        file: PathBuf,
        #[arg(long)]
        merge_semantic: bool,
    },
    /// Write a JSON backup to a file, or stdout when no file is given.
    Export { file: Option<PathBuf> },
    /// Show counters and membership tiers.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Inspect or change stored settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// `settings` subcommands.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print one setting, or all of them.
    Get { key: Option<String> },
    /// Store a value; `true`/`false` and integers keep their type.
    Set { key: String, value: String },
    /// Remove a setting.
    Unset { key: String },
}

fn parse_feature_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
        .ok_or_else(|| format!("`{value}` is neither RFC 3339 nor YYYY-MM-DD"))
}
