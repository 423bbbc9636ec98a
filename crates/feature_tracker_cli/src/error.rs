//! CLI error type.

use feature_tracker_core::db::DbError;
use feature_tracker_core::{
    BackupError, LoggingError, RepoError, ServiceError, SettingsError,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type CliResult<T> = Result<T, CliError>;

/// Failures surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Argument parsing failed or help/version was requested.
    Args(clap::Error),
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
    UnknownSetting(String),
    Settings(SettingsError),
    Logging(LoggingError),
    Db(DbError),
    Repo(RepoError),
    Service(ServiceError),
    Backup(BackupError),
    Json(serde_json::Error),
    Output(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Args(err) => write!(f, "{err}"),
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create `{}`: {source}", dir.display())
            }
            Self::UnknownSetting(key) => write!(f, "setting `{key}` is not set"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Backup(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "failed to encode output: {err}"),
            Self::Output(err) => write!(f, "failed to write output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Args(err) => Some(err),
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Settings(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Backup(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Output(err) => Some(err),
            Self::UnknownSetting(_) => None,
        }
    }
}

impl From<clap::Error> for CliError {
    fn from(value: clap::Error) -> Self {
        Self::Args(value)
    }
}

impl From<SettingsError> for CliError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<BackupError> for CliError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Output(value)
    }
}
