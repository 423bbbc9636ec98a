//! Rolling file log bootstrap.
//!
//! # Responsibility
//! - Start file-based rolling logs at most once per process.
//! - Keep core events metadata-only: ids and counters, never notes or names.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and directory is a no-op.
//! - A different level or directory after startup is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "feature_tracker";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: LogLevel,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Supported log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `debug` in debug builds, `info` in release builds.
    pub fn build_default() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::UnsupportedLevel(other.to_string())),
        }
    }
}

/// Logging bootstrap failures.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeDirectory(PathBuf),
    CreateDirectory { dir: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with another level or directory.
    AlreadyInitialized { level: LogLevel, log_dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDirectory(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyInitialized { level, log_dir } => write!(
                f,
                "logging already initialized with level `{}` at `{}`",
                level.as_str(),
                log_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::UnsupportedLevel(_)
            | Self::RelativeDirectory(_)
            | Self::AlreadyInitialized { .. } => None,
        }
    }
}

/// Starts rolling file logs in `log_dir` at `level`.
///
/// # Errors
/// - `log_dir` is relative or cannot be created.
/// - The backend fails to start.
/// - Logging is already active with a different level or directory.
pub fn init_logging(level: LogLevel, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let log_dir = log_dir.as_ref();
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(log_dir.to_path_buf()));
    }

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(level, log_dir))?;
    if active.level != level || active.log_dir != log_dir {
        return Err(LoggingError::AlreadyInitialized {
            level: active.level,
            log_dir: active.log_dir.clone(),
        });
    }
    Ok(())
}

/// Returns `(level, log_dir)` when logging is active.
pub fn logging_status() -> Option<(LogLevel, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

fn start_logger(level: LogLevel, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        dir: log_dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::try_with_str(level.as_str())
        .map_err(LoggingError::Backend)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    info!(
        "event=logging_start module=core status=ok level={} version={} platform={}",
        level.as_str(),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, LogLevel, LoggingError};
    use std::path::Path;

    #[test]
    fn level_parsing_accepts_aliases_and_rejects_unknown() {
        assert_eq!(" WARNING ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!(matches!(
            "verbose".parse::<LogLevel>(),
            Err(LoggingError::UnsupportedLevel(_))
        ));
    }

    #[test]
    fn relative_directory_is_rejected() {
        let err = init_logging(LogLevel::Info, Path::new("logs/dev")).unwrap_err();
        assert!(matches!(err, LoggingError::RelativeDirectory(_)));
    }

    #[test]
    fn init_is_idempotent_and_rejects_reconfiguration() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        init_logging(LogLevel::Info, first.path()).unwrap();
        init_logging(LogLevel::Info, first.path()).unwrap();

        let err = init_logging(LogLevel::Debug, first.path()).unwrap_err();
        assert!(matches!(err, LoggingError::AlreadyInitialized { .. }));
        let err = init_logging(LogLevel::Info, second.path()).unwrap_err();
        assert!(matches!(err, LoggingError::AlreadyInitialized { .. }));

        let (level, dir) = logging_status().unwrap();
        assert_eq!(level, LogLevel::Info);
        assert_eq!(dir, first.path());
    }
}
