//! JSON backup import/export.
//!
//! # Responsibility
//! - Convert page collections to and from the portable backup document.
//! - Report malformed documents as structured decode errors.
//!
//! # Invariants
//! - Decoding never touches any store; callers apply the result.
//! - Export always writes `dateV2`; import also accepts legacy numeric `date`.
//! - File export replaces the target atomically.

mod json;

pub use json::{decode_backup, encode_backup, REFERENCE_EPOCH_UNIX_SECONDS};

use crate::fsutil::write_atomically;
use crate::model::page::Page;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Why a backup document could not be decoded.
///
/// `path` is the coding path of the offending element, e.g.
/// `[0].features[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupDecodeError {
    /// Not valid JSON, or a value that cannot represent its field
    /// (bad uuid, unparsable date, non-positive count).
    CorruptedPayload { path: String, message: String },
    /// Required key absent from an object.
    MissingKey { path: String, key: String },
    /// Required key present with `null`.
    MissingValue { path: String, key: String },
    /// Value has the wrong JSON type.
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Display for BackupDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorruptedPayload { path, message } => {
                write!(f, "corrupted backup payload at `{path}`: {message}")
            }
            Self::MissingKey { path, key } => {
                write!(f, "backup is missing key `{key}` at `{path}`")
            }
            Self::MissingValue { path, key } => {
                write!(f, "backup has null value for `{key}` at `{path}`")
            }
            Self::TypeMismatch {
                path,
                expected,
                found,
            } => write!(f, "backup type mismatch at `{path}`: expected {expected}, found {found}"),
        }
    }
}

impl BackupDecodeError {
    /// Stable category name for logs and front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CorruptedPayload { .. } => "corrupted_payload",
            Self::MissingKey { .. } => "missing_key",
            Self::MissingValue { .. } => "missing_value",
            Self::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

impl Error for BackupDecodeError {}

pub type BackupResult<T> = Result<T, BackupError>;

/// Backup file/codec failure.
#[derive(Debug)]
pub enum BackupError {
    Decode(BackupDecodeError),
    Encode(serde_json::Error),
    Io { path: PathBuf, source: std::io::Error },
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode backup: {err}"),
            Self::Io { path, source } => {
                write!(f, "backup file `{}` unavailable: {source}", path.display())
            }
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<BackupDecodeError> for BackupError {
    fn from(value: BackupDecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Reads and decodes a backup file.
pub fn read_backup_file(path: impl AsRef<Path>) -> BackupResult<Vec<Page>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let pages = decode_backup(&contents)?;
    info!(
        "event=backup_read module=backup status=ok pages={}",
        pages.len()
    );
    Ok(pages)
}

/// Encodes `pages` and atomically replaces the file at `path`.
///
/// On failure the previous file, if any, is left as it was.
pub fn write_backup_file(path: impl AsRef<Path>, pages: &[Page]) -> BackupResult<()> {
    let path = path.as_ref();
    let document = encode_backup(pages)?;
    if let Err(source) = write_atomically(path, document.as_bytes()) {
        error!(
            "event=backup_write module=backup status=error error_code=write_failed error={}",
            source
        );
        return Err(BackupError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    info!(
        "event=backup_write module=backup status=ok pages={} bytes={}",
        pages.len(),
        document.len()
    );
    Ok(())
}
