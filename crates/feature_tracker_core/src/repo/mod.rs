//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the "load all / save all" contract the service layer relies on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate pages before SQL mutations; `create_page` applies
//!   the stricter user-input check.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to DB transport errors.

pub mod page_repo;

use crate::db::DbError;
use crate::model::page::ModelValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for page/feature persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    /// No page with this id.
    NotFound(Uuid),
    /// Id already used by a stored page or feature.
    DuplicateId(Uuid),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be converted to the domain model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "page not found: {id}"),
            Self::DuplicateId(id) => write!(f, "identifier already in use: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "page repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted page data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::DuplicateId(_)
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
