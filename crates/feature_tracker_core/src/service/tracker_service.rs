//! Tracker use-case service.
//!
//! # Responsibility
//! - Provide add/delete/list entry points for front ends.
//! - Run the reconciler at load and restore time and persist its result.
//!
//! # Invariants
//! - A backup that fails to decode never reaches the repository.
//! - Reconciled output is written with one `save_all_pages` call.
//! - Service layer remains storage-agnostic.

use crate::backup::{decode_backup, encode_backup, BackupDecodeError, BackupError};
use crate::model::page::{normalize_hub, normalize_page_name, Feature, FeatureId, Page, PageId};
use crate::reconcile::{RandomIdGenerator, ReconcileOptions, ReconcileReport, Reconciler};
use crate::repo::page_repo::PageRepository;
use crate::repo::RepoError;
use crate::service::statistics::{compute_statistics, TrackerStatistics};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from tracker service operations.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    /// Backup text could not be decoded; the store was not touched.
    Decode(BackupDecodeError),
    Backup(BackupError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Decode(err) => write!(f, "{err}"),
            Self::Backup(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Backup(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<BackupDecodeError> for ServiceError {
    fn from(value: BackupDecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<BackupError> for ServiceError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}

/// Request model for adding a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    /// Raw user input; normalized to a lowercase slug.
    pub name: String,
    /// Hub tag; blank falls back to the default hub.
    pub hub: String,
    pub notes: String,
    pub count: u32,
    pub is_challenge: bool,
}

impl NewPage {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hub: String::new(),
            notes: String::new(),
            count: 1,
            is_challenge: false,
        }
    }
}

/// Request model for adding a feature to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeature {
    pub date: DateTime<Utc>,
    pub raw: bool,
    pub notes: String,
}

/// Use-case service over a page repository.
pub struct TrackerService<R: PageRepository> {
    repo: R,
}

impl<R: PageRepository> TrackerService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a page from user input and returns its id.
    pub fn add_page(&self, request: &NewPage) -> ServiceResult<PageId> {
        let mut page = Page::new(normalize_page_name(&request.name));
        page.hub = normalize_hub(&request.hub);
        page.notes = request.notes.clone();
        page.count = request.count;
        page.is_challenge = request.is_challenge;
        Ok(self.repo.create_page(&page)?)
    }

    /// Appends a feature to an existing page.
    pub fn add_feature(&self, page_id: PageId, request: &NewFeature) -> ServiceResult<FeatureId> {
        let feature = Feature::new(request.date, request.raw, request.notes.clone());
        Ok(self.repo.add_feature(page_id, &feature)?)
    }

    /// Deletes a page together with its features.
    pub fn delete_page(&self, page_id: PageId) -> ServiceResult<()> {
        Ok(self.repo.delete_page(page_id)?)
    }

    pub fn get_page(&self, page_id: PageId) -> ServiceResult<Option<Page>> {
        Ok(self.repo.get_page(page_id)?)
    }

    pub fn list_pages(&self) -> ServiceResult<Vec<Page>> {
        Ok(self.repo.load_all_pages()?)
    }

    /// Reconciles the stored collection, saving only when it changed.
    pub fn reconcile_store(&self, options: ReconcileOptions) -> ServiceResult<ReconcileReport> {
        let pages = self.repo.load_all_pages()?;
        let outcome = Reconciler::with_options(RandomIdGenerator, options).run(pages);
        if !outcome.report.is_noop() {
            self.repo.save_all_pages(&outcome.pages)?;
        }
        Ok(outcome.report)
    }

    /// Replaces the store with a decoded, reconciled backup.
    ///
    /// Decode failures are returned before any write.
    pub fn restore_backup(
        &self,
        document: &str,
        options: ReconcileOptions,
    ) -> ServiceResult<ReconcileReport> {
        let pages = match decode_backup(document) {
            Ok(pages) => pages,
            Err(err) => {
                warn!(
                    "event=backup_restore module=service status=error error_code=decode_failed kind={}",
                    err.kind()
                );
                return Err(err.into());
            }
        };

        let outcome = Reconciler::with_options(RandomIdGenerator, options).run(pages);
        self.repo.save_all_pages(&outcome.pages)?;
        info!(
            "event=backup_restore module=service status=ok pages={}",
            outcome.pages.len()
        );
        Ok(outcome.report)
    }

    /// Encodes the stored collection as a backup document.
    pub fn export_backup(&self) -> ServiceResult<String> {
        let pages = self.repo.load_all_pages()?;
        Ok(encode_backup(&pages)?)
    }

    pub fn statistics(&self) -> ServiceResult<TrackerStatistics> {
        let pages = self.repo.load_all_pages()?;
        Ok(compute_statistics(&pages))
    }
}
