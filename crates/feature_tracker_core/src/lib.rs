//! Core domain logic for Feature Tracker.
//! Front ends call into this crate for storage, backup and reconciliation.

pub mod backup;
pub mod db;
mod fsutil;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;
pub mod settings;

pub use backup::{
    decode_backup, encode_backup, read_backup_file, write_backup_file, BackupDecodeError,
    BackupError,
};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::page::{
    normalize_hub, normalize_page_name, Feature, FeatureId, ModelValidationError, Page, PageId,
    DEFAULT_HUB,
};
pub use reconcile::{
    reconcile, IdGenerator, RandomIdGenerator, ReconcileOptions, ReconcileOutcome,
    ReconcileReport, Reconciler, SequenceIdGenerator,
};
pub use repo::page_repo::{PageRepository, SqlitePageRepository};
pub use repo::{RepoError, RepoResult};
pub use service::statistics::{compute_statistics, MembershipTier, TrackerStatistics};
pub use service::tracker_service::{
    NewFeature, NewPage, ServiceError, ServiceResult, TrackerService,
};
pub use settings::{SettingValue, SettingsError, SettingsStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
