//! Page and feature domain model.
//!
//! # Responsibility
//! - Define the page/feature records shared by storage, backup and reconcile.
//! - Own name/hub normalization and write-path validation.
//!
//! # Invariants
//! - A `Page` exclusively owns its `features`; dropping the page drops them.
//! - `count` is a positive multiplier (`>= 1`).
//! - Page and feature ids live in one identifier space.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a page.
pub type PageId = Uuid;

/// Stable identifier of a feature. Shares the id space with [`PageId`].
pub type FeatureId = Uuid;

/// Hub tag applied when older data carries none.
pub const DEFAULT_HUB: &str = "snap";

static HUB_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid hub tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Validation failures for page write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Name is empty after trim.
    BlankName,
    /// `count` must be at least one.
    NonPositiveCount,
    /// Hub tag is not a lowercase slug.
    InvalidHub(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "page name must not be blank"),
            Self::NonPositiveCount => write!(f, "page count must be at least 1"),
            Self::InvalidHub(hub) => write!(f, "invalid hub tag `{hub}`"),
        }
    }
}

impl Error for ModelValidationError {}

/// One dated feature entry on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub id: FeatureId,
    pub date: DateTime<Utc>,
    /// `true` for the RAW hub variant, `false` for Snap.
    pub raw: bool,
    pub notes: String,
}

impl Feature {
    /// Creates a feature with a generated id.
    pub fn new(date: DateTime<Utc>, raw: bool, notes: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), date, raw, notes)
    }

    /// Creates a feature with a caller-provided id (import paths).
    pub fn with_id(id: FeatureId, date: DateTime<Utc>, raw: bool, notes: impl Into<String>) -> Self {
        Self {
            id,
            date,
            raw,
            notes: notes.into(),
        }
    }

    /// Semantic identity: same notes and same date.
    pub fn is_same_record(&self, other: &Feature) -> bool {
        self.notes == other.notes && self.date == other.date
    }
}

/// One hub category page and the features it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    /// Lowercase hub/category slug.
    pub name: String,
    /// Origin hub tag, `DEFAULT_HUB` for legacy records.
    pub hub: String,
    pub notes: String,
    /// How many slots this page counts as in statistics.
    pub count: u32,
    /// One-off challenge page rather than a recurring hub page.
    pub is_challenge: bool,
    pub features: Vec<Feature>,
}

impl Page {
    /// Creates an empty page with a generated id and default fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates an empty page with a caller-provided id.
    pub fn with_id(id: PageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hub: DEFAULT_HUB.to_string(),
            notes: String::new(),
            count: 1,
            is_challenge: false,
            features: Vec::new(),
        }
    }

    /// Semantic identity: same name and same challenge flag.
    ///
    /// No other field participates.
    pub fn is_same_record(&self, other: &Page) -> bool {
        self.name == other.name && self.is_challenge == other.is_challenge
    }

    /// Validates fields every stored page must satisfy.
    ///
    /// Imported and legacy pages only go through this check; name and hub
    /// are free text there.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.count == 0 {
            return Err(ModelValidationError::NonPositiveCount);
        }
        Ok(())
    }

    /// Stricter check for pages created from user input: non-blank name and
    /// a lowercase slug hub tag.
    pub fn validate_new(&self) -> Result<(), ModelValidationError> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::BlankName);
        }
        if !HUB_TAG_RE.is_match(&self.hub) {
            return Err(ModelValidationError::InvalidHub(self.hub.clone()));
        }
        Ok(())
    }

    /// Iterates page id followed by every feature id.
    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.id).chain(self.features.iter().map(|feature| feature.id))
    }
}

/// Normalizes user input into a page name slug.
///
/// Trims, lowercases and collapses inner whitespace to one space.
pub fn normalize_page_name(input: &str) -> String {
    WHITESPACE_RE
        .replace_all(input.trim(), " ")
        .to_lowercase()
}

/// Normalizes a hub tag, falling back to `DEFAULT_HUB` when blank.
pub fn normalize_hub(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_HUB.to_string()
    } else {
        trimmed.to_lowercase()
    }
}
