//! Page repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Load and replace the whole page collection (the reconcile boundary).
//! - Provide single-record writes for add/delete user actions.
//!
//! # Invariants
//! - `save_all_pages` replaces everything in one immediate transaction; a
//!   failure leaves the previous rows in place.
//! - Listing order is deterministic: `sort_order ASC, row_id ASC`.
//! - Deleting a page deletes its features (`ON DELETE CASCADE`).

use crate::db::migrations::latest_version;
use crate::model::page::{Feature, FeatureId, Page, PageId};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const PAGE_SELECT_SQL: &str = "SELECT
    row_id,
    uuid,
    name,
    hub,
    notes,
    count,
    is_challenge
FROM pages";

const FEATURE_SELECT_SQL: &str = "SELECT
    page_row_id,
    uuid,
    feature_date,
    raw,
    notes
FROM features";

/// Repository interface for the tracked page collection.
pub trait PageRepository {
    /// Loads every page with its features, in stored order.
    fn load_all_pages(&self) -> RepoResult<Vec<Page>>;
    /// Atomically replaces the stored collection with `pages`.
    fn save_all_pages(&self, pages: &[Page]) -> RepoResult<()>;
    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>>;
    /// Appends one page (and any features it carries).
    fn create_page(&self, page: &Page) -> RepoResult<PageId>;
    /// Appends one feature to an existing page.
    fn add_feature(&self, page_id: PageId, feature: &Feature) -> RepoResult<FeatureId>;
    /// Deletes one page and its features.
    fn delete_page(&self, id: PageId) -> RepoResult<()>;
}

/// SQLite-backed page repository.
pub struct SqlitePageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePageRepository<'conn> {
    /// Creates repository from a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl PageRepository for SqlitePageRepository<'_> {
    fn load_all_pages(&self) -> RepoResult<Vec<Page>> {
        read_all_pages(self.conn)
    }

    fn save_all_pages(&self, pages: &[Page]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Err(err) = write_all_pages(&tx, pages) {
            error!(
                "event=pages_save module=repo status=error error_code=save_failed error={}",
                err
            );
            return Err(err);
        }
        tx.commit()?;
        info!(
            "event=pages_save module=repo status=ok pages={}",
            pages.len()
        );
        Ok(())
    }

    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAGE_SELECT_SQL} WHERE uuid = ?1 LIMIT 1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let (row_id, mut page) = parse_page_row(row)?;

        let mut stmt = self.conn.prepare(&format!(
            "{FEATURE_SELECT_SQL} WHERE page_row_id = ?1 ORDER BY sort_order ASC, row_id ASC;"
        ))?;
        let mut rows = stmt.query([row_id])?;
        while let Some(row) = rows.next()? {
            let (_, feature) = parse_feature_row(row)?;
            page.features.push(feature);
        }
        Ok(Some(page))
    }

    fn create_page(&self, page: &Page) -> RepoResult<PageId> {
        page.validate_new()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for id in page.ids() {
            ensure_id_unused(&tx, id)?;
        }
        let sort_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM pages;",
            [],
            |row| row.get(0),
        )?;
        insert_page(&tx, page, sort_order)?;
        tx.commit()?;

        Ok(page.id)
    }

    fn add_feature(&self, page_id: PageId, feature: &Feature) -> RepoResult<FeatureId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let page_row_id: i64 = tx
            .query_row(
                "SELECT row_id FROM pages WHERE uuid = ?1;",
                [page_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(page_id))?;
        ensure_id_unused(&tx, feature.id)?;

        let sort_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM features WHERE page_row_id = ?1;",
            [page_row_id],
            |row| row.get(0),
        )?;
        insert_feature(&tx, page_row_id, feature, sort_order)?;
        tx.commit()?;

        Ok(feature.id)
    }

    fn delete_page(&self, id: PageId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM pages WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

/// Reads the full collection without checking schema version.
///
/// Shared with the migration data step, which runs before the final version.
pub(crate) fn read_all_pages(conn: &Connection) -> RepoResult<Vec<Page>> {
    let mut pages = Vec::new();
    let mut index_by_row: HashMap<i64, usize> = HashMap::new();

    let mut stmt = conn.prepare(&format!(
        "{PAGE_SELECT_SQL} ORDER BY sort_order ASC, row_id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (row_id, page) = parse_page_row(row)?;
        index_by_row.insert(row_id, pages.len());
        pages.push(page);
    }

    let mut stmt = conn.prepare(&format!(
        "{FEATURE_SELECT_SQL} ORDER BY page_row_id ASC, sort_order ASC, row_id ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (page_row_id, feature) = parse_feature_row(row)?;
        let index = index_by_row.get(&page_row_id).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "feature {} references missing page row {page_row_id}",
                feature.id
            ))
        })?;
        pages[*index].features.push(feature);
    }

    Ok(pages)
}

/// Replaces all rows with `pages`. Caller owns the transaction.
pub(crate) fn write_all_pages(conn: &Connection, pages: &[Page]) -> RepoResult<()> {
    for page in pages {
        page.validate()?;
    }

    conn.execute("DELETE FROM features;", [])?;
    conn.execute("DELETE FROM pages;", [])?;
    for (sort_order, page) in (0_i64..).zip(pages) {
        insert_page(conn, page, sort_order)?;
    }
    Ok(())
}

fn insert_page(conn: &Connection, page: &Page, sort_order: i64) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO pages (
            uuid,
            name,
            hub,
            notes,
            count,
            is_challenge,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            page.id.to_string(),
            page.name.as_str(),
            page.hub.as_str(),
            page.notes.as_str(),
            i64::from(page.count),
            bool_to_int(page.is_challenge),
            sort_order,
        ],
    )?;
    let page_row_id = conn.last_insert_rowid();

    for (feature_order, feature) in (0_i64..).zip(&page.features) {
        insert_feature(conn, page_row_id, feature, feature_order)?;
    }
    Ok(())
}

fn insert_feature(
    conn: &Connection,
    page_row_id: i64,
    feature: &Feature,
    sort_order: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO features (
            uuid,
            page_row_id,
            feature_date,
            raw,
            notes,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            feature.id.to_string(),
            page_row_id,
            date_to_db(feature.date),
            bool_to_int(feature.raw),
            feature.notes.as_str(),
            sort_order,
        ],
    )?;
    Ok(())
}

fn ensure_id_unused(conn: &Connection, id: Uuid) -> RepoResult<()> {
    let in_use: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pages WHERE uuid = ?1)
             OR EXISTS(SELECT 1 FROM features WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if in_use != 0 {
        return Err(RepoError::DuplicateId(id));
    }
    Ok(())
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<(i64, Page)> {
    let row_id: i64 = row.get("row_id")?;
    let uuid_text: String = row.get("uuid")?;
    let count_value: i64 = row.get("count")?;
    let count = u32::try_from(count_value).map_err(|_| {
        RepoError::InvalidData(format!("invalid count `{count_value}` in pages.count"))
    })?;

    let page = Page {
        id: parse_uuid(&uuid_text, "pages.uuid")?,
        name: row.get("name")?,
        hub: row.get("hub")?,
        notes: row.get("notes")?,
        count,
        is_challenge: int_to_bool(row.get("is_challenge")?, "pages.is_challenge")?,
        features: Vec::new(),
    };
    Ok((row_id, page))
}

fn parse_feature_row(row: &Row<'_>) -> RepoResult<(i64, Feature)> {
    let page_row_id: i64 = row.get("page_row_id")?;
    let uuid_text: String = row.get("uuid")?;
    let date_text: String = row.get("feature_date")?;

    let feature = Feature {
        id: parse_uuid(&uuid_text, "features.uuid")?,
        date: date_from_db(&date_text)?,
        raw: int_to_bool(row.get("raw")?, "features.raw")?,
        notes: row.get("notes")?,
    };
    Ok((page_row_id, feature))
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn date_to_db(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn date_from_db(value: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!("invalid date `{value}` in features.feature_date"))
        })
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
