//! Data step for migration 3: reconcile identifiers before unique indexes.

use crate::db::{DbError, DbResult};
use crate::reconcile::reconcile;
use crate::repo::page_repo::{read_all_pages, write_all_pages};
use crate::repo::RepoError;
use log::info;
use rusqlite::Connection;

const VERSION: u32 = 3;

/// Rewrites stored pages so every page/feature uuid is unique.
///
/// Leaves the tables untouched when nothing collides.
pub(super) fn reconcile_stored_identifiers(conn: &Connection) -> DbResult<()> {
    let pages = read_all_pages(conn).map_err(into_db_error)?;
    let outcome = reconcile(pages);
    if outcome.report.is_noop() {
        return Ok(());
    }

    write_all_pages(conn, &outcome.pages).map_err(into_db_error)?;
    info!(
        "event=db_migrate_dedupe module=db status=ok version={VERSION} pages={} merged_pages={} reassigned_ids={}",
        outcome.pages.len(),
        outcome.report.merged_pages,
        outcome.report.reassigned_page_ids + outcome.report.reassigned_feature_ids
    );
    Ok(())
}

fn into_db_error(err: RepoError) -> DbError {
    match err {
        RepoError::Db(err) => err,
        other => DbError::MigrationData {
            version: VERSION,
            message: other.to_string(),
        },
    }
}
