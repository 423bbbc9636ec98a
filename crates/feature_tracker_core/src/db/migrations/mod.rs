//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Run per-migration data steps and SQL atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A data step runs inside the migration transaction, before its SQL.

mod dedupe;

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

type DataStep = fn(&Connection) -> DbResult<()>;

#[derive(Clone, Copy)]
struct Migration {
    version: u32,
    data_step: Option<DataStep>,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        data_step: None,
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        data_step: None,
        sql: include_str!("0002_page_hub.sql"),
    },
    Migration {
        version: 3,
        data_step: Some(dedupe::reconcile_stored_identifiers),
        sql: include_str!("0003_unique_ids.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_migrations_up_to(conn, latest_version())
}

/// Applies pending migrations up to and including `target`.
///
/// Used to stage legacy stores in tests and import tooling.
pub fn apply_migrations_up_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version >= target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version || migration.version > target {
            continue;
        }

        if let Some(step) = migration.data_step {
            step(&tx)?;
        }
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={}",
            migration.version
        );
    }
    tx.commit()?;

    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
