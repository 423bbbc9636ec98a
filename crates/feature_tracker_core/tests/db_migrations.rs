use feature_tracker_core::db::migrations::{apply_migrations_up_to, latest_version};
use feature_tracker_core::db::{open_db, open_db_in_memory, DbError};
use feature_tracker_core::{PageRepository, SqlitePageRepository};
use rusqlite::Connection;
use uuid::Uuid;

const SHARED_ID: &str = "5b1f2d7a-3c44-4e8e-9a0b-1d2c3e4f5a6b";
const FEATURE_ID: &str = "0f9e8d7c-6b5a-4433-8221-100f0e0d0c0b";
const SECOND_FEATURE_ID: &str = "a1b2c3d4-e5f6-4789-8abc-def012345678";

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "pages");
    assert_table_exists(&conn, "features");
    assert_index_exists(&conn, "idx_pages_uuid");
    assert_index_exists(&conn, "idx_features_uuid");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "pages");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn legacy_store_with_colliding_ids_is_reconciled_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite3");

    let mut conn = Connection::open(&path).unwrap();
    apply_migrations_up_to(&mut conn, 2).unwrap();
    assert_eq!(schema_version(&conn), 2);
    conn.execute_batch(&format!(
        "INSERT INTO pages (uuid, name, notes, count, sort_order) VALUES
            ('{SHARED_ID}', 'abstract', '', 1, 0),
            ('{SHARED_ID}', 'abstract', 'copy', 1, 1),
            ('{SHARED_ID}', 'nature', '', 1, 2);
         INSERT INTO features (uuid, page_row_id, feature_date, raw, notes, sort_order) VALUES
            ('{FEATURE_ID}', 1, '2023-11-05T18:00:00Z', 0, 'one', 0),
            ('{FEATURE_ID}', 2, '2023-11-05T18:00:00Z', 0, 'one', 0),
            ('{SECOND_FEATURE_ID}', 2, '2024-01-02T09:30:00Z', 1, 'two', 1);"
    ))
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());

    let repo = SqlitePageRepository::try_new(&conn).unwrap();
    let pages = repo.load_all_pages().unwrap();
    assert_eq!(pages.len(), 2);

    let shared = Uuid::parse_str(SHARED_ID).unwrap();
    assert_eq!(pages[0].id, shared);
    assert_eq!(pages[0].name, "abstract");
    let notes: Vec<_> = pages[0]
        .features
        .iter()
        .map(|feature| feature.notes.as_str())
        .collect();
    assert_eq!(notes, vec!["one", "two"]);

    assert_eq!(pages[1].name, "nature");
    assert_ne!(pages[1].id, shared);
}

#[test]
fn legacy_store_with_free_text_hub_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy_hub.sqlite3");

    let mut conn = Connection::open(&path).unwrap();
    apply_migrations_up_to(&mut conn, 2).unwrap();
    conn.execute_batch(&format!(
        "INSERT INTO pages (uuid, name, hub, notes, count, sort_order) VALUES
            ('{SHARED_ID}', 'Abstract', 'Snap Hub', '', 1, 0),
            ('{SHARED_ID}', 'nature', 'snap', '', 1, 1);"
    ))
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    let repo = SqlitePageRepository::try_new(&conn).unwrap();
    let pages = repo.load_all_pages().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].hub, "Snap Hub");
    assert_ne!(pages[0].id, pages[1].id);
}

#[test]
fn unique_index_rejects_colliding_insert_after_migration() {
    let conn = open_db_in_memory().unwrap();
    let insert = format!(
        "INSERT INTO pages (uuid, name, hub, notes, count, is_challenge, sort_order)
         VALUES ('{SHARED_ID}', 'abstract', 'snap', '', 1, 0, 0);"
    );
    conn.execute_batch(&insert).unwrap();

    assert!(conn.execute_batch(&insert).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
