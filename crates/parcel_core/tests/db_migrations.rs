use parcel_core::db::migrations::latest_version;
use parcel_core::db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
use parcel_core::{Parcel, ParcelRepository, SqliteParcelRepository};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_object_exists(&conn, "table", "parcel");
    assert_object_exists(&conn, "index", "idx_parcel_client");
}

#[test]
fn in_memory_databases_are_isolated() {
    let first = open_db_in_memory().unwrap();
    let second = open_db_in_memory().unwrap();

    SqliteParcelRepository::try_new(&first)
        .unwrap()
        .add_parcel(&Parcel::new(1, "a"))
        .unwrap();

    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM parcel;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn reopening_file_database_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let conn_first = open_db(&path).unwrap();
    let number = SqliteParcelRepository::try_new(&conn_first)
        .unwrap()
        .add_parcel(&Parcel::new(1000, "test"))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let loaded = SqliteParcelRepository::try_new(&conn_second)
        .unwrap()
        .get_parcel(number)
        .unwrap();
    assert_eq!(loaded.address, "test");
}

#[test]
fn open_with_options_applies_busy_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let options = DbOptions {
        busy_timeout: Duration::from_millis(250),
    };

    let conn = open_db_with_options(dir.path().join("tracker.db"), &options).unwrap();
    let timeout_ms: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timeout_ms, 250);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_object_exists(conn: &Connection, kind: &str, name: &str) {
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
