use folio_core::db::migrations::{self, latest_version};
use folio_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "content");
    assert_table_exists(&conn, "tags");
    assert_table_exists(&conn, "content_tags");
    assert_table_exists(&conn, "content_attributes");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "content");
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
fn content_indexes_enforce_address_and_canonical_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO content (
            slug, address, canonical_id, content_uri, date_created, date_updated, title, lang
        ) VALUES (?1, ?2, ?3, 'file://pages/x.md', 'd', 'd', 't', ?4);";

    conn.execute(insert, ["a", "/a", "/a", "en"]).unwrap();
    assert!(conn.execute(insert, ["a", "/a", "/other", "en"]).is_err());
    assert!(conn.execute(insert, ["b", "/b", "/a", "en"]).is_err());
    conn.execute(insert, ["b", "/b", "/a", "fr"]).unwrap();
}

#[test]
fn deleting_content_cascades_to_links() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO content (id, slug, address, canonical_id, content_uri, date_created, date_updated, title)
         VALUES (1, 'a', '/a', '/a', 'file://pages/a.md', 'd', 'd', 't');
         INSERT INTO tags (id, name) VALUES (1, 'news');
         INSERT INTO content_tags (content_id, tag_id) VALUES (1, 1);
         INSERT INTO content_attributes (content_id, key, value) VALUES (1, 'k', 'v');
         DELETE FROM content WHERE id = 1;",
    )
    .unwrap();

    assert_eq!(count(&conn, "content_tags"), 0);
    assert_eq!(count(&conn, "content_attributes"), 0);
    assert_eq!(count(&conn, "tags"), 1);
}

fn schema_version(conn: &Connection) -> u32 {
    migrations::schema_version(conn).unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
