//! Connection readiness checks shared by the SQLite repositories.

use crate::repo::content_repo::{StoreError, StoreResult};
use rusqlite::Connection;

const CONTENT_COLUMNS: &[&str] = &[
    "id",
    "active",
    "parent_address",
    "slug",
    "address",
    "canonical_id",
    "content_class",
    "content_type",
    "content_uri",
    "date_created",
    "date_updated",
    "date_expired",
    "lang",
    "title",
    "author",
    "img_prefix",
    "has_img",
    "set_by_system",
];

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("content", CONTENT_COLUMNS),
    ("tags", &["id", "name"]),
    ("content_tags", &["content_id", "tag_id"]),
    ("content_attributes", &["content_id", "key", "value"]),
];

/// Fails unless every table and column the content store touches exists.
pub(crate) fn ensure_content_schema(conn: &Connection) -> StoreResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
