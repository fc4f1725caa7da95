//! Storage layer of the content store.
//!
//! # Responsibility
//! - Hand out SQLite connections whose schema matches this build.
//! - Report storage failures with enough context to tell a failed schema
//!   upgrade apart from a failed query.
//!
//! # Invariants
//! - The schema revision lives in `PRAGMA user_version`.
//! - No content, tag or attribute row is touched before every pending
//!   migration has committed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// A connection, pragma or query failed outside a migration script.
    Sqlite(rusqlite::Error),
    /// One migration script failed; the whole upgrade was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The database was last written by a newer build of the store.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "content store query failed: {err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(
                f,
                "content store migration {version} ({name}) failed: {source}"
            ),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "content store schema version {db_version} is newer than this build supports (latest {latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
