//! Core of the folio content persistence layer.
//!
//! Records (content, pages, posts and tag entries) track their own changes
//! and derived fields; the repository layer persists them to SQLite with
//! bodies kept in an external store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, FolioConfig, IndexConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::{
    Content, ContentKind, ContentRegistry, ContentTag, ContentUri, ErrorCategory, FieldError,
    FieldValue, HydrationError, Record, RecordId, ValidationIssue,
};
pub use repo::body_store::{BodyStore, BodyStoreError, FsBodyStore};
pub use repo::content_repo::{
    ContentIndexQuery, ContentRepository, IndexOrder, PrimaryWrite, SaveReport,
    SqliteContentRepository, StoreError, StoreResult,
};
pub use service::content_service::{ContentIndexPage, ContentService, ContentServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
