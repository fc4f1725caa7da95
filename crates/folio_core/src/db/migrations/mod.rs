//! Content store schema upgrades.
//!
//! # Responsibility
//! - List the content store's schema scripts, oldest first.
//! - Bring a connection from its recorded revision up to [`latest_version`]
//!   inside one transaction.
//!
//! # Invariants
//! - Revisions are contiguous and start at 1.
//! - `PRAGMA user_version` only advances together with the script that
//!   produced that revision.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// One numbered schema script.
#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    // content rows with address, canonical id and body location
    Migration {
        version: 1,
        name: "content",
        sql: include_str!("0001_content.sql"),
    },
    // tag dictionary plus tag and attribute association tables
    Migration {
        version: 2,
        name: "tags_attributes",
        sql: include_str!("0002_tags_attributes.sql"),
    },
];

/// Highest schema revision this build can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Schema revision currently recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Upgrades the content store schema to [`latest_version`].
///
/// Databases already at the latest revision are left untouched. A database
/// recorded at a newer revision is refused rather than downgraded.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skip version={from}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        run_migration(&tx, migration)?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

fn run_migration(tx: &Transaction<'_>, migration: &Migration) -> DbResult<()> {
    let wrap = |source: rusqlite::Error| DbError::Migration {
        version: migration.version,
        name: migration.name,
        source,
    };
    tx.execute_batch(migration.sql).map_err(wrap)?;
    tx.pragma_update(None, "user_version", migration.version)
        .map_err(wrap)?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        migration.version, migration.name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn revisions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
        assert_eq!(latest_version() as usize, MIGRATIONS.len());
    }

    #[test]
    fn partially_migrated_database_is_brought_up_to_date() {
        let mut conn = Connection::open_in_memory().expect("db");
        conn.execute_batch(MIGRATIONS[0].sql).expect("first script");
        conn.pragma_update(None, "user_version", 1).expect("pragma");

        apply_migrations(&mut conn).expect("upgrade");
        assert_eq!(schema_version(&conn).expect("version"), latest_version());
        conn.execute("INSERT INTO tags (name) VALUES ('rust');", [])
            .expect("tags table");
    }

    #[test]
    fn failing_script_names_the_migration_and_rolls_back() {
        let mut conn = Connection::open_in_memory().expect("db");
        // A stray table makes the tags script collide on CREATE TABLE.
        conn.execute_batch(MIGRATIONS[0].sql).expect("first script");
        conn.execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY);")
            .expect("stray table");
        conn.pragma_update(None, "user_version", 1).expect("pragma");

        match apply_migrations(&mut conn).unwrap_err() {
            DbError::Migration { version, name, .. } => {
                assert_eq!(version, 2);
                assert_eq!(name, "tags_attributes");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(schema_version(&conn).expect("version"), 1);
    }
}
