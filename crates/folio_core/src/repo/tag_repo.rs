//! Tag dictionary persistence.
//!
//! # Responsibility
//! - Look up, create and list entries of the shared `tags` dictionary.
//!
//! # Invariants
//! - Tag names are stored normalised (trimmed, lowercase) and unique.

use crate::model::record::{ErrorCategory, RecordId};
use crate::model::tag::normalize_tags;
use crate::model::ContentTag;
use crate::repo::content_repo::{map_write_error, StoreError, StoreResult};
use crate::repo::uniqueness::validate_tag;
use log::debug;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Returns persisted dictionary entries for known names and unsaved
/// [`ContentTag`]s for the rest, in name order.
pub fn get_or_add_tags<I, S>(conn: &Connection, names: I) -> StoreResult<Vec<ContentTag>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags = Vec::new();
    for name in normalize_tags(names) {
        match find_tag_id(conn, &name)? {
            Some(id) => tags.push(ContentTag::restore(id, name)?),
            None => tags.push(ContentTag::new(&name)?),
        }
    }
    Ok(tags)
}

/// Validates and inserts an unsaved tag, assigning its id.
/// Saving an already persisted tag is a no-op.
pub fn save_tag(conn: &Connection, tag: &mut ContentTag) -> StoreResult<RecordId> {
    if let Some(id) = tag.id() {
        return Ok(id);
    }
    validate_tag(conn, tag)?;
    let record = tag.record();
    if !record.is_valid() {
        let issues = record.errors();
        if issues
            .iter()
            .all(|issue| issue.category == ErrorCategory::Uniqueness)
        {
            return Err(StoreError::Uniqueness(issues));
        }
        return Err(StoreError::InvalidRecord(issues));
    }
    let name = tag.name().unwrap_or_default().to_string();
    conn.execute("INSERT INTO tags (name) VALUES (?1);", [name.as_str()])
        .map_err(map_write_error)?;
    let id = conn.last_insert_rowid();
    let record = tag.record_mut();
    record.assign_id(id)?;
    record.mark_persisted();
    debug!("event=tag_insert module=repo status=ok tag_id={id}");
    Ok(id)
}

/// Every dictionary entry, sorted by name.
pub fn list_tags(conn: &Connection) -> StoreResult<Vec<ContentTag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name ASC;")?;
    let mut rows = stmt.query([])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(ContentTag::restore(row.get(0)?, row.get(1)?)?);
    }
    Ok(tags)
}

/// Id of `name` in the dictionary, inserting it when missing.
pub(crate) fn ensure_tag_id(conn: &Connection, name: &str) -> StoreResult<RecordId> {
    if let Some(id) = find_tag_id(conn, name)? {
        return Ok(id);
    }
    let mut tag = ContentTag::new(name)?;
    save_tag(conn, &mut tag)
}

fn find_tag_id(conn: &Connection, name: &str) -> StoreResult<Option<RecordId>> {
    let id = conn
        .query_row("SELECT id FROM tags WHERE name = ?1;", [name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

/// Names currently linked to one content row.
pub(crate) fn linked_tag_names(conn: &Connection, content_id: RecordId) -> StoreResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM content_tags ct
         INNER JOIN tags t ON t.id = ct.tag_id
         WHERE ct.content_id = ?1;",
    )?;
    let mut rows = stmt.query([content_id])?;
    let mut names = BTreeSet::new();
    while let Some(row) = rows.next()? {
        names.insert(row.get(0)?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::{list_tags, save_tag};
    use crate::db::open_db_in_memory;
    use crate::model::record::ErrorCategory;
    use crate::model::ContentTag;
    use crate::repo::content_repo::StoreError;

    #[test]
    fn racing_insert_of_the_same_name_is_a_uniqueness_error() {
        let conn = open_db_in_memory().expect("db");
        // Another writer lands the same name between validation and insert.
        conn.execute_batch(
            "CREATE TEMP TRIGGER concurrent_tag BEFORE INSERT ON tags
             BEGIN
                 INSERT INTO tags (name) VALUES (NEW.name);
             END;",
        )
        .expect("trigger");

        let mut tag = ContentTag::new("rust").expect("tag");
        match save_tag(&conn, &mut tag).unwrap_err() {
            StoreError::Uniqueness(issues) => {
                assert_eq!(issues[0].field, "name");
                assert_eq!(issues[0].category, ErrorCategory::Uniqueness);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(tag.id().is_none());
    }

    #[test]
    fn saved_tags_are_listed_by_name() {
        let conn = open_db_in_memory().expect("db");
        for name in ["sql", "rust"] {
            let mut tag = ContentTag::new(name).expect("tag");
            save_tag(&conn, &mut tag).expect("save");
            assert!(tag.id().is_some());
        }
        let names: Vec<String> = list_tags(&conn)
            .expect("list")
            .iter()
            .filter_map(|tag| tag.name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["rust", "sql"]);
    }
}
