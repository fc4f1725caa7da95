//! Object-level validation that needs the store: uniqueness of content
//! addresses, canonical ids per language, and tag names.
//!
//! Checks exclude the record's own id so re-saving unchanged data passes.
//! They run inside the save transaction; the unique indexes remain the final
//! backstop for concurrent writers.

use crate::model::descriptor::fields;
use crate::model::record::{ErrorCategory, RecordId};
use crate::model::{Content, ContentTag};
use crate::repo::content_repo::StoreResult;
use rusqlite::{params, Connection};

/// Records or clears uniqueness errors on `content`.
pub(crate) fn validate_content(conn: &Connection, content: &mut Content) -> StoreResult<()> {
    let own_id = content.id();

    let address_taken = match content.address() {
        Some(address) => !address_is_unique(conn, &address, own_id)?,
        None => false,
    };
    let canonical_taken = match (content.canonical_id(), content.lang()) {
        (Some(canonical_id), Some(lang)) if !canonical_id.is_empty() => {
            !canonical_id_is_unique(conn, canonical_id, lang, own_id)?
        }
        _ => false,
    };

    let record = content.record_mut();
    if address_taken {
        record.set_error(
            fields::ADDRESS,
            ErrorCategory::Uniqueness,
            "Another content record already uses this address",
        );
    } else {
        record.clear_error(fields::ADDRESS, ErrorCategory::Uniqueness);
    }
    if canonical_taken {
        record.set_error(
            fields::CANONICAL_ID,
            ErrorCategory::Uniqueness,
            "Another content record already uses this canonical id for this language",
        );
    } else {
        record.clear_error(fields::CANONICAL_ID, ErrorCategory::Uniqueness);
    }
    Ok(())
}

/// Records or clears the tag-name uniqueness error on `tag`.
pub(crate) fn validate_tag(conn: &Connection, tag: &mut ContentTag) -> StoreResult<()> {
    let taken = match tag.name() {
        Some(name) if !name.is_empty() => !tag_is_unique(conn, name, tag.id())?,
        _ => false,
    };
    let record = tag.record_mut();
    if taken {
        record.set_error(
            fields::TAG_NAME,
            ErrorCategory::Uniqueness,
            "This tag already exists",
        );
    } else {
        record.clear_error(fields::TAG_NAME, ErrorCategory::Uniqueness);
    }
    Ok(())
}

pub fn address_is_unique(
    conn: &Connection,
    address: &str,
    own_id: Option<RecordId>,
) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM content WHERE address = ?1 AND id != ?2
        );",
        params![address, own_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(exists == 0)
}

pub fn canonical_id_is_unique(
    conn: &Connection,
    canonical_id: &str,
    lang: &str,
    own_id: Option<RecordId>,
) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM content WHERE canonical_id = ?1 AND lang = ?2 AND id != ?3
        );",
        params![canonical_id, lang, own_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(exists == 0)
}

pub fn tag_is_unique(conn: &Connection, name: &str, own_id: Option<RecordId>) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1 AND id != ?2);",
        params![name, own_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(exists == 0)
}
