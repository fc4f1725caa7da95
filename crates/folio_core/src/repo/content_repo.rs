//! Content store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist content records: primary row, tag links, attributes and body.
//! - Hydrate rows back into the concrete content type named by their class
//!   discriminator.
//!
//! # Invariants
//! - A save runs validation inside one immediate transaction and writes
//!   nothing when the record has errors.
//! - Only changed primary columns are updated; tags and attributes are
//!   reconciled through minimal diffs.
//! - The body is written after all row writes but before commit, so a body
//!   failure rolls the rows back.
//! - Identity is assigned to the record only after a successful commit.

use crate::db::DbError;
use crate::model::descriptor::fields;
use crate::model::record::{ErrorCategory, FieldError, RecordId, ValidationIssue};
use crate::model::registry::{ContentRegistry, HydrationError};
use crate::model::uri::ContentUri;
use crate::model::value::FieldValue;
use crate::model::{Content, ContentKind, ContentTag};
use crate::repo::body_store::{BodyStore, BodyStoreError, FsBodyStore};
use crate::repo::collection_diff::{diff_maps, diff_sets, MapDiff, SetDiff};
use crate::repo::schema::ensure_content_schema;
use crate::repo::tag_repo;
use crate::repo::uniqueness::validate_content;
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const CONTENT_SELECT_SQL: &str = "SELECT
    id,
    active,
    parent_address,
    slug,
    canonical_id,
    content_class,
    content_type,
    content_uri,
    date_created,
    date_updated,
    date_expired,
    lang,
    title,
    author,
    img_prefix,
    has_img,
    set_by_system
FROM content";

/// Columns read by [`CONTENT_SELECT_SQL`] that map onto record fields.
const FIELD_COLUMNS: &[&str] = &[
    fields::ACTIVE,
    fields::PARENT_ADDRESS,
    fields::SLUG,
    fields::CANONICAL_ID,
    fields::CONTENT_CLASS,
    fields::CONTENT_TYPE,
    fields::CONTENT_URI,
    fields::DATE_CREATED,
    fields::DATE_UPDATED,
    fields::DATE_EXPIRED,
    fields::LANG,
    fields::TITLE,
    fields::AUTHOR,
    fields::IMG_PREFIX,
    fields::HAS_IMG,
];

const SET_BY_SYSTEM_COLUMN: &str = "set_by_system";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for content and tag persistence.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Field(FieldError),
    Hydration(HydrationError),
    Body(BodyStoreError),
    /// Field-level validation failed; nothing was written.
    InvalidRecord(Vec<ValidationIssue>),
    /// Another record already holds a unique value.
    Uniqueness(Vec<ValidationIssue>),
    NotFound(RecordId),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Field(err) => write!(f, "{err}"),
            Self::Hydration(err) => write!(f, "{err}"),
            Self::Body(err) => write!(f, "{err}"),
            Self::InvalidRecord(issues) => {
                write!(f, "record is invalid: {}", join_issues(issues))
            }
            Self::Uniqueness(issues) => {
                write!(f, "uniqueness violated: {}", join_issues(issues))
            }
            Self::NotFound(id) => write!(f, "content not found: {id}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted content data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Field(err) => Some(err),
            Self::Hydration(err) => Some(err),
            Self::Body(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<FieldError> for StoreError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}

impl From<HydrationError> for StoreError {
    fn from(value: HydrationError) -> Self {
        Self::Hydration(value)
    }
}

impl From<BodyStoreError> for StoreError {
    fn from(value: BodyStoreError) -> Self {
        Self::Body(value)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What happened to the primary row during a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryWrite {
    Inserted,
    /// Columns written by the update, always including provenance.
    Updated(Vec<&'static str>),
}

/// Write volume of one successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub id: RecordId,
    pub primary: PrimaryWrite,
    pub tags: SetDiff<String>,
    pub attributes: MapDiff<String, String>,
    pub body_written: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexOrder {
    #[default]
    DateCreatedDesc,
    DateCreatedAsc,
    TitleAsc,
}

impl IndexOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::DateCreatedDesc => "date_created DESC, id DESC",
            Self::DateCreatedAsc => "date_created ASC, id ASC",
            Self::TitleAsc => "title COLLATE NOCASE ASC, id ASC",
        }
    }
}

/// Filters and pagination for [`ContentRepository::get_content_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIndexQuery {
    /// Parent addresses; a row matches when it lies below any of them.
    pub parents: Vec<String>,
    pub order: IndexOrder,
    /// `None` returns every matching row.
    pub limit: Option<u32>,
    /// 1-based page number; `0` is treated as `1`.
    pub page: u32,
}

impl Default for ContentIndexQuery {
    fn default() -> Self {
        Self {
            parents: Vec::new(),
            order: IndexOrder::default(),
            limit: None,
            page: 1,
        }
    }
}

impl ContentIndexQuery {
    pub fn below(parent: impl Into<String>) -> Self {
        Self {
            parents: vec![parent.into()],
            ..Self::default()
        }
    }

    fn offset(&self) -> Option<u32> {
        let limit = self.limit?;
        Some(self.page.max(1).saturating_sub(1).saturating_mul(limit))
    }
}

/// Repository interface for content persistence.
pub trait ContentRepository {
    /// Validates and persists `content`, assigning its id on first save.
    fn save_content(&mut self, content: &mut Content) -> StoreResult<SaveReport>;
    /// Loads by id regardless of the `active` flag.
    fn get_content_by_id(&self, id: RecordId) -> StoreResult<Option<Content>>;
    /// Loads active content by address.
    fn get_content_by_address(&self, address: &str) -> StoreResult<Option<Content>>;
    /// Loads active content by canonical id and language.
    fn get_content_by_canonical_id(
        &self,
        canonical_id: &str,
        lang: &str,
    ) -> StoreResult<Option<Content>>;
    /// Lists active content.
    fn get_content_index(&self, query: &ContentIndexQuery) -> StoreResult<Vec<Content>>;
    /// Removes the row and its tag/attribute links. Unsaved content is a
    /// no-op.
    fn delete_content(&mut self, content: &Content, remove_body: bool) -> StoreResult<()>;

    /// Content stored at this content's parent address.
    fn get_parent_of(&self, content: &Content) -> StoreResult<Option<Content>> {
        match content.parent_address() {
            Some(parent) => self.get_content_by_address(parent),
            None => Ok(None),
        }
    }

    /// Active content below this content's address.
    fn get_children(&self, content: &Content) -> StoreResult<Vec<Content>> {
        match content.address() {
            Some(address) => self.get_content_index(&ContentIndexQuery::below(address)),
            None => Ok(Vec::new()),
        }
    }
}

/// SQLite-backed content store with pluggable body storage.
pub struct SqliteContentRepository<'conn, B: BodyStore = FsBodyStore> {
    conn: &'conn mut Connection,
    registry: ContentRegistry,
    bodies: B,
}

impl<'conn, B: BodyStore> SqliteContentRepository<'conn, B> {
    /// Constructs a repository from a migrated connection, using the default
    /// class registry.
    pub fn try_new(conn: &'conn mut Connection, bodies: B) -> StoreResult<Self> {
        ensure_content_schema(conn)?;
        Ok(Self {
            conn,
            registry: ContentRegistry::default(),
            bodies,
        })
    }

    pub fn with_registry(mut self, registry: ContentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ContentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ContentRegistry {
        &mut self.registry
    }

    pub fn bodies(&self) -> &B {
        &self.bodies
    }

    pub fn connection(&self) -> &Connection {
        &*self.conn
    }

    /// See [`tag_repo::get_or_add_tags`].
    pub fn get_or_add_tags<I, S>(&self, names: I) -> StoreResult<Vec<ContentTag>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tag_repo::get_or_add_tags(self.conn, names)
    }

    pub fn save_tag(&mut self, tag: &mut ContentTag) -> StoreResult<RecordId> {
        tag_repo::save_tag(self.conn, tag)
    }

    pub fn list_tags(&self) -> StoreResult<Vec<ContentTag>> {
        tag_repo::list_tags(self.conn)
    }

    fn check_content_class(&self, content: &Content) -> StoreResult<()> {
        let Some(class) = content.content_class().filter(|class| !class.is_empty()) else {
            return Ok(());
        };
        let kind = self.registry.resolve(class)?;
        if kind != content.kind() {
            return Err(StoreError::InvalidRecord(vec![ValidationIssue {
                field: fields::CONTENT_CLASS.to_string(),
                category: ErrorCategory::Value,
                message: format!(
                    "content class `{class}` resolves to `{}`, not `{}`",
                    kind.type_name(),
                    content.kind().type_name()
                ),
            }]));
        }
        Ok(())
    }

    fn save_content_inner(&mut self, content: &mut Content) -> StoreResult<SaveReport> {
        self.check_content_class(content)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        validate_content(&tx, content)?;
        reject_invalid(content)?;

        let changed = content.record().changed_fields();
        let written = match content.id() {
            None => insert_content_row(&tx, content).map(|id| (id, PrimaryWrite::Inserted)),
            Some(id) => update_content_row(&tx, id, content, &changed)
                .map(|columns| (id, PrimaryWrite::Updated(columns))),
        };
        let (id, primary) = match written {
            Ok(written) => written,
            Err(err) => {
                record_store_conflicts(content, &err);
                return Err(err);
            }
        };

        let tags = if changed.contains(fields::TAGS) {
            sync_tags(&tx, id, &content.tags())?
        } else {
            SetDiff::default()
        };
        let attributes = if changed.contains(fields::ATTRIBUTES) {
            sync_attributes(&tx, id, &content.attributes())?
        } else {
            MapDiff::default()
        };

        let mut body_written = false;
        if changed.contains(fields::BODY) || changed.contains(fields::CONTENT_URI) {
            if let Some(body) = content.body() {
                let uri = content.content_uri().ok_or_else(|| {
                    StoreError::InvalidData("content has a body but no content uri".to_string())
                })?;
                self.bodies.write(&uri, body.as_bytes())?;
                body_written = true;
            }
        }

        tx.commit()?;

        let record = content.record_mut();
        record.assign_id(id)?;
        record.mark_persisted();

        Ok(SaveReport {
            id,
            primary,
            tags,
            attributes,
            body_written,
        })
    }

    fn query_contents(&self, clause: &str, bind_values: Vec<Value>) -> StoreResult<Vec<Content>> {
        let mut stmt = self.conn.prepare(&format!("{CONTENT_SELECT_SQL} {clause};"))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut persisted = Vec::new();
        while let Some(row) = rows.next()? {
            persisted.push(parse_content_row(row)?);
        }
        self.hydrate(persisted)
    }

    fn query_one(&self, clause: &str, bind_values: Vec<Value>) -> StoreResult<Option<Content>> {
        Ok(self.query_contents(clause, bind_values)?.into_iter().next())
    }

    /// Dresses rows into their concrete types, then attaches tags,
    /// attributes and bodies. Tags and attributes are loaded with one query
    /// each for the whole batch.
    fn hydrate(&self, rows: Vec<PersistedRow>) -> StoreResult<Vec<Content>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let kinds = rows
            .iter()
            .map(|row| self.registry.resolve(&row.class))
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<RecordId> = rows.iter().map(|row| row.id).collect();
        let mut tags = load_tags_for(self.conn, &ids)?;
        let mut attributes = load_attributes_for(self.conn, &ids)?;

        rows.into_iter()
            .zip(kinds)
            .map(|(row, kind)| {
                let row_tags = tags.remove(&row.id).unwrap_or_default();
                let row_attributes = attributes.remove(&row.id).unwrap_or_default();
                self.dress(row, kind, row_tags, row_attributes)
            })
            .collect()
    }

    fn dress(
        &self,
        mut row: PersistedRow,
        kind: ContentKind,
        tags: BTreeSet<String>,
        attributes: BTreeMap<String, String>,
    ) -> StoreResult<Content> {
        let body = match row.columns.get(fields::CONTENT_URI).and_then(FieldValue::as_text) {
            Some(uri) => self.read_body(row.id, uri)?,
            None => FieldValue::Null,
        };

        let mut values: Vec<(&str, FieldValue)> = Vec::new();
        for spec in kind.descriptor().primary_fields() {
            let Some(column) = spec.column() else {
                continue;
            };
            let value = row.columns.remove(column).unwrap_or(FieldValue::Null);
            values.push((spec.name, value));
        }
        values.push((fields::BODY, body));
        values.push((fields::TAGS, FieldValue::Tags(tags)));
        values.push((fields::ATTRIBUTES, FieldValue::Attributes(attributes)));

        Ok(Content::restore(kind, row.id, values, &row.set_by_system)?)
    }

    /// A missing body file reads as an empty body.
    fn read_body(&self, id: RecordId, uri: &str) -> StoreResult<FieldValue> {
        let uri = ContentUri::parse(uri).map_err(|err| {
            StoreError::InvalidData(format!("content {id} has an invalid content_uri: {err}"))
        })?;
        let bytes = self.bodies.read(&uri)?.unwrap_or_default();
        let body = String::from_utf8(bytes).map_err(|_| {
            StoreError::InvalidData(format!("body of content {id} is not valid UTF-8"))
        })?;
        Ok(FieldValue::Text(body))
    }
}

impl<B: BodyStore> ContentRepository for SqliteContentRepository<'_, B> {
    fn save_content(&mut self, content: &mut Content) -> StoreResult<SaveReport> {
        let started_at = Instant::now();
        let result = self.save_content_inner(content);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(report) => info!(
                "event=content_save module=repo status=ok id={} inserted={} tag_writes={} attribute_writes={} body_written={} duration_ms={}",
                report.id,
                report.primary == PrimaryWrite::Inserted,
                report.tags.write_count(),
                report.attributes.write_count(),
                report.body_written,
                duration_ms
            ),
            Err(err) => warn!(
                "event=content_save module=repo status=error address={} error_count={} duration_ms={} error={}",
                content.address().unwrap_or_default(),
                content.record().error_count(),
                duration_ms,
                err
            ),
        }
        result
    }

    fn get_content_by_id(&self, id: RecordId) -> StoreResult<Option<Content>> {
        self.query_one("WHERE id = ?", vec![Value::Integer(id)])
    }

    fn get_content_by_address(&self, address: &str) -> StoreResult<Option<Content>> {
        self.query_one(
            "WHERE active = 1 AND address = ?",
            vec![Value::Text(address.to_string())],
        )
    }

    fn get_content_by_canonical_id(
        &self,
        canonical_id: &str,
        lang: &str,
    ) -> StoreResult<Option<Content>> {
        self.query_one(
            "WHERE active = 1 AND canonical_id = ? AND lang = ?",
            vec![
                Value::Text(canonical_id.to_string()),
                Value::Text(lang.to_string()),
            ],
        )
    }

    fn get_content_index(&self, query: &ContentIndexQuery) -> StoreResult<Vec<Content>> {
        let started_at = Instant::now();
        let mut clause = String::from("WHERE active = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        let parents: Vec<&str> = query
            .parents
            .iter()
            .map(|parent| parent.trim().trim_end_matches('/'))
            .filter(|parent| !parent.is_empty())
            .collect();
        if !parents.is_empty() {
            let conditions = vec![r"address LIKE ? ESCAPE '\'"; parents.len()].join(" OR ");
            clause.push_str(&format!(" AND ({conditions})"));
            for parent in parents {
                bind_values.push(Value::Text(format!("{}/%", escape_like(parent))));
            }
        }

        clause.push_str(" ORDER BY ");
        clause.push_str(query.order.sql());

        if let Some(limit) = query.limit {
            clause.push_str(" LIMIT ? OFFSET ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            bind_values.push(Value::Integer(i64::from(query.offset().unwrap_or(0))));
        }

        let contents = self.query_contents(&clause, bind_values)?;
        info!(
            "event=content_index module=repo status=ok parent_count={} result_count={} duration_ms={}",
            query.parents.len(),
            contents.len(),
            started_at.elapsed().as_millis()
        );
        Ok(contents)
    }

    fn delete_content(&mut self, content: &Content, remove_body: bool) -> StoreResult<()> {
        let Some(id) = content.id() else {
            return Ok(());
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM content_tags WHERE content_id = ?1;", [id])?;
        tx.execute("DELETE FROM content_attributes WHERE content_id = ?1;", [id])?;
        let changed = tx.execute("DELETE FROM content WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tx.commit()?;
        info!("event=content_delete module=repo status=ok id={id}");

        if remove_body {
            if let Some(uri) = content.content_uri() {
                if let Err(err) = self.bodies.remove(&uri) {
                    warn!(
                        "event=body_remove module=repo status=error id={} error={}",
                        id, err
                    );
                }
            }
        }
        Ok(())
    }
}

/// A raw `content` row before it is dressed into a concrete type.
struct PersistedRow {
    id: RecordId,
    class: String,
    columns: BTreeMap<&'static str, FieldValue>,
    set_by_system: BTreeSet<String>,
}

fn parse_content_row(row: &Row<'_>) -> StoreResult<PersistedRow> {
    let id: RecordId = row.get("id")?;
    let class: String = row.get(fields::CONTENT_CLASS)?;

    let mut columns = BTreeMap::new();
    for &column in FIELD_COLUMNS {
        let value = match row.get::<_, Value>(column)? {
            Value::Null => FieldValue::Null,
            Value::Integer(value) => FieldValue::Integer(value),
            Value::Text(value) => FieldValue::Text(value),
            Value::Real(_) | Value::Blob(_) => {
                return Err(StoreError::InvalidData(format!(
                    "unexpected value type in content.{column} for id {id}"
                )));
            }
        };
        columns.insert(column, value);
    }

    let raw: String = row.get(SET_BY_SYSTEM_COLUMN)?;
    let flags: BTreeMap<String, bool> = serde_json::from_str(&raw).map_err(|err| {
        StoreError::InvalidData(format!(
            "invalid content.set_by_system for id {id}: {err}"
        ))
    })?;
    let set_by_system = flags
        .into_iter()
        .filter_map(|(field, system)| system.then_some(field))
        .collect();

    Ok(PersistedRow {
        id,
        class,
        columns,
        set_by_system,
    })
}

fn reject_invalid(content: &Content) -> StoreResult<()> {
    let issues = content.record().errors();
    if issues.is_empty() {
        return Ok(());
    }
    if issues
        .iter()
        .all(|issue| issue.category == ErrorCategory::Uniqueness)
    {
        return Err(StoreError::Uniqueness(issues));
    }
    Err(StoreError::InvalidRecord(issues))
}

fn insert_content_row(conn: &Connection, content: &Content) -> StoreResult<RecordId> {
    let mut columns = vec![fields::ADDRESS, SET_BY_SYSTEM_COLUMN];
    let mut bind_values = vec![
        Value::Text(require_address(content)?),
        Value::Text(set_by_system_json(content)?),
    ];
    for spec in content.descriptor().primary_fields() {
        if let Some(column) = spec.column() {
            columns.push(column);
            bind_values.push(to_sql_value(column, content.get(spec.name))?);
        }
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO content ({}) VALUES ({placeholders});",
        columns.join(", ")
    );
    conn.execute(&sql, params_from_iter(bind_values))
        .map_err(map_write_error)?;
    Ok(conn.last_insert_rowid())
}

fn update_content_row(
    conn: &Connection,
    id: RecordId,
    content: &Content,
    changed: &BTreeSet<&'static str>,
) -> StoreResult<Vec<&'static str>> {
    let mut columns = Vec::new();
    let mut bind_values = Vec::new();
    for spec in content.descriptor().primary_fields() {
        let Some(column) = spec.column() else {
            continue;
        };
        if changed.contains(spec.name) {
            columns.push(column);
            bind_values.push(to_sql_value(column, content.get(spec.name))?);
        }
    }
    if changed.contains(fields::SLUG) || changed.contains(fields::PARENT_ADDRESS) {
        columns.push(fields::ADDRESS);
        bind_values.push(Value::Text(require_address(content)?));
    }
    columns.push(SET_BY_SYSTEM_COLUMN);
    bind_values.push(Value::Text(set_by_system_json(content)?));
    bind_values.push(Value::Integer(id));

    let assignments = columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE content SET {assignments} WHERE id = ?;");
    let updated = conn
        .execute(&sql, params_from_iter(bind_values))
        .map_err(map_write_error)?;
    if updated == 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(columns)
}

fn sync_tags(
    conn: &Connection,
    content_id: RecordId,
    desired: &BTreeSet<String>,
) -> StoreResult<SetDiff<String>> {
    let persisted = tag_repo::linked_tag_names(conn, content_id)?;
    let diff = diff_sets(&persisted, desired);
    for name in &diff.to_delete {
        conn.execute(
            "DELETE FROM content_tags
             WHERE content_id = ?1
               AND tag_id IN (SELECT id FROM tags WHERE name = ?2);",
            params![content_id, name],
        )?;
    }
    for name in &diff.to_insert {
        let tag_id = tag_repo::ensure_tag_id(conn, name)?;
        conn.execute(
            "INSERT INTO content_tags (content_id, tag_id) VALUES (?1, ?2);",
            params![content_id, tag_id],
        )?;
    }
    Ok(diff)
}

fn sync_attributes(
    conn: &Connection,
    content_id: RecordId,
    desired: &BTreeMap<String, String>,
) -> StoreResult<MapDiff<String, String>> {
    let persisted = load_attributes_for(conn, &[content_id])?
        .remove(&content_id)
        .unwrap_or_default();
    let diff = diff_maps(&persisted, desired);
    for key in &diff.to_delete {
        conn.execute(
            "DELETE FROM content_attributes WHERE content_id = ?1 AND key = ?2;",
            params![content_id, key],
        )?;
    }
    for (key, value) in &diff.to_insert {
        conn.execute(
            "INSERT INTO content_attributes (content_id, key, value) VALUES (?1, ?2, ?3);",
            params![content_id, key, value],
        )?;
    }
    for (key, value) in &diff.to_update {
        conn.execute(
            "UPDATE content_attributes SET value = ?3 WHERE content_id = ?1 AND key = ?2;",
            params![content_id, key, value],
        )?;
    }
    Ok(diff)
}

fn load_tags_for(
    conn: &Connection,
    ids: &[RecordId],
) -> StoreResult<BTreeMap<RecordId, BTreeSet<String>>> {
    let sql = format!(
        "SELECT ct.content_id, t.name
         FROM content_tags ct
         INNER JOIN tags t ON t.id = ct.tag_id
         WHERE ct.content_id IN ({});",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(ids))?;
    let mut tags: BTreeMap<RecordId, BTreeSet<String>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        tags.entry(row.get(0)?).or_default().insert(row.get(1)?);
    }
    Ok(tags)
}

fn load_attributes_for(
    conn: &Connection,
    ids: &[RecordId],
) -> StoreResult<BTreeMap<RecordId, BTreeMap<String, String>>> {
    let sql = format!(
        "SELECT content_id, key, value
         FROM content_attributes
         WHERE content_id IN ({});",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(ids))?;
    let mut attributes: BTreeMap<RecordId, BTreeMap<String, String>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let value: Option<String> = row.get(2)?;
        attributes
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?, value.unwrap_or_default());
    }
    Ok(attributes)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn require_address(content: &Content) -> StoreResult<String> {
    content
        .address()
        .ok_or_else(|| StoreError::InvalidData("content has no address".to_string()))
}

fn set_by_system_json(content: &Content) -> StoreResult<String> {
    let flags: BTreeMap<&str, bool> = content
        .record()
        .fields_set_by_system()
        .into_iter()
        .map(|field| (field, true))
        .collect();
    serde_json::to_string(&flags)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode provenance: {err}")))
}

fn to_sql_value(column: &str, value: &FieldValue) -> StoreResult<Value> {
    match value {
        FieldValue::Null => Ok(Value::Null),
        FieldValue::Integer(value) => Ok(Value::Integer(*value)),
        FieldValue::Bool(value) => Ok(Value::Integer(i64::from(*value))),
        FieldValue::Text(value) => Ok(Value::Text(value.clone())),
        other => Err(StoreError::InvalidData(format!(
            "cannot store {} value in content.{column}",
            other.kind_name()
        ))),
    }
}

/// Unique-index violations surface as [`StoreError::Uniqueness`].
/// Maps a UNIQUE index violation raised by a write to a field-level
/// [`StoreError::Uniqueness`]; every other failure stays a database error.
pub(crate) fn map_write_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.starts_with("UNIQUE constraint failed") =>
        {
            let field = if message.contains("content.address") {
                fields::ADDRESS
            } else if message.contains("content.canonical_id") {
                fields::CANONICAL_ID
            } else if message.contains("tags.name") {
                fields::TAG_NAME
            } else {
                "content"
            };
            StoreError::Uniqueness(vec![ValidationIssue {
                field: field.to_string(),
                category: ErrorCategory::Uniqueness,
                message: message.clone(),
            }])
        }
        _ => StoreError::from(err),
    }
}

fn record_store_conflicts(content: &mut Content, err: &StoreError) {
    if let StoreError::Uniqueness(issues) = err {
        for issue in issues {
            content
                .record_mut()
                .set_error(issue.field.clone(), issue.category, issue.message.clone());
        }
    }
}
