//! Content records: the generic content type and its page/post subtypes.
//!
//! # Responsibility
//! - Typed accessors and fluent setters over a descriptor-backed [`Record`].
//! - Address and ancestry helpers derived from `parent_address` + `slug`.
//!
//! # Invariants
//! - Setters on this type are caller writes; they make the field sticky
//!   against later cascades.
//! - `address()` is always derived, never stored on the record.

use crate::model::cascade::record_address;
use crate::model::descriptor::{fields, ContentKind, TypeDescriptor};
use crate::model::record::{FieldError, Record, RecordId};
use crate::model::tag::{normalize_tag, normalize_tags};
use crate::model::uri::ContentUri;
use crate::model::value::FieldValue;
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, BTreeSet};

pub type ContentResult<'a> = Result<&'a mut Content, FieldError>;

#[derive(Debug, Clone)]
pub struct Content {
    kind: ContentKind,
    record: Record,
}

impl Content {
    /// New unsaved content of `kind`, populated with defaults.
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            record: Record::with_defaults(kind.descriptor()),
        }
    }

    pub fn new_page() -> Self {
        Self::new(ContentKind::Page)
    }

    pub fn new_post() -> Self {
        Self::new(ContentKind::Post)
    }

    pub(crate) fn restore(
        kind: ContentKind,
        id: RecordId,
        values: Vec<(&str, FieldValue)>,
        set_by_system: &BTreeSet<String>,
    ) -> Result<Self, FieldError> {
        Ok(Self {
            kind,
            record: Record::restore(kind.descriptor(), id, values, set_by_system)?,
        })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.kind.descriptor()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn id(&self) -> Option<RecordId> {
        self.record.id()
    }

    /// Caller write of any declared field.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> ContentResult<'_> {
        self.record.set(field, value, false)?;
        Ok(self)
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.record.get(field)
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.record.get(field).as_text()
    }

    pub fn set_active(&mut self, active: bool) -> ContentResult<'_> {
        self.set(fields::ACTIVE, active)
    }

    pub fn set_parent_address(&mut self, parent: Option<&str>) -> ContentResult<'_> {
        self.set(fields::PARENT_ADDRESS, parent)
    }

    pub fn set_slug(&mut self, slug: &str) -> ContentResult<'_> {
        self.set(fields::SLUG, slug)
    }

    pub fn set_canonical_id(&mut self, canonical_id: &str) -> ContentResult<'_> {
        self.set(fields::CANONICAL_ID, canonical_id)
    }

    pub fn set_content_class(&mut self, class: &str) -> ContentResult<'_> {
        self.set(fields::CONTENT_CLASS, class)
    }

    pub fn set_content_type(&mut self, content_type: &str) -> ContentResult<'_> {
        self.set(fields::CONTENT_TYPE, content_type)
    }

    pub fn set_content_uri(&mut self, uri: ContentUri) -> ContentResult<'_> {
        self.set(fields::CONTENT_URI, uri)
    }

    pub fn set_date_created(&mut self, date: DateTime<FixedOffset>) -> ContentResult<'_> {
        self.set(fields::DATE_CREATED, date)
    }

    pub fn set_date_updated(&mut self, date: DateTime<FixedOffset>) -> ContentResult<'_> {
        self.set(fields::DATE_UPDATED, date)
    }

    pub fn set_date_expired(&mut self, date: Option<DateTime<FixedOffset>>) -> ContentResult<'_> {
        self.set(fields::DATE_EXPIRED, date)
    }

    pub fn set_lang(&mut self, lang: &str) -> ContentResult<'_> {
        self.set(fields::LANG, lang)
    }

    pub fn set_title(&mut self, title: &str) -> ContentResult<'_> {
        self.set(fields::TITLE, title)
    }

    pub fn set_body(&mut self, body: &str) -> ContentResult<'_> {
        self.set(fields::BODY, body)
    }

    pub fn set_tags<I, S>(&mut self, tags: I) -> ContentResult<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(fields::TAGS, normalize_tags(tags))
    }

    /// Adds one tag; blank names are ignored.
    pub fn add_tag(&mut self, tag: &str) -> ContentResult<'_> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(self);
        };
        let mut tags = self.tags();
        tags.insert(tag);
        self.set(fields::TAGS, tags)
    }

    pub fn remove_tag(&mut self, tag: &str) -> ContentResult<'_> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(self);
        };
        let mut tags = self.tags();
        tags.remove(&tag);
        self.set(fields::TAGS, tags)
    }

    pub fn set_attributes(&mut self, attributes: BTreeMap<String, String>) -> ContentResult<'_> {
        self.set(fields::ATTRIBUTES, attributes)
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) -> ContentResult<'_> {
        let mut attributes = self.attributes();
        attributes.insert(key.to_string(), value.to_string());
        self.set(fields::ATTRIBUTES, attributes)
    }

    pub fn remove_attribute(&mut self, key: &str) -> ContentResult<'_> {
        let mut attributes = self.attributes();
        attributes.remove(key);
        self.set(fields::ATTRIBUTES, attributes)
    }

    /// Post only.
    pub fn set_author(&mut self, author: Option<&str>) -> ContentResult<'_> {
        self.set(fields::AUTHOR, author)
    }

    /// Post only.
    pub fn set_img_prefix(&mut self, prefix: &str) -> ContentResult<'_> {
        self.set(fields::IMG_PREFIX, prefix)
    }

    /// Post only.
    pub fn set_has_img(&mut self, has_img: bool) -> ContentResult<'_> {
        self.set(fields::HAS_IMG, has_img)
    }

    pub fn active(&self) -> bool {
        self.record.get(fields::ACTIVE).as_flag().unwrap_or(false)
    }

    pub fn parent_address(&self) -> Option<&str> {
        self.text(fields::PARENT_ADDRESS).filter(|parent| !parent.is_empty())
    }

    pub fn slug(&self) -> Option<&str> {
        self.text(fields::SLUG)
    }

    pub fn canonical_id(&self) -> Option<&str> {
        self.text(fields::CANONICAL_ID)
    }

    pub fn content_class(&self) -> Option<&str> {
        self.text(fields::CONTENT_CLASS)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.text(fields::CONTENT_TYPE)
    }

    pub fn content_uri(&self) -> Option<ContentUri> {
        self.text(fields::CONTENT_URI)
            .and_then(|uri| ContentUri::parse(uri).ok())
    }

    pub fn date_created(&self) -> Option<DateTime<FixedOffset>> {
        self.record.get(fields::DATE_CREATED).as_date()
    }

    pub fn date_updated(&self) -> Option<DateTime<FixedOffset>> {
        self.record.get(fields::DATE_UPDATED).as_date()
    }

    pub fn date_expired(&self) -> Option<DateTime<FixedOffset>> {
        self.record.get(fields::DATE_EXPIRED).as_date()
    }

    pub fn lang(&self) -> Option<&str> {
        self.text(fields::LANG)
    }

    pub fn title(&self) -> Option<&str> {
        self.text(fields::TITLE)
    }

    pub fn body(&self) -> Option<&str> {
        self.text(fields::BODY)
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.record
            .get(fields::TAGS)
            .as_tags()
            .cloned()
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.record
            .get(fields::ATTRIBUTES)
            .as_attributes()
            .cloned()
            .unwrap_or_default()
    }

    pub fn author(&self) -> Option<&str> {
        self.text(fields::AUTHOR)
    }

    pub fn img_prefix(&self) -> Option<&str> {
        self.text(fields::IMG_PREFIX)
    }

    pub fn has_img(&self) -> Option<bool> {
        self.record.get(fields::HAS_IMG).as_flag()
    }

    /// Full hierarchical path: `parent_address + "/" + slug`.
    pub fn address(&self) -> Option<String> {
        record_address(&self.record)
    }

    /// Every proper ancestor address, nearest first.
    ///
    /// `/a/b/c` yields `["/a/b", "/a"]`.
    pub fn ancestors(&self) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_address().map(str::to_string);
        while let Some(address) = current {
            current = address
                .rfind('/')
                .filter(|index| *index > 0)
                .map(|index| address[..index].to_string());
            ancestors.push(address);
        }
        ancestors
    }

    /// The parent's canonical id equals its address.
    pub fn parent_canonical_id(&self) -> Option<&str> {
        self.parent_address()
    }
}

#[cfg(test)]
mod tests {
    use super::Content;
    use crate::model::descriptor::{fields, ContentKind};
    use crate::model::record::{ErrorCategory, FieldError};
    use chrono::DateTime;

    #[test]
    fn title_cascades_to_slug_canonical_id_and_uri() {
        let mut page = Content::new_page();
        page.set_parent_address(Some("/about"))
            .unwrap()
            .set_title("About Test")
            .unwrap();
        assert_eq!(page.slug(), Some("about-test"));
        assert_eq!(page.address().as_deref(), Some("/about/about-test"));
        assert_eq!(page.canonical_id(), Some("/about/about-test"));
        assert_eq!(
            page.content_uri().map(|uri| uri.to_string()).as_deref(),
            Some("file://pages/about/about-test.md")
        );
    }

    #[test]
    fn caller_set_slug_is_sticky() {
        let mut page = Content::new_page();
        page.set_slug("custom").unwrap();
        page.set_title("Something Else").unwrap();
        assert_eq!(page.slug(), Some("custom"));
        assert_eq!(page.canonical_id(), Some("/custom"));
    }

    #[test]
    fn body_write_touches_date_updated_unless_caller_set() {
        let mut page = Content::new_page();
        let fixed = DateTime::parse_from_rfc3339("2001-01-01T00:00:00Z").unwrap();
        page.record_mut()
            .set(fields::DATE_UPDATED, fixed, true)
            .unwrap();
        page.set_body("hello").unwrap();
        assert_ne!(page.date_updated(), Some(fixed));

        page.set_date_updated(fixed).unwrap();
        page.set_body("changed").unwrap();
        assert_eq!(page.date_updated(), Some(fixed));
    }

    #[test]
    fn post_img_prefix_follows_title_and_date_until_caller_set() {
        let mut post = Content::new_post();
        let date = DateTime::parse_from_rfc3339("2016-11-01T18:00:00Z").unwrap();
        post.set_date_created(date).unwrap().set_title("About Test").unwrap();
        assert_eq!(post.img_prefix(), Some("2016-11-about-test"));

        post.set_img_prefix("custom").unwrap();
        post.set_title("Completely New Title Here").unwrap();
        assert_eq!(post.img_prefix(), Some("custom"));
    }

    #[test]
    fn post_only_fields_are_unknown_on_pages() {
        let mut page = Content::new_page();
        assert!(matches!(
            page.set_img_prefix("x").unwrap_err(),
            FieldError::UnknownField { .. }
        ));
        assert_eq!(Content::new(ContentKind::Content).content_class(), Some("content"));
    }

    #[test]
    fn tags_are_normalized_and_editable() {
        let mut page = Content::new_page();
        page.set_tags([" Rust", "rust", "SQL"]).unwrap();
        page.add_tag("News").unwrap().remove_tag("sql").unwrap();
        assert_eq!(
            page.tags().into_iter().collect::<Vec<_>>(),
            vec!["news", "rust"]
        );
    }

    #[test]
    fn ancestors_walk_up_to_root() {
        let mut page = Content::new_page();
        page.set_parent_address(Some("/a/b/c")).unwrap();
        page.set_title("Leaf").unwrap();
        assert_eq!(page.ancestors(), vec!["/a/b/c", "/a/b", "/a"]);
        assert_eq!(page.parent_canonical_id(), Some("/a/b/c"));

        let root = Content::new_page();
        assert!(root.ancestors().is_empty());
    }

    #[test]
    fn caller_set_canonical_id_survives_address_changes() {
        let mut page = Content::new_page();
        page.set_title("About Test").unwrap();
        page.set_canonical_id("/canon").unwrap();

        page.set_parent_address(Some("/x")).unwrap();
        page.set_slug("moved").unwrap();
        page.set_title("Renamed").unwrap();

        assert_eq!(page.address().as_deref(), Some("/x/moved"));
        assert_eq!(page.canonical_id(), Some("/canon"));
        assert!(!page.record().is_set_by_system(fields::CANONICAL_ID));
    }

    #[test]
    fn mismatched_content_class_is_a_value_error() {
        let mut page = Content::new_page();
        page.set_title("About Test").unwrap();
        assert!(page.record().is_valid());

        page.set_content_class("post").unwrap();
        assert!(page.record().has_error(fields::CONTENT_CLASS, ErrorCategory::Value));
        assert!(!page.record().is_valid());

        page.set_content_class("garbage").unwrap();
        assert!(page.record().has_error(fields::CONTENT_CLASS, ErrorCategory::Value));

        page.set_content_class("page").unwrap();
        assert!(!page.record().has_error(fields::CONTENT_CLASS, ErrorCategory::Value));
        assert!(page.record().is_valid(), "{:?}", page.record().errors());
    }

    #[test]
    fn new_content_reports_required_errors_until_titled() {
        let mut page = Content::new_page();
        assert!(page.record().has_error(fields::TITLE, ErrorCategory::Required));
        assert!(page.record().has_error(fields::CONTENT_URI, ErrorCategory::Required));
        page.set_title("Ready").unwrap();
        assert!(page.record().is_valid(), "{:?}", page.record().errors());
    }
}
