//! Field value representation and canonical storage normalisation.
//!
//! # Responsibility
//! - Define the dynamic value type flowing through record setters.
//! - Own the canonical timestamp format used for every date field.
//!
//! # Invariants
//! - Stored (normalised) values only use `Null`, `Integer`, `Text`, `Tags` and
//!   `Attributes`; `Bool`, `Date` and `Uri` exist as setter inputs only.
//! - Canonical dates are UTC and formatted with [`DATE_FORMAT`].

use crate::model::uri::ContentUri;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical timestamp layout, e.g. `2016-11-01T23:00:00+0000`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Dynamic value accepted by record setters and held by records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Date(DateTime<FixedOffset>),
    Uri(ContentUri),
    Tags(BTreeSet<String>),
    Attributes(BTreeMap<String, String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this value counts as "missing" for required checks.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Reads a stored `0/1` flag.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Reads a stored canonical date.
    pub fn as_date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Text(value) => parse_date(value),
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    pub fn as_attributes(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Attributes(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Short name of the variant, used in type-mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Uri(_) => "uri",
            Self::Tags(_) => "tags",
            Self::Attributes(_) => "attributes",
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value.fixed_offset())
    }
}

impl From<ContentUri> for FieldValue {
    fn from(value: ContentUri) -> Self {
        Self::Uri(value)
    }
}

impl From<BTreeSet<String>> for FieldValue {
    fn from(value: BTreeSet<String>) -> Self {
        Self::Tags(value)
    }
}

impl From<BTreeMap<String, String>> for FieldValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Attributes(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Current time as used for `date_created`/`date_updated` defaults.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// Formats a timestamp in the canonical UTC storage layout.
pub fn format_date(value: &DateTime<FixedOffset>) -> String {
    value.with_timezone(&Utc).format(DATE_FORMAT).to_string()
}

/// Parses a canonical, RFC 3339 or bare `YYYY-MM-DD` date string.
///
/// Bare dates may use `-`, `_`, `/`, `.` or `'` as separators and resolve to
/// midnight UTC.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed);
    }
    if trimmed.chars().count() == 10 {
        let normalized = trimmed.replace(['_', '/', '.', '\''], "-");
        let date = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).fixed_offset());
    }
    None
}
