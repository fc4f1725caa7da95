//! Tag dictionary entries and tag-name normalisation.

use crate::model::descriptor::{fields, TypeDescriptor, CONTENT_TAG_DESCRIPTOR};
use crate::model::record::{FieldError, Record, RecordId};
use std::collections::BTreeSet;

/// Normalises one tag: trims and lowercases it, returning `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Normalises a tag collection, dropping blanks and duplicates.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}

/// One entry of the global tag dictionary.
#[derive(Debug, Clone)]
pub struct ContentTag {
    record: Record,
}

impl ContentTag {
    pub fn descriptor() -> &'static TypeDescriptor {
        &CONTENT_TAG_DESCRIPTOR
    }

    /// Builds an unsaved tag. Blank names are kept as-is so validation can
    /// report them.
    pub fn new(name: &str) -> Result<Self, FieldError> {
        let mut record = Record::with_defaults(Self::descriptor());
        let value = normalize_tag(name).unwrap_or_default();
        record.set(fields::TAG_NAME, value, false)?;
        Ok(Self { record })
    }

    pub(crate) fn restore(id: RecordId, name: String) -> Result<Self, FieldError> {
        let record = Record::restore(
            Self::descriptor(),
            id,
            vec![(fields::TAG_NAME, name.into())],
            &BTreeSet::new(),
        )?;
        Ok(Self { record })
    }

    pub fn id(&self) -> Option<RecordId> {
        self.record.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.record.get(fields::TAG_NAME).as_text()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag, normalize_tags, ContentTag};
    use crate::model::record::ErrorCategory;

    #[test]
    fn normalize_tag_trims_and_lowercases() {
        assert_eq!(normalize_tag("  Rust "), Some("rust".to_string()));
        assert_eq!(normalize_tag("   "), None);
    }

    #[test]
    fn normalize_tags_deduplicates() {
        let tags = normalize_tags(["B", "b ", "", "a"]);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn blank_tag_name_is_a_required_error() {
        let tag = ContentTag::new("  ").expect("tag should build");
        assert!(tag.record().has_error(super::fields::TAG_NAME, ErrorCategory::Required));
        let named = ContentTag::new(" News ").expect("tag should build");
        assert_eq!(named.name(), Some("news"));
        assert!(named.record().is_valid());
    }
}
