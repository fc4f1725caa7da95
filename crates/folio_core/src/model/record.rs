//! Generic persistable record engine.
//!
//! # Responsibility
//! - Hold field values for any descriptor-backed record kind.
//! - Track change history, per-field provenance and validation errors.
//! - Drive derived-field cascades on effective value changes.
//!
//! # Invariants
//! - Only fields declared by the descriptor can be read or written.
//! - `id` is immutable once assigned.
//! - Every write re-validates the written field; errors are always current.
//! - A cascade runs only when the stored value actually changed, and only
//!   overwrites targets that are still system-set.

use crate::model::cascade;
use crate::model::descriptor::{fields, FieldSpec, TypeDescriptor};
use crate::model::validation::check_field;
use crate::model::value::FieldValue;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RecordId = i64;

static NULL: FieldValue = FieldValue::Null;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    UnknownField {
        type_name: &'static str,
        field: String,
    },
    InvalidArgument {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    ImmutableField {
        field: &'static str,
        current: RecordId,
        attempted: String,
    },
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { type_name, field } => {
                write!(f, "`{type_name}` has no field `{field}`")
            }
            Self::InvalidArgument {
                field,
                expected,
                found,
            } => write!(f, "field `{field}` expects {expected}, got {found}"),
            Self::ImmutableField {
                field,
                current,
                attempted,
            } => write!(
                f,
                "field `{field}` is immutable (current {current}, attempted {attempted})"
            ),
        }
    }
}

impl Error for FieldError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    Required,
    Value,
    Uniqueness,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Value => "value",
            Self::Uniqueness => "uniqueness",
        }
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub category: ErrorCategory,
    pub message: String,
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.category, self.message)
    }
}

/// One recorded write: the value and provenance the field had before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub field: &'static str,
    pub previous: FieldValue,
    pub previous_set_by_system: Option<bool>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Record {
    descriptor: &'static TypeDescriptor,
    id: Option<RecordId>,
    values: BTreeMap<&'static str, FieldValue>,
    set_by_system: BTreeMap<&'static str, bool>,
    history: Vec<ChangeEntry>,
    errors: BTreeMap<(String, ErrorCategory), String>,
}

impl Record {
    fn empty(descriptor: &'static TypeDescriptor) -> Self {
        Self {
            descriptor,
            id: None,
            values: BTreeMap::new(),
            set_by_system: BTreeMap::new(),
            history: Vec::new(),
            errors: BTreeMap::new(),
        }
    }

    /// New unsaved record with every declared field written as system-set.
    pub fn with_defaults(descriptor: &'static TypeDescriptor) -> Self {
        let mut record = Self::empty(descriptor);
        for spec in descriptor.fields {
            if let Some(value) = spec.field_type.normalize(spec.default_value(descriptor)) {
                if record.apply(spec, value, true) {
                    cascade::propagate(&mut record, spec.name, true);
                }
            }
        }
        record
    }

    /// Rebuilds a persisted record. Fields are caller-set unless listed in
    /// `set_by_system`; history starts empty and no cascade runs.
    pub(crate) fn restore(
        descriptor: &'static TypeDescriptor,
        id: RecordId,
        values: Vec<(&str, FieldValue)>,
        set_by_system: &BTreeSet<String>,
    ) -> Result<Self, FieldError> {
        let mut incoming: BTreeMap<&str, FieldValue> = values.into_iter().collect();
        let mut record = Self::empty(descriptor);
        record.id = Some(id);
        for spec in descriptor.fields {
            let raw = incoming.remove(spec.name).unwrap_or(FieldValue::Null);
            let found = raw.kind_name();
            let value = spec
                .field_type
                .normalize(raw)
                .ok_or(FieldError::InvalidArgument {
                    field: spec.name,
                    expected: spec.field_type.expected(),
                    found,
                })?;
            record.values.insert(spec.name, value);
            record
                .set_by_system
                .insert(spec.name, set_by_system.contains(spec.name));
            record.revalidate(spec);
        }
        if let Some(field) = incoming.into_keys().next() {
            return Err(FieldError::UnknownField {
                type_name: descriptor.name,
                field: field.to_string(),
            });
        }
        Ok(record)
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.descriptor
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Assigns the store identity. Re-assigning the same id is a no-op.
    pub fn assign_id(&mut self, id: RecordId) -> Result<(), FieldError> {
        match self.id {
            Some(current) if current != id => Err(FieldError::ImmutableField {
                field: fields::ID,
                current,
                attempted: id.to_string(),
            }),
            _ => {
                self.id = Some(id);
                Ok(())
            }
        }
    }

    /// Current value of `field`; undeclared fields read as null.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Writes one field.
    ///
    /// The value is type-checked and normalised, recorded in history when it
    /// differs from (or replaces a null) previous value, validated, and, if it
    /// changed, propagated to dependent system-set fields.
    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
        system_set: bool,
    ) -> Result<&mut Self, FieldError> {
        let value = value.into();
        if field == fields::ID {
            self.set_id_value(value)?;
            return Ok(self);
        }

        let spec = self
            .descriptor
            .field(field)
            .ok_or_else(|| FieldError::UnknownField {
                type_name: self.descriptor.name,
                field: field.to_string(),
            })?;
        let found = value.kind_name();
        let value = spec
            .field_type
            .normalize(value)
            .ok_or(FieldError::InvalidArgument {
                field: spec.name,
                expected: spec.field_type.expected(),
                found,
            })?;

        if self.apply(spec, value, system_set) {
            cascade::propagate(self, spec.name, system_set);
        }
        Ok(self)
    }

    fn set_id_value(&mut self, value: FieldValue) -> Result<(), FieldError> {
        match value {
            FieldValue::Integer(id) => self.assign_id(id),
            FieldValue::Null => match self.id {
                None => Ok(()),
                Some(current) => Err(FieldError::ImmutableField {
                    field: fields::ID,
                    current,
                    attempted: "null".to_string(),
                }),
            },
            other => Err(FieldError::InvalidArgument {
                field: fields::ID,
                expected: "integer",
                found: other.kind_name(),
            }),
        }
    }

    fn apply(&mut self, spec: &'static FieldSpec, value: FieldValue, system_set: bool) -> bool {
        let previous = self.values.get(spec.name).cloned().unwrap_or(FieldValue::Null);
        let changed = previous != value;
        if changed || previous.is_null() {
            self.history.push(ChangeEntry {
                field: spec.name,
                previous,
                previous_set_by_system: self.set_by_system.get(spec.name).copied(),
                recorded_at: Utc::now(),
            });
        }
        self.values.insert(spec.name, value);
        self.set_by_system.insert(spec.name, system_set);
        self.revalidate(spec);
        changed
    }

    /// Reverts the most recent write to `field` without cascading.
    /// Returns `false` when the field has no recorded change.
    pub fn undo_change(&mut self, field: &str) -> bool {
        let Some(position) = self.history.iter().rposition(|entry| entry.field == field) else {
            return false;
        };
        let entry = self.history.remove(position);
        let Some(spec) = self.descriptor.field(entry.field) else {
            return false;
        };
        self.values.insert(spec.name, entry.previous);
        match entry.previous_set_by_system {
            Some(flag) => self.set_by_system.insert(spec.name, flag),
            None => self.set_by_system.remove(spec.name),
        };
        self.revalidate(spec);
        true
    }

    fn revalidate(&mut self, spec: &FieldSpec) {
        let value = self.values.get(spec.name).unwrap_or(&NULL);
        for check in check_field(spec, value, self.descriptor.name) {
            let key = (spec.name.to_string(), check.category);
            match check.failure {
                Some(message) => self.errors.insert(key, message),
                None => self.errors.remove(&key),
            };
        }
    }

    /// Fields written since construction, hydration or the last save.
    pub fn changed_fields(&self) -> BTreeSet<&'static str> {
        self.history.iter().map(|entry| entry.field).collect()
    }

    /// Current values of every changed field.
    pub fn changes(&self) -> BTreeMap<&'static str, &FieldValue> {
        self.changed_fields()
            .into_iter()
            .map(|field| (field, self.get(field)))
            .collect()
    }

    pub fn has_changed(&self, field: &str) -> bool {
        self.history.iter().any(|entry| entry.field == field)
    }

    pub fn history(&self) -> &[ChangeEntry] {
        &self.history
    }

    pub fn is_set_by_system(&self, field: &str) -> bool {
        self.set_by_system.get(field).copied().unwrap_or(false)
    }

    pub fn fields_set_by_system(&self) -> BTreeSet<&'static str> {
        self.set_by_system
            .iter()
            .filter(|(_, system)| **system)
            .map(|(field, _)| *field)
            .collect()
    }

    /// Clears history after the record has been persisted.
    pub(crate) fn mark_persisted(&mut self) {
        self.history.clear();
    }

    pub fn set_error(
        &mut self,
        field: impl Into<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) {
        self.errors.insert((field.into(), category), message.into());
    }

    pub fn clear_error(&mut self, field: &str, category: ErrorCategory) {
        self.errors.remove(&(field.to_string(), category));
    }

    pub fn has_error(&self, field: &str, category: ErrorCategory) -> bool {
        self.errors.contains_key(&(field.to_string(), category))
    }

    pub fn errors(&self) -> Vec<ValidationIssue> {
        self.errors
            .iter()
            .map(|((field, category), message)| ValidationIssue {
                field: field.clone(),
                category: *category,
                message: message.clone(),
            })
            .collect()
    }

    pub fn errors_in(&self, category: ErrorCategory) -> Vec<ValidationIssue> {
        self.errors()
            .into_iter()
            .filter(|issue| issue.category == category)
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCategory, FieldError, Record};
    use crate::model::descriptor::{fields, ContentKind};
    use crate::model::value::FieldValue;
    use std::collections::BTreeSet;

    fn page() -> Record {
        Record::with_defaults(ContentKind::Page.descriptor())
    }

    #[test]
    fn defaults_are_system_set_and_flag_missing_required_fields() {
        let record = page();
        assert!(record.is_set_by_system(fields::TITLE));
        assert!(record.is_set_by_system(fields::LANG));
        assert_eq!(record.get(fields::LANG), &FieldValue::from("en"));
        assert_eq!(record.get(fields::ACTIVE), &FieldValue::Integer(1));
        assert!(record.has_error(fields::TITLE, ErrorCategory::Required));
        assert!(record.has_error(fields::SLUG, ErrorCategory::Required));
        assert!(!record.has_error(fields::PARENT_ADDRESS, ErrorCategory::Required));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut record = page();
        let err = record.set("img_prefix", "x", false).unwrap_err();
        assert!(matches!(err, FieldError::UnknownField { .. }));
    }

    #[test]
    fn type_mismatch_is_invalid_argument() {
        let mut record = page();
        let err = record.set(fields::ACTIVE, "maybe", false).unwrap_err();
        assert!(matches!(
            err,
            FieldError::InvalidArgument {
                field: "active",
                ..
            }
        ));
    }

    #[test]
    fn id_is_immutable_once_assigned() {
        let mut record = page();
        record.set(fields::ID, 7_i64, false).expect("first id");
        record.set(fields::ID, 7_i64, false).expect("same id is fine");
        let err = record.set(fields::ID, 8_i64, false).unwrap_err();
        assert!(matches!(err, FieldError::ImmutableField { current: 7, .. }));
        assert_eq!(record.id(), Some(7));
    }

    #[test]
    fn writes_revalidate_and_clear_errors() {
        let mut record = page();
        record.set(fields::TITLE, "Hello", false).expect("set title");
        assert!(!record.has_error(fields::TITLE, ErrorCategory::Required));
        record.set(fields::TITLE, "", false).expect("clear title");
        assert!(record.has_error(fields::TITLE, ErrorCategory::Required));
    }

    #[test]
    fn unchanged_non_null_write_does_not_record_history() {
        let mut record = page();
        record.mark_persisted();
        record.set(fields::LANG, "en", false).expect("same lang");
        assert!(record.changed_fields().is_empty());
        assert!(!record.is_set_by_system(fields::LANG));
    }

    #[test]
    fn undo_restores_previous_value_and_provenance() {
        let mut record = page();
        record.set(fields::TITLE, "First", false).expect("title");
        record.mark_persisted();
        record.set(fields::SLUG, "custom", false).expect("slug");
        assert_eq!(record.get(fields::CANONICAL_ID), &FieldValue::from("/custom"));

        assert!(record.undo_change(fields::SLUG));
        assert_eq!(record.get(fields::SLUG), &FieldValue::from("first"));
        assert!(record.is_set_by_system(fields::SLUG));
        // no cascade on undo
        assert_eq!(record.get(fields::CANONICAL_ID), &FieldValue::from("/custom"));
        assert!(!record.undo_change(fields::SLUG));
    }

    #[test]
    fn restore_marks_only_recorded_fields_as_system_set() {
        let system: BTreeSet<String> = [fields::SLUG.to_string()].into_iter().collect();
        let record = Record::restore(
            ContentKind::Page.descriptor(),
            3,
            vec![
                (fields::TITLE, "Hi".into()),
                (fields::SLUG, "hi".into()),
                (fields::ACTIVE, FieldValue::Integer(1)),
            ],
            &system,
        )
        .expect("restore");
        assert_eq!(record.id(), Some(3));
        assert!(record.changed_fields().is_empty());
        assert!(record.is_set_by_system(fields::SLUG));
        assert!(!record.is_set_by_system(fields::TITLE));
        assert_eq!(
            record.fields_set_by_system().into_iter().collect::<Vec<_>>(),
            vec![fields::SLUG]
        );
    }

    #[test]
    fn restore_rejects_unknown_fields() {
        let err = Record::restore(
            ContentKind::Content.descriptor(),
            1,
            vec![(fields::HAS_IMG, FieldValue::Integer(0))],
            &BTreeSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::UnknownField { .. }));
    }
}
