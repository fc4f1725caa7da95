//! Field-level validation rules.
//!
//! These checks are pure: they look at one field value, its spec and the
//! normalized type name of the record that owns it. Store-backed checks
//! (uniqueness, class registration) live with the repository.

use crate::model::descriptor::{FieldSpec, FieldType};
use crate::model::record::ErrorCategory;
use crate::model::value::FieldValue;

/// Outcome of one rule: `failure` is `None` when the rule passes and any
/// previously recorded error for that category should be cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub category: ErrorCategory,
    pub failure: Option<String>,
}

impl FieldCheck {
    fn pass(category: ErrorCategory) -> Self {
        Self {
            category,
            failure: None,
        }
    }

    fn fail(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            failure: Some(message.into()),
        }
    }

    fn check(category: ErrorCategory, ok: bool, message: impl FnOnce() -> String) -> Self {
        if ok {
            Self::pass(category)
        } else {
            Self::fail(category, message())
        }
    }
}

/// Runs every rule that applies to `spec` against `value`, for a record
/// whose descriptor is named `type_name`.
pub fn check_field(spec: &FieldSpec, value: &FieldValue, type_name: &str) -> Vec<FieldCheck> {
    let mut checks = Vec::with_capacity(2);
    if let Some(message) = spec.required {
        checks.push(FieldCheck::check(
            ErrorCategory::Required,
            !value.is_blank(),
            || message.to_string(),
        ));
    }
    if let Some(check) = check_value(spec, value, type_name) {
        checks.push(check);
    }
    checks
}

fn check_value(spec: &FieldSpec, value: &FieldValue, type_name: &str) -> Option<FieldCheck> {
    let category = ErrorCategory::Value;
    let check = match spec.field_type {
        // A blank class is left to the required rule.
        FieldType::ContentClass => match value.as_text() {
            Some(class) if !class.is_empty() => FieldCheck::check(category, class == type_name, || {
                format!("content class `{class}` is inconsistent with record type `{type_name}`")
            }),
            _ => FieldCheck::pass(category),
        },
        FieldType::Flag => FieldCheck::check(category, value.as_flag().is_some(), || {
            format!("`{}` must be true or false", spec.name)
        }),
        FieldType::Lang => match value.as_text() {
            Some(lang) => FieldCheck::check(category, lang.chars().count() == 2, || {
                format!("`{lang}` is not a two-character language code")
            }),
            None => FieldCheck::pass(category),
        },
        FieldType::Slug => match value.as_text() {
            Some(slug) => FieldCheck::check(category, !slug.contains('/'), || {
                format!("slug `{slug}` must not contain `/`")
            }),
            None => FieldCheck::pass(category),
        },
        FieldType::ParentAddress => match value.as_text() {
            Some(parent) if !parent.is_empty() => FieldCheck::check(
                category,
                parent.starts_with('/') && !parent.ends_with('/'),
                || format!("parent address `{parent}` must start and not end with `/`"),
            ),
            _ => FieldCheck::pass(category),
        },
        _ => return None,
    };
    Some(check)
}
