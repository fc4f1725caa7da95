//! Derived-field rules.
//!
//! Each rule recomputes one target field when one of its trigger fields
//! changes. A rule is skipped when the record kind lacks the target, or when
//! the target was last written by a caller.
//!
//! # Invariants
//! - The trigger -> target graph is acyclic, so propagation terminates.

use crate::model::descriptor::fields::{
    BODY, CANONICAL_ID, CONTENT_URI, DATE_CREATED, DATE_UPDATED, IMG_PREFIX, PARENT_ADDRESS,
    SLUG, TITLE,
};
use crate::model::record::Record;
use crate::model::slug::{img_prefix, slugify};
use crate::model::uri::ContentUri;
use crate::model::value::{now, FieldValue};
use log::warn;

pub(crate) struct CascadeRule {
    pub(crate) triggers: &'static [&'static str],
    pub(crate) target: &'static str,
    /// When `false`, system writes to a trigger do not fire the rule.
    pub(crate) fires_on_system_writes: bool,
    derive: fn(&Record) -> Option<FieldValue>,
}

pub(crate) static CASCADE_RULES: &[CascadeRule] = &[
    CascadeRule {
        triggers: &[TITLE],
        target: SLUG,
        fires_on_system_writes: true,
        derive: derive_slug,
    },
    CascadeRule {
        triggers: &[SLUG, PARENT_ADDRESS],
        target: CANONICAL_ID,
        fires_on_system_writes: true,
        derive: derive_canonical_id,
    },
    CascadeRule {
        triggers: &[SLUG, PARENT_ADDRESS],
        target: CONTENT_URI,
        fires_on_system_writes: true,
        derive: derive_content_uri,
    },
    CascadeRule {
        triggers: &[BODY],
        target: DATE_UPDATED,
        fires_on_system_writes: false,
        derive: derive_date_updated,
    },
    CascadeRule {
        triggers: &[DATE_CREATED, TITLE],
        target: IMG_PREFIX,
        fires_on_system_writes: true,
        derive: derive_img_prefix,
    },
];

/// Applies every rule triggered by a change of `field`.
pub(crate) fn propagate(record: &mut Record, field: &str, system_set: bool) {
    for rule in CASCADE_RULES {
        if !rule.triggers.iter().any(|trigger| *trigger == field) {
            continue;
        }
        if system_set && !rule.fires_on_system_writes {
            continue;
        }
        if !record.descriptor().has_field(rule.target) || !record.is_set_by_system(rule.target) {
            continue;
        }
        let Some(value) = (rule.derive)(record) else {
            continue;
        };
        if let Err(err) = record.set(rule.target, value, true) {
            warn!(
                "event=field_cascade module=model status=error trigger={} target={} error={}",
                field, rule.target, err
            );
        }
    }
}

/// `parent + "/" + slug`; `None` while the slug is missing.
pub fn compose_address(parent: Option<&str>, slug: Option<&str>) -> Option<String> {
    let slug = slug.filter(|slug| !slug.is_empty())?;
    Some(format!("{}/{}", parent.unwrap_or(""), slug))
}

pub(crate) fn record_address(record: &Record) -> Option<String> {
    compose_address(
        record.get(PARENT_ADDRESS).as_text(),
        record.get(SLUG).as_text(),
    )
}

fn derive_slug(record: &Record) -> Option<FieldValue> {
    let title = record.get(TITLE).as_text().filter(|title| !title.is_empty())?;
    Some(FieldValue::Text(slugify(title)))
}

fn derive_canonical_id(record: &Record) -> Option<FieldValue> {
    record_address(record).map(FieldValue::Text)
}

fn derive_content_uri(record: &Record) -> Option<FieldValue> {
    let address = record_address(record)?;
    ContentUri::for_address(&address).ok().map(FieldValue::Uri)
}

fn derive_date_updated(_record: &Record) -> Option<FieldValue> {
    Some(FieldValue::Date(now()))
}

fn derive_img_prefix(record: &Record) -> Option<FieldValue> {
    let date_created = record.get(DATE_CREATED).as_date()?;
    let title = record.get(TITLE).as_text().filter(|title| !title.is_empty())?;
    Some(FieldValue::Text(img_prefix(&date_created, title)))
}

#[cfg(test)]
mod tests {
    use super::{compose_address, CASCADE_RULES};
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn rule_graph_is_acyclic() {
        let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for rule in CASCADE_RULES {
            for trigger in rule.triggers {
                edges.entry(*trigger).or_default().insert(rule.target);
            }
        }

        fn visit<'a>(
            node: &'a str,
            edges: &BTreeMap<&'a str, BTreeSet<&'a str>>,
            path: &mut Vec<&'a str>,
        ) {
            assert!(!path.contains(&node), "cascade cycle through {path:?} -> {node}");
            path.push(node);
            if let Some(targets) = edges.get(node) {
                for target in targets {
                    visit(target, edges, path);
                }
            }
            path.pop();
        }

        for node in edges.keys() {
            visit(node, &edges, &mut Vec::new());
        }
    }

    #[test]
    fn address_needs_a_slug() {
        assert_eq!(compose_address(Some("/about"), Some("me")), Some("/about/me".into()));
        assert_eq!(compose_address(None, Some("me")), Some("/me".into()));
        assert_eq!(compose_address(Some("/about"), None), None);
        assert_eq!(compose_address(Some("/about"), Some("")), None);
    }
}
