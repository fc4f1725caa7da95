//! Static type descriptors for persistable record kinds.
//!
//! # Responsibility
//! - Declare every field a record kind exposes, with its type, storage
//!   location, default and required-message.
//! - Provide the type catalog used to resolve class names on hydration.
//!
//! # Invariants
//! - Field lists are fixed at compile time; lookups never allocate.
//! - Every `Storage::Primary` column exists on the `content` table (or on
//!   `tags` for the tag family).

use crate::model::uri::ContentUri;
use crate::model::value::{format_date, now, parse_date, FieldValue};
use crate::model::tag::normalize_tags;

/// Field keys shared by records, SQL columns and provenance maps.
pub mod fields {
    pub const ID: &str = "id";
    pub const ACTIVE: &str = "active";
    pub const PARENT_ADDRESS: &str = "parent_address";
    pub const SLUG: &str = "slug";
    pub const CANONICAL_ID: &str = "canonical_id";
    pub const CONTENT_CLASS: &str = "content_class";
    pub const CONTENT_TYPE: &str = "content_type";
    pub const CONTENT_URI: &str = "content_uri";
    pub const DATE_CREATED: &str = "date_created";
    pub const DATE_UPDATED: &str = "date_updated";
    pub const DATE_EXPIRED: &str = "date_expired";
    pub const LANG: &str = "lang";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
    pub const TAGS: &str = "tags";
    pub const ATTRIBUTES: &str = "attributes";
    pub const AUTHOR: &str = "author";
    pub const IMG_PREFIX: &str = "img_prefix";
    pub const HAS_IMG: &str = "has_img";
    pub const TAG_NAME: &str = "name";
    /// Derived column, never a settable field.
    pub const ADDRESS: &str = "address";
}

use fields::*;

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";
pub const DEFAULT_LANG: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Stored as INTEGER 0/1.
    Flag,
    Text,
    Slug,
    ParentAddress,
    Lang,
    Date,
    Uri,
    ContentClass,
    Tags,
    Attributes,
}

impl FieldType {
    pub fn expected(self) -> &'static str {
        match self {
            Self::Flag => "bool or 0/1 integer",
            Self::Text | Self::Slug | Self::ParentAddress | Self::Lang | Self::ContentClass => {
                "text"
            }
            Self::Date => "date or parseable date text",
            Self::Uri => "uri or parseable uri text",
            Self::Tags => "tag set",
            Self::Attributes => "attribute map",
        }
    }

    /// Converts a setter input into its stored form, or `None` on a type
    /// mismatch. `Null` is accepted by every type.
    pub fn normalize(self, value: FieldValue) -> Option<FieldValue> {
        match (self, value) {
            (_, FieldValue::Null) => Some(FieldValue::Null),
            (Self::Flag, FieldValue::Bool(flag)) => Some(FieldValue::Integer(i64::from(flag))),
            (Self::Flag, FieldValue::Integer(raw @ (0 | 1))) => Some(FieldValue::Integer(raw)),
            (
                Self::Text | Self::Slug | Self::ParentAddress | Self::Lang | Self::ContentClass,
                FieldValue::Text(text),
            ) => Some(FieldValue::Text(text)),
            (Self::Date, FieldValue::Date(date)) => Some(FieldValue::Text(format_date(&date))),
            (Self::Date, FieldValue::Text(text)) => {
                parse_date(&text).map(|date| FieldValue::Text(format_date(&date)))
            }
            (Self::Uri, FieldValue::Uri(uri)) => Some(FieldValue::Text(uri.to_string())),
            (Self::Uri, FieldValue::Text(text)) => ContentUri::parse(&text)
                .ok()
                .map(|uri| FieldValue::Text(uri.to_string())),
            (Self::Tags, FieldValue::Tags(tags)) => Some(FieldValue::Tags(normalize_tags(tags))),
            (Self::Attributes, FieldValue::Attributes(map)) => Some(FieldValue::Attributes(map)),
            _ => None,
        }
    }
}

/// Where a field's value is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// A column of the record's primary row.
    Primary(&'static str),
    /// External body store, addressed by `content_uri`.
    Body,
    /// Link table against the tag dictionary.
    Tags,
    /// Key/value side table.
    Attributes,
}

impl Storage {
    pub fn is_auxiliary(self) -> bool {
        !matches!(self, Self::Primary(_))
    }
}

/// Value a freshly constructed record starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Null,
    Flag(bool),
    Text(&'static str),
    Now,
    TypeName,
    EmptyTags,
    EmptyAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub storage: Storage,
    pub default: FieldDefault,
    /// Message recorded when the field is null or empty.
    pub required: Option<&'static str>,
}

impl FieldSpec {
    pub fn column(&self) -> Option<&'static str> {
        match self.storage {
            Storage::Primary(column) => Some(column),
            _ => None,
        }
    }

    pub(crate) fn default_value(&self, descriptor: &TypeDescriptor) -> FieldValue {
        match self.default {
            FieldDefault::Null => FieldValue::Null,
            FieldDefault::Flag(flag) => FieldValue::Bool(flag),
            FieldDefault::Text(text) => FieldValue::from(text),
            FieldDefault::Now => FieldValue::Date(now()),
            FieldDefault::TypeName => FieldValue::from(descriptor.name),
            FieldDefault::EmptyTags => FieldValue::Tags(Default::default()),
            FieldDefault::EmptyAttributes => FieldValue::Attributes(Default::default()),
        }
    }
}

/// Concrete content subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Content,
    Page,
    Post,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [Self::Content, Self::Page, Self::Post];

    pub fn descriptor(self) -> &'static TypeDescriptor {
        match self {
            Self::Content => &CONTENT_DESCRIPTOR,
            Self::Page => &PAGE_DESCRIPTOR,
            Self::Post => &POST_DESCRIPTOR,
        }
    }

    pub fn type_name(self) -> &'static str {
        self.descriptor().name
    }
}

/// Which root a record kind descends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFamily {
    Content(ContentKind),
    Tag,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Normalised type name, also the default class discriminator.
    pub name: &'static str,
    pub family: RecordFamily,
    pub fields: &'static [FieldSpec],
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn primary_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|spec| !spec.storage.is_auxiliary())
    }

    pub fn auxiliary_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|spec| spec.storage.is_auxiliary())
    }
}

const fn primary(
    name: &'static str,
    field_type: FieldType,
    default: FieldDefault,
    required: Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        storage: Storage::Primary(name),
        default,
        required,
    }
}

const F_ACTIVE: FieldSpec = primary(
    ACTIVE,
    FieldType::Flag,
    FieldDefault::Flag(true),
    Some("You must specify whether the content is active"),
);
const F_PARENT_ADDRESS: FieldSpec =
    primary(PARENT_ADDRESS, FieldType::ParentAddress, FieldDefault::Null, None);
const F_SLUG: FieldSpec = primary(
    SLUG,
    FieldType::Slug,
    FieldDefault::Null,
    Some("You must specify a slug"),
);
const F_CANONICAL_ID: FieldSpec = primary(
    CANONICAL_ID,
    FieldType::Text,
    FieldDefault::Null,
    Some("You must specify a canonical id"),
);
const F_CONTENT_CLASS: FieldSpec = primary(
    CONTENT_CLASS,
    FieldType::ContentClass,
    FieldDefault::TypeName,
    Some("You must specify a content class"),
);
const F_CONTENT_TYPE: FieldSpec = primary(
    CONTENT_TYPE,
    FieldType::Text,
    FieldDefault::Text(DEFAULT_CONTENT_TYPE),
    Some("You must specify a content type"),
);
const F_CONTENT_URI: FieldSpec = primary(
    CONTENT_URI,
    FieldType::Uri,
    FieldDefault::Null,
    Some("You must specify a content uri"),
);
const F_DATE_CREATED: FieldSpec = primary(
    DATE_CREATED,
    FieldType::Date,
    FieldDefault::Now,
    Some("You must specify a creation date"),
);
const F_DATE_UPDATED: FieldSpec = primary(
    DATE_UPDATED,
    FieldType::Date,
    FieldDefault::Now,
    Some("You must specify an update date"),
);
const F_DATE_EXPIRED: FieldSpec = primary(DATE_EXPIRED, FieldType::Date, FieldDefault::Null, None);
const F_LANG: FieldSpec = primary(
    LANG,
    FieldType::Lang,
    FieldDefault::Text(DEFAULT_LANG),
    Some("You must specify a language"),
);
const F_TITLE: FieldSpec = primary(
    TITLE,
    FieldType::Text,
    FieldDefault::Null,
    Some("You must specify a title"),
);
const F_BODY: FieldSpec = FieldSpec {
    name: BODY,
    field_type: FieldType::Text,
    storage: Storage::Body,
    default: FieldDefault::Null,
    required: None,
};
const F_TAGS: FieldSpec = FieldSpec {
    name: TAGS,
    field_type: FieldType::Tags,
    storage: Storage::Tags,
    default: FieldDefault::EmptyTags,
    required: None,
};
const F_ATTRIBUTES: FieldSpec = FieldSpec {
    name: ATTRIBUTES,
    field_type: FieldType::Attributes,
    storage: Storage::Attributes,
    default: FieldDefault::EmptyAttributes,
    required: None,
};
const F_AUTHOR: FieldSpec = primary(AUTHOR, FieldType::Text, FieldDefault::Null, None);
const F_IMG_PREFIX: FieldSpec = primary(
    IMG_PREFIX,
    FieldType::Text,
    FieldDefault::Null,
    Some("You must specify an image prefix"),
);
const F_HAS_IMG: FieldSpec = primary(
    HAS_IMG,
    FieldType::Flag,
    FieldDefault::Flag(false),
    Some("You must specify whether the post has images"),
);
const F_TAG_NAME: FieldSpec = primary(
    TAG_NAME,
    FieldType::Text,
    FieldDefault::Null,
    Some("You must specify a tag name"),
);

const CONTENT_FIELDS: &[FieldSpec] = &[
    F_ACTIVE,
    F_PARENT_ADDRESS,
    F_SLUG,
    F_CANONICAL_ID,
    F_CONTENT_CLASS,
    F_CONTENT_TYPE,
    F_CONTENT_URI,
    F_DATE_CREATED,
    F_DATE_UPDATED,
    F_DATE_EXPIRED,
    F_LANG,
    F_TITLE,
    F_BODY,
    F_TAGS,
    F_ATTRIBUTES,
];

const POST_FIELDS: &[FieldSpec] = &[
    F_ACTIVE,
    F_PARENT_ADDRESS,
    F_SLUG,
    F_CANONICAL_ID,
    F_CONTENT_CLASS,
    F_CONTENT_TYPE,
    F_CONTENT_URI,
    F_DATE_CREATED,
    F_DATE_UPDATED,
    F_DATE_EXPIRED,
    F_LANG,
    F_TITLE,
    F_BODY,
    F_TAGS,
    F_ATTRIBUTES,
    F_AUTHOR,
    F_IMG_PREFIX,
    F_HAS_IMG,
];

pub static CONTENT_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    name: "content",
    family: RecordFamily::Content(ContentKind::Content),
    fields: CONTENT_FIELDS,
};

pub static PAGE_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    name: "page",
    family: RecordFamily::Content(ContentKind::Page),
    fields: CONTENT_FIELDS,
};

pub static POST_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    name: "post",
    family: RecordFamily::Content(ContentKind::Post),
    fields: POST_FIELDS,
};

/// Tag dictionary entries. Persistable, but not a content subtype.
pub static CONTENT_TAG_DESCRIPTOR: TypeDescriptor = TypeDescriptor {
    name: "content-tag",
    family: RecordFamily::Tag,
    fields: &[F_TAG_NAME],
};

static CATALOG: [&TypeDescriptor; 4] = [
    &CONTENT_DESCRIPTOR,
    &PAGE_DESCRIPTOR,
    &POST_DESCRIPTOR,
    &CONTENT_TAG_DESCRIPTOR,
];

/// Looks up a known record type by its normalised name.
pub fn descriptor_by_type_name(name: &str) -> Option<&'static TypeDescriptor> {
    let normalized = name.trim().to_ascii_lowercase();
    CATALOG
        .iter()
        .copied()
        .find(|descriptor| descriptor.name == normalized)
}
