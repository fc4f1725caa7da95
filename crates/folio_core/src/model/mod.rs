//! Persistable record model.
//!
//! # Responsibility
//! - Define content records (content/page/post) and tag dictionary entries.
//! - Own change tracking, provenance, derived-field cascades and
//!   field-level validation.
//!
//! # Invariants
//! - Records never touch storage; the repository layer persists them.
//! - Type descriptors are static and immutable.

pub mod cascade;
pub mod content;
pub mod descriptor;
pub mod record;
pub mod registry;
pub mod slug;
pub mod tag;
pub mod uri;
pub mod validation;
pub mod value;

pub use content::Content;
pub use descriptor::{fields, ContentKind, TypeDescriptor};
pub use record::{ErrorCategory, FieldError, Record, RecordId, ValidationIssue};
pub use registry::{ContentRegistry, HydrationError};
pub use tag::ContentTag;
pub use uri::{ContentUri, UriError};
pub use value::FieldValue;
