//! Content class registry.
//!
//! Maps the `content_class` discriminator stored on each row to a concrete
//! content type. The registry is an explicit value owned by whoever hydrates
//! rows, so tests and embedders can extend it without global state.

use crate::model::descriptor::{descriptor_by_type_name, ContentKind, RecordFamily};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationError {
    /// The discriminator has no registry binding.
    UnknownContentClass(String),
    /// The binding names a type that does not exist.
    NonexistentContentClass { class: String, type_name: String },
    /// The binding names a type outside the content family.
    NondescendentContentClass { class: String, type_name: String },
}

impl Display for HydrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContentClass(class) => write!(f, "unknown content class `{class}`"),
            Self::NonexistentContentClass { class, type_name } => write!(
                f,
                "content class `{class}` is bound to nonexistent type `{type_name}`"
            ),
            Self::NondescendentContentClass { class, type_name } => write!(
                f,
                "content class `{class}` is bound to `{type_name}`, which is not a content type"
            ),
        }
    }
}

impl Error for HydrationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRegistry {
    bindings: BTreeMap<String, String>,
}

impl Default for ContentRegistry {
    /// Binds each built-in content type under its own name.
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in ContentKind::ALL {
            registry.register(kind.type_name(), kind.type_name());
        }
        registry
    }
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Binds `discriminator` to `type_name`, replacing any earlier binding.
    /// The target is checked lazily on [`ContentRegistry::resolve`].
    pub fn register(&mut self, discriminator: &str, type_name: &str) -> &mut Self {
        self.bindings
            .insert(discriminator.trim().to_string(), type_name.trim().to_string());
        self
    }

    pub fn unregister(&mut self, discriminator: &str) -> Option<String> {
        self.bindings.remove(discriminator.trim())
    }

    pub fn is_registered(&self, discriminator: &str) -> bool {
        self.bindings.contains_key(discriminator.trim())
    }

    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn resolve(&self, discriminator: &str) -> Result<ContentKind, HydrationError> {
        let type_name = self
            .bindings
            .get(discriminator.trim())
            .ok_or_else(|| HydrationError::UnknownContentClass(discriminator.to_string()))?;
        let descriptor = descriptor_by_type_name(type_name).ok_or_else(|| {
            HydrationError::NonexistentContentClass {
                class: discriminator.to_string(),
                type_name: type_name.clone(),
            }
        })?;
        match descriptor.family {
            RecordFamily::Content(kind) => Ok(kind),
            RecordFamily::Tag => Err(HydrationError::NondescendentContentClass {
                class: discriminator.to_string(),
                type_name: type_name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentRegistry, HydrationError};
    use crate::model::descriptor::ContentKind;

    #[test]
    fn default_bindings_cover_builtin_types() {
        let registry = ContentRegistry::default();
        assert_eq!(registry.resolve("page"), Ok(ContentKind::Page));
        assert_eq!(registry.resolve("post"), Ok(ContentKind::Post));
        assert_eq!(registry.resolve("content"), Ok(ContentKind::Content));
        assert_eq!(
            registry.discriminators().collect::<Vec<_>>(),
            vec!["content", "page", "post"]
        );
    }

    #[test]
    fn resolve_distinguishes_failure_modes() {
        let mut registry = ContentRegistry::empty();
        registry
            .register("gallery", "gallery")
            .register("tag", "content-tag")
            .register("article", "page");

        assert!(matches!(
            registry.resolve("video"),
            Err(HydrationError::UnknownContentClass(_))
        ));
        assert!(matches!(
            registry.resolve("gallery"),
            Err(HydrationError::NonexistentContentClass { .. })
        ));
        assert!(matches!(
            registry.resolve("tag"),
            Err(HydrationError::NondescendentContentClass { .. })
        ));
        assert_eq!(registry.resolve("article"), Ok(ContentKind::Page));
    }

    #[test]
    fn unregister_removes_binding() {
        let mut registry = ContentRegistry::default();
        assert_eq!(registry.unregister("post"), Some("post".to_string()));
        assert!(!registry.is_registered("post"));
    }
}
