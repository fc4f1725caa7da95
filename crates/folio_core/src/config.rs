//! File-based configuration.
//!
//! # Responsibility
//! - Parse `folio.toml` into typed settings with defaults for every key.
//! - Reject inconsistent index limits early.
//!
//! # Invariants
//! - `1 <= index.default_limit <= index.max_limit` for a loaded config.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = "folio.sqlite3";
pub const DEFAULT_CONTENT_ROOT: &str = "content";
pub const DEFAULT_IMAGES_DIR: &str = "public/assets/imgs";
pub const DEFAULT_INDEX_LIMIT: u32 = 10;
pub const MAX_INDEX_LIMIT: u32 = 50;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    pub database: DatabaseConfig,
    pub content: ContentConfig,
    pub logging: LoggingConfig,
    pub index: IndexConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Directory holding the `pages/` body tree.
    pub root_dir: PathBuf,
    /// Root of the post lead image tree, mirrored by parent address.
    pub images_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_CONTENT_ROOT),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging is disabled when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Page size bounds for content index listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_INDEX_LIMIT,
            max_limit: MAX_INDEX_LIMIT,
        }
    }
}

impl IndexConfig {
    /// `None` and `0` fall back to the default; larger values are clamped.
    pub fn normalize_limit(&self, limit: Option<u32>) -> u32 {
        match limit {
            Some(0) | None => self.default_limit,
            Some(value) => value.min(self.max_limit),
        }
    }
}

impl FolioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let IndexConfig {
            default_limit,
            max_limit,
        } = self.index;
        if default_limit == 0 {
            return Err(ConfigError::Invalid(
                "index.default_limit must be at least 1".to_string(),
            ));
        }
        if max_limit < default_limit {
            return Err(ConfigError::Invalid(format!(
                "index.max_limit ({max_limit}) must not be below index.default_limit ({default_limit})"
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `<content.root_dir>/pages`.
    pub fn pages_dir(&self) -> PathBuf {
        self.content.root_dir.join("pages")
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, FolioConfig, IndexConfig};
    use std::path::Path;

    #[test]
    fn empty_document_uses_defaults() {
        let config = FolioConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, FolioConfig::default());
        assert_eq!(config.database.path, Path::new("folio.sqlite3"));
        assert_eq!(config.index.default_limit, 10);
        assert_eq!(config.index.max_limit, 50);
        assert_eq!(config.content.images_dir, Path::new("public/assets/imgs"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = FolioConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/folio/site.db"

            [content]
            root_dir = "/srv/site"
            images_dir = "/srv/site/public/assets/imgs"

            [logging]
            level = "warn"
            dir = "/var/log/folio"

            [index]
            default_limit = 5
            max_limit = 20
            "#,
        )
        .expect("valid config");
        assert_eq!(config.content.root_dir, Path::new("/srv/site"));
        assert_eq!(config.pages_dir(), Path::new("/srv/site/pages"));
        assert_eq!(
            config.content.images_dir,
            Path::new("/srv/site/public/assets/imgs")
        );
        assert_eq!(config.logging.dir.as_deref(), Some(Path::new("/var/log/folio")));
        assert_eq!(config.index.max_limit, 20);
    }

    #[test]
    fn images_dir_alone_keeps_the_content_root_default() {
        let config = FolioConfig::from_toml_str("[content]\nimages_dir = \"imgs\"\n")
            .expect("valid config");
        assert_eq!(config.content.images_dir, Path::new("imgs"));
        assert_eq!(config.content.root_dir, Path::new("content"));
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let err = FolioConfig::from_toml_str("[index]\ndefault_limit = 30\nmax_limit = 20\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let err = FolioConfig::from_toml_str("[database]\nurl = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn normalize_limit_defaults_and_clamps() {
        let limits = IndexConfig::default();
        assert_eq!(limits.normalize_limit(None), 10);
        assert_eq!(limits.normalize_limit(Some(0)), 10);
        assert_eq!(limits.normalize_limit(Some(25)), 25);
        assert_eq!(limits.normalize_limit(Some(500)), 50);
    }
}
