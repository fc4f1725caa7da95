//! Scheme/host/path reference values.
//!
//! Content bodies live outside the relational store and are referenced by a
//! URI such as `file://pages/about/me.md`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;

/// Scheme understood by the body store.
pub const BODY_SCHEME: &str = "file";
/// Host token that maps to the `pages/` directory of the content root.
pub const BODY_HOST: &str = "pages";
const BODY_EXTENSION: &str = ".md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    Malformed { value: String, message: String },
}

impl Display for UriError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { value, message } => write!(f, "malformed uri `{value}`: {message}"),
        }
    }
}

impl Error for UriError {}

/// Parsed scheme/host/path reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri(Url);

impl ContentUri {
    pub fn parse(value: &str) -> Result<Self, UriError> {
        Url::parse(value.trim())
            .map(Self)
            .map_err(|err| UriError::Malformed {
                value: value.to_string(),
                message: err.to_string(),
            })
    }

    /// Builds the conventional body location for a content address.
    pub fn for_address(address: &str) -> Result<Self, UriError> {
        Self::parse(&format!("{BODY_SCHEME}://{BODY_HOST}{address}{BODY_EXTENSION}"))
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ContentUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::ContentUri;

    #[test]
    fn address_uri_follows_pages_convention() {
        let uri = ContentUri::for_address("/about/about-test").expect("uri should build");
        assert_eq!(uri.as_str(), "file://pages/about/about-test.md");
        assert_eq!(uri.scheme(), "file");
        assert_eq!(uri.host(), Some("pages"));
        assert_eq!(uri.path(), "/about/about-test.md");
    }

    #[test]
    fn parse_rejects_relative_references() {
        assert!(ContentUri::parse("about/me.md").is_err());
    }
}
