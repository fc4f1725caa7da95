//! External storage for content bodies.
//!
//! # Responsibility
//! - Read, write and remove body bytes addressed by a [`ContentUri`].
//!
//! # Invariants
//! - Only `file://pages/...` URIs are accepted by [`FsBodyStore`].
//! - Paths never escape `<root>/pages`.
//! - Writes require the `pages` directory to exist; nested directories below
//!   it are created on demand.

use crate::model::uri::{ContentUri, BODY_HOST, BODY_SCHEME};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug)]
pub enum BodyStoreError {
    /// The URI scheme is not understood by the store.
    IllegalContentUri(String),
    /// The URI host or path does not map into the pages directory.
    IllegalDataUri(String),
    /// The pages directory is missing.
    NonexistentFile(PathBuf),
    Io { path: PathBuf, source: io::Error },
}

impl Display for BodyStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalContentUri(uri) => write!(f, "illegal content uri `{uri}`"),
            Self::IllegalDataUri(uri) => write!(f, "illegal data uri `{uri}`"),
            Self::NonexistentFile(path) => write!(f, "directory does not exist: {}", path.display()),
            Self::Io { path, source } => write!(f, "body io failed for {}: {source}", path.display()),
        }
    }
}

impl Error for BodyStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type BodyResult<T> = Result<T, BodyStoreError>;

/// Byte storage keyed by content URI.
pub trait BodyStore {
    /// Returns `None` when nothing is stored at `uri`.
    fn read(&self, uri: &ContentUri) -> BodyResult<Option<Vec<u8>>>;
    fn write(&self, uri: &ContentUri, bytes: &[u8]) -> BodyResult<()>;
    /// Removing a missing body is not an error.
    fn remove(&self, uri: &ContentUri) -> BodyResult<()>;
}

/// Filesystem body store rooted at a content directory.
#[derive(Debug, Clone)]
pub struct FsBodyStore {
    root: PathBuf,
}

impl FsBodyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(BODY_HOST)
    }

    /// Creates `<root>/pages` if needed.
    pub fn ensure_pages_dir(&self) -> BodyResult<PathBuf> {
        let dir = self.pages_dir();
        fs::create_dir_all(&dir).map_err(|source| BodyStoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Maps a URI onto a file below the pages directory.
    pub fn resolve(&self, uri: &ContentUri) -> BodyResult<PathBuf> {
        if uri.scheme() != BODY_SCHEME {
            return Err(BodyStoreError::IllegalContentUri(uri.to_string()));
        }
        if uri.host() != Some(BODY_HOST) {
            return Err(BodyStoreError::IllegalDataUri(uri.to_string()));
        }

        let relative = Path::new(uri.path().trim_start_matches('/'));
        let mut path = self.pages_dir();
        let mut has_segment = false;
        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    has_segment = true;
                }
                Component::CurDir => {}
                _ => return Err(BodyStoreError::IllegalDataUri(uri.to_string())),
            }
        }
        if !has_segment {
            return Err(BodyStoreError::IllegalDataUri(uri.to_string()));
        }
        Ok(path)
    }
}

impl BodyStore for FsBodyStore {
    fn read(&self, uri: &ContentUri) -> BodyResult<Option<Vec<u8>>> {
        let path = self.resolve(uri)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BodyStoreError::Io { path, source }),
        }
    }

    fn write(&self, uri: &ContentUri, bytes: &[u8]) -> BodyResult<()> {
        let path = self.resolve(uri)?;
        let pages = self.pages_dir();
        if !pages.is_dir() {
            return Err(BodyStoreError::NonexistentFile(pages));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BodyStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, bytes).map_err(|source| BodyStoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(
            "event=body_write module=repo status=ok path={} bytes={}",
            path.display(),
            bytes.len()
        );
        Ok(())
    }

    fn remove(&self, uri: &ContentUri) -> BodyResult<()> {
        let path = self.resolve(uri)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("event=body_remove module=repo status=ok path={}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BodyStoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BodyStore, BodyStoreError, FsBodyStore};
    use crate::model::uri::ContentUri;

    fn uri(value: &str) -> ContentUri {
        ContentUri::parse(value).expect("valid uri")
    }

    #[test]
    fn resolve_rejects_foreign_schemes_and_hosts() {
        let store = FsBodyStore::new("/tmp/folio-never-created");
        assert!(matches!(
            store.resolve(&uri("https://pages/a.md")),
            Err(BodyStoreError::IllegalContentUri(_))
        ));
        assert!(matches!(
            store.resolve(&uri("file://images/a.md")),
            Err(BodyStoreError::IllegalDataUri(_))
        ));
        assert!(matches!(
            store.resolve(&uri("file://pages/")),
            Err(BodyStoreError::IllegalDataUri(_))
        ));
    }

    #[test]
    fn resolve_maps_into_pages_dir() {
        let store = FsBodyStore::new("/srv/site");
        let path = store
            .resolve(&uri("file://pages/about/me.md"))
            .expect("resolvable");
        assert_eq!(path, std::path::Path::new("/srv/site/pages/about/me.md"));
    }

    #[test]
    fn write_requires_pages_dir_then_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBodyStore::new(dir.path());
        let target = uri("file://pages/about/me.md");

        assert!(matches!(
            store.write(&target, b"hi"),
            Err(BodyStoreError::NonexistentFile(_))
        ));

        store.ensure_pages_dir().expect("pages dir");
        store.write(&target, b"hi").expect("write");
        assert_eq!(store.read(&target).expect("read"), Some(b"hi".to_vec()));

        store.remove(&target).expect("remove");
        assert_eq!(store.read(&target).expect("read"), None);
        store.remove(&target).expect("second remove is a no-op");
    }
}
