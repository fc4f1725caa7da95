//! Content use-case service.
//!
//! # Responsibility
//! - Provide create/read/list/delete use-cases over any
//!   [`ContentRepository`].
//! - Apply index page-size policy from configuration.
//! - Keep the derived `has_img` flag of posts in step with the image tree.
//!
//! # Invariants
//! - Created content is always read back from the store before returning.
//! - Index listings never exceed the configured maximum limit.

use crate::config::IndexConfig;
use crate::model::{Content, ContentKind, FieldError, RecordId};
use crate::repo::content_repo::{
    ContentIndexQuery, ContentRepository, IndexOrder, SaveReport, StoreError,
};
use crate::service::image_cache::update_content_image_cache;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug)]
pub enum ContentServiceError {
    /// No active content at the given address.
    NotFound(String),
    Field(FieldError),
    Store(StoreError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ContentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(address) => write!(f, "content not found: {address}"),
            Self::Field(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent content state: {details}")
            }
        }
    }
}

impl Error for ContentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for ContentServiceError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}

impl From<StoreError> for ContentServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ServiceResult<T> = Result<T, ContentServiceError>;

/// One page of a content index listing.
#[derive(Debug, Clone)]
pub struct ContentIndexPage {
    pub items: Vec<Content>,
    /// Effective limit after normalisation.
    pub applied_limit: u32,
    pub page: u32,
}

/// Content service facade over repository implementations.
pub struct ContentService<R: ContentRepository> {
    repo: R,
    limits: IndexConfig,
}

impl<R: ContentRepository> ContentService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_limits(repo, IndexConfig::default())
    }

    pub fn with_limits(repo: R, limits: IndexConfig) -> Self {
        Self { repo, limits }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    /// Builds, saves and reads back new content.
    pub fn create_content(
        &mut self,
        kind: ContentKind,
        title: &str,
        parent_address: Option<&str>,
    ) -> ServiceResult<Content> {
        let mut content = Content::new(kind);
        content
            .set_parent_address(parent_address)?
            .set_title(title)?;
        self.repo.save_content(&mut content)?;
        self.read_back(&content)
    }

    /// Saves caller-built content and reads it back.
    pub fn save(&mut self, content: &mut Content) -> ServiceResult<(SaveReport, Content)> {
        let report = self.repo.save_content(content)?;
        let stored = self.read_back(content)?;
        Ok((report, stored))
    }

    pub fn get_by_address(&self, address: &str) -> ServiceResult<Content> {
        self.repo
            .get_content_by_address(address)?
            .ok_or_else(|| ContentServiceError::NotFound(address.to_string()))
    }

    pub fn get_by_id(&self, id: RecordId) -> ServiceResult<Option<Content>> {
        Ok(self.repo.get_content_by_id(id)?)
    }

    /// Lists active content below any of `parents`, newest first.
    pub fn list_index(
        &self,
        parents: &[String],
        limit: Option<u32>,
        page: u32,
    ) -> ServiceResult<ContentIndexPage> {
        let applied_limit = self.limits.normalize_limit(limit);
        let page = page.max(1);
        let query = ContentIndexQuery {
            parents: parents.to_vec(),
            order: IndexOrder::DateCreatedDesc,
            limit: Some(applied_limit),
            page,
        };
        let items = self.repo.get_content_index(&query)?;
        Ok(ContentIndexPage {
            items,
            applied_limit,
            page,
        })
    }

    pub fn get_parent_of(&self, content: &Content) -> ServiceResult<Option<Content>> {
        Ok(self.repo.get_parent_of(content)?)
    }

    pub fn get_children(&self, content: &Content) -> ServiceResult<Vec<Content>> {
        Ok(self.repo.get_children(content)?)
    }

    /// Deletes the active content at `address` and returns what was removed.
    pub fn delete(&mut self, address: &str, remove_body: bool) -> ServiceResult<Content> {
        let content = self.get_by_address(address)?;
        self.repo.delete_content(&content, remove_body)?;
        Ok(content)
    }

    /// Recomputes `has_img` for the content at `address` from the image
    /// tree and saves it when the flag changed.
    ///
    /// Returns the stored content and the recorded flag, `None` for content
    /// types without one.
    pub fn refresh_image_cache(
        &mut self,
        address: &str,
        images_dir: &Path,
    ) -> ServiceResult<(Content, Option<bool>)> {
        let mut content = self.get_by_address(address)?;
        let has_img = update_content_image_cache(&mut content, images_dir)?;
        if content.record().changed_fields().is_empty() {
            return Ok((content, has_img));
        }
        self.repo.save_content(&mut content)?;
        Ok((self.read_back(&content)?, has_img))
    }

    fn read_back(&self, content: &Content) -> ServiceResult<Content> {
        let id = content.id().ok_or(ContentServiceError::InconsistentState(
            "saved content has no id",
        ))?;
        self.repo
            .get_content_by_id(id)?
            .ok_or(ContentServiceError::InconsistentState(
                "saved content not found in read-back",
            ))
    }
}
