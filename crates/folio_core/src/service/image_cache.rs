//! Derived `has_img` flag for posts.
//!
//! # Responsibility
//! - Decide whether a post has a lead image on disk and record the answer
//!   as a system write.
//!
//! # Invariants
//! - The lead image of a post lives at
//!   `<images_dir><parent_address>/<img_prefix>.jpg`.
//! - Content types without a `has_img` field are never touched.

use crate::model::descriptor::fields;
use crate::model::{Content, FieldError};
use log::debug;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSION: &str = "jpg";

/// Expected lead image path, or `None` when the content has no image prefix.
pub fn lead_image_path(content: &Content, images_dir: &Path) -> Option<PathBuf> {
    let prefix = content.img_prefix().filter(|prefix| !prefix.is_empty())?;
    let mut path = images_dir.to_path_buf();
    for segment in content
        .parent_address()
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
    {
        path.push(segment);
    }
    path.push(format!("{prefix}.{IMAGE_EXTENSION}"));
    Some(path)
}

/// Sets `has_img` from the presence of the lead image under `images_dir`.
///
/// Returns `Ok(None)` for content types that carry no image flag, otherwise
/// the flag that was recorded.
pub fn update_content_image_cache(
    content: &mut Content,
    images_dir: &Path,
) -> Result<Option<bool>, FieldError> {
    if !content.descriptor().has_field(fields::HAS_IMG) {
        return Ok(None);
    }
    let image = lead_image_path(content, images_dir);
    let found = image.as_deref().is_some_and(Path::is_file);
    content.record_mut().set(fields::HAS_IMG, found, true)?;
    debug!(
        "event=image_cache module=service status=ok has_img={found} path={}",
        image
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    );
    Ok(Some(found))
}

#[cfg(test)]
mod tests {
    use super::{lead_image_path, update_content_image_cache};
    use crate::model::descriptor::fields;
    use crate::model::Content;
    use std::fs;
    use std::path::Path;

    fn post_below(parent: &str, prefix: &str) -> Content {
        let mut post = Content::new_post();
        post.set_parent_address(Some(parent))
            .unwrap()
            .set_title("Trip Report")
            .unwrap()
            .set_img_prefix(prefix)
            .unwrap();
        post
    }

    #[test]
    fn image_path_follows_parent_address() {
        let post = post_below("/blog/2016", "2016-11-trip-report");
        assert_eq!(
            lead_image_path(&post, Path::new("/srv/imgs")).as_deref(),
            Some(Path::new("/srv/imgs/blog/2016/2016-11-trip-report.jpg"))
        );
    }

    #[test]
    fn flag_tracks_the_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut post = post_below("/blog", "trip");

        assert_eq!(update_content_image_cache(&mut post, dir.path()).unwrap(), Some(false));
        assert_eq!(post.has_img(), Some(false));

        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/trip.jpg"), b"jpeg").unwrap();
        assert_eq!(update_content_image_cache(&mut post, dir.path()).unwrap(), Some(true));
        assert_eq!(post.has_img(), Some(true));
        assert!(post.record().is_set_by_system(fields::HAS_IMG));
    }

    #[test]
    fn pages_have_no_image_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = Content::new_page();
        page.set_title("About").unwrap();
        assert_eq!(update_content_image_cache(&mut page, dir.path()).unwrap(), None);
    }
}
