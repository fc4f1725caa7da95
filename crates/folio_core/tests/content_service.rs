use folio_core::{
    open_db_in_memory, ContentKind, ContentService, ContentServiceError, FsBodyStore,
    IndexConfig, SqliteContentRepository,
};
use rusqlite::Connection;
use tempfile::TempDir;

#[test]
fn create_content_returns_the_stored_record() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);

    let created = service
        .create_content(ContentKind::Post, "Hello World", Some("/blog"))
        .unwrap();

    assert!(created.id().is_some());
    assert_eq!(created.kind(), ContentKind::Post);
    assert_eq!(created.address().as_deref(), Some("/blog/hello-world"));
    assert_eq!(created.content_class(), Some("post"));
    assert!(created.img_prefix().is_some_and(|prefix| prefix.ends_with("hello-world")));

    let by_address = service.get_by_address("/blog/hello-world").unwrap();
    assert_eq!(by_address.id(), created.id());
}

#[test]
fn create_content_rejects_duplicate_addresses() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);

    service
        .create_content(ContentKind::Page, "Contact", None)
        .unwrap();
    let err = service
        .create_content(ContentKind::Page, "Contact", None)
        .unwrap_err();
    assert!(matches!(
        err,
        ContentServiceError::Store(folio_core::StoreError::Uniqueness(_))
    ));
}

#[test]
fn save_reports_writes_and_reads_back() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);

    let mut page = service
        .create_content(ContentKind::Page, "Changelog", Some("/docs"))
        .unwrap();
    page.set_body("v1").unwrap().add_tag("release").unwrap();
    let (report, stored) = service.save(&mut page).unwrap();

    assert!(report.body_written);
    assert_eq!(report.tags.write_count(), 1);
    assert_eq!(stored.body(), Some("v1"));
    assert!(stored.tags().contains("release"));
}

#[test]
fn list_index_normalizes_limit_and_page() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let limits = IndexConfig {
        default_limit: 2,
        max_limit: 3,
    };
    let mut service = ContentService::with_limits(repo, limits);

    for title in ["One", "Two", "Three", "Four"] {
        service
            .create_content(ContentKind::Page, title, Some("/notes"))
            .unwrap();
    }
    let parents = vec!["/notes".to_string()];

    let default_page = service.list_index(&parents, None, 0).unwrap();
    assert_eq!(default_page.applied_limit, 2);
    assert_eq!(default_page.page, 1);
    assert_eq!(default_page.items.len(), 2);

    let clamped = service.list_index(&parents, Some(500), 1).unwrap();
    assert_eq!(clamped.applied_limit, 3);
    assert_eq!(clamped.items.len(), 3);

    let last = service.list_index(&parents, Some(3), 2).unwrap();
    assert_eq!(last.items.len(), 1);
}

#[test]
fn parent_and_children_are_exposed() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);

    let guide = service
        .create_content(ContentKind::Page, "Guide", None)
        .unwrap();
    let chapter = service
        .create_content(ContentKind::Page, "Chapter", Some("/guide"))
        .unwrap();

    let parent = service.get_parent_of(&chapter).unwrap().expect("parent");
    assert_eq!(parent.id(), guide.id());
    let children = service.get_children(&guide).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id(), chapter.id());
}

#[test]
fn delete_removes_content_and_reports_missing_addresses() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);

    let created = service
        .create_content(ContentKind::Page, "Temporary", None)
        .unwrap();
    let removed = service.delete("/temporary", true).unwrap();
    assert_eq!(removed.id(), created.id());
    assert!(service
        .get_by_id(created.id().unwrap())
        .unwrap()
        .is_none());

    let err = service.delete("/temporary", true).unwrap_err();
    match err {
        ContentServiceError::NotFound(address) => assert_eq!(address, "/temporary"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn refresh_image_cache_persists_the_has_img_flag() {
    let (mut conn, dir) = setup();
    let repo = SqliteContentRepository::try_new(&mut conn, FsBodyStore::new(dir.path())).unwrap();
    let mut service = ContentService::new(repo);
    let images = dir.path().join("imgs");

    let post = service
        .create_content(ContentKind::Post, "Hello World", Some("/blog"))
        .unwrap();
    assert_eq!(post.has_img(), Some(false));

    let (unchanged, has_img) = service
        .refresh_image_cache("/blog/hello-world", &images)
        .unwrap();
    assert_eq!(has_img, Some(false));
    assert_eq!(unchanged.has_img(), Some(false));

    let prefix = post.img_prefix().unwrap();
    std::fs::create_dir_all(images.join("blog")).unwrap();
    std::fs::write(images.join("blog").join(format!("{prefix}.jpg")), b"jpeg").unwrap();

    let (stored, has_img) = service
        .refresh_image_cache("/blog/hello-world", &images)
        .unwrap();
    assert_eq!(has_img, Some(true));
    assert_eq!(stored.has_img(), Some(true));
    assert!(stored.record().is_set_by_system("has_img"));
    assert_eq!(
        service.get_by_address("/blog/hello-world").unwrap().has_img(),
        Some(true)
    );

    service.create_content(ContentKind::Page, "About", None).unwrap();
    let (_, has_img) = service.refresh_image_cache("/about", &images).unwrap();
    assert_eq!(has_img, None);
}

fn setup() -> (Connection, TempDir) {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    FsBodyStore::new(dir.path()).ensure_pages_dir().unwrap();
    (conn, dir)
}
