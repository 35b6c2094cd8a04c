//! End-to-end coverage of §8 scenarios 1-4, driven through the full
//! orchestrator pass rather than calling `insert_gallery_info` directly.

mod common;

use common::TestEnv;
use h2hdb::concurrency::WorkerPool;
use h2hdb::config::{AppConfig, CbzGrouping, CbzSort, DatabaseConfig, H2hConfig, LoggerConfig, LogLevel, MediaServerType};
use h2hdb::entities::{comments, gallery, gids, queues, tags, titles, upload_accounts};
use std::sync::Arc;

fn test_config(download_path: &std::path::Path) -> AppConfig {
    AppConfig {
        h2h: H2hConfig {
            download_path: download_path.to_path_buf(),
            cbz_path: None,
            cbz_tmp_directory: std::env::temp_dir(),
            cbz_max_size: 0,
            cbz_grouping: CbzGrouping::Flat,
            cbz_sort: CbzSort::No,
        },
        database: DatabaseConfig {
            sql_type: "sqlite".to_string(),
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: String::new(),
        },
        logger: LoggerConfig {
            level: LogLevel::Info,
            display_on_screen: false,
            write_to_file: None,
            max_log_entry_length: None,
            synochat_webhook: None,
        },
        media_server: MediaServerType::None,
    }
}

#[tokio::test]
async fn fresh_ingest_populates_every_attribute_end_to_end() {
    let env = TestEnv::new();
    env.write_gallery(
        "MyGallery [12345]",
        "Alpha",
        "alice",
        "2024-01-02 03:04:05",
        "2024-06-07 08:09:10",
        "artist:bob, group:g1",
        "hello",
        &[("1.jpg", b"A"), ("2.jpg", b"B")],
    );

    let driver = Arc::new(env.driver);
    let config = test_config(env.download_dir.path());
    let db_pool = WorkerPool::new(2);

    let outcome = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert_eq!(outcome.galleries_inserted, 1);

    let gallery_id = gallery::get_gallery_id_by_name(&driver, "MyGallery [12345]")
        .unwrap()
        .unwrap();
    assert_eq!(gids::get_gid(&driver, gallery_id).unwrap(), 12345);
    assert_eq!(titles::get_title(&driver, gallery_id).unwrap(), "Alpha");
    assert_eq!(
        upload_accounts::get_upload_account(&driver, gallery_id).unwrap(),
        "alice"
    );
    assert_eq!(comments::get_comment(&driver, gallery_id).unwrap(), "hello");
    assert_eq!(
        tags::get_tag_pairs_for_gallery(&driver, gallery_id)
            .unwrap()
            .into_iter()
            .collect::<std::collections::HashSet<_>>(),
        std::collections::HashSet::from([
            ("artist".to_string(), "bob".to_string()),
            ("group".to_string(), "g1".to_string())
        ])
    );
    assert!(queues::list_tombstones(&driver).unwrap().is_empty());
}

#[tokio::test]
async fn second_pass_with_unchanged_folder_inserts_nothing() {
    let env = TestEnv::new();
    env.write_gallery(
        "MyGallery [12345]",
        "Alpha",
        "alice",
        "2024-01-02 03:04:05",
        "2024-06-07 08:09:10",
        "artist:bob",
        "hello",
        &[("1.jpg", b"A")],
    );

    let driver = Arc::new(env.driver);
    let config = test_config(env.download_dir.path());
    let db_pool = WorkerPool::new(2);

    let first = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert!(first.any_insert());

    let second = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert!(!second.any_insert());
}

#[tokio::test]
async fn content_change_triggers_a_full_reingest() {
    let env = TestEnv::new();
    env.write_gallery(
        "MyGallery [12345]",
        "Alpha",
        "alice",
        "2024-01-02 03:04:05",
        "2024-06-07 08:09:10",
        "artist:bob",
        "hello",
        &[("1.jpg", b"A")],
    );

    let download_path = env.download_dir.path().to_path_buf();
    let driver = Arc::new(env.driver);
    let config = test_config(&download_path);
    let db_pool = WorkerPool::new(2);

    let first = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert!(first.any_insert());

    // Uploaded-by changes, so galleryinfo.txt's contents (and its sha512) change.
    std::fs::write(
        download_path.join("MyGallery [12345]").join("galleryinfo.txt"),
        "Title: Alpha\n\
         Upload Time: 2024-01-02 03:04:05\n\
         Uploaded By: carol\n\
         Downloaded: 2024-06-07 08:09:10\n\
         Tags: artist:bob\n\
         Uploader's Comments\n\
         hello\n",
    )
    .unwrap();

    let second = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert!(second.any_insert());

    let gallery_id = gallery::get_gallery_id_by_name(&driver, "MyGallery [12345]")
        .unwrap()
        .unwrap();
    assert_eq!(
        upload_accounts::get_upload_account(&driver, gallery_id).unwrap(),
        "carol"
    );
    assert!(queues::list_tombstones(&driver).unwrap().is_empty());
}

#[tokio::test]
async fn crash_recovery_reingests_after_an_interrupted_tombstone() {
    let env = TestEnv::new();
    env.write_gallery(
        "MyGallery [12345]",
        "Alpha",
        "alice",
        "2024-01-02 03:04:05",
        "2024-06-07 08:09:10",
        "artist:bob",
        "hello",
        &[("1.jpg", b"A")],
    );

    // Simulate a process that crashed right after writing the tombstone.
    queues::add_tombstone(&env.driver, "MyGallery [12345]").unwrap();
    assert_eq!(
        queues::list_tombstones(&env.driver).unwrap(),
        vec!["MyGallery [12345]".to_string()]
    );

    let driver = Arc::new(env.driver);
    let config = test_config(env.download_dir.path());
    let db_pool = WorkerPool::new(2);

    let outcome = h2hdb::orchestrator::run_pass(&driver, &config, &db_pool, false)
        .await
        .unwrap();
    assert!(outcome.any_insert());
    assert!(queues::list_tombstones(&driver).unwrap().is_empty());

    let gallery_id = gallery::get_gallery_id_by_name(&driver, "MyGallery [12345]")
        .unwrap()
        .unwrap();
    assert_eq!(titles::get_title(&driver, gallery_id).unwrap(), "Alpha");
}
