//! Shared scaffolding for the end-to-end tests: a temp-dir download tree
//! plus an on-disk SQLite database, mirroring the teacher's own
//! `tests/common/fixtures.rs` shape.

use h2hdb::storage::{open_and_prepare, StorageDriver};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestEnv {
    pub download_dir: TempDir,
    pub driver: StorageDriver,
}

impl TestEnv {
    pub fn new() -> Self {
        let download_dir = TempDir::new().expect("tempdir");
        let driver = StorageDriver::open_in_memory().expect("open in-memory db");
        open_and_prepare(&driver).expect("prepare schema");
        Self { download_dir, driver }
    }

    pub fn download_path(&self) -> &Path {
        self.download_dir.path()
    }

    /// Write a gallery folder with a `galleryinfo.txt` and the given pages
    /// (file name -> contents).
    pub fn write_gallery(
        &self,
        folder_name: &str,
        title: &str,
        upload_account: &str,
        upload_time: &str,
        download_time: &str,
        tags: &str,
        comment: &str,
        pages: &[(&str, &[u8])],
    ) -> PathBuf {
        let folder = self.download_path().join(folder_name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join("galleryinfo.txt"),
            format!(
                "Title: {title}\n\
                 Upload Time: {upload_time}\n\
                 Uploaded By: {upload_account}\n\
                 Downloaded: {download_time}\n\
                 Tags: {tags}\n\
                 Uploader's Comments\n\
                 {comment}\n"
            ),
        )
        .unwrap();
        for (name, bytes) in pages {
            fs::write(folder.join(name), bytes).unwrap();
        }
        folder
    }
}
