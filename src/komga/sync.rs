//! The Komga background sync loop (§4.10). Drives a library scan, then
//! walks books and series page by page, patching metadata that has
//! drifted and memoizing ids that already match so repeated passes do
//! less work. The exclude sets live on this struct rather than as process
//! globals (§9 Design Notes) — each sync instance owns its own.

use super::client::{BookMetadata, KomgaClient, SeriesMetadataPatch};
use super::get_komga_metadata;
use crate::errors::Result;
use crate::storage::StorageDriver;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct KomgaSync {
    client: KomgaClient,
    driver: Arc<StorageDriver>,
    library_id: String,
    excluded_books: Arc<Mutex<HashSet<String>>>,
    excluded_series: Arc<Mutex<HashSet<String>>>,
}

impl KomgaSync {
    pub fn new(client: KomgaClient, driver: Arc<StorageDriver>, library_id: String) -> Self {
        Self {
            client,
            driver,
            library_id,
            excluded_books: Arc::new(Mutex::new(HashSet::new())),
            excluded_series: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Trigger a scan, then keep sweeping books and series until a full
    /// pass over both makes no further changes (both exclude sets have
    /// stabilized).
    pub async fn run_until_stable(&self) -> Result<()> {
        self.client.trigger_library_scan(&self.library_id).await?;
        loop {
            let books_changed = self.sync_books().await?;
            let series_changed = self.sync_series().await?;
            if !books_changed && !series_changed {
                break;
            }
        }
        Ok(())
    }

    /// One page-by-page sweep over every book in the library. Returns
    /// whether any book was patched or newly memoized.
    async fn sync_books(&self) -> Result<bool> {
        let mut changed = false;
        let mut page = 0;
        loop {
            let result = self.client.list_books(&self.library_id, page).await?;
            for book in &result.content {
                if self.excluded_books.lock().unwrap().contains(&book.id) {
                    continue;
                }
                let Some(desired) = get_komga_metadata(&self.driver, &book.name)? else {
                    continue;
                };
                if metadata_matches(&book.metadata, &desired) {
                    self.excluded_books.lock().unwrap().insert(book.id.clone());
                    continue;
                }
                self.client.patch_book_metadata(&book.id, &desired).await?;
                info!(book_id = %book.id, gallery = %book.name, "patched komga book metadata");
                changed = true;
            }
            if result.last {
                break;
            }
            page += 1;
        }
        Ok(changed)
    }

    /// One page-by-page sweep over every series in the library. A series's
    /// title becomes the release-date string of any book inside it whose
    /// gallery is known.
    async fn sync_series(&self) -> Result<bool> {
        let mut changed = false;
        let mut page = 0;
        loop {
            let result = self.client.list_series(&self.library_id, page).await?;
            for series in &result.content {
                if self.excluded_series.lock().unwrap().contains(&series.id) {
                    continue;
                }
                if self.sync_one_series(&series.id, &series.name).await? {
                    changed = true;
                } else {
                    self.excluded_series.lock().unwrap().insert(series.id.clone());
                }
            }
            if result.last {
                break;
            }
            page += 1;
        }
        Ok(changed)
    }

    async fn sync_one_series(&self, series_id: &str, current_title: &str) -> Result<bool> {
        let mut page = 0;
        loop {
            let result = self.client.list_series_books(series_id, page).await?;
            for book in &result.content {
                let Some(desired) = get_komga_metadata(&self.driver, &book.name)? else {
                    continue;
                };
                if desired.release_date == current_title {
                    return Ok(false);
                }
                self.client
                    .patch_series_metadata(
                        series_id,
                        &SeriesMetadataPatch {
                            title: desired.release_date.clone(),
                        },
                    )
                    .await?;
                info!(series_id, title = %desired.release_date, "patched komga series title");
                return Ok(true);
            }
            if result.last {
                break;
            }
            page += 1;
        }
        Ok(false)
    }
}

fn metadata_matches(current: &BookMetadata, desired: &BookMetadata) -> bool {
    current.title == desired.title
        && current.summary == desired.summary
        && current.release_date == desired.release_date
        && current.authors == desired.authors
}
