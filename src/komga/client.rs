//! A thin typed wrapper over the slice of the Komga REST API this system
//! consumes (§6). Retry policy follows `RemoteErrorClass`: 500/504/429 get
//! up to 3 attempts with a 5s sleep between them, 401 aborts immediately,
//! anything else is logged and surfaced once.

use crate::errors::{H2hDbError, RemoteErrorClass, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const PAGE_SIZE: u32 = 100;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_SLEEP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct KomgaClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub last: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Series {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Book {
    pub id: String,
    pub name: String,
    #[serde(rename = "seriesId")]
    pub series_id: String,
    pub metadata: BookMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "releaseDate", default)]
    pub release_date: String,
    #[serde(default)]
    pub authors: Vec<Author>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesMetadataPatch {
    pub title: String,
}

impl KomgaClient {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub async fn trigger_library_scan(&self, library_id: &str) -> Result<()> {
        let url = format!("{}/api/v1/libraries/{library_id}/scan", self.base_url);
        self.execute_with_retry(|| self.http.post(&url).basic_auth(&self.username, Some(&self.password)))
            .await?;
        Ok(())
    }

    pub async fn list_series(&self, library_id: &str, page: u32) -> Result<Page<Series>> {
        let url = format!(
            "{}/api/v1/series?library_id={library_id}&page={page}&size={PAGE_SIZE}",
            self.base_url
        );
        self.get_json(&url).await
    }

    pub async fn get_series(&self, series_id: &str) -> Result<Series> {
        let url = format!("{}/api/v1/series/{series_id}", self.base_url);
        self.get_json(&url).await
    }

    pub async fn list_series_books(&self, series_id: &str, page: u32) -> Result<Page<Book>> {
        let url = format!(
            "{}/api/v1/series/{series_id}/books?page={page}&size={PAGE_SIZE}",
            self.base_url
        );
        self.get_json(&url).await
    }

    pub async fn list_books(&self, library_id: &str, page: u32) -> Result<Page<Book>> {
        let url = format!(
            "{}/api/v1/books?library_id={library_id}&page={page}&size={PAGE_SIZE}",
            self.base_url
        );
        self.get_json(&url).await
    }

    pub async fn get_book(&self, book_id: &str) -> Result<Book> {
        let url = format!("{}/api/v1/books/{book_id}", self.base_url);
        self.get_json(&url).await
    }

    pub async fn patch_book_metadata(&self, book_id: &str, metadata: &BookMetadata) -> Result<()> {
        let url = format!("{}/api/v1/books/{book_id}/metadata", self.base_url);
        let body = serde_json::to_value(metadata).map_err(|err| H2hDbError::Remote {
            status: 0,
            message: format!("failed to encode book metadata: {err}"),
        })?;
        self.execute_with_retry(|| {
            self.http
                .patch(&url)
                .basic_auth(&self.username, Some(&self.password))
                .json(&body)
        })
        .await?;
        Ok(())
    }

    pub async fn patch_series_metadata(&self, series_id: &str, patch: &SeriesMetadataPatch) -> Result<()> {
        let url = format!("{}/api/v1/series/{series_id}/metadata", self.base_url);
        self.execute_with_retry(|| {
            self.http
                .patch(&url)
                .basic_auth(&self.username, Some(&self.password))
                .json(patch)
        })
        .await?;
        Ok(())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let response = self
            .execute_with_retry(|| self.http.get(url).basic_auth(&self.username, Some(&self.password)))
            .await?;
        response.json::<T>().await.map_err(|err| H2hDbError::Remote {
            status: 0,
            message: format!("failed to decode response body: {err}"),
        })
    }

    /// Issue the request built by `build`, retrying per `RemoteErrorClass`.
    /// `build` is called fresh on every attempt since `RequestBuilder` is
    /// consumed by `.send()`.
    async fn execute_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let send_result = build().send().await;
            let response = match send_result {
                Ok(response) => response,
                Err(err) => {
                    return Err(H2hDbError::Remote {
                        status: 0,
                        message: format!("request failed: {err}"),
                    });
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                return Ok(response);
            }

            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());

            match RemoteErrorClass::classify(status) {
                RemoteErrorClass::Retryable if attempt < MAX_ATTEMPTS => {
                    warn!(status, attempt, "komga request failed, retrying");
                    tokio::time::sleep(RETRY_SLEEP).await;
                    continue;
                }
                _ => {
                    return Err(H2hDbError::Remote { status, message });
                }
            }
        }
    }
}
