//! `h2hdb-cbz`: same pass/sleep loop as `h2hdb-sql`, plus CBZ archive
//! emission and, when `media_server.server_type = "komga"`, a background
//! Komga library sync run once per pass alongside ingestion.

use clap::Parser;
use h2hdb::komga::{KomgaClient, KomgaSync};
use h2hdb::concurrency::WorkerPool;
use h2hdb::config::{AppConfig, CliConfig, MediaServerType};
use h2hdb::orchestrator;
use h2hdb::storage::{open_and_prepare, StorageDriver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const PASS_SLEEP: Duration = Duration::from_secs(1800);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let config = AppConfig::resolve(&cli)?;
    let _logging_guard = h2hdb::logging::init(&config.logger)?;

    let driver = Arc::new(StorageDriver::open(&config.database.database)?);
    open_and_prepare(&driver)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("shutdown requested, will stop after the current pass");
            shutdown.store(true, Ordering::SeqCst);
        })?;
    }

    let komga_sync = match &config.media_server {
        MediaServerType::Komga {
            base_url,
            api_username,
            api_password,
            library_id,
        } => {
            let client = KomgaClient::new(base_url.clone(), api_username.clone(), api_password.clone());
            Some(KomgaSync::new(client, driver.clone(), library_id.clone()))
        }
        MediaServerType::None => None,
    };

    let db_pool = WorkerPool::sized_for_db();

    loop {
        let outcome = match orchestrator::run_pass(&driver, &config, &db_pool, true).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "pass failed");
                return Err(err.into());
            }
        };
        info!(
            inserted = outcome.galleries_inserted,
            archived = outcome.archives_written,
            "pass complete"
        );

        if let Some(sync) = &komga_sync {
            if let Err(err) = sync.run_until_stable().await {
                warn!(error = %err, "komga sync pass failed, will retry next loop");
            }
        }

        if !outcome.any_insert() || shutdown.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(PASS_SLEEP).await;
    }

    Ok(())
}
