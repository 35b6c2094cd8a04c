//! `h2hdb-sql`: run `insert_h2h_download` once, then keep looping as long
//! as a pass inserted at least one gallery, sleeping 1800s between passes.
//! No archive emission.

use clap::Parser;
use h2hdb::concurrency::WorkerPool;
use h2hdb::config::{AppConfig, CliConfig};
use h2hdb::orchestrator;
use h2hdb::storage::{open_and_prepare, StorageDriver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

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

    let db_pool = WorkerPool::sized_for_db();

    loop {
        let outcome = match orchestrator::run_pass(&driver, &config, &db_pool, false).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "pass failed");
                return Err(err.into());
            }
        };
        info!(inserted = outcome.galleries_inserted, "pass complete");

        if !outcome.any_insert() || shutdown.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(PASS_SLEEP).await;
    }

    Ok(())
}
