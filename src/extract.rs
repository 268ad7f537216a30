//! Batch run: prepare destination, connect, drain the pool, disconnect

use std::path::Path;
use std::sync::Arc;

use blob_fetch::{run_pool, BatchReport, BlobStore, FetchOptions};
use log::{error, info};

use crate::config::Settings;
use crate::error::AppError;
use crate::providers::connect_store;

/// Retrieve `names` into `dest_dir` using the configured store.
///
/// Destination and connection failures are fatal; per-file failures only show
/// up in the returned report.
pub async fn run_batch(
    settings: &Settings,
    names: Vec<String>,
    dest_dir: &Path,
) -> Result<BatchReport, AppError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|source| AppError::Destination {
            path: dest_dir.to_path_buf(),
            source,
        })?;

    info!("Connecting to {}", settings.store.describe());
    let store = connect_store(&settings.store, settings.connect_timeout).await?;

    Ok(drain(store, names, dest_dir, settings.fetch_options()).await)
}

/// Run the pool to completion, then tear the store session down
pub async fn drain(
    store: Arc<dyn BlobStore>,
    names: Vec<String>,
    dest_dir: &Path,
    options: FetchOptions,
) -> BatchReport {
    let report = run_pool(store.clone(), names, dest_dir, options).await;

    if let Err(e) = store.disconnect().await {
        error!("Failed to disconnect from store: {}", e);
    }

    report
}
