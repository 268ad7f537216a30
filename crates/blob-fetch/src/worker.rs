//! Retrieval worker - pulls names from the job source until it is exhausted

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};

use crate::error::FetchError;
use crate::guard::{destination_path, partial_path, should_skip};
use crate::queue::JobSource;
use crate::store::BlobStore;
use crate::strategy::fetch_blob;
use crate::types::{BlobResult, FetchOptions, TransferOutcome};

/// Process names until the job source is drained, returning this worker's results
pub(crate) async fn run_worker(
    worker_id: usize,
    store: Arc<dyn BlobStore>,
    jobs: Arc<JobSource>,
    dest_dir: Arc<Path>,
    options: FetchOptions,
) -> Vec<BlobResult> {
    debug!("worker_start: {}", worker_id);
    let mut results = Vec::new();

    while let Some(name) = jobs.next().await {
        let result = process_blob(store.as_ref(), &name, &dest_dir, &options).await;
        log_outcome(&result);
        results.push(result);
    }

    debug!("worker_exit: {} processed={}", worker_id, results.len());
    results
}

/// Handle one name. Failures are captured in the result, never propagated.
pub(crate) async fn process_blob(
    store: &dyn BlobStore,
    name: &str,
    dest_dir: &Path,
    options: &FetchOptions,
) -> BlobResult {
    let started = Instant::now();
    let outcome = match retrieve(store, name, dest_dir, options).await {
        Ok(outcome) => outcome,
        Err(e) => TransferOutcome::Failed {
            error: e.to_string(),
        },
    };

    BlobResult {
        name: name.to_string(),
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

async fn retrieve(
    store: &dyn BlobStore,
    name: &str,
    dest_dir: &Path,
    options: &FetchOptions,
) -> Result<TransferOutcome, FetchError> {
    let destination = destination_path(dest_dir, name)?;
    if should_skip(&destination).await {
        return Ok(TransferOutcome::Skipped);
    }

    let transfer = fetch_blob(store, name, dest_dir, options.size_threshold);
    let transferred = match options.transfer_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, transfer).await {
            Ok(result) => result?,
            Err(_) => {
                // The cancelled transfer had no chance to clean up after itself
                let _ = tokio::fs::remove_file(partial_path(dest_dir, name)).await;
                return Err(FetchError::TimedOut {
                    name: name.to_string(),
                    timeout,
                });
            }
        },
        None => transfer.await?,
    };

    Ok(TransferOutcome::Downloaded {
        bytes: transferred.bytes,
        mode: transferred.mode,
    })
}

fn log_outcome(result: &BlobResult) {
    match &result.outcome {
        TransferOutcome::Skipped => {
            info!("File {} already exists locally, skipping", result.name)
        }
        TransferOutcome::Downloaded { bytes, mode } => info!(
            "Downloaded {} ({} bytes, {}) in {}ms",
            result.name, bytes, mode, result.elapsed_ms
        ),
        TransferOutcome::Failed { error } => {
            error!("Failed to retrieve {}: {}", result.name, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::strategy::TransferMode;
    use std::time::Duration;
    use tempfile::tempdir;

    fn options(size_threshold: u64) -> FetchOptions {
        FetchOptions {
            workers: 1,
            size_threshold,
            transfer_timeout: None,
        }
    }

    #[tokio::test]
    async fn present_file_is_skipped_without_opening() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"local").unwrap();
        let store = MemoryStore::new().with_blob("a.bin", b"remote".to_vec());

        let result = process_blob(&store, "a.bin", dir.path(), &options(1024)).await;

        assert_eq!(result.outcome, TransferOutcome::Skipped);
        assert_eq!(store.opened(), 0);
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"local");
    }

    #[tokio::test]
    async fn empty_file_is_downloaded_again() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"").unwrap();
        let store = MemoryStore::new().with_blob("a.bin", b"remote".to_vec());

        let result = process_blob(&store, "a.bin", dir.path(), &options(1024)).await;

        assert_eq!(
            result.outcome,
            TransferOutcome::Downloaded {
                bytes: 6,
                mode: TransferMode::Buffered,
            }
        );
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn invalid_name_fails_without_store_access() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new().with_blob("../escape.bin", b"x".to_vec());

        let result = process_blob(&store, "../escape.bin", dir.path(), &options(1024)).await;

        assert!(matches!(result.outcome, TransferOutcome::Failed { .. }));
        assert_eq!(store.opened(), 0);
    }

    #[tokio::test]
    async fn slow_transfer_times_out_and_cleans_up() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new()
            .with_blob("slow.bin", vec![1u8; 4096])
            .with_delay("slow.bin", Duration::from_secs(30));
        let options = FetchOptions {
            workers: 1,
            size_threshold: 0,
            transfer_timeout: Some(Duration::from_millis(50)),
        };

        let result = process_blob(&store, "slow.bin", dir.path(), &options).await;

        match result.outcome {
            TransferOutcome::Failed { error } => assert!(error.contains("timed out")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!dir.path().join("slow.bin").exists());
        assert!(!partial_path(dir.path(), "slow.bin").exists());
        assert_eq!(store.open_streams(), 0);
    }
}
