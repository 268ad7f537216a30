//! Worker pool orchestration for one batch

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use log::{error, info, warn};

use crate::queue::JobSource;
use crate::store::BlobStore;
use crate::types::{BatchReport, FetchOptions};
use crate::worker::run_worker;

/// Retrieve every name into `dest_dir` with `options.workers` concurrent workers.
///
/// `dest_dir` must already exist. Returns once every worker has drained the job
/// source; per-file failures are part of the report, never an error.
pub async fn run_pool(
    store: Arc<dyn BlobStore>,
    names: Vec<String>,
    dest_dir: &Path,
    options: FetchOptions,
) -> BatchReport {
    let (names, duplicates_dropped) = dedupe(names);
    if duplicates_dropped > 0 {
        warn!(
            "batch_duplicates: dropped {} duplicate name(s)",
            duplicates_dropped
        );
    }

    let workers = options.workers.max(1);
    info!(
        "batch_start: names={} workers={} threshold={}",
        names.len(),
        workers,
        options.size_threshold
    );

    let jobs = Arc::new(JobSource::load(names).await);
    let dest_dir: Arc<Path> = Arc::from(dest_dir);

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                store.clone(),
                jobs.clone(),
                dest_dir.clone(),
                options,
            ))
        })
        .collect();

    let mut report = BatchReport {
        duplicates_dropped,
        ..BatchReport::default()
    };
    for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(results) => report.extend(results),
            Err(e) => error!("worker_failed: {} error={}", worker_id, e),
        }
    }

    info!(
        "batch_done: total={} downloaded={} skipped={} failed={}",
        report.counts.total(),
        report.counts.downloaded,
        report.counts.skipped,
        report.counts.failed
    );
    report
}

/// Drop repeated names, keeping the first occurrence of each
fn dedupe(names: Vec<String>) -> (Vec<String>, usize) {
    let total = names.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<String> = names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}
