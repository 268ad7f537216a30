//! JSON run report

use std::path::{Path, PathBuf};

use blob_fetch::{BatchCounts, BatchReport, BlobResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub store: String,
    pub destination: PathBuf,
    pub counts: BatchCounts,
    pub duplicates_dropped: usize,
    pub results: &'a [BlobResult],
}

impl<'a> RunReport<'a> {
    pub fn new(
        batch: &'a BatchReport,
        store: String,
        destination: &Path,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            started_at,
            finished_at,
            store,
            destination: destination.to_path_buf(),
            counts: batch.counts,
            duplicates_dropped: batch.duplicates_dropped,
            results: &batch.results,
        }
    }
}

pub async fn write_report(path: &Path, report: &RunReport<'_>) -> Result<(), AppError> {
    let report_err = |source| AppError::Report {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(report).map_err(|e| report_err(e.into()))?;
    tokio::fs::write(path, json).await.map_err(report_err)
}
