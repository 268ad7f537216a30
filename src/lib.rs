//! blob-extract - bulk export of named blobs into a local directory
//!
//! This crate wires the retrieval engine (`blob-fetch`) to its collaborators:
//! - `config`: properties file -> validated `Settings`
//! - `blob_list`: list file -> ordered blob names
//! - `providers`: GridFS and S3-compatible store backends
//! - `extract`: destination setup, connection lifecycle and pool drain
//! - `report`: optional JSON report of the run

pub mod blob_list;
mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod providers;
pub mod report;

use blob_fetch::BatchReport;
use chrono::Utc;
use log::info;

pub use cli::Cli;
pub use error::AppError;

use crate::blob_list::read_blob_names;
use crate::config::Settings;
use crate::report::{write_report, RunReport};

/// Run one export as described by the command line
pub async fn run(cli: &Cli) -> Result<BatchReport, AppError> {
    let settings = Settings::load(&cli.config)?;

    let names = read_blob_names(&cli.bloblist)
        .await
        .map_err(|source| AppError::BlobList {
            path: cli.bloblist.clone(),
            source,
        })?;
    info!(
        "Loaded {} blob name(s) from {}",
        names.len(),
        cli.bloblist.display()
    );

    let started_at = Utc::now();
    let report = extract::run_batch(&settings, names, &cli.blobpath).await?;
    let finished_at = Utc::now();

    let counts = report.counts;
    let elapsed = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
    info!(
        "All done: {} downloaded, {} skipped, {} failed ({} bytes) in {:.1}s",
        counts.downloaded, counts.skipped, counts.failed, counts.bytes_written, elapsed
    );

    if let Some(path) = &cli.report {
        let run_report = RunReport::new(
            &report,
            settings.store.describe(),
            &cli.blobpath,
            started_at,
            finished_at,
        );
        write_report(path, &run_report).await?;
        info!("Report written to {}", path.display());
    }

    Ok(report)
}
