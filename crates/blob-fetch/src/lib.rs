//! Blob retrieval engine with bounded concurrency and size-based transfers
//!
//! Provides the worker pool that materializes a batch of named blobs as local files:
//! - Fixed-size pool of workers pulling names from a shared job source
//! - Skip check for files already present and non-empty
//! - Buffered transfer for small blobs, streamed copy for large ones
//! - Per-file failure isolation, outcomes reported through `log` and the batch report

mod error;
pub mod guard;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod pool;
mod queue;
mod store;
pub mod strategy;
mod types;
mod worker;

pub use error::{FetchError, StoreError, StoreResult};
pub use pool::run_pool;
pub use store::{BlobStore, BlobStream, UNKNOWN_LENGTH};
pub use strategy::{fetch_blob, TransferMode, Transferred};
pub use types::{
    BatchCounts, BatchReport, BlobResult, FetchOptions, TransferOutcome, DEFAULT_SIZE_THRESHOLD,
    DEFAULT_WORKERS,
};
