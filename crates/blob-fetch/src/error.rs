use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type returned by store backends
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a single blob retrieval. Never aborts the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid blob name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("failed to open download stream for {name}: {source}")]
    OpenStream { name: String, source: StoreError },

    #[error("failed to read {name} from download stream: {source}")]
    Read { name: String, source: io::Error },

    #[error("failed to write {name} to {}: {source}", path.display())]
    Write {
        name: String,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to stream {name} to disk: {source}")]
    Copy { name: String, source: io::Error },

    #[error("transfer of {name} timed out after {}s", timeout.as_secs())]
    TimedOut { name: String, timeout: Duration },
}
