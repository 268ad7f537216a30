use std::io;
use std::path::PathBuf;
use std::time::Duration;

use blob_fetch::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort the whole run
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read blob list {}: {source}", path.display())]
    BlobList { path: PathBuf, source: io::Error },

    #[error("failed to create destination directory {}: {source}", path.display())]
    Destination { path: PathBuf, source: io::Error },

    #[error("failed to connect to {store}: {source}")]
    Connect { store: String, source: StoreError },

    #[error("timed out connecting to {store} after {}s", timeout.as_secs())]
    ConnectTimeout { store: String, timeout: Duration },

    #[error("failed to write report {}: {source}", path.display())]
    Report { path: PathBuf, source: io::Error },
}
