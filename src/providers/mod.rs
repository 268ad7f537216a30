//! Store backends and connection setup
//!
//! - `gridfs`: MongoDB GridFS buckets
//! - `s3`: S3-compatible buckets (AWS, R2, MinIO) through presigned URLs

mod gridfs;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use blob_fetch::{BlobStore, StoreError};

use crate::config::StoreSettings;
use crate::error::AppError;

pub use gridfs::GridFsStore;
pub use s3::S3Store;

/// Connect to the configured store; the whole attempt is bounded by `timeout`
pub async fn connect_store(
    settings: &StoreSettings,
    timeout: Duration,
) -> Result<Arc<dyn BlobStore>, AppError> {
    let connecting = async {
        let store: Arc<dyn BlobStore> = match settings {
            StoreSettings::GridFs(cfg) => Arc::new(GridFsStore::connect(cfg, timeout).await?),
            StoreSettings::S3(cfg) => Arc::new(S3Store::connect(cfg).await?),
        };
        Ok::<_, StoreError>(store)
    };

    match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(store)) => Ok(store),
        Ok(Err(source)) => Err(AppError::Connect {
            store: settings.describe(),
            source,
        }),
        Err(_) => Err(AppError::ConnectTimeout {
            store: settings.describe(),
            timeout,
        }),
    }
}
