//! Size-based transfer strategy: buffered read for small blobs, streamed copy for large ones

use std::fmt;
use std::path::Path;

use log::debug;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::FetchError;
use crate::guard::{destination_path, partial_path};
use crate::store::{BlobStore, BlobStream, UNKNOWN_LENGTH};

/// Copy buffer size for streamed transfers (256 KB) - bounds memory per worker
pub const COPY_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    Buffered,
    Streamed,
}

impl TransferMode {
    /// Blobs strictly larger than the threshold are streamed
    pub fn select(length: u64, size_threshold: u64) -> Self {
        if length > size_threshold {
            TransferMode::Streamed
        } else {
            TransferMode::Buffered
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Buffered => write!(f, "buffered"),
            TransferMode::Streamed => write!(f, "streamed"),
        }
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    pub bytes: u64,
    pub mode: TransferMode,
}

/// Fetch `name` from the store into `dest_dir/name`.
///
/// Bytes land in a hidden partial file that is renamed onto the destination
/// only after the transfer completed; on failure the partial file is removed.
pub async fn fetch_blob(
    store: &dyn BlobStore,
    name: &str,
    dest_dir: &Path,
    size_threshold: u64,
) -> Result<Transferred, FetchError> {
    let destination = destination_path(dest_dir, name)?;
    let partial = partial_path(dest_dir, name);

    let mut stream = store
        .open(name)
        .await
        .map_err(|source| FetchError::OpenStream {
            name: name.to_string(),
            source,
        })?;

    let length = stream.length();
    let mode = TransferMode::select(length, size_threshold);
    debug!(
        "fetch_start: {} length={} threshold={} mode={}",
        name, length, size_threshold, mode
    );

    let result = match mode {
        TransferMode::Buffered => buffered_transfer(&mut stream, name, &partial).await,
        TransferMode::Streamed => streamed_transfer(&mut stream, name, &partial).await,
    };
    stream.close();

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    if let Err(source) = tokio::fs::rename(&partial, &destination).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(FetchError::Write {
            name: name.to_string(),
            path: destination,
            source,
        });
    }

    if length != UNKNOWN_LENGTH && bytes != length {
        debug!(
            "fetch_length_mismatch: {} declared={} written={}",
            name, length, bytes
        );
    }

    Ok(Transferred { bytes, mode })
}

/// Read the whole blob into memory, then write it with a single call
async fn buffered_transfer(
    stream: &mut BlobStream,
    name: &str,
    partial: &Path,
) -> Result<u64, FetchError> {
    let mut data = Vec::with_capacity(stream.length() as usize);
    stream
        .read_to_end(&mut data)
        .await
        .map_err(|source| FetchError::Read {
            name: name.to_string(),
            source,
        })?;

    tokio::fs::write(partial, &data)
        .await
        .map_err(|source| FetchError::Write {
            name: name.to_string(),
            path: partial.to_path_buf(),
            source,
        })?;

    Ok(data.len() as u64)
}

/// Copy the blob chunk by chunk through a fixed-size buffer
async fn streamed_transfer(
    stream: &mut BlobStream,
    name: &str,
    partial: &Path,
) -> Result<u64, FetchError> {
    let mut file = File::create(partial)
        .await
        .map_err(|source| FetchError::Write {
            name: name.to_string(),
            path: partial.to_path_buf(),
            source,
        })?;

    let copy_err = |source| FetchError::Copy {
        name: name.to_string(),
        source,
    };

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = stream.read(&mut buffer).await.map_err(copy_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).await.map_err(copy_err)?;
        written += n as u64;
    }

    file.flush().await.map_err(copy_err)?;
    Ok(written)
}
