//! Boundary between the engine and a remote blob store

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::StoreResult;

/// A remote store able to open named read streams.
///
/// Implementations are shared by every worker of a batch and must be safe for
/// concurrent use without external locking.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open a read stream over the bytes of `name`
    async fn open(&self, name: &str) -> StoreResult<BlobStream>;

    /// Tear down the store session once the batch has drained
    async fn disconnect(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Declared length for streams whose size the store cannot tell up front.
/// Larger than any threshold, so such blobs always take the streamed path.
pub const UNKNOWN_LENGTH: u64 = u64::MAX;

/// Readable stream over one blob, carrying its declared length
pub struct BlobStream {
    length: u64,
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl BlobStream {
    pub fn new<R>(length: u64, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            length,
            reader: Box::pin(reader),
        }
    }

    /// Byte length reported by the store before reading, or [`UNKNOWN_LENGTH`]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Release the underlying connection resources
    pub fn close(self) {
        drop(self.reader);
    }
}

impl AsyncRead for BlobStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStream")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
