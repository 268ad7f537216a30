//! In-memory `BlobStore` for tests (`test-util` feature)
//!
//! Tracks how many streams are open at once so concurrency bounds can be
//! asserted, and can inject open failures, mid-stream read failures and delays.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

use crate::error::StoreResult;
use crate::store::{BlobStore, BlobStream, UNKNOWN_LENGTH};

/// Largest slice handed out per read, so transfers take several polls
const MAX_READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    disconnects: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Arc<Vec<u8>>>,
    read_failures: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    unknown_lengths: HashSet<String>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(mut self, name: &str, content: Vec<u8>) -> Self {
        self.blobs.insert(name.to_string(), Arc::new(content));
        self
    }

    /// Fail reads of `name` once `after` bytes have been delivered
    pub fn with_read_failure_after(mut self, name: &str, after: usize) -> Self {
        self.read_failures.insert(name.to_string(), after);
        self
    }

    /// Delay the first read of `name`
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Delay the first read of every blob without a specific delay
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Open `name` without declaring its length
    pub fn with_unknown_length(mut self, name: &str) -> Self {
        self.unknown_lengths.insert(name.to_string());
        self
    }

    /// Number of successful `open` calls
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet closed
    pub fn open_streams(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open streams observed
    pub fn max_open_streams(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.counters.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn open(&self, name: &str) -> StoreResult<BlobStream> {
        let data = self
            .blobs
            .get(name)
            .cloned()
            .ok_or_else(|| format!("file with name {} not found", name))?;

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let now_open = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_in_flight
            .fetch_max(now_open, Ordering::SeqCst);

        let delay = self.delays.get(name).copied().or(self.default_delay);
        let reader = MemoryReader {
            length: data.len(),
            data,
            position: 0,
            fail_after: self.read_failures.get(name).copied(),
            delay: delay.map(|d| Box::pin(tokio::time::sleep(d))),
            counters: self.counters.clone(),
        };

        let length = if self.unknown_lengths.contains(name) {
            UNKNOWN_LENGTH
        } else {
            reader.length as u64
        };
        Ok(BlobStream::new(length, reader))
    }

    async fn disconnect(&self) -> StoreResult<()> {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryReader {
    data: Arc<Vec<u8>>,
    length: usize,
    position: usize,
    fail_after: Option<usize>,
    delay: Option<Pin<Box<Sleep>>>,
    counters: Arc<Counters>,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(delay) = self.delay.as_mut() {
            if delay.as_mut().poll(cx).is_pending() {
                return Poll::Pending;
            }
        }
        self.delay = None;

        let mut end = self.length;
        if let Some(fail_after) = self.fail_after {
            if self.position >= fail_after {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "stream reset by store",
                )));
            }
            end = end.min(fail_after);
        }

        let start = self.position;
        let n = (end - start).min(buf.remaining()).min(MAX_READ_CHUNK);
        buf.put_slice(&self.data[start..start + n]);
        self.position += n;
        Poll::Ready(Ok(()))
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
