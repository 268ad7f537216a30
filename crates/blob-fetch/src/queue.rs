//! Shared job source feeding blob names to workers

use tokio::sync::{mpsc, Mutex};

/// Queue of blob names consumed concurrently by the pool.
///
/// Every name is delivered to exactly one caller of [`JobSource::next`]; once
/// the queue is drained every caller observes `None`.
#[derive(Debug)]
pub struct JobSource {
    receiver: Mutex<mpsc::Receiver<String>>,
}

impl JobSource {
    /// Load all names and close the queue.
    ///
    /// The channel is sized to the list so loading never waits on consumers.
    pub async fn load(names: Vec<String>) -> Self {
        let (sender, receiver) = mpsc::channel(names.len().max(1));
        for name in names {
            if sender.send(name).await.is_err() {
                break;
            }
        }
        drop(sender);

        Self {
            receiver: Mutex::new(receiver),
        }
    }

    /// Next name to process, or `None` once the queue is exhausted
    pub async fn next(&self) -> Option<String> {
        self.receiver.lock().await.recv().await
    }
}
