//! Batch options, per-blob outcomes and the aggregated report

use std::time::Duration;

use serde::Serialize;

use crate::strategy::TransferMode;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 10;

/// Default size threshold between buffered and streamed transfers (20 MB)
pub const DEFAULT_SIZE_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Settings fixed for the whole batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub workers: usize,
    pub size_threshold: u64,
    /// Deadline for a single transfer; `None` lets transfers run unbounded
    pub transfer_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Target file already present and non-empty
    Skipped,
    Downloaded { bytes: u64, mode: TransferMode },
    Failed { error: String },
}

/// Outcome of one blob
#[derive(Debug, Clone, Serialize)]
pub struct BlobResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub bytes_written: u64,
}

impl BatchCounts {
    pub fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Skipped => self.skipped += 1,
            TransferOutcome::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.bytes_written += bytes;
            }
            TransferOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.skipped + self.downloaded + self.failed
    }
}

/// Everything a batch produced, merged from the workers after they finished
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub counts: BatchCounts,
    pub duplicates_dropped: usize,
    pub results: Vec<BlobResult>,
}

impl BatchReport {
    pub fn extend(&mut self, results: Vec<BlobResult>) {
        for result in &results {
            self.counts.record(&result.outcome);
        }
        self.results.extend(results);
    }

    pub fn outcome_of(&self, name: &str) -> Option<&TransferOutcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: TransferOutcome) -> BlobResult {
        BlobResult {
            name: name.to_string(),
            outcome,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn report_counts_every_outcome() {
        let mut report = BatchReport::default();
        report.extend(vec![
            result("a", TransferOutcome::Skipped),
            result(
                "b",
                TransferOutcome::Downloaded {
                    bytes: 10,
                    mode: TransferMode::Buffered,
                },
            ),
        ]);
        report.extend(vec![
            result(
                "c",
                TransferOutcome::Downloaded {
                    bytes: 5,
                    mode: TransferMode::Streamed,
                },
            ),
            result(
                "d",
                TransferOutcome::Failed {
                    error: "boom".into(),
                },
            ),
        ]);

        assert_eq!(
            report.counts,
            BatchCounts {
                skipped: 1,
                downloaded: 2,
                failed: 1,
                bytes_written: 15,
            }
        );
        assert_eq!(report.counts.total(), 4);
        assert_eq!(report.outcome_of("a"), Some(&TransferOutcome::Skipped));
        assert_eq!(report.outcome_of("zzz"), None);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(result(
            "b.bin",
            TransferOutcome::Downloaded {
                bytes: 3,
                mode: TransferMode::Streamed,
            },
        ))
        .unwrap();

        assert_eq!(value["name"], "b.bin");
        assert_eq!(value["status"], "downloaded");
        assert_eq!(value["bytes"], 3);
        assert_eq!(value["mode"], "streamed");
    }
}
