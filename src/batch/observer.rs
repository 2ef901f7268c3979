//! Progress notifications and cancellation.

use super::outcome::{BatchReport, JobOutcome};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives progress events. Called from worker threads when the batch runs
/// in parallel.
pub trait ProgressObserver: Send + Sync {
    /// Job `index` (0-based) of `total` is starting.
    fn job_started(&self, _index: usize, _total: usize, _input: &Path) {}

    /// Job `index` of `total` has an outcome.
    fn job_finished(&self, _index: usize, _total: usize, _outcome: &JobOutcome) {}

    /// Every job has an outcome.
    fn batch_finished(&self, _report: &BatchReport) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Observer that reports through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn job_started(&self, index: usize, total: usize, input: &Path) {
        log::info!("[{}/{}] Processing {}", index + 1, total, input.display());
    }

    fn job_finished(&self, index: usize, total: usize, outcome: &JobOutcome) {
        if outcome.is_success() {
            log::info!("[{}/{}] {}", index + 1, total, outcome);
        } else {
            log::warn!("[{}/{}] {}", index + 1, total, outcome);
        }
    }

    fn batch_finished(&self, report: &BatchReport) {
        log::info!("Batch done: {} succeeded, {} failed", report.succeeded(), report.failed());
    }
}

/// Shared flag that stops jobs which have not started yet.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Token in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
