//! Runs jobs through `parse → watermark → metadata → encrypt → serialize →
//! publish`, one isolated outcome per job.

use super::job::BatchJob;
use super::observer::{CancellationToken, NoopObserver, ProgressObserver};
use super::outcome::{BatchReport, JobOutcome, Stage};
use crate::document::Document;
use crate::encryption::apply_encryption;
use crate::error::{Error, Result};
use crate::writer::apply_watermark;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashSet;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Batch-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// `None` runs jobs one after another; `Some(n)` uses up to `n` threads,
    /// capped at the number of cores
    pub parallelism: Option<usize>,
    /// Replace existing output files
    pub overwrite: bool,
}

/// Drives a batch of [`BatchJob`]s.
///
/// A failing job never stops the others. Outputs are written to a temporary
/// file in the destination directory and renamed into place only once
/// complete, so a failed job leaves nothing at its output path.
pub struct Orchestrator {
    config: BatchConfig,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator without progress reporting.
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
        }
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop pending jobs when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this orchestrator's pending jobs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every job; the report lists outcomes in job order.
    pub fn run(&self, jobs: Vec<BatchJob>) -> BatchReport {
        let total = jobs.len();
        log::info!("Starting batch of {} job(s)", total);

        let outcomes = match shared_params_error(&jobs) {
            Some(err) => {
                log::error!("Shared encryption settings rejected: {}", err);
                jobs.iter()
                    .enumerate()
                    .map(|(index, job)| {
                        let outcome = JobOutcome::failure(job.input.clone(), Stage::Encrypt, &err);
                        self.observer.job_finished(index, total, &outcome);
                        outcome
                    })
                    .collect()
            },
            None => {
                let blocked = self.output_conflicts(&jobs);
                self.dispatch(jobs, blocked)
            },
        };

        let report = BatchReport::new(outcomes);
        self.observer.batch_finished(&report);
        report
    }

    fn dispatch(&self, jobs: Vec<BatchJob>, blocked: Vec<Option<Error>>) -> Vec<JobOutcome> {
        let total = jobs.len();
        let work: Vec<(usize, BatchJob, Option<Error>)> = jobs
            .into_iter()
            .zip(blocked)
            .enumerate()
            .map(|(index, (job, conflict))| (index, job, conflict))
            .collect();
        let run_one = |(index, job, conflict): (usize, BatchJob, Option<Error>)| {
            self.run_one(index, total, job, conflict)
        };

        let threads = match self.config.parallelism {
            Some(n) if n > 1 => n.min(available_cores()),
            _ => 1,
        };
        if threads <= 1 {
            return work.into_iter().map(run_one).collect();
        }

        match ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => {
                log::debug!("Running batch on {} threads", threads);
                pool.install(|| work.into_par_iter().map(run_one).collect())
            },
            Err(e) => {
                log::warn!("Could not start worker pool ({}), running sequentially", e);
                work.into_iter().map(run_one).collect()
            },
        }
    }

    fn run_one(&self, index: usize, total: usize, job: BatchJob, conflict: Option<Error>) -> JobOutcome {
        if self.cancel.is_cancelled() {
            let outcome = JobOutcome::failure(job.input.clone(), Stage::Queued, &Error::Cancelled);
            self.observer.job_finished(index, total, &outcome);
            return outcome;
        }

        self.observer.job_started(index, total, &job.input);
        let outcome = match conflict {
            Some(err) => JobOutcome::failure(job.input.clone(), Stage::Write, &err),
            None => match guarded_execute(&job, self.config.overwrite) {
                Ok(bytes_written) => JobOutcome::Success {
                    input: job.input.clone(),
                    output: job.output.clone(),
                    bytes_written,
                },
                Err((stage, err)) => JobOutcome::failure(job.input.clone(), stage, &err),
            },
        };
        self.observer.job_finished(index, total, &outcome);
        outcome
    }

    /// Output problems known before any job runs.
    fn output_conflicts(&self, jobs: &[BatchJob]) -> Vec<Option<Error>> {
        let mut claimed = HashSet::new();
        jobs.iter()
            .map(|job| {
                let output = normalized(&job.output);
                if output == normalized(&job.input) {
                    return Some(Error::OutputIsInput(job.output.clone()));
                }
                if !claimed.insert(output) {
                    return Some(Error::DuplicateOutput(job.output.clone()));
                }
                if !self.config.overwrite && job.output.exists() {
                    return Some(Error::OutputCollision(job.output.clone()));
                }
                None
            })
            .collect()
    }
}

/// Validation error of encryption settings shared by every job.
fn shared_params_error(jobs: &[BatchJob]) -> Option<Error> {
    let first = &jobs.first()?.encryption;
    if jobs.iter().all(|job| job.encryption == *first) {
        first.validate().err()
    } else {
        None
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Absolute form of `path` for comparison, resolving its directory when the
/// file itself does not exist yet.
fn normalized(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        },
        _ => path.to_path_buf(),
    }
}

/// Runs [`execute`], turning a panic into a failure of this job alone.
fn guarded_execute(job: &BatchJob, overwrite: bool) -> std::result::Result<u64, (Stage, Error)> {
    let stage = Cell::new(Stage::Read);
    contain_panic(job, &stage, || execute(job, overwrite, &stage))
}

fn contain_panic<T>(
    job: &BatchJob,
    stage: &Cell<Stage>,
    work: impl FnOnce() -> std::result::Result<T, (Stage, Error)>,
) -> std::result::Result<T, (Stage, Error)> {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{}: panicked during {}: {}", job.input.display(), stage.get(), message);
            Err((stage.get(), Error::Aborted(message)))
        },
    }
}

/// One job end to end; returns the number of bytes published.
///
/// `stage` is set before each step so a panic can be attributed to it.
fn execute(job: &BatchJob, overwrite: bool, stage: &Cell<Stage>) -> std::result::Result<u64, (Stage, Error)> {
    let enter = |next: Stage| {
        stage.set(next);
        move |err: Error| (next, err)
    };

    let failed = enter(Stage::Encrypt);
    job.encryption.validate().map_err(failed)?;

    let failed = enter(Stage::Read);
    let data = std::fs::read(&job.input).map_err(|e| failed(Error::from(e)))?;

    let failed = enter(Stage::Parse);
    let mut doc = Document::parse(&data, &job.parse_options).map_err(failed)?;
    log::debug!("{}: {} page(s)", job.input.display(), doc.page_count());

    let failed = enter(Stage::Watermark);
    apply_watermark(&mut doc, &job.watermark).map_err(failed)?;

    if let Some(metadata) = &job.metadata {
        let failed = enter(Stage::Metadata);
        metadata.apply(&mut doc).map_err(failed)?;
    }

    let failed = enter(Stage::Encrypt);
    apply_encryption(&mut doc, &job.encryption).map_err(failed)?;

    let failed = enter(Stage::Serialize);
    let bytes = doc.serialize().map_err(failed)?;

    let failed = enter(Stage::Write);
    publish(&job.output, &bytes, overwrite).map_err(failed)?;
    log::info!("Sealed {} -> {}", job.input.display(), job.output.display());
    Ok(bytes.len() as u64)
}

/// Write `bytes` next to `path` and rename into place.
pub fn publish(path: &Path, bytes: &[u8], overwrite: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    if overwrite {
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    } else {
        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                Error::OutputCollision(path.to_path_buf())
            } else {
                Error::Io(e.error)
            }
        })?;
    }
    Ok(())
}
