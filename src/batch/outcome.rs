//! Per-job outcomes and the batch report.

use crate::error::{Error, ErrorKind};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline step a job was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Not started
    Queued,
    /// Reading the input file
    Read,
    /// Parsing (and decrypting) the input
    Parse,
    /// Stamping the watermark
    Watermark,
    /// Writing `/Info`
    Metadata,
    /// Setting up encryption
    Encrypt,
    /// Producing output bytes
    Serialize,
    /// Publishing the output file
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Queued => "queued",
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::Watermark => "watermark",
            Stage::Metadata => "metadata",
            Stage::Encrypt => "encrypt",
            Stage::Serialize => "serialize",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    /// Output published
    Success {
        /// Input file
        input: PathBuf,
        /// Published output file
        output: PathBuf,
        /// Size of the output
        bytes_written: u64,
    },
    /// Nothing was published
    Failure {
        /// Input file
        input: PathBuf,
        /// Error category
        kind: ErrorKind,
        /// Human readable cause
        message: String,
        /// Where the job stopped
        stage: Stage,
    },
}

impl JobOutcome {
    /// Failure outcome for `error` raised during `stage`.
    pub fn failure(input: impl Into<PathBuf>, stage: Stage, error: &Error) -> Self {
        JobOutcome::Failure {
            input: input.into(),
            kind: error.kind(),
            message: error.to_string(),
            stage,
        }
    }

    /// Whether the output was published.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    /// Input file of the job.
    pub fn input(&self) -> &Path {
        match self {
            JobOutcome::Success { input, .. } | JobOutcome::Failure { input, .. } => input,
        }
    }

    /// Error category, for failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Failing stage, for failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failure { stage, .. } => Some(*stage),
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success {
                input,
                output,
                bytes_written,
            } => write!(
                f,
                "OK    {} -> {} ({} bytes)",
                input.display(),
                output.display(),
                bytes_written
            ),
            JobOutcome::Failure {
                input,
                kind,
                message,
                stage,
            } => write!(f, "FAIL  {} [{}] {}: {}", input.display(), stage, kind, message),
        }
    }
}

/// Outcomes of a batch, in job order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    /// Wrap outcomes in job order.
    pub fn new(outcomes: Vec<JobOutcome>) -> Self {
        Self { outcomes }
    }

    /// All outcomes.
    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    /// Number of jobs.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the batch had no jobs.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Jobs whose output was published.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Jobs that failed (including cancelled ones).
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Whether every job succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

impl IntoIterator for BatchReport {
    type Item = JobOutcome;
    type IntoIter = std::vec::IntoIter<JobOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
