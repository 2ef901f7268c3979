//! Batch processing of many input files.
//!
//! ```no_run
//! use pdf_seal::batch::{BatchConfig, BatchJob, LogObserver, Orchestrator, OutputNaming};
//! use pdf_seal::encryption::EncryptionParams;
//! use pdf_seal::writer::WatermarkSpec;
//! use std::sync::Arc;
//!
//! let watermark = WatermarkSpec::builder("Licensed to Kim")
//!     .build()?;
//! let params = EncryptionParams::new("open-sesame");
//! let naming = OutputNaming::Suffix("Kim".to_string());
//!
//! let jobs = ["a.pdf", "b.pdf"]
//!     .iter()
//!     .map(|input| BatchJob::derive(*input, &naming, watermark.clone(), params.clone()))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let report = Orchestrator::new(BatchConfig { parallelism: Some(4), overwrite: false })
//!     .with_observer(Arc::new(LogObserver))
//!     .run(jobs);
//! println!("{} of {} sealed", report.succeeded(), report.len());
//! # Ok::<(), pdf_seal::error::Error>(())
//! ```

mod job;
mod naming;
mod observer;
mod orchestrator;
mod outcome;

pub use job::BatchJob;
pub use naming::OutputNaming;
pub use observer::{CancellationToken, LogObserver, NoopObserver, ProgressObserver};
pub use orchestrator::{publish, BatchConfig, Orchestrator};
pub use outcome::{BatchReport, JobOutcome, Stage};
