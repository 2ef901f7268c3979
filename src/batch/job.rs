//! One unit of batch work.

use super::naming::OutputNaming;
use crate::encryption::EncryptionParams;
use crate::error::Result;
use crate::metadata::MetadataStamp;
use crate::parser_config::ParseOptions;
use crate::writer::WatermarkSpec;
use std::path::PathBuf;

/// Input file plus everything needed to produce its sealed output.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// File to read
    pub input: PathBuf,
    /// Where the sealed file is published
    pub output: PathBuf,
    /// Stamp applied to every selected page
    pub watermark: WatermarkSpec,
    /// Password protection of the output
    pub encryption: EncryptionParams,
    /// Optional `/Info` changes
    pub metadata: Option<MetadataStamp>,
    /// How the input is read
    pub parse_options: ParseOptions,
}

impl BatchJob {
    /// Job with an explicit output path.
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        watermark: WatermarkSpec,
        encryption: EncryptionParams,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            watermark,
            encryption,
            metadata: None,
            parse_options: ParseOptions::default(),
        }
    }

    /// Job whose output path is derived from the input with `naming`.
    pub fn derive(
        input: impl Into<PathBuf>,
        naming: &OutputNaming,
        watermark: WatermarkSpec,
        encryption: EncryptionParams,
    ) -> Result<Self> {
        let input = input.into();
        let output = naming.derive(&input)?;
        Ok(Self::new(input, output, watermark, encryption))
    }

    /// Stamp `/Info` before encryption.
    pub fn with_metadata(mut self, metadata: MetadataStamp) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Read the input with these options (e.g. a password or recovery).
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }
}
