//! Output path derivation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// How a job's output path is derived from its input path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum OutputNaming {
    /// Next to the input, `{stem}_{suffix}.{ext}`
    Suffix(String),
    /// Same file name inside another directory
    Directory(PathBuf),
    /// A fixed path (single-file batches)
    Explicit(PathBuf),
}

impl Default for OutputNaming {
    fn default() -> Self {
        OutputNaming::Suffix("sealed".to_string())
    }
}

impl OutputNaming {
    /// Output path for `input`.
    ///
    /// ```
    /// use pdf_seal::batch::OutputNaming;
    /// use std::path::Path;
    ///
    /// let naming = OutputNaming::Suffix("Kim".to_string());
    /// let out = naming.derive(Path::new("docs/report.pdf"))?;
    /// assert_eq!(out, Path::new("docs/report_Kim.pdf"));
    /// # Ok::<(), pdf_seal::error::Error>(())
    /// ```
    pub fn derive(&self, input: &Path) -> Result<PathBuf> {
        match self {
            OutputNaming::Suffix(suffix) => {
                let stem = input.file_stem().ok_or_else(|| no_file_name(input))?;
                let mut name = OsString::from(stem);
                name.push("_");
                name.push(sanitize(suffix));
                name.push(".");
                name.push(input.extension().unwrap_or_else(|| OsStr::new("pdf")));
                Ok(input.with_file_name(name))
            },
            OutputNaming::Directory(dir) => {
                let name = input.file_name().ok_or_else(|| no_file_name(input))?;
                Ok(dir.join(name))
            },
            OutputNaming::Explicit(path) => Ok(path.clone()),
        }
    }
}

fn no_file_name(input: &Path) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("input path {} has no file name", input.display()),
    ))
}

/// Replace characters that cannot appear in a file name.
fn sanitize(suffix: &str) -> String {
    suffix
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
