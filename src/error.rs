//! Error types for the sealing pipeline.
//!
//! Every failure carries a precise [`Error`] variant for diagnostics and maps onto a
//! coarse [`ErrorKind`] used in batch reports.

use std::path::PathBuf;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, stamping, encrypting or writing a PDF.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: {0}")]
    InvalidHeader(String),

    /// Unsupported PDF version
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// Structurally invalid document
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Circular reference detected in the page tree
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Input is encrypted and no password was supplied
    #[error("Document is encrypted and requires a password")]
    PasswordRequired,

    /// Input is encrypted and the supplied password does not open it
    #[error("Incorrect password for encrypted document")]
    IncorrectPassword,

    /// Cipher failure on malformed encrypted data
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Password rejected by the password policy
    #[error("Weak or empty password: {0}")]
    WeakPassword(String),

    /// Requested algorithm or key length is not implemented
    #[error("Unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Watermark cannot be drawn with the configured font or page
    #[error("Watermark cannot be rendered: {0}")]
    Unrenderable(String),

    /// Output path already taken
    #[error("Output path already exists: {}", .0.display())]
    OutputCollision(PathBuf),

    /// Two jobs of one batch write the same file
    #[error("Output path is produced by an earlier job in the batch: {}", .0.display())]
    DuplicateOutput(PathBuf),

    /// Output would replace its own input
    #[error("Output path is the input file: {}", .0.display())]
    OutputIsInput(PathBuf),

    /// Job skipped because the batch was cancelled
    #[error("Job cancelled before it started")]
    Cancelled,

    /// Job stopped by a panic while processing its input
    #[error("Job aborted while processing input: {0}")]
    Aborted(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

/// Coarse failure category reported per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Unreadable or corrupt input
    MalformedDocument,
    /// Input uses a PDF feature this crate does not implement
    UnsupportedFeature,
    /// Watermark text or geometry cannot be rendered
    UnrenderableSpecification,
    /// Password does not meet the minimum policy
    WeakOrEmptyPassword,
    /// Requested key length or algorithm is not implemented
    UnsupportedAlgorithm,
    /// Output path conflict
    OutputCollision,
    /// Read or write failure
    IoFailure,
    /// Job abandoned before it started
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::MalformedDocument => "MalformedDocument",
            ErrorKind::UnsupportedFeature => "UnsupportedFeature",
            ErrorKind::UnrenderableSpecification => "UnrenderableSpecification",
            ErrorKind::WeakOrEmptyPassword => "WeakOrEmptyPassword",
            ErrorKind::UnsupportedAlgorithm => "UnsupportedAlgorithm",
            ErrorKind::OutputCollision => "OutputCollision",
            ErrorKind::IoFailure => "IOFailure",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Category of this error for batch reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHeader(_)
            | Error::ParseError { .. }
            | Error::InvalidXref(_)
            | Error::ObjectNotFound(..)
            | Error::InvalidObjectType { .. }
            | Error::UnexpectedEof
            | Error::InvalidPdf(_)
            | Error::CircularReference(_)
            | Error::RecursionLimitExceeded(_)
            | Error::Decode(_)
            | Error::Encryption(_)
            | Error::Aborted(_)
            | Error::Utf8Error(_) => ErrorKind::MalformedDocument,
            Error::UnsupportedVersion(_)
            | Error::UnsupportedFilter(_)
            | Error::Unsupported(_)
            | Error::PasswordRequired
            | Error::IncorrectPassword => ErrorKind::UnsupportedFeature,
            Error::WeakPassword(_) => ErrorKind::WeakOrEmptyPassword,
            Error::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Error::Unrenderable(_) => ErrorKind::UnrenderableSpecification,
            Error::OutputCollision(_) | Error::DuplicateOutput(_) | Error::OutputIsInput(_) => {
                ErrorKind::OutputCollision
            },
            Error::Io(_) => ErrorKind::IoFailure,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "invalid token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("invalid token"));
    }

    #[test]
    fn test_object_not_found_error() {
        let err = Error::ObjectNotFound(10, 0);
        assert!(format!("{}", err).contains("10 0 R"));
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_password_errors_are_unsupported_feature() {
        assert_eq!(Error::PasswordRequired.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(Error::IncorrectPassword.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_io_error_kind() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(format!("{}", err).contains("disk full"));
    }

    #[test]
    fn test_collision_message_shows_path() {
        let err = Error::OutputCollision(PathBuf::from("/tmp/out.pdf"));
        assert!(format!("{}", err).contains("/tmp/out.pdf"));
        assert_eq!(err.kind(), ErrorKind::OutputCollision);
    }

    #[test]
    fn test_error_kind_display_uses_taxonomy_names() {
        assert_eq!(ErrorKind::IoFailure.to_string(), "IOFailure");
        assert_eq!(ErrorKind::WeakOrEmptyPassword.to_string(), "WeakOrEmptyPassword");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
