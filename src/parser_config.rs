//! Options controlling how input documents are read.

/// Parser options for error recovery, resource limits and decryption.
///
/// # Example
///
/// ```
/// use pdf_seal::parser_config::ParseOptions;
///
/// let strict = ParseOptions::strict();
/// assert!(!strict.recover_xref);
///
/// let opened = ParseOptions::default().with_password("s3cret");
/// assert_eq!(opened.password.as_deref(), Some("s3cret"));
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Rebuild the cross-reference table by scanning for `N G obj` headers when
    /// the stored one is missing or points at the wrong offsets.
    ///
    /// Off by default: inconsistent offsets are reported as a malformed document.
    pub recover_xref: bool,

    /// Skip objects inside object streams that fail to parse instead of failing
    /// the whole document.
    pub skip_invalid_objects: bool,

    /// Maximum object nesting depth and page tree depth.
    pub max_nesting: usize,

    /// Maximum decompression ratio (decompressed:compressed). 0 disables the check.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes. 0 disables the check.
    pub max_decompressed_size: usize,

    /// Password used to open an encrypted input (user or owner password).
    pub password: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ParseOptions {
    /// Strict mode: damaged structure is an error.
    pub fn strict() -> Self {
        Self {
            recover_xref: false,
            skip_invalid_objects: false,
            max_nesting: 100,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024,
            password: None,
        }
    }

    /// Lenient mode: rebuild damaged cross-reference data and skip broken
    /// compressed objects.
    pub fn lenient() -> Self {
        Self {
            recover_xref: true,
            skip_invalid_objects: true,
            ..Self::strict()
        }
    }

    /// Supply the password for an encrypted input.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}
