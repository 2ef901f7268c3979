//! User-facing encryption settings.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Access permissions granted to a user who opens the document with the
    /// user password. Bit positions follow the `/P` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document
        const PRINT = 1 << 2;
        /// Modify contents
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics
        const COPY = 1 << 4;
        /// Add or modify annotations
        const ANNOTATE = 1 << 5;
        /// Fill in form fields
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility
        const ACCESSIBILITY = 1 << 9;
        /// Insert, rotate or delete pages
        const ASSEMBLE = 1 << 10;
        /// Print at full resolution
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::all()
    }
}

impl Permissions {
    /// Signed `/P` value: reserved bits set, granted bits added.
    ///
    /// ```
    /// use pdf_seal::encryption::Permissions;
    ///
    /// assert_eq!(Permissions::empty().p_value(), -3904);
    /// assert_eq!(Permissions::all().p_value(), -4);
    /// ```
    pub fn p_value(&self) -> i32 {
        (0xFFFF_F0C0u32 | self.bits()) as i32
    }

    /// Permissions encoded in a `/P` value read from a file.
    pub fn from_p_value(p: i32) -> Self {
        Permissions::from_bits_truncate(p as u32)
    }
}

/// Cipher and key length of the Standard Security Handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum EncryptionAlgorithm {
    /// RC4 with a 40-bit key (V1, R2)
    Rc4_40,
    /// RC4 with a 128-bit key (V2, R3)
    #[default]
    Rc4_128,
    /// AES-128 CBC through the AESV2 crypt filter (V4, R4)
    Aes128,
    /// AES-256 CBC through the AESV3 crypt filter (V5, R6)
    Aes256,
}

impl EncryptionAlgorithm {
    /// Pick an algorithm by cipher family and key length in bits.
    ///
    /// ```
    /// use pdf_seal::encryption::EncryptionAlgorithm;
    ///
    /// assert_eq!(
    ///     EncryptionAlgorithm::from_name_and_bits("rc4", 40).unwrap(),
    ///     EncryptionAlgorithm::Rc4_40
    /// );
    /// assert!(EncryptionAlgorithm::from_name_and_bits("rc4", 64).is_err());
    /// ```
    pub fn from_name_and_bits(name: &str, bits: u32) -> Result<Self> {
        match (name.to_ascii_lowercase().as_str(), bits) {
            ("rc4", 40) => Ok(Self::Rc4_40),
            ("rc4", 128) => Ok(Self::Rc4_128),
            ("aes", 128) => Ok(Self::Aes128),
            ("aes", 256) => Ok(Self::Aes256),
            (family @ ("rc4" | "aes"), _) => Err(Error::UnsupportedAlgorithm(format!(
                "{} with a {}-bit key",
                family, bits
            ))),
            _ => Err(Error::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// `/V` value.
    pub fn version(&self) -> i64 {
        match self {
            Self::Rc4_40 => 1,
            Self::Rc4_128 => 2,
            Self::Aes128 => 4,
            Self::Aes256 => 5,
        }
    }

    /// `/R` value.
    pub fn revision(&self) -> u32 {
        match self {
            Self::Rc4_40 => 2,
            Self::Rc4_128 => 3,
            Self::Aes128 => 4,
            Self::Aes256 => 6,
        }
    }

    /// File key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Rc4_40 => 5,
            Self::Rc4_128 | Self::Aes128 => 16,
            Self::Aes256 => 32,
        }
    }

    /// Whether strings and streams are AES-encrypted.
    pub fn is_aes(&self) -> bool {
        matches!(self, Self::Aes128 | Self::Aes256)
    }

    /// Minimum PDF version able to express this algorithm.
    pub fn min_pdf_version(&self) -> &'static str {
        match self {
            Self::Rc4_40 => "1.3",
            Self::Rc4_128 => "1.4",
            Self::Aes128 => "1.6",
            Self::Aes256 => "1.7",
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rc4_40 => "rc4-40",
            Self::Rc4_128 => "rc4-128",
            Self::Aes128 => "aes-128",
            Self::Aes256 => "aes-256",
        })
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, bits) = lower
            .split_once('-')
            .ok_or_else(|| Error::UnsupportedAlgorithm(s.to_string()))?;
        let bits: u32 = bits
            .parse()
            .map_err(|_| Error::UnsupportedAlgorithm(s.to_string()))?;
        Self::from_name_and_bits(name, bits)
    }
}

/// Passwords, permissions and cipher for one output document.
///
/// ```
/// use pdf_seal::encryption::{EncryptionAlgorithm, EncryptionParams, Permissions};
///
/// let params = EncryptionParams::new("reader")
///     .with_owner_password("admin")
///     .with_permissions(Permissions::PRINT)
///     .with_algorithm(EncryptionAlgorithm::Aes128);
/// assert!(params.validate().is_ok());
/// assert_eq!(params.effective_owner_password(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionParams {
    /// Password needed to open the document
    pub user_password: String,
    /// Password granting full access; `None` reuses the user password
    pub owner_password: Option<String>,
    /// Permissions granted to the user password
    pub permissions: Permissions,
    /// Cipher and key length
    pub algorithm: EncryptionAlgorithm,
    /// Whether `/Type /Metadata` streams are encrypted (AES only)
    pub encrypt_metadata: bool,
}

impl EncryptionParams {
    /// Default settings for a user password: RC4-128, every permission granted.
    pub fn new(user_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: None,
            permissions: Permissions::default(),
            algorithm: EncryptionAlgorithm::default(),
            encrypt_metadata: true,
        }
    }

    /// Set an explicit owner password.
    pub fn with_owner_password(mut self, owner: impl Into<String>) -> Self {
        self.owner_password = Some(owner.into());
        self
    }

    /// Set the granted permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set the cipher.
    pub fn with_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Leave XMP metadata streams readable.
    pub fn with_encrypt_metadata(mut self, encrypt_metadata: bool) -> Self {
        self.encrypt_metadata = encrypt_metadata;
        self
    }

    /// Owner password actually written.
    pub fn effective_owner_password(&self) -> &str {
        self.owner_password.as_deref().unwrap_or(&self.user_password)
    }

    /// Check the password policy and algorithm settings without touching a document.
    pub fn validate(&self) -> Result<()> {
        if self.user_password.is_empty() {
            return Err(Error::WeakPassword("user password is empty".to_string()));
        }
        if matches!(self.owner_password.as_deref(), Some("")) {
            return Err(Error::WeakPassword("owner password is explicitly empty".to_string()));
        }
        let legacy = !matches!(self.algorithm, EncryptionAlgorithm::Aes256);
        if legacy {
            let non_latin1 = [self.user_password.as_str(), self.effective_owner_password()]
                .iter()
                .any(|p| p.chars().any(|c| u32::from(c) > 0xFF));
            if non_latin1 {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "{} passwords must be Latin-1; use aes-256 for Unicode passwords",
                    self.algorithm
                )));
            }
        }
        if !self.encrypt_metadata && self.algorithm.revision() < 4 {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} always encrypts metadata",
                self.algorithm
            )));
        }
        Ok(())
    }
}

/// Password bytes for revisions 2 to 4 (one byte per Latin-1 character).
pub(crate) fn legacy_password_bytes(password: &str) -> Vec<u8> {
    password.chars().map(|c| u32::from(c).min(0xFF) as u8).collect()
}
