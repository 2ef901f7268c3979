//! Configuration file for sealing runs.
//!
//! A [`SealConfig`] is plain data loaded from JSON; [`SealConfig::watermark_spec`]
//! and [`SealConfig::encryption_params`] turn it into validated pipeline inputs.
//!
//! ```
//! use pdf_seal::config::SealConfig;
//!
//! let config = SealConfig::from_json(r#"{
//!     "watermark": { "text": "Licensed to Kim", "placement": { "mode": "tiled", "pitch_x": 200, "pitch_y": 150 } },
//!     "encryption": { "user_password": "open-sesame", "algorithm": "aes-128", "permissions": { "copy": false } },
//!     "naming": { "kind": "suffix", "value": "Kim" },
//!     "batch": { "parallelism": 4 }
//! }"#)?;
//! let spec = config.watermark_spec()?;
//! let params = config.encryption_params()?;
//! assert_eq!(spec.text(), "Licensed to Kim");
//! assert!(!params.permissions.contains(pdf_seal::encryption::Permissions::COPY));
//! # Ok::<(), pdf_seal::error::Error>(())
//! ```

use crate::batch::{BatchConfig, OutputNaming};
use crate::encryption::{EncryptionAlgorithm, EncryptionParams, Permissions};
use crate::error::{Error, Result};
use crate::fonts::StandardFont;
use crate::metadata::MetadataStamp;
use crate::writer::{PageRotation, Placement, WatermarkSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a sealing run needs apart from the input list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SealConfig {
    /// Stamp settings
    pub watermark: WatermarkConfig,
    /// Password protection settings
    pub encryption: EncryptionConfig,
    /// Output path derivation
    pub naming: OutputNaming,
    /// Parallelism and overwrite policy
    pub batch: BatchConfig,
    /// `/Info` entries written before encryption
    pub metadata: Option<MetadataStamp>,
}

impl SealConfig {
    /// Parse a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Io(e.into()))
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validated watermark.
    pub fn watermark_spec(&self) -> Result<WatermarkSpec> {
        self.watermark.to_spec()
    }

    /// Validated encryption parameters.
    pub fn encryption_params(&self) -> Result<EncryptionParams> {
        let params = self.encryption.to_params()?;
        params.validate()?;
        Ok(params)
    }
}

/// Watermark section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Stamp text; required to build a watermark
    pub text: Option<String>,
    /// Standard face
    pub font: StandardFont,
    /// TrueType file to embed instead of the standard face
    pub font_file: Option<PathBuf>,
    /// Font size in points
    pub size: f64,
    /// Counter-clockwise rotation in degrees
    pub rotation: f64,
    /// Fill opacity, 0 to 1
    pub opacity: f64,
    /// RGB fill color, each 0 to 1
    pub color: [f64; 3],
    /// Layout on the page
    pub placement: Placement,
    /// Treatment of `/Rotate`
    pub page_rotation: PageRotation,
    /// First stamped page (0-based)
    pub first_page: usize,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: None,
            font: StandardFont::default(),
            font_file: None,
            size: 48.0,
            rotation: 45.0,
            opacity: 0.3,
            color: [0.5, 0.5, 0.5],
            placement: Placement::default(),
            page_rotation: PageRotation::default(),
            first_page: 0,
        }
    }
}

impl WatermarkConfig {
    fn to_spec(&self) -> Result<WatermarkSpec> {
        let text = self
            .text
            .as_deref()
            .ok_or_else(|| Error::Unrenderable("no watermark text configured".to_string()))?;
        let [r, g, b] = self.color;
        let mut builder = WatermarkSpec::builder(text)
            .with_font(self.font)
            .with_size(self.size)
            .with_rotation(self.rotation)
            .with_opacity(self.opacity)
            .with_color(r, g, b)
            .with_placement(self.placement)
            .with_page_rotation(self.page_rotation)
            .with_first_page(self.first_page);
        if let Some(path) = &self.font_file {
            builder = builder.with_font_file(path);
        }
        builder.build()
    }
}

/// Encryption section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Password needed to open outputs
    pub user_password: Option<String>,
    /// Full-access password; defaults to the user password
    pub owner_password: Option<String>,
    /// `rc4-40`, `rc4-128`, `aes-128` or `aes-256`
    pub algorithm: String,
    /// Granted permissions
    pub permissions: PermissionConfig,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            user_password: None,
            owner_password: None,
            algorithm: EncryptionAlgorithm::default().to_string(),
            permissions: PermissionConfig::default(),
        }
    }
}

impl EncryptionConfig {
    fn to_params(&self) -> Result<EncryptionParams> {
        let user = self
            .user_password
            .as_deref()
            .ok_or_else(|| Error::WeakPassword("no user password configured".to_string()))?;
        let mut params = EncryptionParams::new(user)
            .with_algorithm(self.algorithm.parse()?)
            .with_permissions(self.permissions.to_permissions());
        if let Some(owner) = &self.owner_password {
            params = params.with_owner_password(owner.clone());
        }
        Ok(params)
    }
}

/// Permission switches; everything is allowed unless turned off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionConfig {
    /// Printing
    pub print: bool,
    /// Changing content
    pub modify: bool,
    /// Copying text and graphics
    pub copy: bool,
    /// Adding annotations
    pub annotate: bool,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
        }
    }
}

impl PermissionConfig {
    /// Permission flags; switches not listed here stay granted.
    pub fn to_permissions(&self) -> Permissions {
        let mut perms = Permissions::all();
        perms.set(Permissions::PRINT | Permissions::PRINT_HIGH_QUALITY, self.print);
        perms.set(Permissions::MODIFY | Permissions::ASSEMBLE, self.modify);
        perms.set(Permissions::COPY, self.copy);
        perms.set(Permissions::ANNOTATE, self.annotate);
        perms
    }
}
