//! Fonts used for watermark text.
//!
//! Latin text references one of the standard text faces, which every
//! conforming reader provides, with WinAnsiEncoding. Text outside that
//! encoding (Hangul names, for instance) needs an embedded TrueType face.

mod encoding;
mod metrics;
mod truetype;

pub use encoding::{encode_win_ansi, win_ansi_code};
pub use metrics::FontMetrics;
pub use truetype::TrueTypeFont;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A standard 14 text face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandardFont {
    /// Sans serif
    #[default]
    Helvetica,
    /// Sans serif, bold
    HelveticaBold,
    /// Serif
    TimesRoman,
    /// Serif, bold
    TimesBold,
    /// Monospaced
    Courier,
    /// Monospaced, bold
    CourierBold,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
        }
    }

    /// Width table and vertical metrics.
    pub fn metrics(&self) -> FontMetrics {
        match self {
            Self::Helvetica => metrics::helvetica(),
            Self::HelveticaBold => metrics::helvetica_bold(),
            Self::TimesRoman => metrics::times_roman(),
            Self::TimesBold => metrics::times_bold(),
            Self::Courier => metrics::courier(false),
            Self::CourierBold => metrics::courier(true),
        }
    }

    /// Width of `text` in points at `size`.
    ///
    /// ```
    /// use pdf_seal::fonts::StandardFont;
    ///
    /// assert_eq!(StandardFont::Courier.text_width("abc", 10.0), 18.0);
    /// ```
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        self.metrics().text_width(text) * size / 1000.0
    }

    /// Simple font dictionary referencing this face.
    pub fn font_dict(&self) -> Object {
        Object::dict([
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("Type1")),
            ("BaseFont", Object::name(self.base_font())),
            ("Encoding", Object::name("WinAnsiEncoding")),
        ])
    }
}

impl fmt::Display for StandardFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_font())
    }
}

impl FromStr for StandardFont {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "helvetica" | "sans" => Ok(Self::Helvetica),
            "helveticabold" | "sansbold" => Ok(Self::HelveticaBold),
            "timesroman" | "times" | "serif" => Ok(Self::TimesRoman),
            "timesbold" | "serifbold" => Ok(Self::TimesBold),
            "courier" | "mono" => Ok(Self::Courier),
            "courierbold" | "monobold" => Ok(Self::CourierBold),
            _ => Err(Error::Unrenderable(format!("unknown standard font '{}'", s))),
        }
    }
}

/// Face a watermark is set in.
#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkFont {
    /// Standard 14 face, WinAnsiEncoding
    Standard(StandardFont),
    /// Embedded TrueType face, Identity-H
    TrueType(Arc<TrueTypeFont>),
}

impl Default for WatermarkFont {
    fn default() -> Self {
        Self::Standard(StandardFont::default())
    }
}

impl From<StandardFont> for WatermarkFont {
    fn from(font: StandardFont) -> Self {
        Self::Standard(font)
    }
}

impl WatermarkFont {
    /// Bytes to show `text` with this face.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Standard(_) => encode_win_ansi(text),
            Self::TrueType(font) => font.encode(text),
        }
    }

    /// Whether shown strings use two-byte codes.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::TrueType(_))
    }

    /// Advance of `text` in 1/1000 em.
    pub fn text_width(&self, text: &str) -> f64 {
        match self {
            Self::Standard(font) => font.metrics().text_width(text),
            Self::TrueType(font) => font.text_width(text),
        }
    }

    /// Lowest and highest extent of `text` in 1/1000 em.
    pub fn vertical_extent(&self, text: &str) -> (f64, f64) {
        match self {
            Self::Standard(font) => font.metrics().vertical_extent(text),
            Self::TrueType(font) => font.vertical_extent(text),
        }
    }

    /// Add the font dictionary (and any embedded program) for `text` to `doc`.
    pub fn add_to(&self, doc: &mut Document, text: &str) -> Result<ObjectRef> {
        match self {
            Self::Standard(font) => Ok(doc.add_object(font.font_dict())),
            Self::TrueType(font) => font.add_to(doc, text),
        }
    }
}

impl fmt::Display for WatermarkFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(font) => fmt::Display::fmt(font, f),
            Self::TrueType(font) => f.write_str(font.name()),
        }
    }
}
