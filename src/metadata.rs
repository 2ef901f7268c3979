//! Document information (`/Info`) stamping.

use crate::document::Document;
use crate::error::Result;
use crate::object::Object;
use serde::{Deserialize, Serialize};

/// Values written into the `/Info` dictionary before encryption.
///
/// `None` leaves an entry as it is; `Some("")` writes an empty string, which
/// is how a producer is blanked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataStamp {
    /// `/Author`
    pub author: Option<String>,
    /// `/Subject`
    pub subject: Option<String>,
    /// `/Creator`
    pub creator: Option<String>,
    /// `/Producer`
    pub producer: Option<String>,
}

impl MetadataStamp {
    /// Whether the stamp changes nothing.
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.subject.is_none() && self.creator.is_none() && self.producer.is_none()
    }

    /// Write the stamp and a fresh `/ModDate`.
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let info = doc.info_mut()?;
        let entries = [
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                info.insert(key.to_string(), Object::String(encode_text_string(value)));
            }
        }
        info.insert("ModDate".to_string(), Object::String(pdf_date(chrono::Utc::now()).into_bytes()));
        log::debug!("Stamped document information: {:?}", self);
        Ok(())
    }
}

/// Encode a PDF text string: ASCII as is, anything else as UTF-16BE with BOM.
///
/// ```
/// use pdf_seal::metadata::encode_text_string;
///
/// assert_eq!(encode_text_string("Ann"), b"Ann");
/// assert_eq!(encode_text_string("é"), vec![0xFE, 0xFF, 0x00, 0xE9]);
/// ```
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// `D:YYYYMMDDHHmmSS+00'00'`
fn pdf_date(at: chrono::DateTime<chrono::Utc>) -> String {
    format!("D:{}+00'00'", at.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_apply_sets_only_given_fields() {
        let mut doc = Document::new();
        doc.info_mut()
            .unwrap()
            .insert("Title".to_string(), Object::String(b"Kept".to_vec()));
        let stamp = MetadataStamp {
            author: Some("Kim".to_string()),
            producer: Some(String::new()),
            ..Default::default()
        };
        stamp.apply(&mut doc).unwrap();

        let info = doc.get(doc.trailer().info.unwrap()).unwrap().as_dict().unwrap();
        assert_eq!(info.get("Title").and_then(|o| o.as_string()), Some(&b"Kept"[..]));
        assert_eq!(info.get("Author").and_then(|o| o.as_string()), Some(&b"Kim"[..]));
        assert_eq!(info.get("Producer").and_then(|o| o.as_string()), Some(&b""[..]));
        assert!(!info.contains_key("Subject"));
        assert!(info.contains_key("ModDate"));
    }

    #[test]
    fn test_empty_stamp_creates_nothing() {
        let mut doc = Document::new();
        MetadataStamp::default().apply(&mut doc).unwrap();
        assert!(doc.trailer().info.is_none());
    }

    #[test]
    fn test_utf16_for_hangul() {
        assert_eq!(encode_text_string("김"), vec![0xFE, 0xFF, 0xAE, 0x40]);
    }

    #[test]
    fn test_pdf_date_format() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(pdf_date(at), "D:20240305070809+00'00'");
    }
}
