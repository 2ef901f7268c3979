//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008, section 7.3.

use crate::object::{Dict, Object, ObjectRef};
use std::io::Write;

/// Serializer for PDF objects.
///
/// Dictionary keys are written in sorted order so output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Write an indirect object definition: `{id} {gen} obj\n{object}\nendobj\n`.
    pub fn write_indirect<W: Write>(&self, w: &mut W, r: ObjectRef, obj: &Object) -> std::io::Result<()> {
        writeln!(w, "{} {} obj", r.id, r.gen)?;
        self.write_object(w, obj)?;
        write!(w, "\nendobj\n")
    }

    /// Serialize an indirect object definition.
    pub fn serialize_indirect(&self, r: ObjectRef, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.write_indirect(&mut buf, r, obj);
        buf
    }

    /// Write an object to a buffer.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => self.write_string(w, s),
            Object::Name(n) => self.write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream { dict, data } => self.write_stream(w, dict, data),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    /// Write a PDF string.
    ///
    /// Uses literal string syntax `(...)` with proper escaping,
    /// or hex string syntax `<...>` for binary data.
    fn write_string<W: Write>(&self, w: &mut W, data: &[u8]) -> std::io::Result<()> {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            write!(w, "(")?;
            for &byte in data {
                match byte {
                    b'(' => write!(w, "\\(")?,
                    b')' => write!(w, "\\)")?,
                    b'\\' => write!(w, "\\\\")?,
                    b'\n' => write!(w, "\\n")?,
                    b'\r' => write!(w, "\\r")?,
                    b'\t' => write!(w, "\\t")?,
                    _ => w.write_all(&[byte])?,
                }
            }
            write!(w, ")")
        } else {
            write!(w, "<")?;
            for byte in data {
                write!(w, "{:02X}", byte)?;
            }
            write!(w, ">")
        }
    }

    /// Write a PDF name.
    ///
    /// Names are read back one byte per character, so characters up to U+00FF
    /// are written as that single byte. Wider characters fall back to their
    /// UTF-8 bytes, each `#xx`-escaped.
    fn write_name<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        let mut utf8 = [0u8; 4];
        for c in name.chars() {
            let bytes: &[u8] = match u32::from(c) {
                code @ 0..=0xFF => {
                    utf8[0] = code as u8;
                    &utf8[..1]
                },
                _ => c.encode_utf8(&mut utf8).as_bytes(),
            };
            for &byte in bytes {
                if is_regular_name_byte(byte) {
                    w.write_all(&[byte])?;
                } else {
                    write!(w, "#{:02X}", byte)?;
                }
            }
        }
        Ok(())
    }

    /// Write a PDF array.
    fn write_array<W: Write>(&self, w: &mut W, arr: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")
    }

    /// Write a PDF dictionary.
    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dict) -> std::io::Result<()> {
        write!(w, "<<")?;

        let mut keys: Vec<_> = dict.keys().collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                if self.compact {
                    write!(w, " ")?;
                } else {
                    write!(w, "\n  ")?;
                }
                self.write_name(w, key)?;
                write!(w, " ")?;
                self.write_object(w, value)?;
            }
        }

        if self.compact {
            if !dict.is_empty() {
                write!(w, " ")?;
            }
        } else if !dict.is_empty() {
            writeln!(w)?;
        }
        write!(w, ">>")
    }

    /// Write a PDF stream. `/Length` always matches the bytes written.
    fn write_stream<W: Write>(&self, w: &mut W, dict: &Dict, data: &[u8]) -> std::io::Result<()> {
        let mut dict_with_length = dict.clone();
        dict_with_length.insert("Length".to_string(), Object::Integer(data.len() as i64));

        self.write_dictionary(w, &dict_with_length)?;
        write!(w, "\nstream\n")?;
        w.write_all(data)?;
        write!(w, "\nendstream")
    }
}

fn is_regular_name_byte(byte: u8) -> bool {
    matches!(byte,
        b'!'
        | b'"'
        | b'$'..=b'&'
        | b'\''
        | b'*'..=b'.'
        | b'0'..=b'9'
        | b';'
        | b'='
        | b'?'
        | b'@'
        | b'A'..=b'Z'
        | b'\\'
        | b'^'..=b'z'
        | b'|'
        | b'~'
        | 0xA1..=0xFF)
}

/// Write a real number with at most 5 decimals and no trailing zeros.
pub(crate) fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
    if !value.is_finite() {
        return write!(w, "0");
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return write!(w, "{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => write!(w, "0"),
        t => write!(w, "{}", t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    #[test]
    fn test_serialize_scalars() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Null), "null");
        assert_eq!(s.serialize_to_string(&Object::Boolean(true)), "true");
        assert_eq!(s.serialize_to_string(&Object::Integer(-123)), "-123");
    }

    #[test]
    fn test_serialize_real() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::Real(3.14258)), "3.14258");
        assert_eq!(s.serialize_to_string(&Object::Real(1.0)), "1");
        assert_eq!(s.serialize_to_string(&Object::Real(0.5)), "0.5");
        assert_eq!(s.serialize_to_string(&Object::Real(-0.000001)), "0");
        assert_eq!(s.serialize_to_string(&Object::Real(f64::NAN)), "0");
    }

    #[test]
    fn test_serialize_string() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::String(b"Hello".to_vec())), "(Hello)");
        assert_eq!(
            s.serialize_to_string(&Object::String(b"Test (parens)".to_vec())),
            "(Test \\(parens\\))"
        );
        assert_eq!(s.serialize_to_string(&Object::String(vec![0x00, 0xFF, 0x80])), "<00FF80>");
    }

    #[test]
    fn test_serialize_name_with_special_chars() {
        let s = ObjectSerializer::new();
        assert_eq!(s.serialize_to_string(&Object::name("Type")), "/Type");
        assert_eq!(s.serialize_to_string(&Object::name("Name With Space")), "/Name#20With#20Space");
        assert_eq!(s.serialize_to_string(&Object::name("a/b#c")), "/a#2Fb#23c");
    }

    #[test]
    fn test_latin1_name_reads_back() {
        let s = ObjectSerializer::compact();
        let name = Object::name("Caf\u{e9}");
        let bytes = s.serialize(&name);
        assert_eq!(bytes, b"/Caf\xe9");
        let (_, parsed) = parse_object(&bytes).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_serialize_dictionary() {
        let s = ObjectSerializer::compact();
        let dict = Object::dict([("Type", Object::name("Page")), ("Count", Object::Integer(1))]);
        assert_eq!(s.serialize_to_string(&dict), "<< /Count 1 /Type /Page >>");
    }

    #[test]
    fn test_serialize_indirect() {
        let s = ObjectSerializer::new();
        let bytes = s.serialize_indirect(ObjectRef::new(1, 0), &Object::Integer(42));
        assert_eq!(bytes, b"1 0 obj\n42\nendobj\n");
    }

    #[test]
    fn test_stream_length_is_corrected() {
        let s = ObjectSerializer::compact();
        let stream = Object::Stream {
            dict: [("Length".to_string(), Object::Integer(999))].into_iter().collect(),
            data: bytes::Bytes::from_static(b"stream data"),
        };
        let result = s.serialize_to_string(&stream);
        assert!(result.contains("/Length 11"));
        assert!(result.ends_with("stream\nstream data\nendstream"));
    }

    #[test]
    fn test_nested_objects_parse_back() {
        let s = ObjectSerializer::new();
        let obj = Object::dict([
            ("Kids", Object::Array(vec![Object::Reference(ObjectRef::new(3, 0)), Object::Real(1.25)])),
            ("Title", Object::String(b"x(y)\\z".to_vec())),
        ]);
        let bytes = s.serialize(&obj);
        let (_, parsed) = parse_object(&bytes).unwrap();
        assert_eq!(parsed, obj);
    }
}
