//! PDF document writer.
//!
//! Writes a [`Document`] as a complete file: header, body, classic xref table
//! and trailer. Only objects reachable from the trailer are written, in
//! ascending object number order.

use super::object_serializer::ObjectSerializer;
use crate::decoders::encode_flate;
use crate::document::Document;
use crate::error::Result;
use crate::object::{Object, ObjectRef};
use std::collections::BTreeSet;
use std::io::Write;

/// Serialize `doc`, encrypting when it carries an encryption state.
pub fn write_document(doc: &Document) -> Result<Vec<u8>> {
    PdfWriter::new(doc).finish()
}

/// Single-use writer for one document.
pub struct PdfWriter<'a> {
    doc: &'a Document,
    serializer: ObjectSerializer,
}

impl<'a> PdfWriter<'a> {
    /// Writer for `doc`.
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            serializer: ObjectSerializer::compact(),
        }
    }

    /// Objects reachable from the trailer.
    fn reachable(&self) -> BTreeSet<ObjectRef> {
        let trailer = self.doc.trailer();
        let mut pending: Vec<ObjectRef> = [Some(trailer.root), trailer.info, trailer.encrypt]
            .into_iter()
            .flatten()
            .collect();
        let mut seen = BTreeSet::new();
        while let Some(r) = pending.pop() {
            if !seen.insert(r) {
                continue;
            }
            match self.doc.get(r) {
                Some(obj) => obj.collect_references(&mut pending),
                None => log::debug!("Dangling reference {} is written as-is", r),
            }
        }
        seen.retain(|r| self.doc.get(*r).is_some());
        seen
    }

    /// The object as it will be written: new streams compressed, then encrypted.
    fn prepare(&self, r: ObjectRef, obj: &Object) -> Result<Object> {
        let mut out = match obj {
            Object::Stream { dict, data }
                if self.doc.serialize_options().compress_new_streams
                    && self.doc.is_fresh(r)
                    && !dict.contains_key("Filter") =>
            {
                let mut dict = dict.clone();
                dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                dict.remove("DecodeParms");
                Object::Stream {
                    dict,
                    data: bytes::Bytes::from(encode_flate(data)?),
                }
            },
            other => other.clone(),
        };
        if let Some(state) = self.doc.encryption() {
            out = state.encrypt_object(r, &out)?;
        }
        Ok(out)
    }

    /// Build the complete PDF file.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", self.doc.version())?;
        // Binary marker so transfer tools treat the file as binary
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let refs = self.reachable();
        let mut offsets: Vec<(ObjectRef, usize)> = Vec::with_capacity(refs.len());
        for r in &refs {
            let Some(obj) = self.doc.get(*r) else {
                continue;
            };
            let prepared = self.prepare(*r, obj)?;
            offsets.push((*r, output.len()));
            self.serializer.write_indirect(&mut output, *r, &prepared)?;
        }

        let size = offsets.last().map_or(1, |(r, _)| r.id + 1);
        let xref_offset = output.len();
        write_xref_table(&mut output, &offsets, size)?;
        self.write_trailer(&mut output, size)?;
        write!(output, "startxref\n{}\n%%EOF\n", xref_offset)?;

        log::debug!(
            "Wrote {} objects ({} bytes){}",
            offsets.len(),
            output.len(),
            if self.doc.encryption().is_some() { ", encrypted" } else { "" }
        );
        Ok(output)
    }

    fn write_trailer<W: Write>(&self, w: &mut W, size: u32) -> std::io::Result<()> {
        let trailer = self.doc.trailer();
        let mut dict = crate::object::Dict::new();
        dict.insert("Size".to_string(), Object::Integer(i64::from(size)));
        dict.insert("Root".to_string(), Object::Reference(trailer.root));
        if let Some(info) = trailer.info.filter(|r| self.doc.get(*r).is_some()) {
            dict.insert("Info".to_string(), Object::Reference(info));
        }
        if let Some((first, second)) = &trailer.id {
            dict.insert(
                "ID".to_string(),
                Object::Array(vec![Object::String(first.clone()), Object::String(second.clone())]),
            );
        }
        if let (Some(encrypt), Some(_)) = (trailer.encrypt, self.doc.encryption()) {
            dict.insert("Encrypt".to_string(), Object::Reference(encrypt));
        }
        writeln!(w, "trailer")?;
        self.serializer.write_object(w, &Object::Dictionary(dict))?;
        writeln!(w)
    }
}

/// One subsection covering `0..size`; unused numbers are free entries.
fn write_xref_table<W: Write>(w: &mut W, offsets: &[(ObjectRef, usize)], size: u32) -> std::io::Result<()> {
    write!(w, "xref\n0 {}\n", size)?;
    let mut entries = offsets.iter().peekable();
    for id in 0..size {
        match entries.peek() {
            Some((r, offset)) if r.id == id => {
                write!(w, "{:010} {:05} n\r\n", offset, r.gen)?;
                entries.next();
            },
            _ => write!(w, "{:010} {:05} f\r\n", 0, 65535)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::parser_config::ParseOptions;

    #[test]
    fn test_output_structure() {
        let mut doc = Document::new();
        doc.add_page(Rect::new(0.0, 0.0, 100.0, 100.0), b"0 0 m").unwrap();
        let bytes = write_document(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("xref\n0 5\n0000000000 65535 f\r\n"));
    }

    #[test]
    fn test_unreachable_objects_dropped() {
        let mut doc = Document::new();
        let orphan = doc.add_object(Object::String(b"orphan".to_vec()));
        let bytes = write_document(&doc).unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("orphan"));
        let reparsed = Document::parse(&bytes, &ParseOptions::default()).unwrap();
        assert!(reparsed.get(orphan).is_none());
    }

    #[test]
    fn test_fresh_streams_compressed_on_request() {
        let mut doc = Document::new();
        let page = doc.add_page(Rect::new(0.0, 0.0, 100.0, 100.0), b"BT ET").unwrap();
        let content = doc.page(0).unwrap().content_refs()[0];

        let compressed = write_document(&doc).unwrap();
        let reparsed = Document::parse(&compressed, &ParseOptions::default()).unwrap();
        let stream = reparsed.get(content).unwrap().as_dict().unwrap();
        assert_eq!(stream.get("Filter").and_then(|f| f.as_name()), Some("FlateDecode"));
        assert_eq!(reparsed.decoded_stream(content).unwrap(), b"BT ET");

        doc.set_serialize_options(crate::document::SerializeOptions {
            compress_new_streams: false,
        });
        let plain = write_document(&doc).unwrap();
        assert!(String::from_utf8_lossy(&plain).contains("stream\nBT ET\nendstream"));
        assert_eq!(reparsed.page_refs(), &[page]);
    }
}
