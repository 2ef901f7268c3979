//! Object streams (`/Type /ObjStm`, PDF 1.5+).
//!
//! The decoded stream starts with `/N` pairs of integers (object number, offset
//! relative to `/First`) followed by the objects themselves, without
//! `obj`/`endobj` wrappers.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;
use crate::parser_config::ParseOptions;

/// Objects in an object stream, in index order. `None` marks an object that
/// could not be parsed and was skipped.
pub type ObjectStreamContents = Vec<(u32, Option<Object>)>;

/// Extract every object in a (decrypted) object stream.
///
/// With `options.skip_invalid_objects` an unparsable member is logged and
/// skipped; otherwise it fails the whole stream.
pub fn parse_object_stream(stream: &Object, options: &ParseOptions) -> Result<ObjectStreamContents> {
    if !stream.has_type("ObjStm") {
        return Err(Error::InvalidPdf("object stream is not /Type /ObjStm".to_string()));
    }
    let dict = stream
        .as_dict()
        .ok_or_else(|| Error::InvalidPdf("object stream has no dictionary".to_string()))?;

    let int = |key: &str| dict.get(key).and_then(|o| o.as_integer());
    let n = match int("N") {
        Some(n @ 0..=1_000_000) => n as usize,
        other => return Err(Error::InvalidPdf(format!("object stream /N is {:?}", other))),
    };
    let first = match int("First") {
        Some(f) if f >= 0 => f as usize,
        other => return Err(Error::InvalidPdf(format!("object stream /First is {:?}", other))),
    };

    let data = stream.decode_stream_data(options)?;
    if data.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream holds {} bytes but /First is {}",
            data.len(),
            first
        )));
    }

    let mut header = &data[..first];
    let mut offsets = Vec::with_capacity(n);
    for i in 0..n {
        let mut pair = [0i64; 2];
        for slot in pair.iter_mut() {
            match token(header) {
                Ok((rest, Token::Integer(v))) if v >= 0 => {
                    *slot = v;
                    header = rest;
                },
                _ => {
                    return Err(Error::InvalidPdf(format!(
                        "object stream header entry {} is malformed",
                        i
                    )))
                },
            }
        }
        let id = u32::try_from(pair[0])
            .map_err(|_| Error::InvalidPdf(format!("object stream member number {} out of range", pair[0])))?;
        offsets.push((id, pair[1] as usize));
    }

    let body = &data[first..];
    let mut objects = Vec::with_capacity(n);
    for (id, offset) in offsets {
        let parsed = body
            .get(offset..)
            .ok_or_else(|| Error::InvalidPdf(format!("object {} offset {} out of range", id, offset)))
            .and_then(|input| {
                parse_object(input)
                    .map(|(_, obj)| obj)
                    .map_err(|e| crate::parser::to_parse_error(input, e, "object stream member"))
            });

        match parsed {
            Ok(obj) => objects.push((id, Some(obj))),
            Err(e) if options.skip_invalid_objects => {
                log::warn!("Skipping object {} in object stream: {}", id, e);
                objects.push((id, None));
            },
            Err(e) => return Err(e),
        }
    }

    log::debug!("Object stream yielded {} objects", objects.len());
    Ok(objects)
}
