//! PDF object parser.
//!
//! Recursive descent over lexer tokens: reads primitives, arrays, dictionaries,
//! indirect references (`10 0 R`), streams, and whole indirect objects
//! (`10 0 obj ... endobj`).

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dict, Object, ObjectRef};
use nom::IResult;

/// Nesting limit for arrays and dictionaries.
const MAX_NESTING: usize = 100;

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode escape sequences in a raw literal string.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd`, and line continuations.
/// Unknown escapes drop the backslash.
///
/// ```
/// # use pdf_seal::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247 1"), b"Section \xa7 1");
/// assert_eq!(decode_literal_string_escapes(b"a\\\nb"), b"ab");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 >= raw.len() {
            out.push(c);
            i += 1;
            continue;
        }

        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut code = u32::from(next - b'0');
                for _ in 0..2 {
                    match raw.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            i += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

/// Decode the body of a hex string. Whitespace is ignored and an odd trailing
/// digit is padded with 0.
///
/// ```
/// # use pdf_seal::parser::decode_hex;
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let nibble = |c: u8| -> Result<u8> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| Error::ParseError {
                offset: 0,
                reason: format!("Invalid hex digit '{}'", c as char),
            })
    };

    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0])?;
            let lo = match pair.get(1) {
                Some(&c) => nibble(c)?,
                None => 0,
            };
            Ok((hi << 4) | lo)
        })
        .collect()
}

/// Parse one PDF object.
///
/// ```
/// use pdf_seal::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /Page /Kids [ 3 0 R ] >>").unwrap();
/// assert!(obj.has_type("Page"));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_at_depth(input, 0)
}

fn parse_object_at_depth(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Integer(id) => {
            // "id gen R" is a reference; otherwise a plain integer
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if let (Ok(id), true) = (u32::try_from(id), (0..=i64::from(u16::MAX)).contains(&gen)) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(id, gen as u16))));
                    }
                }
            }
            Ok((rest, Object::Integer(id)))
        },
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::String(bytes))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => parse_array(rest, depth),
        Token::DictStart => {
            let (rest, dict) = parse_dictionary(rest, depth)?;
            match token(rest) {
                Ok((after_kw, Token::StreamStart)) => {
                    let length = dict.get("Length").and_then(|l| l.as_integer());
                    let (rest, data) = parse_stream_data(after_kw, length)?;
                    Ok((
                        rest,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::from(data),
                        },
                    ))
                },
                _ => Ok((rest, Object::Dictionary(dict))),
            }
        },
        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

fn parse_array(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(remaining) {
            return Ok((rest, Object::Array(items)));
        }
        let (rest, item) = parse_object_at_depth(remaining, depth + 1)?;
        items.push(item);
        remaining = rest;
    }
}

fn parse_dictionary(input: &[u8], depth: usize) -> IResult<&[u8], Dict> {
    let mut dict = Dict::new();
    let mut remaining = input;

    loop {
        let (rest, tok) = token(remaining)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_object_at_depth(rest, depth + 1)?;
                // A null value is equivalent to an absent key
                if !value.is_null() {
                    dict.insert(key, value);
                }
                remaining = rest;
            },
            _ => return Err(fail(remaining, nom::error::ErrorKind::Tag)),
        }
    }
}

/// Read stream bytes following the `stream` keyword.
///
/// A known `length` is trusted when it lands on `endstream`; otherwise the data
/// runs up to the next `endstream` keyword minus its preceding end-of-line.
fn parse_stream_data(input: &[u8], length: Option<i64>) -> IResult<&[u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        log::warn!("No end-of-line after stream keyword");
        input
    };

    if let Some(length) = length {
        let length = length.max(0) as usize;
        if length <= input.len() {
            let after = &input[length..];
            if let Ok((rest, Token::StreamEnd)) = token(after) {
                return Ok((rest, input[..length].to_vec()));
            }
            log::debug!("Stream /Length {} does not reach endstream, scanning", length);
        }
    }

    let pos = find_keyword(input, b"endstream").ok_or_else(|| fail(input, nom::error::ErrorKind::Eof))?;
    let mut end = pos;
    if end > 0 && input[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && input[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((&input[pos + b"endstream".len()..], input[..end].to_vec()))
}

/// Find the first occurrence of `keyword` in `haystack`.
pub fn find_keyword(haystack: &[u8], keyword: &[u8]) -> Option<usize> {
    if keyword.is_empty() || haystack.len() < keyword.len() {
        return None;
    }
    haystack.windows(keyword.len()).position(|w| w == keyword)
}

/// Parse an indirect object `N G obj <object> endobj`.
///
/// A missing `endobj` is tolerated.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, r) = indirect_header(input)?;
    let (rest, object) = parse_object(rest)?;
    Ok((skip_endobj(rest, r), (r, object)))
}

/// Parse an indirect stream object whose `/Length` is an indirect reference
/// already resolved to `length`.
pub fn parse_indirect_stream(input: &[u8], length: i64) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, r) = indirect_header(input)?;
    let rest = match token(rest)? {
        (rest, Token::DictStart) => rest,
        _ => return Err(fail(rest, nom::error::ErrorKind::Tag)),
    };
    let (rest, dict) = parse_dictionary(rest, 0)?;
    let rest = match token(rest)? {
        (rest, Token::StreamStart) => rest,
        _ => return Err(fail(rest, nom::error::ErrorKind::Tag)),
    };
    let (rest, data) = parse_stream_data(rest, Some(length))?;
    let object = Object::Stream {
        dict,
        data: bytes::Bytes::from(data),
    };
    Ok((skip_endobj(rest, r), (r, object)))
}

/// `N G obj`
fn indirect_header(input: &[u8]) -> IResult<&[u8], ObjectRef> {
    let (rest, id) = match token(input)? {
        (rest, Token::Integer(id)) => match u32::try_from(id) {
            Ok(id) => (rest, id),
            Err(_) => return Err(fail(input, nom::error::ErrorKind::Digit)),
        },
        _ => return Err(fail(input, nom::error::ErrorKind::Digit)),
    };
    let (rest, gen) = match token(rest)? {
        (rest, Token::Integer(gen)) if (0..=i64::from(u16::MAX)).contains(&gen) => (rest, gen as u16),
        _ => return Err(fail(rest, nom::error::ErrorKind::Digit)),
    };
    match token(rest)? {
        (rest, Token::ObjStart) => Ok((rest, ObjectRef::new(id, gen))),
        _ => Err(fail(rest, nom::error::ErrorKind::Tag)),
    }
}

fn skip_endobj(rest: &[u8], r: ObjectRef) -> &[u8] {
    match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => {
            log::debug!("Object {} has no endobj", r);
            skip_ws(rest).map_or(rest, |(after, _)| after)
        },
    }
}

/// Convert a nom error into a crate error, computing the byte offset relative to
/// `base`.
pub fn to_parse_error(base: &[u8], err: nom::Err<nom::error::Error<&[u8]>>, what: &str) -> Error {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = base.len().saturating_sub(e.input.len());
            Error::ParseError {
                offset,
                reason: format!("{} ({:?})", what, e.code),
            }
        },
        nom::Err::Incomplete(_) => Error::UnexpectedEof,
    }
}
