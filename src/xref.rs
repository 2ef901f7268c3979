//! Cross-reference data.
//!
//! Reads classic `xref` tables and cross-reference streams (PDF 1.5+), follows
//! `/Prev` links of incremental updates, and merges hybrid-file `/XRefStm`
//! sections. Newer sections take precedence over older ones.

use crate::error::{Error, Result};
use crate::lexer::{is_pdf_whitespace, token, Token};
use crate::object::{Dict, Object};
use crate::parser::{parse_indirect_object, parse_object};
use crate::parser_config::ParseOptions;
use byteorder::{BigEndian, ByteOrder};
use std::collections::{BTreeMap, HashSet};

/// How far back from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 2048;

/// Upper bound on entries in one subsection.
const MAX_SUBSECTION: u32 = 8_388_607;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Unused object number
    Free,
    /// Indirect object stored at a byte offset
    InFile {
        /// Byte offset of `N G obj`
        offset: usize,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    InStream {
        /// Object number of the `/ObjStm`
        stream_id: u32,
        /// Index of the object within the stream
        index: u32,
    },
}

/// Merged cross-reference information for a whole file.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dict,
}

impl CrossRefTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, id: u32, entry: XRefEntry) {
        self.entries.insert(id, entry);
    }

    /// Look up one object number.
    pub fn get(&self, id: u32) -> Option<&XRefEntry> {
        self.entries.get(&id)
    }

    /// All entries in ascending object number order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, XRefEntry)> + '_ {
        self.entries.iter().map(|(id, e)| (*id, *e))
    }

    /// The newest trailer dictionary (for xref streams, the stream dictionary).
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Replace the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dict) {
        self.trailer = trailer;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold in an older section: existing entries win, missing trailer keys are
    /// inherited.
    pub fn merge_older(&mut self, older: CrossRefTable) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
        for (key, value) in older.trailer {
            if key != "Prev" && key != "XRefStm" {
                self.trailer.entry(key).or_insert(value);
            }
        }
    }
}

/// Locate the offset named by the last `startxref` keyword.
pub fn find_xref_offset(data: &[u8]) -> Result<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let tail = &data[window_start..];

    let pos = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or_else(|| Error::InvalidXref("startxref not found".to_string()))?;

    match token(&tail[pos + b"startxref".len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as usize)
        },
        _ => Err(Error::InvalidXref("startxref is not followed by a valid offset".to_string())),
    }
}

/// Parse the cross-reference section at `offset` and every older section it links
/// to.
pub fn parse_xref(data: &[u8], offset: usize, options: &ParseOptions) -> Result<CrossRefTable> {
    let mut visited = HashSet::new();
    let mut next = Some(offset);
    let mut merged: Option<CrossRefTable> = None;

    while let Some(offset) = next {
        if !visited.insert(offset) {
            log::warn!("xref /Prev chain loops back to offset {}", offset);
            break;
        }
        if visited.len() > options.max_nesting {
            return Err(Error::InvalidXref(format!(
                "more than {} chained xref sections",
                options.max_nesting
            )));
        }

        let section = parse_section(data, offset, options)?;
        next = section
            .trailer()
            .get("Prev")
            .and_then(|p| p.as_integer())
            .filter(|&p| p >= 0)
            .map(|p| p as usize);

        merged = Some(match merged {
            None => section,
            Some(mut newer) => {
                newer.merge_older(section);
                newer
            },
        });
    }

    merged.ok_or_else(|| Error::InvalidXref("no cross-reference section".to_string()))
}

/// One section: a classic table (plus its hybrid `/XRefStm`) or an xref stream.
fn parse_section(data: &[u8], offset: usize, options: &ParseOptions) -> Result<CrossRefTable> {
    let at = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidXref(format!("offset {} is past end of file", offset)))?;
    let start = at.iter().position(|&c| !is_pdf_whitespace(c)).unwrap_or(at.len());
    let at = &at[start..];

    if at.starts_with(b"xref") {
        log::debug!("Classic xref table at offset {}", offset);
        let mut table = parse_classic_table(&at[4..])?;

        if let Some(stm_offset) = table.trailer().get("XRefStm").and_then(|o| o.as_integer()) {
            log::debug!("Hybrid file: /XRefStm at {}", stm_offset);
            let stream_table = parse_xref_stream(data, stm_offset.max(0) as usize, options)?;
            for (id, entry) in stream_table.entries() {
                if matches!(table.get(id), None | Some(XRefEntry::Free)) {
                    table.insert(id, entry);
                }
            }
        }
        Ok(table)
    } else if at.first().is_some_and(|c| c.is_ascii_digit()) {
        log::debug!("Cross-reference stream at offset {}", offset);
        parse_xref_stream(data, offset + start, options)
    } else {
        Err(Error::InvalidXref(format!(
            "offset {} points at neither a table nor a stream",
            offset
        )))
    }
}

/// Byte cursor for the fixed-format classic table.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.data.len() && is_pdf_whitespace(self.data[self.pos]) {
            self.pos += 1;
        }
    }

    fn peek_keyword(&mut self, kw: &[u8]) -> bool {
        self.skip_ws();
        self.data[self.pos..].starts_with(kw)
    }

    fn number(&mut self) -> Option<u64> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.data[start..self.pos]).ok()?.parse().ok()
    }

    fn flag(&mut self) -> Option<u8> {
        self.skip_ws();
        let c = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(c)
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

fn parse_classic_table(body: &[u8]) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut cur = Cursor { data: body, pos: 0 };

    while !cur.peek_keyword(b"trailer") {
        let first = cur
            .number()
            .ok_or_else(|| Error::InvalidXref("bad subsection header".to_string()))?;
        let count = cur
            .number()
            .ok_or_else(|| Error::InvalidXref("bad subsection count".to_string()))?;
        if count > u64::from(MAX_SUBSECTION) {
            return Err(Error::InvalidXref(format!("subsection of {} entries", count)));
        }

        for i in 0..count {
            let (offset, gen, flag) = match (cur.number(), cur.number(), cur.flag()) {
                (Some(o), Some(g), Some(f)) => (o, g, f),
                _ => {
                    return Err(Error::InvalidXref(format!(
                        "malformed entry {} of subsection {}",
                        i, first
                    )))
                },
            };
            let id = first
                .checked_add(i)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| Error::InvalidXref(format!("object number {} + {} out of range", first, i)))?;
            let entry = match flag {
                b'n' if offset > 0 => XRefEntry::InFile {
                    offset: offset as usize,
                    gen: gen.min(u64::from(u16::MAX)) as u16,
                },
                b'n' | b'f' => XRefEntry::Free,
                other => {
                    return Err(Error::InvalidXref(format!(
                        "entry {} has type flag '{}'",
                        id, other as char
                    )))
                },
            };
            table.insert(id, entry);
        }
    }

    let after_trailer = &cur.rest()[b"trailer".len()..];
    let (_, trailer) = parse_object(after_trailer)
        .map_err(|e| crate::parser::to_parse_error(after_trailer, e, "trailer dictionary"))?;
    match trailer {
        Object::Dictionary(dict) => table.set_trailer(dict),
        other => {
            return Err(Error::InvalidXref(format!(
                "trailer is a {}, not a dictionary",
                other.type_name()
            )))
        },
    }

    Ok(table)
}

fn width(w: &[Object], i: usize) -> Result<usize> {
    match w.get(i).and_then(|o| o.as_integer()) {
        Some(n @ 0..=8) => Ok(n as usize),
        _ => Err(Error::InvalidXref(format!("/W[{}] must be an integer in 0..=8", i))),
    }
}

fn read_field(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        0
    } else {
        BigEndian::read_uint(bytes, bytes.len())
    }
}

/// One `/Index` pair as object numbers; the last number must fit in `u32`.
fn index_range(start: i64, count: i64) -> Result<(u32, u32)> {
    let bad = || Error::InvalidXref(format!("/Index range [{} {}] out of bounds", start, count));
    let first = u32::try_from(start).map_err(|_| bad())?;
    let len = u32::try_from(count).map_err(|_| bad())?;
    if len > 0 {
        first.checked_add(len - 1).ok_or_else(bad)?;
    }
    if len > MAX_SUBSECTION {
        return Err(bad());
    }
    Ok((first, len))
}

/// Parse the `/Type /XRef` stream object at `offset`.
pub fn parse_xref_stream(data: &[u8], offset: usize, options: &ParseOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidXref(format!("xref stream offset {} out of range", offset)))?;
    let (_, (_, obj)) = parse_indirect_object(input)
        .map_err(|e| crate::parser::to_parse_error(input, e, "cross-reference stream"))?;

    if !obj.has_type("XRef") {
        return Err(Error::InvalidXref(format!("object at {} is not /Type /XRef", offset)));
    }
    let dict = obj
        .as_dict()
        .cloned()
        .ok_or_else(|| Error::InvalidXref("xref stream has no dictionary".to_string()))?;

    let w = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or_else(|| Error::InvalidXref("missing /W array".to_string()))?;
    let (w1, w2, w3) = (width(w, 0)?, width(w, 1)?, width(w, 2)?);
    let entry_size = w1 + w2 + w3;
    if entry_size == 0 {
        return Err(Error::InvalidXref("/W widths are all zero".to_string()));
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::InvalidXref("missing /Size".to_string()))?;

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| match pair {
                [start, count] => Some((start.as_integer()?, count.as_integer()?)),
                _ => None,
            })
            .map(|(start, count)| index_range(start, count))
            .collect::<Result<_>>()?,
        None => vec![index_range(0, size)?],
    };

    let decoded = obj.decode_stream_data(options)?;

    let mut table = CrossRefTable::new();
    let mut rows = decoded.chunks_exact(entry_size);
    for (start, count) in ranges {
        for i in 0..count {
            let row = match rows.next() {
                Some(row) => row,
                None => {
                    log::warn!("xref stream data ends before entry {}", start + i);
                    break;
                },
            };
            let kind = if w1 == 0 { 1 } else { read_field(&row[..w1]) };
            let f2 = read_field(&row[w1..w1 + w2]);
            let f3 = read_field(&row[w1 + w2..]);

            let entry = match kind {
                0 => XRefEntry::Free,
                1 => XRefEntry::InFile {
                    offset: f2 as usize,
                    gen: f3.min(u64::from(u16::MAX)) as u16,
                },
                2 => match (u32::try_from(f2), u32::try_from(f3)) {
                    (Ok(stream_id), Ok(index)) => XRefEntry::InStream { stream_id, index },
                    _ => {
                        return Err(Error::InvalidXref(format!(
                            "compressed entry {} points at stream {} index {}",
                            start + i,
                            f2,
                            f3
                        )))
                    },
                },
                other => {
                    log::debug!("Ignoring xref stream entry of type {}", other);
                    continue;
                },
            };
            table.insert(start + i, entry);
        }
    }

    table.set_trailer(dict);
    Ok(table)
}
