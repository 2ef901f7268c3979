//! TrueType faces embedded for text outside WinAnsiEncoding.
//!
//! The font program is embedded whole as `/FontFile2` under a Type0 font with
//! `Identity-H` encoding, so every code in a shown string is a glyph id.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::Path;
use ttf_parser::{Face, GlyphId};

/// Width used for glyphs without a horizontal metric.
const DEFAULT_WIDTH: f64 = 1000.0;

/// Mappings per `beginbfchar` block.
const BFCHAR_CHUNK: usize = 100;

/// A parsed TrueType/OpenType face, with metrics in 1/1000 em.
#[derive(Clone, PartialEq)]
pub struct TrueTypeFont {
    name: String,
    data: bytes::Bytes,
    glyphs: HashMap<char, u16>,
    widths: HashMap<u16, f64>,
    heights: HashMap<u16, (f64, f64)>,
    ascender: f64,
    descender: f64,
    cap_height: f64,
    bbox: [f64; 4],
    flags: u32,
    stem_v: i64,
    italic: bool,
}

impl TrueTypeFont {
    /// Parse raw TTF/OTF data. `name` defaults to the face's PostScript name.
    pub fn from_data(name: Option<String>, data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Unrenderable("font file is empty".to_string()));
        }
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::Unrenderable(format!("failed to parse font: {}", e)))?;

        let units = f64::from(face.units_per_em());
        let scale = |v: i16| f64::from(v) * 1000.0 / units;

        let mut glyphs = HashMap::new();
        for codepoint in 0..=0xFFFF_u32 {
            if let Some(c) = char::from_u32(codepoint) {
                if let Some(gid) = face.glyph_index(c) {
                    glyphs.insert(c, gid.0);
                }
            }
        }

        let mut widths = HashMap::new();
        let mut heights = HashMap::new();
        for gid in 0..face.number_of_glyphs() {
            let glyph = GlyphId(gid);
            if let Some(advance) = face.glyph_hor_advance(glyph) {
                widths.insert(gid, f64::from(advance) * 1000.0 / units);
            }
            if let Some(bb) = face.glyph_bounding_box(glyph) {
                heights.insert(gid, (scale(bb.y_min), scale(bb.y_max)));
            }
        }

        let name = name
            .or_else(|| postscript_name(&face))
            .map(|n| sanitize_name(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        let bb = face.global_bounding_box();
        let mut flags = 1 << 2; // symbolic: glyphs are addressed by id
        if face.is_monospaced() {
            flags |= 1;
        }
        if face.is_italic() {
            flags |= 1 << 6;
        }

        log::debug!("Loaded font {} with {} mapped characters", name, glyphs.len());
        Ok(Self {
            name,
            glyphs,
            widths,
            heights,
            ascender: scale(face.ascender()),
            descender: scale(face.descender()),
            cap_height: scale(face.capital_height().unwrap_or_else(|| face.ascender())),
            bbox: [scale(bb.x_min), scale(bb.y_min), scale(bb.x_max), scale(bb.y_max)],
            flags,
            stem_v: if face.is_bold() { 140 } else { 80 },
            italic: face.is_italic(),
            data: bytes::Bytes::from(data),
        })
    }

    /// Read and parse a font file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            Error::Unrenderable(format!("cannot read font file {}: {}", path.display(), e))
        })?;
        Self::from_data(None, data)
    }

    /// Name used as `/BaseFont`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Glyph id mapped to `c`.
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.glyphs.get(&c).copied()
    }

    /// Advance of a glyph in 1/1000 em.
    pub fn glyph_width(&self, gid: u16) -> f64 {
        self.widths.get(&gid).copied().unwrap_or(DEFAULT_WIDTH)
    }

    /// Advance of `text` in 1/1000 em. Unmapped characters count as `.notdef`.
    pub fn text_width(&self, text: &str) -> f64 {
        text.chars()
            .map(|c| self.glyph_width(self.glyph_id(c).unwrap_or(0)))
            .sum()
    }

    /// Typographic ascender in 1/1000 em.
    pub fn ascender(&self) -> f64 {
        self.ascender
    }

    /// Typographic descender in 1/1000 em (negative).
    pub fn descender(&self) -> f64 {
        self.descender
    }

    /// Lowest and highest extent of the glyphs in `text`, never inside the
    /// typographic descender and ascender.
    pub fn vertical_extent(&self, text: &str) -> (f64, f64) {
        text.chars()
            .filter_map(|c| self.glyph_id(c))
            .filter_map(|gid| self.heights.get(&gid))
            .fold((self.descender, self.ascender), |(lo, hi), &(y_min, y_max)| {
                (lo.min(y_min), hi.max(y_max))
            })
    }

    /// Two-byte glyph ids for `text`; every character must have a glyph.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let gid = self.glyph_id(c).ok_or_else(|| {
                Error::Unrenderable(format!(
                    "font {} has no glyph for '{}' (U+{:04X})",
                    self.name, c, c as u32
                ))
            })?;
            out.extend_from_slice(&gid.to_be_bytes());
        }
        Ok(out)
    }

    /// Add the Type0 font and its descendants for showing `text`.
    pub fn add_to(&self, doc: &mut Document, text: &str) -> Result<ObjectRef> {
        let used = self.used_glyphs(text)?;

        let mut file_dict = Dict::new();
        file_dict.insert("Length1".to_string(), Object::Integer(self.data.len() as i64));
        let file_ref = doc.add_object(Object::Stream {
            dict: file_dict,
            data: self.data.clone(),
        });

        let [llx, lly, urx, ury] = self.bbox;
        let descriptor_ref = doc.add_object(Object::dict([
            ("Type", Object::name("FontDescriptor")),
            ("FontName", Object::name(self.name.clone())),
            ("Flags", Object::Integer(i64::from(self.flags))),
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(llx.round() as i64),
                    Object::Integer(lly.round() as i64),
                    Object::Integer(urx.round() as i64),
                    Object::Integer(ury.round() as i64),
                ]),
            ),
            ("ItalicAngle", Object::Integer(if self.italic { -12 } else { 0 })),
            ("Ascent", Object::Integer(self.ascender.round() as i64)),
            ("Descent", Object::Integer(self.descender.round() as i64)),
            ("CapHeight", Object::Integer(self.cap_height.round() as i64)),
            ("StemV", Object::Integer(self.stem_v)),
            ("FontFile2", Object::Reference(file_ref)),
        ]));

        let cid_ref = doc.add_object(Object::dict([
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("CIDFontType2")),
            ("BaseFont", Object::name(self.name.clone())),
            (
                "CIDSystemInfo",
                Object::dict([
                    ("Registry", Object::String(b"Adobe".to_vec())),
                    ("Ordering", Object::String(b"Identity".to_vec())),
                    ("Supplement", Object::Integer(0)),
                ]),
            ),
            ("FontDescriptor", Object::Reference(descriptor_ref)),
            ("DW", Object::Integer(DEFAULT_WIDTH as i64)),
            ("W", self.widths_array(&used)),
            ("CIDToGIDMap", Object::name("Identity")),
        ]));

        let cmap_ref = doc.add_object(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from(to_unicode_cmap(&used)?),
        });

        Ok(doc.add_object(Object::dict([
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("Type0")),
            ("BaseFont", Object::name(self.name.clone())),
            ("Encoding", Object::name("Identity-H")),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_ref)])),
            ("ToUnicode", Object::Reference(cmap_ref)),
        ])))
    }

    fn used_glyphs(&self, text: &str) -> Result<BTreeMap<u16, char>> {
        let mut used = BTreeMap::new();
        for c in text.chars() {
            let gid = self
                .glyph_id(c)
                .ok_or_else(|| Error::Unrenderable(format!("font {} has no glyph for '{}'", self.name, c)))?;
            used.entry(gid).or_insert(c);
        }
        Ok(used)
    }

    /// `/W` array grouping consecutive glyph ids: `[first [w1 w2 ...] ...]`.
    fn widths_array(&self, used: &BTreeMap<u16, char>) -> Object {
        let mut out = Vec::new();
        let mut run: Vec<Object> = Vec::new();
        let mut start: Option<u16> = None;
        let mut prev = 0u16;
        for &gid in used.keys() {
            if start.is_some() && prev.checked_add(1) != Some(gid) {
                out.push(Object::Integer(i64::from(start.unwrap_or(prev))));
                out.push(Object::Array(std::mem::take(&mut run)));
                start = None;
            }
            start.get_or_insert(gid);
            run.push(Object::Integer(self.glyph_width(gid).round() as i64));
            prev = gid;
        }
        if let Some(first) = start {
            out.push(Object::Integer(i64::from(first)));
            out.push(Object::Array(run));
        }
        Object::Array(out)
    }
}

impl fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("glyphs", &self.glyphs.len())
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn postscript_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .and_then(|name| name.to_string())
}

/// Keep only characters allowed unescaped in a PDF name.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect()
}

/// ToUnicode CMap mapping each used glyph id back to its character.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Result<Vec<u8>> {
    let mut cmap = Vec::new();
    cmap.write_all(
        b"/CIDInit /ProcSet findresource begin\n\
          12 dict begin\n\
          begincmap\n\
          /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
          /CMapName /Adobe-Identity-UCS def\n\
          /CMapType 2 def\n\
          1 begincodespacerange\n\
          <0000> <FFFF>\n\
          endcodespacerange\n",
    )?;
    let mappings: Vec<(u16, char)> = used.iter().map(|(&gid, &c)| (gid, c)).collect();
    for chunk in mappings.chunks(BFCHAR_CHUNK) {
        writeln!(cmap, "{} beginbfchar", chunk.len())?;
        for &(gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c.encode_utf16(&mut units).iter().map(|u| format!("{:04X}", u)).collect();
            writeln!(cmap, "<{:04X}> <{}>", gid, hex)?;
        }
        writeln!(cmap, "endbfchar")?;
    }
    cmap.write_all(b"endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n")?;
    Ok(cmap)
}
