//! In-memory PDF document.
//!
//! A [`Document`] owns every indirect object in an arena keyed by
//! [`ObjectRef`], the ordered list of page references and a structured
//! [`Trailer`]. Inherited page attributes are copied onto each page while
//! parsing, so every page dictionary is self-contained.

use crate::encryption::{EncryptionHandler, EncryptionState};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::{parse_indirect_object, parse_indirect_stream};
use crate::parser_config::ParseOptions;
use crate::xref::{find_xref_offset, parse_xref, CrossRefTable, XRefEntry};
use crate::xref_reconstruction::reconstruct_xref;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Page attributes inherited from `/Pages` nodes.
const INHERITABLE: [&str; 4] = ["MediaBox", "CropBox", "Resources", "Rotate"];

/// The header must start within this many bytes.
const HEADER_WINDOW: usize = 1024;

/// Longest chain of references followed by [`Document::resolve`].
const MAX_REFERENCE_CHAIN: usize = 32;

/// Trailer information kept in structured form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    /// Document catalog
    pub root: ObjectRef,
    /// Document information dictionary
    pub info: Option<ObjectRef>,
    /// File identifier pair
    pub id: Option<(Vec<u8>, Vec<u8>)>,
    /// Encryption dictionary of the output
    pub encrypt: Option<ObjectRef>,
    /// Declared `/Size` of the source file
    pub size: u32,
}

/// Options for writing a document back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Flate-compress streams added since parsing that have no `/Filter`
    pub compress_new_streams: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            compress_new_streams: true,
        }
    }
}

/// A parsed (and, if needed, decrypted) PDF document.
///
/// # Example
///
/// ```
/// use pdf_seal::document::Document;
/// use pdf_seal::geometry::Rect;
/// use pdf_seal::parser_config::ParseOptions;
///
/// let mut doc = Document::new();
/// doc.add_page(Rect::new(0.0, 0.0, 595.0, 842.0), b"0 0 m 10 10 l S")?;
/// let bytes = doc.serialize()?;
///
/// let reparsed = Document::parse(&bytes, &ParseOptions::default())?;
/// assert_eq!(reparsed.page_count(), 1);
/// # Ok::<(), pdf_seal::error::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    version: String,
    objects: BTreeMap<ObjectRef, Object>,
    pages: Vec<ObjectRef>,
    trailer: Trailer,
    encryption: Option<EncryptionState>,
    fresh: BTreeSet<ObjectRef>,
    serialize_options: SerializeOptions,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let catalog = ObjectRef::new(1, 0);
        let pages = ObjectRef::new(2, 0);
        let mut objects = BTreeMap::new();
        objects.insert(
            catalog,
            Object::dict([("Type", Object::name("Catalog")), ("Pages", Object::Reference(pages))]),
        );
        objects.insert(
            pages,
            Object::dict([
                ("Type", Object::name("Pages")),
                ("Kids", Object::Array(Vec::new())),
                ("Count", Object::Integer(0)),
            ]),
        );
        Self {
            version: "1.4".to_string(),
            objects,
            pages: Vec::new(),
            trailer: Trailer {
                root: catalog,
                info: None,
                id: None,
                encrypt: None,
                size: 3,
            },
            encryption: None,
            fresh: BTreeSet::new(),
            serialize_options: SerializeOptions::default(),
        }
    }

    /// Read and parse a file.
    pub fn load(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data, options)
    }

    /// Parse a complete PDF file held in memory.
    ///
    /// Encrypted input is decrypted with `options.password` (user or owner
    /// password); the result is always plaintext.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<Self> {
        let version = parse_header(data)?;
        log::debug!("PDF header version {}", version);

        let (xref, reconstructed) = read_xref(data, options)?;
        let (xref, objects) = match load_direct_objects(data, &xref) {
            Ok(objects) => (xref, objects),
            Err(e) if options.recover_xref && !reconstructed => {
                log::warn!("Cross-reference offsets are inconsistent ({}), rebuilding", e);
                let rebuilt = reconstruct_xref(data)?;
                let objects = load_direct_objects(data, &rebuilt)?;
                (rebuilt, objects)
            },
            Err(e) => return Err(e),
        };

        let mut objects = objects;
        fix_indirect_lengths(data, &xref, &mut objects);
        let raw_trailer = xref.trailer().clone();
        decrypt_objects(&mut objects, &raw_trailer, options)?;
        load_compressed_objects(&mut objects, &xref, options)?;
        objects.retain(|_, o| !o.has_type("ObjStm") && !o.has_type("XRef"));

        let mut doc = Self {
            version,
            trailer: build_trailer(&raw_trailer)?,
            objects,
            pages: Vec::new(),
            encryption: None,
            fresh: BTreeSet::new(),
            serialize_options: SerializeOptions::default(),
        };
        doc.adopt_direct_info(&raw_trailer);
        doc.pages = collect_pages(&mut doc.objects, doc.trailer.root, options)?;
        doc.check_page_contents(options)?;

        log::info!(
            "Parsed PDF {}: {} objects, {} pages",
            doc.version,
            doc.objects.len(),
            doc.pages.len()
        );
        Ok(doc)
    }

    /// Serialize with the document's [`SerializeOptions`], encrypting if an
    /// [`EncryptionState`] is attached.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        crate::writer::write_document(self)
    }

    /// Alias of [`serialize`](Self::serialize).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.serialize()
    }

    /// PDF version written in the header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Raise the header version to at least `min` (e.g. `"1.6"`).
    pub fn require_version(&mut self, min: &str) {
        if version_tuple(&self.version) < version_tuple(min) {
            log::debug!("Raising PDF version {} to {}", self.version, min);
            self.version = min.to_string();
        }
    }

    /// Structured trailer.
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// Mutable trailer.
    pub fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailer
    }

    /// Look up an object.
    pub fn get(&self, r: ObjectRef) -> Option<&Object> {
        self.objects.get(&r)
    }

    /// Look up an object for modification.
    pub fn get_mut(&mut self, r: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&r)
    }

    /// Every object in ascending identifier order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectRef, &Object)> + '_ {
        self.objects.iter().map(|(r, o)| (*r, o))
    }

    /// Number of objects in the arena.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Add an object under a fresh identifier.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        let next = self
            .objects
            .keys()
            .next_back()
            .map_or(1, |r| r.id + 1)
            .max(self.trailer.size.max(1));
        let r = ObjectRef::new(next, 0);
        self.objects.insert(r, obj);
        self.fresh.insert(r);
        self.trailer.size = next + 1;
        r
    }

    /// Replace an existing object.
    pub fn replace_object(&mut self, r: ObjectRef, obj: Object) -> Result<()> {
        match self.objects.get_mut(&r) {
            Some(slot) => {
                *slot = obj;
                Ok(())
            },
            None => Err(Error::ObjectNotFound(r.id, r.gen)),
        }
    }

    /// Whether `r` was added after parsing.
    pub fn is_fresh(&self, r: ObjectRef) -> bool {
        self.fresh.contains(&r)
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        let mut current = obj;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(r) => {
                    current = self.get(*r).ok_or(Error::ObjectNotFound(r.id, r.gen))?;
                },
                direct => return Ok(direct),
            }
        }
        match current {
            Object::Reference(r) => Err(Error::CircularReference(*r)),
            direct => Ok(direct),
        }
    }

    /// Decode a stream's data through its filter chain.
    pub fn decoded_stream(&self, r: ObjectRef) -> Result<Vec<u8>> {
        self.get(r)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?
            .decode_stream_data(&ParseOptions::default())
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page references in document order.
    pub fn page_refs(&self) -> &[ObjectRef] {
        &self.pages
    }

    /// View of page `index` (0-based).
    pub fn page(&self, index: usize) -> Result<PageView<'_>> {
        let r = *self
            .pages
            .get(index)
            .ok_or_else(|| Error::InvalidPdf(format!("page index {} out of range", index)))?;
        PageView::new(self, r)
    }

    /// Views of every page.
    pub fn pages(&self) -> impl Iterator<Item = Result<PageView<'_>>> + '_ {
        self.pages.iter().map(move |r| PageView::new(self, *r))
    }

    /// Append a page with the given media box and (uncompressed) content.
    pub fn add_page(&mut self, media_box: Rect, content: &[u8]) -> Result<ObjectRef> {
        let pages_root = self
            .get(self.trailer.root)
            .and_then(|c| c.as_dict())
            .and_then(|c| c.get("Pages"))
            .and_then(|p| p.as_reference())
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages".to_string()))?;

        let contents = self.add_object(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::copy_from_slice(content),
        });
        let page = self.add_object(Object::dict([
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(pages_root)),
            ("MediaBox", rect_object(&media_box)),
            ("Resources", Object::Dictionary(Dict::new())),
            ("Contents", Object::Reference(contents)),
        ]));

        let node = self
            .get_mut(pages_root)
            .and_then(|p| p.as_dict_mut())
            .ok_or(Error::ObjectNotFound(pages_root.id, pages_root.gen))?;
        match node.get_mut("Kids") {
            Some(Object::Array(kids)) => kids.push(Object::Reference(page)),
            _ => {
                node.insert("Kids".to_string(), Object::Array(vec![Object::Reference(page)]));
            },
        }
        let count = node.get("Count").and_then(|c| c.as_integer()).unwrap_or(0);
        node.insert("Count".to_string(), Object::Integer(count + 1));

        self.pages.push(page);
        Ok(page)
    }

    /// Replace the `/Contents` of a page with the given streams.
    pub fn set_page_contents(&mut self, page: ObjectRef, contents: Vec<ObjectRef>) -> Result<()> {
        let dict = self
            .get_mut(page)
            .and_then(|p| p.as_dict_mut())
            .ok_or(Error::ObjectNotFound(page.id, page.gen))?;
        dict.insert(
            "Contents".to_string(),
            Object::Array(contents.into_iter().map(Object::Reference).collect()),
        );
        Ok(())
    }

    /// The `/Info` dictionary, created if missing.
    pub fn info_mut(&mut self) -> Result<&mut Dict> {
        let existing = self
            .trailer
            .info
            .filter(|r| self.get(*r).and_then(|o| o.as_dict()).is_some());
        let r = match existing {
            Some(r) => r,
            None => {
                let r = self.add_object(Object::Dictionary(Dict::new()));
                self.trailer.info = Some(r);
                r
            },
        };
        self.get_mut(r)
            .and_then(|o| o.as_dict_mut())
            .ok_or(Error::ObjectNotFound(r.id, r.gen))
    }

    /// Encryption to apply on the next serialization.
    pub fn encryption(&self) -> Option<&EncryptionState> {
        self.encryption.as_ref()
    }

    /// Attach or clear the encryption applied on serialization.
    pub fn set_encryption(&mut self, state: Option<EncryptionState>) {
        if state.is_none() {
            self.trailer.encrypt = None;
        }
        self.encryption = state;
    }

    /// Current serialization options.
    pub fn serialize_options(&self) -> SerializeOptions {
        self.serialize_options
    }

    /// Change serialization options.
    pub fn set_serialize_options(&mut self, options: SerializeOptions) {
        self.serialize_options = options;
    }

    /// A direct `/Info` dictionary in the trailer becomes an indirect object.
    fn adopt_direct_info(&mut self, raw_trailer: &Dict) {
        if let Some(Object::Dictionary(info)) = raw_trailer.get("Info") {
            let r = self.add_object(Object::Dictionary(info.clone()));
            self.fresh.remove(&r);
            self.trailer.info = Some(r);
        }
    }

    /// Every content reference of every page must name a stream.
    fn check_page_contents(&mut self, options: &ParseOptions) -> Result<()> {
        let mut repairs: Vec<(ObjectRef, Vec<ObjectRef>)> = Vec::new();
        for page in &self.pages {
            let view = PageView::new(self, *page)?;
            let refs = view.content_refs();
            let valid: Vec<ObjectRef> = refs
                .iter()
                .copied()
                .filter(|r| matches!(self.get(*r), Some(Object::Stream { .. })))
                .collect();
            if valid.len() != refs.len() {
                let missing = refs.iter().find(|r| !valid.contains(r)).copied();
                if !options.skip_invalid_objects {
                    let r = missing.unwrap_or(*page);
                    return Err(Error::InvalidPdf(format!(
                        "page {} references content {} which is not a stream",
                        page, r
                    )));
                }
                log::warn!("Dropping dangling content references on page {}", page);
                repairs.push((*page, valid));
            }
        }
        for (page, valid) in repairs {
            self.set_page_contents(page, valid)?;
        }
        Ok(())
    }
}

/// Read-only view of one page.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    doc: &'a Document,
    r: ObjectRef,
    dict: &'a Dict,
}

impl<'a> PageView<'a> {
    fn new(doc: &'a Document, r: ObjectRef) -> Result<Self> {
        let dict = doc
            .get(r)
            .and_then(|o| o.as_dict())
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        Ok(Self { doc, r, dict })
    }

    /// Reference of the page object.
    pub fn reference(&self) -> ObjectRef {
        self.r
    }

    /// The page dictionary.
    pub fn dict(&self) -> &'a Dict {
        self.dict
    }

    /// Content streams in drawing order.
    pub fn content_refs(&self) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        match self.dict.get("Contents") {
            Some(Object::Reference(r)) => match self.doc.get(*r) {
                Some(Object::Array(items)) => {
                    out.extend(items.iter().filter_map(|o| o.as_reference()));
                },
                _ => out.push(*r),
            },
            Some(Object::Array(items)) => out.extend(items.iter().filter_map(|o| o.as_reference())),
            _ => {},
        }
        out
    }

    /// The resource dictionary, following an indirect reference.
    pub fn resources(&self) -> Option<&'a Dict> {
        let obj = self.dict.get("Resources")?;
        self.doc.resolve(obj).ok()?.as_dict()
    }

    /// `/MediaBox`, US Letter when unusable.
    pub fn media_box(&self) -> Rect {
        self.box_entry("MediaBox")
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    /// `/CropBox`, if present.
    pub fn crop_box(&self) -> Option<Rect> {
        self.box_entry("CropBox")
    }

    /// `/Rotate` normalized to 0, 90, 180 or 270.
    pub fn rotation(&self) -> i32 {
        let raw = self
            .dict
            .get("Rotate")
            .and_then(|o| self.doc.resolve(o).ok())
            .and_then(|o| o.as_integer())
            .unwrap_or(0);
        (((raw / 90) * 90).rem_euclid(360)) as i32
    }

    fn box_entry(&self, key: &str) -> Option<Rect> {
        let obj = self.doc.resolve(self.dict.get(key)?).ok()?;
        let arr = obj.as_array()?;
        if arr.len() != 4 {
            return None;
        }
        let mut v = [0.0f64; 4];
        for (slot, item) in v.iter_mut().zip(arr) {
            *slot = self.doc.resolve(item).ok()?.as_number()?;
        }
        Some(Rect::from_points(v[0], v[1], v[2], v[3]))
    }
}

/// `[llx lly urx ury]` array for a rectangle.
pub fn rect_object(rect: &Rect) -> Object {
    let num = |v: f64| {
        if v.fract() == 0.0 && v.abs() < 1e15 {
            Object::Integer(v as i64)
        } else {
            Object::Real(v)
        }
    };
    Object::Array(vec![num(rect.left()), num(rect.bottom()), num(rect.right()), num(rect.top())])
}

fn version_tuple(v: &str) -> (u32, u32) {
    let mut parts = v.split('.').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

/// Validate `%PDF-M.m` and return the version.
fn parse_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidHeader("no %PDF- marker at start of file".to_string()))?;
    if pos > 0 {
        log::warn!("{} bytes of garbage before the PDF header", pos);
    }
    let rest = &data[pos + 5..];
    let end = rest
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b'.'))
        .unwrap_or(rest.len());
    let version = std::str::from_utf8(&rest[..end])?;
    match version.split_once('.') {
        Some((major, minor)) if !major.is_empty() && !minor.is_empty() => {
            if major != "1" && major != "2" {
                return Err(Error::UnsupportedVersion(version.to_string()));
            }
            Ok(version.to_string())
        },
        _ => Err(Error::InvalidHeader(format!("malformed version '{}'", version))),
    }
}

/// Load the xref chain; the flag tells whether it was rebuilt by scanning.
fn read_xref(data: &[u8], options: &ParseOptions) -> Result<(CrossRefTable, bool)> {
    let parsed = find_xref_offset(data).and_then(|offset| parse_xref(data, offset, options));
    match parsed {
        Ok(table) if !table.is_empty() && table.trailer().contains_key("Root") => Ok((table, false)),
        Ok(_) if options.recover_xref => {
            log::warn!("Cross-reference data is empty or has no /Root, rebuilding");
            Ok((reconstruct_xref(data)?, true))
        },
        Ok(_) => Err(Error::InvalidXref("cross-reference data is empty or has no /Root".to_string())),
        Err(e) if options.recover_xref => {
            log::warn!("Cross-reference data unreadable ({}), rebuilding", e);
            Ok((reconstruct_xref(data)?, true))
        },
        Err(e) => Err(e),
    }
}

/// Parse every object stored directly in the file.
fn load_direct_objects(data: &[u8], xref: &CrossRefTable) -> Result<BTreeMap<ObjectRef, Object>> {
    let mut objects = BTreeMap::new();
    for (id, entry) in xref.entries() {
        let XRefEntry::InFile { offset, gen } = entry else {
            continue;
        };
        if id == 0 {
            continue;
        }
        let input = data.get(offset..).ok_or_else(|| {
            Error::InvalidXref(format!("object {} offset {} is past end of file", id, offset))
        })?;
        match parse_indirect_object(input) {
            Ok((_, (r, obj))) if r.id == id => {
                if r.gen != gen {
                    log::debug!("Object {} has generation {} but xref says {}", id, r.gen, gen);
                }
                objects.insert(r, obj);
            },
            Ok((_, (r, _))) => {
                return Err(Error::InvalidXref(format!(
                    "offset {} for object {} holds object {}",
                    offset, id, r.id
                )))
            },
            Err(_) => {
                return Err(Error::InvalidXref(format!(
                    "offset {} for object {} does not start an indirect object",
                    offset, id
                )))
            },
        }
    }
    log::debug!("Loaded {} uncompressed objects", objects.len());
    Ok(objects)
}

/// Re-read streams whose `/Length` is an indirect reference, taking exactly the
/// resolved length when it lands on `endstream`.
fn fix_indirect_lengths(data: &[u8], xref: &CrossRefTable, objects: &mut BTreeMap<ObjectRef, Object>) {
    let fixes: Vec<(ObjectRef, Object)> = objects
        .iter()
        .filter_map(|(r, obj)| {
            let Object::Stream { dict, data: scanned } = obj else {
                return None;
            };
            let len = objects.get(&dict.get("Length")?.as_reference()?)?.as_integer()?;
            if usize::try_from(len).ok()? == scanned.len() {
                return None;
            }
            let Some(&XRefEntry::InFile { offset, .. }) = xref.get(r.id) else {
                return None;
            };
            match parse_indirect_stream(data.get(offset..)?, len) {
                Ok((_, (found, stream @ Object::Stream { .. })))
                    if found == *r && stream_len(&stream) == Some(len) =>
                {
                    Some((*r, stream))
                },
                _ => {
                    log::debug!("Object {} /Length {} does not reach endstream, keeping scanned data", r, len);
                    None
                },
            }
        })
        .collect();
    for (r, stream) in fixes {
        objects.insert(r, stream);
    }
}

fn stream_len(obj: &Object) -> Option<i64> {
    match obj {
        Object::Stream { data, .. } => i64::try_from(data.len()).ok(),
        _ => None,
    }
}

/// Decrypt strings and streams in place when the trailer names `/Encrypt`.
fn decrypt_objects(
    objects: &mut BTreeMap<ObjectRef, Object>,
    raw_trailer: &Dict,
    options: &ParseOptions,
) -> Result<()> {
    let Some(entry) = raw_trailer.get("Encrypt") else {
        return Ok(());
    };
    let (encrypt_obj, encrypt_ref) = match entry {
        Object::Reference(r) => (
            objects.get(r).cloned().ok_or(Error::ObjectNotFound(r.id, r.gen))?,
            Some(*r),
        ),
        direct => (direct.clone(), None),
    };
    let file_id = raw_trailer
        .get("ID")
        .and_then(|id| id.as_array())
        .and_then(|id| id.first())
        .and_then(|first| first.as_string())
        .map(|s| s.to_vec())
        .unwrap_or_default();

    let handler = EncryptionHandler::open(&encrypt_obj, file_id, options.password.as_deref())?;
    for (r, obj) in objects.iter_mut() {
        if Some(*r) == encrypt_ref {
            continue;
        }
        let taken = std::mem::replace(obj, Object::Null);
        *obj = handler.decrypt_object(*r, taken)?;
    }
    if let Some(r) = encrypt_ref {
        objects.remove(&r);
    }
    log::info!("Decrypted {} objects", objects.len());
    Ok(())
}

/// Pull objects out of `/ObjStm` streams.
fn load_compressed_objects(
    objects: &mut BTreeMap<ObjectRef, Object>,
    xref: &CrossRefTable,
    options: &ParseOptions,
) -> Result<()> {
    let mut by_stream: BTreeMap<u32, HashSet<u32>> = BTreeMap::new();
    for (id, entry) in xref.entries() {
        if let XRefEntry::InStream { stream_id, .. } = entry {
            by_stream.entry(stream_id).or_default().insert(id);
        }
    }

    let mut loaded = Vec::new();
    for (stream_id, wanted) in by_stream {
        let stream = objects
            .range(ObjectRef::new(stream_id, 0)..=ObjectRef::new(stream_id, u16::MAX))
            .next()
            .map(|(_, o)| o);
        let members = match stream.map(|s| parse_object_stream(s, options)) {
            Some(Ok(members)) => members,
            Some(Err(e)) if options.skip_invalid_objects => {
                log::warn!("Skipping object stream {}: {}", stream_id, e);
                continue;
            },
            Some(Err(e)) => return Err(e),
            None if options.skip_invalid_objects => {
                log::warn!("Object stream {} is missing", stream_id);
                continue;
            },
            None => return Err(Error::ObjectNotFound(stream_id, 0)),
        };
        for (id, obj) in members {
            if let (true, Some(obj)) = (wanted.contains(&id), obj) {
                loaded.push((ObjectRef::new(id, 0), obj));
            }
        }
    }

    log::debug!("Loaded {} objects from object streams", loaded.len());
    objects.extend(loaded);
    Ok(())
}

fn build_trailer(raw: &Dict) -> Result<Trailer> {
    let root = raw
        .get("Root")
        .and_then(|r| r.as_reference())
        .ok_or_else(|| Error::InvalidPdf("trailer has no /Root reference".to_string()))?;
    let id = raw.get("ID").and_then(|id| id.as_array()).and_then(|arr| {
        match (arr.first()?.as_string(), arr.get(1)?.as_string()) {
            (Some(a), Some(b)) => Some((a.to_vec(), b.to_vec())),
            _ => None,
        }
    });
    Ok(Trailer {
        root,
        info: raw.get("Info").and_then(|i| i.as_reference()),
        id,
        encrypt: None,
        size: raw
            .get("Size")
            .and_then(|s| s.as_integer())
            .map(|s| s.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0),
    })
}

/// Walk the page tree, copying inherited attributes onto each leaf.
fn collect_pages(
    objects: &mut BTreeMap<ObjectRef, Object>,
    root: ObjectRef,
    options: &ParseOptions,
) -> Result<Vec<ObjectRef>> {
    let catalog = objects
        .get(&root)
        .and_then(|c| c.as_dict())
        .ok_or_else(|| Error::InvalidPdf(format!("catalog {} is missing", root)))?;
    let pages_root = catalog
        .get("Pages")
        .and_then(|p| p.as_reference())
        .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages reference".to_string()))?;

    let mut walker = PageTreeWalker {
        objects,
        visited: HashSet::new(),
        pages: Vec::new(),
        max_depth: options.max_nesting,
    };
    walker.walk(pages_root, &HashMap::new(), 0)?;
    Ok(walker.pages)
}

struct PageTreeWalker<'a> {
    objects: &'a mut BTreeMap<ObjectRef, Object>,
    visited: HashSet<ObjectRef>,
    pages: Vec<ObjectRef>,
    max_depth: usize,
}

impl PageTreeWalker<'_> {
    fn walk(&mut self, node: ObjectRef, inherited: &HashMap<String, Object>, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimitExceeded(self.max_depth as u32));
        }
        if !self.visited.insert(node) {
            return Err(Error::CircularReference(node));
        }

        let dict = self
            .objects
            .get_mut(&node)
            .and_then(|o| o.as_dict_mut())
            .ok_or_else(|| Error::InvalidPdf(format!("page tree node {} is missing", node)))?;
        let is_leaf = match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Page") => true,
            Some("Pages") => false,
            _ => !dict.contains_key("Kids"),
        };

        if is_leaf {
            for (key, value) in inherited {
                dict.entry(key.clone()).or_insert_with(|| value.clone());
            }
            dict.entry("Type".to_string()).or_insert_with(|| Object::name("Page"));
            if !dict.contains_key("MediaBox") {
                log::warn!("Page {} has no /MediaBox, assuming US Letter", node);
                dict.insert(
                    "MediaBox".to_string(),
                    rect_object(&Rect::new(0.0, 0.0, 612.0, 792.0)),
                );
            }
            self.pages.push(node);
            return Ok(());
        }

        let mut next = inherited.clone();
        for key in INHERITABLE {
            if let Some(value) = dict.get(key) {
                next.insert(key.to_string(), value.clone());
            }
        }
        let kids: Vec<Object> = match dict.get("Kids") {
            Some(Object::Array(kids)) => kids.clone(),
            Some(Object::Reference(r)) => {
                let r = *r;
                self.objects
                    .get(&r)
                    .and_then(|k| k.as_array())
                    .cloned()
                    .ok_or_else(|| Error::InvalidPdf(format!("/Kids of {} is not an array", node)))?
            },
            _ => return Err(Error::InvalidPdf(format!("/Kids of {} is not an array", node))),
        };

        for kid in kids {
            match kid.as_reference() {
                Some(r) => self.walk(r, &next, depth + 1)?,
                None => log::warn!("Ignoring direct object in /Kids of {}", node),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_pdf() -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let bodies = [
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 200 100] /Rotate 90 >>",
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>",
            "<< /Length 8 >>\nstream\n0 0 m S\n\nendstream",
        ];
        let mut offsets = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for o in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", o).as_bytes());
        }
        out.extend_from_slice(format!("trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", xref).as_bytes());
        out
    }

    #[test]
    fn test_parse_materializes_inherited_attributes() {
        let doc = Document::parse(&simple_pdf(), &ParseOptions::default()).unwrap();
        assert_eq!(doc.version(), "1.4");
        assert_eq!(doc.page_count(), 1);
        let page = doc.page(0).unwrap();
        assert_eq!(page.media_box(), Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(page.rotation(), 90);
        assert!(page.dict().contains_key("MediaBox"));
        assert_eq!(page.content_refs(), vec![ObjectRef::new(4, 0)]);
    }

    #[test]
    fn test_bad_header() {
        let err = Document::parse(b"hello world", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_wrong_offsets_strict_vs_recover() {
        let mut pdf = simple_pdf();
        // Shift every object by inserting a comment after the header
        pdf.splice(9..9, b"%shifted\n".iter().copied());
        let err = Document::parse(&pdf, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedDocument);

        let doc = Document::parse(&pdf, &ParseOptions::lenient()).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_page_tree_cycle_detected() {
        let mut doc = Document::new();
        doc.add_page(Rect::new(0.0, 0.0, 10.0, 10.0), b"").unwrap();
        let pages_root = ObjectRef::new(2, 0);
        if let Some(Object::Dictionary(d)) = doc.get_mut(pages_root) {
            if let Some(Object::Array(kids)) = d.get_mut("Kids") {
                kids.push(Object::Reference(pages_root));
            }
        }
        let mut objects = doc.objects.clone();
        let err = collect_pages(&mut objects, doc.trailer.root, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CircularReference(r) if r == pages_root));
    }

    #[test]
    fn test_add_object_uses_fresh_ids() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        assert_eq!(a, ObjectRef::new(3, 0));
        assert_eq!(b, ObjectRef::new(4, 0));
        assert!(doc.is_fresh(a));
        assert_eq!(doc.trailer().size, 5);
    }

    #[test]
    fn test_require_version_only_raises() {
        let mut doc = Document::new();
        doc.require_version("1.6");
        assert_eq!(doc.version(), "1.6");
        doc.require_version("1.3");
        assert_eq!(doc.version(), "1.6");
    }

    #[test]
    fn test_info_created_on_demand() {
        let mut doc = Document::new();
        doc.info_mut()
            .unwrap()
            .insert("Author".to_string(), Object::String(b"me".to_vec()));
        let info = doc.trailer().info.unwrap();
        assert!(doc.get(info).unwrap().as_dict().unwrap().contains_key("Author"));
    }

    #[test]
    fn test_resolve_follows_chain() {
        let mut doc = Document::new();
        let target = doc.add_object(Object::Integer(42));
        let hop = doc.add_object(Object::Reference(target));
        let start = Object::Reference(hop);
        assert_eq!(doc.resolve(&start).unwrap(), &Object::Integer(42));
    }

    #[test]
    fn test_rotation_normalized() {
        let mut doc = Document::new();
        let page = doc.add_page(Rect::new(0.0, 0.0, 10.0, 10.0), b"").unwrap();
        if let Some(d) = doc.get_mut(page).and_then(|p| p.as_dict_mut()) {
            d.insert("Rotate".to_string(), Object::Integer(-90));
        }
        assert_eq!(doc.page(0).unwrap().rotation(), 270);
    }
}
