//! Visible text watermarks stamped into page content.
//!
//! Existing content streams are never decoded or rewritten. Each stamped page
//! gets a shared `q` stream in front of its content and a watermark stream at
//! the end that starts with `Q`, so whatever graphics state the original
//! content leaves behind cannot affect the stamp.
//!
//! # Example
//!
//! ```
//! use pdf_seal::document::Document;
//! use pdf_seal::geometry::Rect;
//! use pdf_seal::writer::{apply_watermark, Placement, WatermarkSpec};
//!
//! let mut doc = Document::new();
//! doc.add_page(Rect::new(0.0, 0.0, 595.0, 842.0), b"")?;
//!
//! let spec = WatermarkSpec::builder("CONFIDENTIAL")
//!     .with_rotation(45.0)
//!     .with_opacity(0.3)
//!     .with_color(0.8, 0.0, 0.0)
//!     .with_placement(Placement::Centered)
//!     .build()?;
//! let summary = apply_watermark(&mut doc, &spec)?;
//! assert_eq!(summary.pages_stamped, 1);
//! # Ok::<(), pdf_seal::error::Error>(())
//! ```

use super::content_stream::{ContentStreamBuilder, ContentStreamOp};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::fonts::{TrueTypeFont, WatermarkFont};
use crate::geometry::{Matrix, Point, Rect};
use crate::object::{Dict, Object, ObjectRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Smallest font size a centred stamp may shrink to.
const MIN_FONT_SIZE: f64 = 1.0;

/// Margin kept between a centred stamp and the page edge.
const FIT_MARGIN: f64 = 18.0;

/// Upper bound on tiles per page.
const MAX_TILES: usize = 10_000;

/// Containment tolerance in points.
const EPSILON: f64 = 1e-6;

/// Page corner for anchored stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    /// Lower left (footer)
    #[default]
    BottomLeft,
    /// Lower right
    BottomRight,
    /// Upper left
    TopLeft,
    /// Upper right
    TopRight,
}

/// Where the text goes on each page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Placement {
    /// One stamp in the middle, shrunk to fit
    #[default]
    Centered,
    /// Repeated on a grid
    Tiled {
        /// Horizontal distance between tile centres
        pitch_x: f64,
        /// Vertical distance between tile centres
        pitch_y: f64,
    },
    /// At a corner, `margin` points from both edges
    Anchored {
        /// Corner to anchor to
        corner: Corner,
        /// Distance from the page edges
        margin: f64,
    },
}

impl Placement {
    /// Footer position used by the bundled CLI.
    pub fn footer() -> Self {
        Placement::Anchored {
            corner: Corner::BottomLeft,
            margin: 30.0,
        }
    }
}

/// Whether `/Rotate` on a page affects the stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageRotation {
    /// Stamp in unrotated page space
    #[default]
    Ignore,
    /// Turn the stamp with the page so it reads upright in a viewer
    Compensate,
}

/// A validated watermark description.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    text: String,
    encoded: Vec<u8>,
    font: WatermarkFont,
    /// Advance of the text in 1/1000 em
    width: f64,
    /// Lowest and highest ink of the text in 1/1000 em
    extent: (f64, f64),
    size: f64,
    rotation: f64,
    opacity: f64,
    color: [f64; 3],
    placement: Placement,
    page_rotation: PageRotation,
    first_page: usize,
}

impl WatermarkSpec {
    /// Start building a watermark for `text`.
    pub fn builder(text: impl Into<String>) -> WatermarkSpecBuilder {
        WatermarkSpecBuilder::new(text)
    }

    /// Text as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Face used for the text.
    pub fn font(&self) -> &WatermarkFont {
        &self.font
    }

    /// Width of the text in points at `size`.
    pub fn text_width(&self, size: f64) -> f64 {
        self.width * size / 1000.0
    }

    /// Requested font size in points.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Counter-clockwise rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Opacity in `0.0..=1.0`.
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Fill color, RGB components in `0.0..=1.0`.
    pub fn color(&self) -> [f64; 3] {
        self.color
    }

    /// Placement mode.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Handling of `/Rotate`.
    pub fn page_rotation(&self) -> PageRotation {
        self.page_rotation
    }

    /// Index of the first page stamped.
    pub fn first_page(&self) -> usize {
        self.first_page
    }
}

/// Builder for [`WatermarkSpec`].
#[derive(Debug, Clone)]
pub struct WatermarkSpecBuilder {
    text: String,
    font: WatermarkFont,
    font_file: Option<PathBuf>,
    size: f64,
    rotation: f64,
    opacity: f64,
    color: [f64; 3],
    placement: Placement,
    page_rotation: PageRotation,
    first_page: usize,
}

impl WatermarkSpecBuilder {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: WatermarkFont::default(),
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

    /// Set the face.
    pub fn with_font(mut self, font: impl Into<WatermarkFont>) -> Self {
        self.font = font.into();
        self
    }

    /// Embed an already parsed TrueType face.
    pub fn with_truetype_font(self, font: TrueTypeFont) -> Self {
        self.with_font(WatermarkFont::TrueType(Arc::new(font)))
    }

    /// Embed the TrueType face read from `path` when the spec is built.
    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    /// Set the font size in points.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Set the rotation (degrees, counter-clockwise).
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the opacity (clamped to 0.0-1.0).
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        self
    }

    /// Set the fill color (components clamped to 0.0-1.0).
    pub fn with_color(mut self, r: f64, g: f64, b: f64) -> Self {
        let c = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        self.color = [c(r), c(g), c(b)];
        self
    }

    /// Set the placement mode.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Set `/Rotate` handling.
    pub fn with_page_rotation(mut self, page_rotation: PageRotation) -> Self {
        self.page_rotation = page_rotation;
        self
    }

    /// Leave pages before `index` unstamped.
    pub fn with_first_page(mut self, index: usize) -> Self {
        self.first_page = index;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<WatermarkSpec> {
        if self.text.trim().is_empty() {
            return Err(Error::Unrenderable("watermark text is empty".to_string()));
        }
        let font = match &self.font_file {
            Some(path) => WatermarkFont::TrueType(Arc::new(TrueTypeFont::from_file(path)?)),
            None => self.font,
        };
        let encoded = font.encode(&self.text)?;
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(Error::Unrenderable(format!("invalid font size {}", self.size)));
        }
        if !self.rotation.is_finite() {
            return Err(Error::Unrenderable("rotation is not a finite angle".to_string()));
        }
        match self.placement {
            Placement::Tiled { pitch_x, pitch_y }
                if !(pitch_x.is_finite() && pitch_y.is_finite() && pitch_x > 0.0 && pitch_y > 0.0) =>
            {
                return Err(Error::Unrenderable(format!(
                    "tile pitch must be positive, got {} x {}",
                    pitch_x, pitch_y
                )));
            },
            Placement::Anchored { margin, .. } if !(margin.is_finite() && margin >= 0.0) => {
                return Err(Error::Unrenderable(format!("invalid anchor margin {}", margin)));
            },
            _ => {},
        }
        Ok(WatermarkSpec {
            width: font.text_width(&self.text),
            extent: font.vertical_extent(&self.text),
            text: self.text,
            encoded,
            font,
            size: self.size,
            rotation: self.rotation,
            opacity: self.opacity,
            color: self.color,
            placement: self.placement,
            page_rotation: self.page_rotation,
            first_page: self.first_page,
        })
    }
}

/// One occurrence of the text on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Baseline start of the unrotated text
    pub origin: Point,
    /// Font size actually used
    pub size: f64,
    /// Rotation applied with `cm`
    pub matrix: Matrix,
    /// Bounding box of the rotated text in page space
    pub bbox: Rect,
}

/// Layout of a watermark on one page.
#[derive(Debug, Clone, Copy)]
pub struct WatermarkGeometry<'a> {
    spec: &'a WatermarkSpec,
    media_box: Rect,
    rotation: f64,
}

impl<'a> WatermarkGeometry<'a> {
    /// Layout for a page with `media_box` and normalized `/Rotate` value.
    pub fn new(spec: &'a WatermarkSpec, media_box: Rect, page_rotate: i32) -> Self {
        let rotation = match spec.page_rotation {
            PageRotation::Ignore => spec.rotation,
            PageRotation::Compensate => spec.rotation + f64::from(page_rotate),
        };
        Self {
            spec,
            media_box,
            rotation,
        }
    }

    /// Total rotation applied to the text.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Unrotated box of the text set at `origin` with `size`, covering every
    /// glyph from descender to ascender.
    pub fn text_bbox(&self, origin: Point, size: f64) -> Rect {
        let (low, high) = self.spec.extent;
        let width = self.spec.text_width(size);
        let bottom = origin.y + low * size / 1000.0;
        let top = origin.y + high * size / 1000.0;
        Rect::from_points(origin.x, bottom, origin.x + width, top)
    }

    /// Baseline origin that centres the text box on `center`.
    fn origin_centered_on(&self, center: Point, size: f64) -> Point {
        let probe = self.text_bbox(Point::new(0.0, 0.0), size);
        Point::new(center.x - probe.width / 2.0, center.y - probe.center().y)
    }

    fn place(&self, origin: Point, size: f64) -> TextPlacement {
        let unrotated = self.text_bbox(origin, size);
        let matrix = Matrix::rotation_about(self.rotation, unrotated.center());
        TextPlacement {
            origin,
            size,
            matrix,
            bbox: matrix.bounding_box(&unrotated),
        }
    }

    /// Every placement on this page.
    pub fn placements(&self) -> Result<Vec<TextPlacement>> {
        match self.spec.placement {
            Placement::Centered => Ok(vec![self.centered()?]),
            Placement::Tiled { pitch_x, pitch_y } => self.tiled(pitch_x, pitch_y),
            Placement::Anchored { corner, margin } => Ok(vec![self.anchored(corner, margin)?]),
        }
    }

    fn centered(&self) -> Result<TextPlacement> {
        let margin = FIT_MARGIN.min(self.media_box.width.min(self.media_box.height) * 0.05);
        let area = self.media_box.inset(margin);
        if area.width <= 0.0 || area.height <= 0.0 {
            return Err(Error::Unrenderable(format!("page {:?} is too small", self.media_box)));
        }

        let center = self.media_box.center();
        let trial = self.place(self.origin_centered_on(center, self.spec.size), self.spec.size);
        let scale = (area.width / trial.bbox.width)
            .min(area.height / trial.bbox.height)
            .min(1.0);
        let size = self.spec.size * scale;
        if !(size.is_finite() && size >= MIN_FONT_SIZE) {
            return Err(Error::Unrenderable(format!(
                "'{}' does not fit the page at any readable size",
                self.spec.text
            )));
        }
        Ok(self.place(self.origin_centered_on(center, size), size))
    }

    fn tiled(&self, pitch_x: f64, pitch_y: f64) -> Result<Vec<TextPlacement>> {
        let mb = self.media_box;
        let nx = ((mb.width / pitch_x).floor() as usize).max(1);
        let ny = ((mb.height / pitch_y).floor() as usize).max(1);
        if nx.saturating_mul(ny) > MAX_TILES {
            return Err(Error::Unrenderable(format!(
                "tile pitch {} x {} gives more than {} tiles",
                pitch_x, pitch_y, MAX_TILES
            )));
        }

        let start_x = mb.left() + (mb.width - nx as f64 * pitch_x) / 2.0 + pitch_x / 2.0;
        let start_y = mb.bottom() + (mb.height - ny as f64 * pitch_y) / 2.0 + pitch_y / 2.0;
        let mut tiles = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let center = Point::new(start_x + i as f64 * pitch_x, start_y + j as f64 * pitch_y);
                let tile = self.place(self.origin_centered_on(center, self.spec.size), self.spec.size);
                if mb.contains_rect(&tile.bbox, EPSILON) {
                    tiles.push(tile);
                }
            }
        }

        if tiles.is_empty() {
            log::debug!("No tile fits the page, falling back to one centred stamp");
            tiles.push(self.centered()?);
        }
        Ok(tiles)
    }

    fn anchored(&self, corner: Corner, margin: f64) -> Result<TextPlacement> {
        let mb = self.media_box;
        let size = self.spec.size;
        let width = self.spec.text_width(size);
        let lift = 1.5 * size;
        let x = match corner {
            Corner::BottomLeft | Corner::TopLeft => mb.left() + margin,
            Corner::BottomRight | Corner::TopRight => mb.right() - margin - width,
        };
        let y = match corner {
            Corner::BottomLeft | Corner::BottomRight => mb.bottom() + margin + lift,
            Corner::TopLeft | Corner::TopRight => mb.top() - margin - lift,
        };
        let placed = self.place(Point::new(x, y), size);
        if !mb.contains_rect(&placed.bbox, EPSILON) {
            return Err(Error::Unrenderable(format!(
                "'{}' at size {} does not fit inside the page at the {:?} corner",
                self.spec.text, size, corner
            )));
        }
        Ok(placed)
    }
}

/// Result of stamping a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatermarkSummary {
    /// Pages that received the stamp
    pub pages_stamped: usize,
    /// Text occurrences drawn across all pages
    pub placements: usize,
}

/// Stamp `spec` onto every page from `spec.first_page()` on.
///
/// Layout is computed for every page before the document is touched, so an
/// unrenderable page leaves the document unchanged.
pub fn apply_watermark(doc: &mut Document, spec: &WatermarkSpec) -> Result<WatermarkSummary> {
    let targets: Vec<ObjectRef> = doc.page_refs().iter().skip(spec.first_page).copied().collect();
    if targets.is_empty() {
        log::warn!(
            "Document has {} pages, nothing to stamp from page {}",
            doc.page_count(),
            spec.first_page + 1
        );
        return Ok(WatermarkSummary::default());
    }

    let mut layouts = Vec::with_capacity(targets.len());
    for (i, page) in targets.iter().enumerate() {
        let view = doc.page(spec.first_page + i)?;
        let geometry = WatermarkGeometry::new(spec, view.media_box(), view.rotation());
        layouts.push((spec.first_page + i, *page, geometry.placements()?));
    }

    let font_ref = spec.font.add_to(doc, &spec.text)?;
    let gs_ref = doc.add_object(Object::dict([
        ("Type", Object::name("ExtGState")),
        ("CA", Object::Real(spec.opacity)),
        ("ca", Object::Real(spec.opacity)),
    ]));
    let save_ref = doc.add_object(Object::Stream {
        dict: Dict::new(),
        data: bytes::Bytes::from_static(b"q\n"),
    });
    let shared = shared_resource_counts(doc);

    let show = if spec.font.is_composite() {
        ContentStreamOp::ShowHexText(spec.encoded.clone())
    } else {
        ContentStreamOp::ShowText(spec.encoded.clone())
    };

    let mut summary = WatermarkSummary::default();
    for (index, page, placements) in layouts {
        let (font_name, gs_name) = register_resources(doc, page, font_ref, gs_ref, &shared)?;

        let mut content = ContentStreamBuilder::new();
        content.restore_state();
        for p in &placements {
            let [r, g, b] = spec.color;
            content
                .save_state()
                .set_ext_gstate(&gs_name)
                .set_fill_color(r, g, b)
                .transform(p.matrix)
                .text_object_with(
                    &font_name,
                    p.size,
                    Matrix::translation(p.origin.x, p.origin.y),
                    show.clone(),
                )
                .restore_state();
        }
        let stamp_ref = doc.add_object(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from(content.build()?),
        });

        let mut contents = vec![save_ref];
        contents.extend(doc.page(index)?.content_refs());
        contents.push(stamp_ref);
        doc.set_page_contents(page, contents)?;

        summary.pages_stamped += 1;
        summary.placements += placements.len();
        log::debug!("Stamped page {} with {} placement(s)", page, placements.len());
    }

    log::info!(
        "Watermarked {} page(s), {} placement(s)",
        summary.pages_stamped,
        summary.placements
    );
    Ok(summary)
}

/// How many pages point at each indirect `/Resources` dictionary.
fn shared_resource_counts(doc: &Document) -> HashMap<ObjectRef, usize> {
    let mut counts = HashMap::new();
    for page in doc.page_refs() {
        let r = doc
            .get(*page)
            .and_then(|p| p.as_dict())
            .and_then(|d| d.get("Resources"))
            .and_then(|r| r.as_reference());
        if let Some(r) = r {
            *counts.entry(r).or_insert(0) += 1;
        }
    }
    counts
}

/// First `{prefix}{n}` not already a key of `existing`.
fn fresh_name(existing: Option<&Dict>, prefix: &str) -> String {
    (1..)
        .map(|n| format!("{}{}", prefix, n))
        .find(|name| existing.map_or(true, |d| !d.contains_key(name)))
        .unwrap_or_else(|| prefix.to_string())
}

/// Owned copy of a sub-dictionary of `resources`, resolving references.
fn owned_subdict(doc: &Document, resources: &Dict, key: &str) -> Result<Dict> {
    match resources.get(key) {
        None => Ok(Dict::new()),
        Some(obj) => Ok(doc.resolve(obj)?.as_dict().cloned().unwrap_or_default()),
    }
}

/// Add the font and graphics state to a page's resources under fresh names.
fn register_resources(
    doc: &mut Document,
    page: ObjectRef,
    font_ref: ObjectRef,
    gs_ref: ObjectRef,
    shared: &HashMap<ObjectRef, usize>,
) -> Result<(String, String)> {
    let page_dict = doc
        .get(page)
        .and_then(|p| p.as_dict())
        .ok_or(Error::ObjectNotFound(page.id, page.gen))?;
    let indirect = page_dict.get("Resources").and_then(|r| r.as_reference());
    let mut resources = match page_dict.get("Resources") {
        Some(obj) => doc.resolve(obj)?.as_dict().cloned().unwrap_or_default(),
        None => Dict::new(),
    };

    let mut fonts = owned_subdict(doc, &resources, "Font")?;
    let mut states = owned_subdict(doc, &resources, "ExtGState")?;
    let font_name = fresh_name(Some(&fonts), "F");
    let gs_name = fresh_name(Some(&states), "GS");
    fonts.insert(font_name.clone(), Object::Reference(font_ref));
    states.insert(gs_name.clone(), Object::Reference(gs_ref));
    resources.insert("Font".to_string(), Object::Dictionary(fonts));
    resources.insert("ExtGState".to_string(), Object::Dictionary(states));

    match indirect {
        Some(r) if shared.get(&r).copied().unwrap_or(0) <= 1 && doc.get(r).is_some() => {
            doc.replace_object(r, Object::Dictionary(resources))?;
        },
        _ => {
            if let Some(r) = indirect {
                log::debug!("Page {} gets its own copy of shared resources {}", page, r);
            }
            let dict = doc
                .get_mut(page)
                .and_then(|p| p.as_dict_mut())
                .ok_or(Error::ObjectNotFound(page.id, page.gen))?;
            dict.insert("Resources".to_string(), Object::Dictionary(resources));
        },
    }
    Ok((font_name, gs_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(text: &str) -> WatermarkSpecBuilder {
        WatermarkSpec::builder(text)
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(spec("").build(), Err(Error::Unrenderable(_))));
        assert!(matches!(spec("   ").build(), Err(Error::Unrenderable(_))));
        assert!(matches!(spec("홍길동").build(), Err(Error::Unrenderable(_))));
        assert!(spec("x").with_size(0.0).build().is_err());
        assert!(spec("x")
            .with_placement(Placement::Tiled { pitch_x: 0.0, pitch_y: 10.0 })
            .build()
            .is_err());
        let s = spec("ok").with_opacity(3.0).with_color(2.0, -1.0, 0.5).build().unwrap();
        assert_eq!(s.opacity(), 1.0);
        assert_eq!(s.color(), [1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_centered_fits_and_shrinks() {
        let s = spec("A VERY LONG CONFIDENTIAL NOTICE FOR SOMEONE").with_size(200.0).build().unwrap();
        let page = Rect::new(0.0, 0.0, 595.0, 842.0);
        let placements = WatermarkGeometry::new(&s, page, 0).placements().unwrap();
        assert_eq!(placements.len(), 1);
        assert!(placements[0].size < 200.0);
        assert!(page.contains_rect(&placements[0].bbox, 1e-6));
        let c = placements[0].bbox.center();
        assert!((c.x - 297.5).abs() < 1e-6 && (c.y - 421.0).abs() < 1e-6);
    }

    #[test]
    fn test_compensate_adds_page_rotation() {
        let s = spec("x")
            .with_rotation(10.0)
            .with_page_rotation(PageRotation::Compensate)
            .build()
            .unwrap();
        let g = WatermarkGeometry::new(&s, Rect::new(0.0, 0.0, 100.0, 100.0), 90);
        assert_eq!(g.rotation(), 100.0);
    }

    #[test]
    fn test_tiles_inside_page() {
        let s = spec("COPY")
            .with_size(20.0)
            .with_placement(Placement::Tiled { pitch_x: 150.0, pitch_y: 150.0 })
            .build()
            .unwrap();
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        let tiles = WatermarkGeometry::new(&s, page, 0).placements().unwrap();
        assert!(tiles.len() > 4);
        assert!(tiles.iter().all(|t| page.contains_rect(&t.bbox, 1e-6)));
    }

    #[test]
    fn test_footer_coordinates() {
        let s = spec("Buyer").with_size(10.0).with_rotation(0.0).with_placement(Placement::footer()).build().unwrap();
        let p = WatermarkGeometry::new(&s, Rect::new(0.0, 0.0, 612.0, 792.0), 0)
            .placements()
            .unwrap()[0];
        assert_eq!(p.origin, Point::new(30.0, 45.0));
        assert!(p.matrix.is_identity());
    }

    #[test]
    fn test_fresh_name_skips_existing() {
        let mut d = Dict::new();
        d.insert("F1".to_string(), Object::Null);
        d.insert("F2".to_string(), Object::Null);
        assert_eq!(fresh_name(Some(&d), "F"), "F3");
        assert_eq!(fresh_name(None, "GS"), "GS1");
    }

    #[test]
    fn test_apply_wraps_content() {
        let mut doc = Document::new();
        doc.add_page(Rect::new(0.0, 0.0, 200.0, 200.0), b"1 0 0 RG").unwrap();
        let original = doc.page(0).unwrap().content_refs();
        let s = spec("Hi").with_size(12.0).build().unwrap();
        let summary = apply_watermark(&mut doc, &s).unwrap();
        assert_eq!(summary, WatermarkSummary { pages_stamped: 1, placements: 1 });

        let page = doc.page(0).unwrap();
        let refs = page.content_refs();
        assert_eq!(refs.len(), 3);
        assert_eq!(&refs[1..2], &original[..]);
        assert_eq!(doc.decoded_stream(refs[0]).unwrap(), b"q\n");
        let stamp = String::from_utf8(doc.decoded_stream(refs[2]).unwrap()).unwrap();
        assert!(stamp.starts_with("Q\nq\n/GS1 gs\n"));
        assert!(stamp.contains("/F1 12 Tf"));
        assert!(stamp.contains("(Hi) Tj"));
        let fonts = page.resources().unwrap().get("Font").unwrap().as_dict().unwrap();
        assert!(fonts.contains_key("F1"));
    }

    #[test]
    fn test_first_page_beyond_document_is_noop() {
        let mut doc = Document::new();
        doc.add_page(Rect::new(0.0, 0.0, 200.0, 200.0), b"").unwrap();
        let before = doc.object_count();
        let s = spec("x").with_first_page(4).build().unwrap();
        assert_eq!(apply_watermark(&mut doc, &s).unwrap(), WatermarkSummary::default());
        assert_eq!(doc.object_count(), before);
    }
}
