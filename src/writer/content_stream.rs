//! PDF content stream builder.
//!
//! Builds the small set of graphics and text operators a watermark needs
//! (ISO 32000-1:2008 sections 8 and 9). Text operands are raw bytes already
//! encoded for the font in use.

use super::object_serializer::write_real;
use crate::error::Result;
use crate::geometry::Matrix;
use std::io::Write;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate a matrix to the CTM (cm)
    Transform(Matrix),
    /// Set graphics state parameters from a named ExtGState (gs)
    SetExtGState(String),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f64),
    /// Set text matrix (Tm)
    SetTextMatrix(Matrix),
    /// Show encoded text (Tj)
    ShowText(Vec<u8>),
    /// Show hex-encoded text (Tj) - for two-byte CIDFont codes
    ShowHexText(Vec<u8>),
    /// Set fill color RGB (rg)
    SetFillColorRGB(f64, f64, f64),
}

/// Accumulates operators and writes them one per line.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Add multiple operations.
    pub fn ops(&mut self, ops: impl IntoIterator<Item = ContentStreamOp>) -> &mut Self {
        self.operations.extend(ops);
        self
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Apply a named ExtGState from the page resources.
    pub fn set_ext_gstate(&mut self, gs_name: &str) -> &mut Self {
        self.op(ContentStreamOp::SetExtGState(gs_name.to_string()))
    }

    /// Set the non-stroking RGB color, components in 0..=1.
    pub fn set_fill_color(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.op(ContentStreamOp::SetFillColorRGB(r, g, b))
    }

    /// Concatenate `m` to the current transformation, unless it is the identity.
    pub fn transform(&mut self, m: Matrix) -> &mut Self {
        if m.is_identity() {
            return self;
        }
        self.op(ContentStreamOp::Transform(m))
    }

    /// A complete `BT ... ET` text object placing `encoded` with `matrix`.
    pub fn text_object(&mut self, font: &str, size: f64, matrix: Matrix, encoded: Vec<u8>) -> &mut Self {
        self.text_object_with(font, size, matrix, ContentStreamOp::ShowText(encoded))
    }

    /// Like [`text_object`](Self::text_object), with the show operator given.
    pub fn text_object_with(&mut self, font: &str, size: f64, matrix: Matrix, show: ContentStreamOp) -> &mut Self {
        self.ops([
            ContentStreamOp::BeginText,
            ContentStreamOp::SetFont(font.to_string(), size),
            ContentStreamOp::SetTextMatrix(matrix),
            show,
            ContentStreamOp::EndText,
        ])
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation has been added.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Build the content stream bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        Ok(buf)
    }
}

fn write_numbers<W: Write>(w: &mut W, values: &[f64]) -> std::io::Result<()> {
    for v in values {
        write_real(w, *v)?;
        write!(w, " ")?;
    }
    Ok(())
}

fn write_matrix<W: Write>(w: &mut W, m: &Matrix, operator: &str) -> std::io::Result<()> {
    write_numbers(w, &[m.a, m.b, m.c, m.d, m.e, m.f])?;
    write!(w, "{}", operator)
}

/// Write a single operation.
fn write_op<W: Write>(w: &mut W, op: &ContentStreamOp) -> std::io::Result<()> {
    match op {
        ContentStreamOp::SaveState => write!(w, "q"),
        ContentStreamOp::RestoreState => write!(w, "Q"),
        ContentStreamOp::Transform(m) => write_matrix(w, m, "cm"),
        ContentStreamOp::SetExtGState(name) => write!(w, "/{} gs", name),
        ContentStreamOp::BeginText => write!(w, "BT"),
        ContentStreamOp::EndText => write!(w, "ET"),
        ContentStreamOp::SetFont(name, size) => {
            write!(w, "/{} ", name)?;
            write_real(w, *size)?;
            write!(w, " Tf")
        },
        ContentStreamOp::SetTextMatrix(m) => write_matrix(w, m, "Tm"),
        ContentStreamOp::ShowText(bytes) => {
            write!(w, "(")?;
            write_escaped_string(w, bytes)?;
            write!(w, ") Tj")
        },
        ContentStreamOp::ShowHexText(bytes) => {
            write!(w, "<")?;
            for b in bytes {
                write!(w, "{:02X}", b)?;
            }
            write!(w, "> Tj")
        },
        ContentStreamOp::SetFillColorRGB(r, g, b) => {
            write_numbers(w, &[*r, *g, *b])?;
            write!(w, "rg")
        },
    }
}

/// Escape a literal string operand; bytes outside ASCII become octal escapes.
fn write_escaped_string<W: Write>(w: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    for &b in bytes {
        match b {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            0x20..=0x7E => w.write_all(&[b])?,
            _ => write!(w, "\\{:03o}", b)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_text_object() {
        let mut b = ContentStreamBuilder::new();
        b.save_state()
            .set_ext_gstate("GS1")
            .set_fill_color(0.5, 0.5, 0.5)
            .text_object("F1", 12.0, Matrix::identity(), b"Hi (x)".to_vec())
            .restore_state();
        let out = String::from_utf8(b.build().unwrap()).unwrap();
        assert_eq!(
            out,
            "q\n/GS1 gs\n0.5 0.5 0.5 rg\nBT\n/F1 12 Tf\n1 0 0 1 0 0 Tm\n(Hi \\(x\\)) Tj\nET\nQ\n"
        );
    }

    #[test]
    fn test_non_ascii_bytes_are_octal() {
        let mut b = ContentStreamBuilder::new();
        b.op(ContentStreamOp::ShowText(vec![b'a', 0xE9, 0x80]));
        assert_eq!(b.build().unwrap(), b"(a\\351\\200) Tj\n");
    }

    #[test]
    fn test_hex_text_is_upper_case_pairs() {
        let mut b = ContentStreamBuilder::new();
        b.op(ContentStreamOp::ShowHexText(vec![0x00, 0x49, 0xD6, 0x0A]));
        assert_eq!(b.build().unwrap(), b"<0049D60A> Tj\n");
    }

    #[test]
    fn test_identity_transform_is_skipped() {
        let mut b = ContentStreamBuilder::new();
        b.transform(Matrix::identity());
        assert!(b.is_empty());
        b.transform(Matrix::rotation_about(90.0, Point::new(0.0, 0.0)));
        assert_eq!(b.len(), 1);
    }
}
