//! Fixture PDFs generated in code.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const A4: (f64, f64) = (595.0, 842.0);
pub const LETTER: (f64, f64) = (612.0, 792.0);
pub const SQUARE: (f64, f64) = (500.0, 500.0);

/// Body of an uncompressed stream object.
pub fn stream(dict_entries: &str, data: &str) -> String {
    format!("<< {} /Length {} >>\nstream\n{}\nendstream", dict_entries, data.len(), data)
}

/// Assemble a PDF from object bodies numbered 1, 2, ... with a classic
/// cross-reference table and `1 0 R` as the catalog.
pub fn pdf_from_objects(objects: &[String]) -> Vec<u8> {
    pdf_with_trailer(objects, "")
}

/// Like [`pdf_from_objects`] with extra trailer entries.
pub fn pdf_with_trailer(objects: &[String], extra_trailer: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = String::new();
    let _ = write!(xref, "xref\n0 {}\n0000000000 65535 f\r\n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(xref, "{:010} 00000 n\r\n", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R {}>>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        extra_trailer,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

/// A document with one page per entry of `sizes`; page `n` shows "Page n".
///
/// Layout: 1 catalog, 2 page tree, 3 font, then a page and its content
/// stream for every page.
pub fn sample_pdf(sizes: &[(f64, f64)]) -> Vec<u8> {
    let first_page = 4;
    let kids: Vec<String> = (0..sizes.len())
        .map(|i| format!("{} 0 R", first_page + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), sizes.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, (w, h)) in sizes.iter().enumerate() {
        let content_id = first_page + 2 * i + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            w, h, content_id
        ));
        objects.push(stream("", &format!("BT /F1 12 Tf 72 72 Td (Page {}) Tj ET", i + 1)));
    }
    pdf_from_objects(&objects)
}

/// Write `bytes` to `dir/name`.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Whether `needle` occurs in `haystack`.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// [`sample_pdf`] whose cross-reference subsection starts at `first`.
pub fn pdf_with_xref_start(first: &str) -> Vec<u8> {
    let bytes = sample_pdf(&[A4]);
    let at = bytes
        .windows(7)
        .rposition(|w| w == b"\nxref\n0")
        .unwrap();
    let mut out = bytes[..at + 6].to_vec();
    out.extend_from_slice(first.as_bytes());
    out.extend_from_slice(&bytes[at + 7..]);
    out
}

/// Catalog and empty page tree indexed by an ASCIIHex-encoded xref stream
/// carrying `extra` dictionary entries.
pub fn pdf_with_xref_stream(extra: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.5\n".to_vec();
    let catalog = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let pages = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let xref = out.len();

    let mut hex = String::from("0000000000FFFF");
    for offset in [catalog, pages, xref] {
        let _ = write!(hex, "01{:08X}0000", offset);
    }
    hex.push('>');
    out.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /XRef /Size 4 /W [1 4 2] /Root 1 0 R /Filter /ASCIIHexDecode {} /Length {} >>\nstream\n{}\nendstream\nendobj\nstartxref\n{}\n%%EOF\n",
            extra,
            hex.len(),
            hex,
            xref
        )
        .as_bytes(),
    );
    out
}

/// TrueType fixture covering ASCII letters, digits, `(),-.` and the Hangul
/// syllables 가 길 나 동 홍, at 2048 units per em.
pub fn seal_sans_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/seal-sans.ttf")
}

/// Three A4 pages whose `/Resources` all point at object 3.
///
/// Layout: 1 catalog, 2 page tree, 3 resources, 4 font, then a page and its
/// content stream for every page.
pub fn shared_resources_pdf() -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [5 0 R 7 0 R 9 0 R] /Count 3 >>".to_string(),
        "<< /Font << /F1 4 0 R >> >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for i in 0..3 {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Resources 3 0 R /Contents {} 0 R >>",
            6 + 2 * i
        ));
        objects.push(stream("", &format!("BT /F1 12 Tf 72 72 Td (Page {}) Tj ET", i + 1)));
    }
    pdf_from_objects(&objects)
}
