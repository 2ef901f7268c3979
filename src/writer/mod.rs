//! PDF writing: serialization and page-content stamping.
//!
//! ## Architecture
//!
//! ```text
//! Document
//!     ↓
//! [apply_watermark] (appends stamp streams, registers resources)
//!     ↓
//! [PdfWriter] (reachable objects, compression, encryption, xref)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```

mod content_stream;
mod object_serializer;
mod pdf_writer;
mod watermark;

pub use content_stream::{ContentStreamBuilder, ContentStreamOp};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{write_document, PdfWriter};
pub use watermark::{
    apply_watermark, Corner, PageRotation, Placement, TextPlacement, WatermarkGeometry,
    WatermarkSpec, WatermarkSpecBuilder, WatermarkSummary,
};
