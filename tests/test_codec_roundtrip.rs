//! Parse → serialize → parse keeps the document structure.

mod common;

use common::{
    pdf_from_objects, pdf_with_trailer, pdf_with_xref_start, pdf_with_xref_stream, sample_pdf, stream, A4,
    LETTER, SQUARE,
};
use pdf_seal::document::Document;
use pdf_seal::error::{Error, ErrorKind};
use pdf_seal::object::{Object, ObjectRef};
use pdf_seal::parser::parse_object;
use pdf_seal::parser_config::ParseOptions;
use pdf_seal::writer::ObjectSerializer;
use proptest::prelude::*;

fn strict() -> ParseOptions {
    ParseOptions::strict()
}

/// Decoded content of every page, in page order.
fn page_contents(doc: &Document) -> Vec<Vec<u8>> {
    doc.pages()
        .map(|page| {
            let page = page.unwrap();
            page.content_refs()
                .into_iter()
                .flat_map(|r| doc.decoded_stream(r).unwrap())
                .collect()
        })
        .collect()
}

mod structure {
    use super::*;

    #[test]
    fn test_round_trip_keeps_pages_boxes_and_content() {
        let original = Document::parse(&sample_pdf(&[A4, LETTER, SQUARE]), &strict()).unwrap();
        let bytes = original.serialize().unwrap();
        let reparsed = Document::parse(&bytes, &strict()).unwrap();

        assert_eq!(reparsed.page_count(), 3);
        for i in 0..3 {
            assert_eq!(
                reparsed.page(i).unwrap().media_box(),
                original.page(i).unwrap().media_box()
            );
        }
        assert_eq!(page_contents(&reparsed), page_contents(&original));
        assert_eq!(reparsed.object_count(), original.object_count());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let doc = Document::parse(&sample_pdf(&[A4]), &strict()).unwrap();
        let once = doc.serialize().unwrap();
        let twice = Document::parse(&once, &strict()).unwrap().serialize().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_starts_with_header_and_ends_with_eof() {
        let bytes = Document::parse(&sample_pdf(&[A4]), &strict())
            .unwrap()
            .serialize()
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_inherited_media_box_and_rotation() {
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 300 400] /Rotate 90 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>".to_string(),
            stream("", "0 0 m 10 10 l S"),
        ];
        let doc = Document::parse(&pdf_from_objects(&objects), &strict()).unwrap();
        let page = doc.page(0).unwrap();
        assert_eq!(page.media_box().width, 300.0);
        assert_eq!(page.media_box().height, 400.0);
        assert_eq!(page.rotation(), 90);
    }

    #[test]
    fn test_indirect_length_is_taken_exactly() {
        let content = "0 0 m 10 10 l S\n";
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] /Contents 4 0 R >>".to_string(),
            format!("<< /Length 5 0 R >>\nstream\n{}endstream", content),
            content.len().to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] /Contents 7 0 R >>".to_string(),
            "<< /Length 8 0 R >>\nstream\nabcdef\nendstream".to_string(),
            "3".to_string(),
        ];
        let doc = Document::parse(&pdf_from_objects(&objects), &strict()).unwrap();
        assert_eq!(page_contents(&doc), vec![content.as_bytes().to_vec(), b"abcdef".to_vec()]);

        let reparsed = Document::parse(&doc.serialize().unwrap(), &strict()).unwrap();
        assert_eq!(page_contents(&reparsed), page_contents(&doc));
    }

    #[test]
    fn test_info_and_id_survive() {
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [] /Count 0 >>".to_string(),
        ];
        objects.push("<< /Title (Handbook) >>".to_string());
        let bytes = pdf_with_trailer(&objects, "/Info 3 0 R /ID [<0102> <0304>] ");
        let doc = Document::parse(&bytes, &strict()).unwrap();
        assert_eq!(doc.trailer().id, Some((vec![1, 2], vec![3, 4])));

        let reparsed = Document::parse(&doc.serialize().unwrap(), &strict()).unwrap();
        let info = reparsed.get(reparsed.trailer().info.unwrap()).unwrap();
        assert_eq!(
            info.as_dict().unwrap().get("Title").and_then(|t| t.as_string()),
            Some(&b"Handbook"[..])
        );
        assert_eq!(reparsed.trailer().id, Some((vec![1, 2], vec![3, 4])));
    }
}

mod compressed_input {
    use super::*;

    /// Catalog and page tree inside an object stream, indexed by an
    /// uncompressed cross-reference stream.
    fn pdf_with_object_stream() -> Vec<u8> {
        let mut out = b"%PDF-1.5\n".to_vec();
        let mut offsets = [0usize; 7];

        let mut push = |out: &mut Vec<u8>, id: usize, body: &[u8]| {
            offsets[id] = out.len();
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        };

        push(
            &mut out,
            3,
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Contents 4 0 R >>",
        );
        push(&mut out, 4, stream("", "1 0 0 RG 0 0 m 50 50 l S").as_bytes());

        let catalog = "<< /Type /Catalog /Pages 2 0 R >>";
        let pages = "<< /Type /Pages /Kids [3 0 R] /Count 1 >>";
        let header = format!("1 0 2 {} ", catalog.len() + 1);
        let body = format!("{}{} {}", header, catalog, pages);
        push(
            &mut out,
            5,
            stream(&format!("/Type /ObjStm /N 2 /First {}", header.len()), &body).as_bytes(),
        );

        let xref_offset = out.len();
        let mut rows: Vec<[u8; 7]> = Vec::new();
        let be = |v: usize| (v as u32).to_be_bytes();
        rows.push([0, 0, 0, 0, 0, 0xFF, 0xFF]);
        rows.push([2, 0, 0, 0, 5, 0, 0]);
        rows.push([2, 0, 0, 0, 5, 0, 1]);
        for id in 3..=5 {
            let o = be(offsets[id]);
            rows.push([1, o[0], o[1], o[2], o[3], 0, 0]);
        }
        let o = be(xref_offset);
        rows.push([1, o[0], o[1], o[2], o[3], 0, 0]);
        let data: Vec<u8> = rows.concat();

        out.extend_from_slice(
            format!(
                "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&data);
        out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        out
    }

    #[test]
    fn test_object_streams_are_expanded() {
        let doc = Document::parse(&pdf_with_object_stream(), &strict()).unwrap();
        assert_eq!(doc.version(), "1.5");
        assert_eq!(doc.page_count(), 1);
        assert!(doc.get(ObjectRef::new(1, 0)).unwrap().has_type("Catalog"));
        assert!(doc.get(ObjectRef::new(5, 0)).is_none());
        assert!(doc.get(ObjectRef::new(6, 0)).is_none());
    }

    #[test]
    fn test_serialized_output_uses_classic_table() {
        let doc = Document::parse(&pdf_with_object_stream(), &strict()).unwrap();
        let bytes = doc.serialize().unwrap();
        assert!(common::contains(&bytes, b"\nxref\n0 "));
        assert!(!common::contains(&bytes, b"/ObjStm"));

        let reparsed = Document::parse(&bytes, &strict()).unwrap();
        assert_eq!(page_contents(&reparsed), page_contents(&doc));
        assert_eq!(reparsed.page(0).unwrap().media_box().width, 200.0);
    }
}

mod malformed {
    use super::*;

    #[test]
    fn test_not_a_pdf() {
        let err = Document::parse(b"GIF89a this is an image", &strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_truncated_file() {
        let bytes = sample_pdf(&[A4]);
        let err = Document::parse(&bytes[..bytes.len() / 2], &strict()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_truncated_file_recovers_in_lenient_mode() {
        let mut bytes = sample_pdf(&[A4, LETTER]);
        let xref = bytes.windows(6).rposition(|w| w == b"\nxref\n").unwrap();
        bytes.truncate(xref + 1);
        assert!(Document::parse(&bytes, &strict()).is_err());

        let doc = Document::parse(&bytes, &ParseOptions::lenient()).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_missing_content_stream() {
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] /Contents 9 0 R >>".to_string(),
        ];
        let bytes = pdf_from_objects(&objects);
        let err = Document::parse(&bytes, &strict()).unwrap_err();
        assert!(matches!(err, Error::InvalidPdf(_)));

        let doc = Document::parse(&bytes, &ParseOptions::lenient()).unwrap();
        assert!(doc.page(0).unwrap().content_refs().is_empty());
    }

    #[test]
    fn test_subsection_numbers_past_u32() {
        assert_eq!(Document::parse(&pdf_with_xref_start("0"), &strict()).unwrap().page_count(), 1);
        for first in ["18446744073709551615", "4294967295"] {
            let err = Document::parse(&pdf_with_xref_start(first), &strict()).unwrap_err();
            assert!(matches!(err, Error::InvalidXref(_)), "{}: {:?}", first, err);
            assert_eq!(err.kind(), ErrorKind::MalformedDocument);
        }
    }

    #[test]
    fn test_xref_stream_index_past_u32() {
        assert!(Document::parse(&pdf_with_xref_stream(""), &strict()).is_ok());
        let err = Document::parse(&pdf_with_xref_stream("/Index [4294967295 2]"), &strict()).unwrap_err();
        assert!(matches!(err, Error::InvalidXref(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_xref_stream_negative_predictor_columns() {
        let bytes = pdf_with_xref_stream("/DecodeParms << /Predictor 12 /Columns -1 >>");
        let err = Document::parse(&bytes, &strict()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }
}

proptest! {
    #[test]
    fn prop_strings_survive_serialization(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let serializer = ObjectSerializer::compact();
        let mut bytes = serializer.serialize(&Object::String(data.clone()));
        bytes.push(b' ');
        let (_, parsed) = parse_object(&bytes).unwrap();
        prop_assert_eq!(parsed, Object::String(data));
    }

    #[test]
    fn prop_names_survive_serialization(name in "[\\x{21}-\\x{FF}]{1,24}") {
        let serializer = ObjectSerializer::compact();
        let mut bytes = serializer.serialize(&Object::Name(name.clone()));
        bytes.push(b' ');
        let (_, parsed) = parse_object(&bytes).unwrap();
        prop_assert_eq!(parsed, Object::Name(name));
    }
}
