//! Cross-reference reconstruction for damaged files.
//!
//! Only used when [`ParseOptions::recover_xref`](crate::parser_config::ParseOptions)
//! is set. Scans the whole file for `N G obj` headers that start a parsable
//! object. Later occurrences of the same object number replace earlier ones,
//! matching the way incremental updates append new versions.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser::{parse_indirect_object, parse_object};
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_OBJ_HEADER: Regex =
        Regex::new(r"(?:^|[\s\x00])([0-9]{1,10})[ \t\r\n\x00\x0c]+([0-9]{1,5})[ \t\r\n\x00\x0c]+obj")
            .unwrap_or_else(|e| panic!("object header pattern: {}", e));
    static ref RE_TRAILER: Regex =
        Regex::new(r"trailer[ \t\r\n\x00\x0c]*<<").unwrap_or_else(|e| panic!("trailer pattern: {}", e));
}

/// Rebuild a cross-reference table by scanning `data`.
///
/// The trailer comes from the last parsable `trailer` dictionary that names a
/// `/Root`; failing that, a trailer is synthesized around the last object with
/// `/Type /Catalog`.
pub fn reconstruct_xref(data: &[u8]) -> Result<CrossRefTable> {
    log::info!("Reconstructing cross-reference table from {} bytes", data.len());

    let mut table = CrossRefTable::new();
    let mut catalog: Option<ObjectRef> = None;
    let mut max_id = 0u32;

    for caps in RE_OBJ_HEADER.captures_iter(data) {
        let (Some(id_m), Some(gen_m)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let number = |m: regex::bytes::Match<'_>| -> Option<u64> {
            std::str::from_utf8(m.as_bytes()).ok()?.parse().ok()
        };
        let (Some(id), Some(gen)) = (number(id_m), number(gen_m)) else {
            continue;
        };
        if id > u64::from(u32::MAX) || gen > u64::from(u16::MAX) {
            continue;
        }

        let offset = id_m.start();
        match parse_indirect_object(&data[offset..]) {
            Ok((_, (r, obj))) => {
                if obj.has_type("Catalog") {
                    catalog = Some(r);
                }
                max_id = max_id.max(r.id);
                table.insert(r.id, XRefEntry::InFile { offset, gen: r.gen });
            },
            Err(_) => log::debug!("Skipping unparsable object header at {}", offset),
        }
    }

    if table.is_empty() {
        return Err(Error::InvalidXref("no objects found while scanning".to_string()));
    }

    let trailer = RE_TRAILER
        .find_iter(data)
        .filter_map(|m| {
            let start = m.end() - 2;
            match parse_object(&data[start..]) {
                Ok((_, Object::Dictionary(d))) if d.contains_key("Root") => Some(d),
                _ => None,
            }
        })
        .last();

    let trailer = match (trailer, catalog) {
        (Some(mut t), _) => {
            t.remove("Prev");
            t.remove("XRefStm");
            t
        },
        (None, Some(root)) => {
            log::warn!("No usable trailer, using catalog {}", root);
            let mut t = Dict::new();
            t.insert("Root".to_string(), Object::Reference(root));
            t.insert("Size".to_string(), Object::Integer(i64::from(max_id) + 1));
            t
        },
        (None, None) => {
            return Err(Error::InvalidXref(
                "no trailer and no catalog found while scanning".to_string(),
            ))
        },
    };
    table.set_trailer(trailer);

    log::info!("Reconstructed {} cross-reference entries", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_without_xref() {
        let pdf = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
%%EOF\n";
        let table = reconstruct_xref(pdf).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.trailer().get("Root"),
            Some(&Object::Reference(ObjectRef::new(1, 0)))
        );
        match table.get(2) {
            Some(XRefEntry::InFile { offset, .. }) => assert!(pdf[*offset..].starts_with(b"2 0 obj")),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_later_definition_wins() {
        let pdf = b"%PDF-1.4\n\
1 0 obj\n(old)\nendobj\n\
1 0 obj\n(new)\nendobj\n\
trailer\n<< /Root 1 0 R /Size 2 >>\n";
        let table = reconstruct_xref(pdf).unwrap();
        match table.get(1) {
            Some(XRefEntry::InFile { offset, .. }) => {
                assert!(pdf[*offset..].starts_with(b"1 0 obj\n(new)"))
            },
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_no_objects_is_error() {
        assert!(matches!(
            reconstruct_xref(b"%PDF-1.4\njunk"),
            Err(Error::InvalidXref(_))
        ));
    }
}
