//! PDF object types.

use crate::error::{Error, Result};
use crate::parser_config::ParseOptions;
use std::collections::HashMap;

const MAX_PREDICTOR_COLUMNS: i64 = 1 << 24;
const MAX_PREDICTOR_COLORS: i64 = 32;

/// Dictionary payload shared by dictionaries and stream headers.
pub type Dict = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dict),
    /// Stream (dictionary + raw, still-encoded data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Stream data exactly as stored in the file (filters not applied)
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Identifier of an indirect object.
///
/// Ordering is by object number, then generation, which is the order objects are
/// written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Build a dictionary object from key/value pairs.
    pub fn dict<'a>(entries: impl IntoIterator<Item = (&'a str, Object)>) -> Self {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an integer or real.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for both Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Whether this is a dictionary (or stream) with the given `/Type`.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.as_dict()
            .and_then(|d| d.get("Type"))
            .and_then(|t| t.as_name())
            .is_some_and(|t| t == type_name)
    }

    /// Collect every indirect reference held anywhere inside this object.
    pub fn collect_references(&self, out: &mut Vec<ObjectRef>) {
        match self {
            Object::Reference(r) => out.push(*r),
            Object::Array(items) => items.iter().for_each(|o| o.collect_references(out)),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                dict.values().for_each(|o| o.collect_references(out))
            },
            _ => {},
        }
    }

    /// Decode stream data using the filters named in the stream dictionary.
    ///
    /// Decompression limits come from `options`.
    pub fn decode_stream_data(&self, options: &ParseOptions) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();

                if filters.is_empty() {
                    return Ok(data.to_vec());
                }

                let decode_params = extract_decode_params(dict.get("DecodeParms"))?;
                crate::decoders::decode_stream_with_options(
                    data,
                    &filters,
                    decode_params.as_ref(),
                    Some(options),
                )
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

/// Extract filter names from a Filter object.
///
/// The Filter entry is either a single name or an array of names.
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

/// Extract predictor parameters from a DecodeParms entry.
///
/// Out-of-range `Columns`, `Colors` or `BitsPerComponent` are a decode error.
fn extract_decode_params(params_obj: Option<&Object>) -> Result<Option<crate::decoders::DecodeParams>> {
    let dict = match params_obj {
        Some(Object::Dictionary(d)) => d,
        Some(Object::Array(arr)) => match arr.iter().find_map(|obj| obj.as_dict()) {
            Some(d) => d,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    let int = |key: &str, default: i64| dict.get(key).and_then(|o| o.as_integer()).unwrap_or(default);
    let bounded = |key: &str, default: i64, max: i64| -> Result<usize> {
        match int(key, default) {
            n if (1..=max).contains(&n) => Ok(n as usize),
            n => Err(Error::Decode(format!("/{} {} outside 1..={}", key, n, max))),
        }
    };

    let bits_per_component = bounded("BitsPerComponent", 8, 16)?;
    if !matches!(bits_per_component, 1 | 2 | 4 | 8 | 16) {
        return Err(Error::Decode(format!("/BitsPerComponent {} is not 1, 2, 4, 8 or 16", bits_per_component)));
    }

    Ok(Some(crate::decoders::DecodeParams {
        predictor: int("Predictor", 1),
        columns: bounded("Columns", 1, MAX_PREDICTOR_COLUMNS)?,
        colors: bounded("Colors", 1, MAX_PREDICTOR_COLORS)?,
        bits_per_component,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_accessors() {
        assert_eq!(Object::Integer(42).as_integer(), Some(42));
        assert_eq!(Object::name("Type").as_name(), Some("Type"));
        assert_eq!(Object::Boolean(true).as_bool(), Some(true));
        assert_eq!(Object::String(b"Hello".to_vec()).as_string(), Some(&b"Hello"[..]));
        assert!(Object::Null.is_null());
        assert!(Object::Integer(1).as_name().is_none());
    }

    #[test]
    fn test_as_number_accepts_int_and_real() {
        assert_eq!(Object::Integer(612).as_number(), Some(612.0));
        assert_eq!(Object::Real(841.89).as_number(), Some(841.89));
        assert_eq!(Object::name("A4").as_number(), None);
    }

    #[test]
    fn test_stream_is_also_a_dict() {
        let mut dict = Dict::new();
        dict.insert("Length".to_string(), Object::Integer(100));
        let mut obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"stream data"),
        };

        assert_eq!(obj.as_dict().unwrap().get("Length").unwrap().as_integer(), Some(100));
        obj.as_dict_mut()
            .unwrap()
            .insert("Filter".to_string(), Object::name("FlateDecode"));
        assert!(obj.as_dict().unwrap().contains_key("Filter"));
    }

    #[test]
    fn test_has_type() {
        let page = Object::dict([("Type", Object::name("Page"))]);
        assert!(page.has_type("Page"));
        assert!(!page.has_type("Pages"));
        assert!(!Object::Integer(3).has_type("Page"));
    }

    #[test]
    fn test_collect_references_walks_nested_values() {
        let obj = Object::dict([
            ("Parent", Object::Reference(ObjectRef::new(2, 0))),
            (
                "Kids",
                Object::Array(vec![
                    Object::Reference(ObjectRef::new(3, 0)),
                    Object::dict([("Font", Object::Reference(ObjectRef::new(7, 1)))]),
                ]),
            ),
        ]);
        let mut refs = Vec::new();
        obj.collect_references(&mut refs);
        refs.sort();
        assert_eq!(
            refs,
            vec![ObjectRef::new(2, 0), ObjectRef::new(3, 0), ObjectRef::new(7, 1)]
        );
    }

    #[test]
    fn test_object_ref_ordering_and_display() {
        assert!(ObjectRef::new(1, 5) < ObjectRef::new(2, 0));
        assert!(ObjectRef::new(2, 0) < ObjectRef::new(2, 1));
        assert_eq!(format!("{}", ObjectRef::new(10, 0)), "10 0 R");
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let obj = Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from_static(b"Hello"),
        };
        assert_eq!(obj.decode_stream_data(&ParseOptions::default()).unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_filter_array() {
        let mut dict = Dict::new();
        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![Object::name("ASCIIHexDecode")]),
        );
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"48656C6C6F>"),
        };
        assert_eq!(obj.decode_stream_data(&ParseOptions::default()).unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        match Object::Integer(42).decode_stream_data(&ParseOptions::default()) {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            other => panic!("Expected InvalidObjectType error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_filter_names() {
        assert_eq!(extract_filter_names(&Object::name("FlateDecode")), vec!["FlateDecode"]);
        let chain = Object::Array(vec![Object::name("ASCII85Decode"), Object::name("FlateDecode")]);
        assert_eq!(extract_filter_names(&chain), vec!["ASCII85Decode", "FlateDecode"]);
        assert!(extract_filter_names(&Object::Integer(42)).is_empty());
    }

    #[test]
    fn test_extract_decode_params_defaults() {
        let params = Object::dict([("Predictor", Object::Integer(12)), ("Columns", Object::Integer(5))]);
        let parsed = extract_decode_params(Some(&params)).unwrap().unwrap();
        assert_eq!(parsed.predictor, 12);
        assert_eq!(parsed.columns, 5);
        assert_eq!(parsed.colors, 1);
        assert_eq!(parsed.bits_per_component, 8);
    }

    #[test]
    fn test_extract_decode_params_rejects_bad_widths() {
        for (key, value) in [
            ("Columns", -1),
            ("Columns", 0),
            ("Columns", i64::MAX),
            ("Colors", -4),
            ("Colors", 1 << 20),
            ("BitsPerComponent", 3),
            ("BitsPerComponent", -8),
        ] {
            let params = Object::dict([("Predictor", Object::Integer(12)), (key, Object::Integer(value))]);
            assert!(
                matches!(extract_decode_params(Some(&params)), Err(Error::Decode(_))),
                "/{} {}",
                key,
                value
            );
        }
        assert!(extract_decode_params(Some(&Object::Null)).unwrap().is_none());
    }

    #[test]
    fn test_negative_columns_in_stream_is_decode_error() {
        let data = crate::decoders::encode_flate(&[2, 1, 2, 3]).unwrap();
        let stream = Object::Stream {
            dict: [
                ("Filter".to_string(), Object::name("FlateDecode")),
                (
                    "DecodeParms".to_string(),
                    Object::dict([("Predictor", Object::Integer(12)), ("Columns", Object::Integer(-1))]),
                ),
            ]
            .into_iter()
            .collect(),
            data: data.into(),
        };
        let err = stream.decode_stream_data(&ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
