//! Stream filters.
//!
//! Supported: `FlateDecode`, `ASCIIHexDecode`, `ASCII85Decode`, `LZWDecode`,
//! `RunLengthDecode`, followed by an optional PNG or TIFF predictor. Any other
//! filter name is reported as [`Error::UnsupportedFilter`] when decoding is
//! requested; the raw bytes stay untouched otherwise.

use crate::error::{Error, Result};
use crate::parser_config::ParseOptions;

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use flate::{encode_flate, FlateDecoder};
pub use lzw::LzwDecoder;
pub use predictor::{decode_predictor, DecodeParams};
pub use runlength::RunLengthDecoder;

/// A single PDF stream filter.
pub trait StreamDecoder {
    /// Decode `input`.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as written in `/Filter`.
    fn name(&self) -> &str;
}

fn decoder_for(filter_name: &str) -> Result<Box<dyn StreamDecoder>> {
    let decoder: Box<dyn StreamDecoder> = match filter_name {
        "FlateDecode" | "Fl" => Box::new(FlateDecoder),
        "ASCIIHexDecode" | "AHx" => Box::new(AsciiHexDecoder),
        "ASCII85Decode" | "A85" => Box::new(Ascii85Decoder),
        "LZWDecode" | "LZW" => Box::new(LzwDecoder),
        "RunLengthDecode" | "RL" => Box::new(RunLengthDecoder),
        other => return Err(Error::UnsupportedFilter(other.to_string())),
    };
    Ok(decoder)
}

/// Decode with default limits.
pub fn decode_stream(data: &[u8], filters: &[String]) -> Result<Vec<u8>> {
    decode_stream_with_options(data, filters, None, None)
}

/// Run `data` through the filter chain, then the predictor in `params`.
///
/// The decompression ratio and absolute size limits from `options` are checked
/// after every filter. A limit of 0 disables that check.
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
    options: Option<&ParseOptions>,
) -> Result<Vec<u8>> {
    let defaults = ParseOptions::default();
    let options = options.unwrap_or(&defaults);
    let max_ratio = u64::from(options.max_decompression_ratio);
    let max_size = options.max_decompressed_size;

    let compressed_size = data.len().max(1) as u64;
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder = decoder_for(filter_name)?;
        current = decoder.decode(&current)?;

        if max_ratio > 0 && current.len() as u64 / compressed_size > max_ratio {
            return Err(Error::Decode(format!(
                "{}: decompression ratio exceeds {}:1 ({} -> {} bytes)",
                decoder.name(),
                max_ratio,
                data.len(),
                current.len()
            )));
        }
        if max_size > 0 && current.len() > max_size {
            return Err(Error::Decode(format!(
                "{}: decompressed size {} exceeds limit {}",
                decoder.name(),
                current.len(),
                max_size
            )));
        }
    }

    if let Some(params) = params {
        if params.predictor > 1 {
            current = decode_predictor(&current, params)?;
        }
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_is_identity() {
        assert_eq!(decode_stream(b"Hello", &[]).unwrap(), b"Hello");
    }

    #[test]
    fn test_unknown_filter_is_unsupported() {
        match decode_stream(b"\xff\xd8", &["DCTDecode".to_string()]) {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "DCTDecode"),
            other => panic!("expected UnsupportedFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_chain_applies_in_order() {
        // ASCIIHex of the RunLength encoding of "aaaa"
        let data = b"FD61 80>";
        let filters = vec!["ASCIIHexDecode".to_string(), "RunLengthDecode".to_string()];
        assert_eq!(decode_stream(data, &filters).unwrap(), b"aaaa");
    }

    #[test]
    fn test_abbreviated_filter_names() {
        assert_eq!(decode_stream(b"4869>", &["AHx".to_string()]).unwrap(), b"Hi");
    }

    #[test]
    fn test_size_limit_enforced() {
        let compressed = encode_flate(&vec![b'x'; 10_000]).unwrap();
        let options = ParseOptions {
            max_decompression_ratio: 0,
            max_decompressed_size: 1_000,
            ..ParseOptions::default()
        };
        let result =
            decode_stream_with_options(&compressed, &["FlateDecode".to_string()], None, Some(&options));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_ratio_limit_enforced() {
        let compressed = encode_flate(&vec![0u8; 1_000_000]).unwrap();
        let result = decode_stream(&compressed, &["FlateDecode".to_string()]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
