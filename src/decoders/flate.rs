//! FlateDecode (zlib/deflate).
//!
//! Decoding tries, in order: zlib via flate2, raw deflate, the `inflate` crate,
//! then `libflate`. Partial output from a truncated stream is accepted with a
//! warning. Anything that no strategy can decompress is an error; raw bytes are
//! never passed off as decoded data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use inflate::inflate_bytes_zlib;
use libflate::zlib::Decoder as LibflateDecoder;
use std::io::{Read, Write};

/// FlateDecode filter.
pub struct FlateDecoder;

fn read_all(mut reader: impl Read, what: &str) -> Option<Vec<u8>> {
    let mut output = Vec::new();
    match reader.read_to_end(&mut output) {
        Ok(_) => Some(output),
        Err(e) if !output.is_empty() => {
            log::warn!("{}: partial recovery of {} bytes ({})", what, output.len(), e);
            Some(output)
        },
        Err(e) => {
            log::debug!("{} failed: {}", what, e);
            None
        },
    }
}

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        if let Some(out) = read_all(ZlibDecoder::new(input), "zlib") {
            return Ok(out);
        }
        if let Some(out) = read_all(DeflateDecoder::new(input), "raw deflate") {
            return Ok(out);
        }
        if input.len() > 2 {
            if let Some(out) = read_all(DeflateDecoder::new(&input[2..]), "deflate after header") {
                if !out.is_empty() {
                    return Ok(out);
                }
            }
        }
        match inflate_bytes_zlib(input) {
            Ok(out) => return Ok(out),
            Err(e) => log::debug!("inflate failed: {}", e),
        }
        if let Ok(decoder) = LibflateDecoder::new(input) {
            if let Some(out) = read_all(decoder, "libflate") {
                if !out.is_empty() {
                    return Ok(out);
                }
            }
        }

        Err(Error::Decode(format!(
            "FlateDecode: {} bytes could not be decompressed",
            input.len()
        )))
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

/// Compress `data` with zlib at the default level.
pub fn encode_flate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flate_decode_simple() {
        let compressed = encode_flate(b"Hello, FlateDecode!").unwrap();
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), b"Hello, FlateDecode!");
    }

    #[test]
    fn test_flate_decode_empty() {
        let compressed = encode_flate(b"").unwrap();
        assert!(FlateDecoder.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_flate_decode_large_data() {
        let original = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".repeat(1000);
        let compressed = encode_flate(&original).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_flate_decode_raw_deflate() {
        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"q 1 0 0 1 0 0 cm Q").unwrap();
        let raw = encoder.finish().unwrap();
        assert_eq!(FlateDecoder.decode(&raw).unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    #[test]
    fn test_flate_decode_invalid_data() {
        let result = FlateDecoder.decode(b"This is not zlib compressed data");
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
