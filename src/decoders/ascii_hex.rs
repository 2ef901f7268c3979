//! ASCIIHexDecode.
//!
//! Whitespace is ignored, `>` ends the data, and an odd final digit is padded
//! with `0`.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter.
pub struct AsciiHexDecoder;

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(Error::Decode(format!(
            "ASCIIHexDecode: invalid hex digit '{}'",
            digit as char
        ))),
    }
}

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let end = input.iter().position(|&c| c == b'>').unwrap_or(input.len());
        let digits: Vec<u8> = input[..end]
            .iter()
            .copied()
            .filter(|c| !crate::lexer::is_pdf_whitespace(*c))
            .collect();

        let mut output = Vec::with_capacity(digits.len() / 2 + 1);
        for pair in digits.chunks(2) {
            let high = hex_value(pair[0])?;
            let low = match pair.get(1) {
                Some(&c) => hex_value(c)?,
                None => 0,
            };
            output.push((high << 4) | low);
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_whitespace_and_eod() {
        assert_eq!(AsciiHexDecoder.decode(b"48 65\n6C 6C 6F>").unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_odd_length() {
        assert_eq!(AsciiHexDecoder.decode(b"486").unwrap(), b"H`");
    }

    #[test]
    fn test_data_after_eod_is_ignored() {
        assert_eq!(AsciiHexDecoder.decode(b"41>zz").unwrap(), b"A");
    }

    #[test]
    fn test_decode_invalid_digit() {
        assert!(AsciiHexDecoder.decode(b"4G").is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert!(AsciiHexDecoder.decode(b"").unwrap().is_empty());
    }
}
