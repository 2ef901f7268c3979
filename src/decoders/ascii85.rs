//! ASCII85Decode (base-85).
//!
//! Five characters in `!`..=`u` encode four bytes; `z` stands for four zero
//! bytes; `~>` ends the data. A final partial group of n characters yields n - 1
//! bytes.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCII85Decode filter.
pub struct Ascii85Decoder;

fn push_digit(acc: u32, digit: u8) -> Result<u32> {
    acc.checked_mul(85)
        .and_then(|v| v.checked_add(u32::from(digit)))
        .ok_or_else(|| Error::Decode("ASCII85Decode: group value overflows 32 bits".to_string()))
}

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let input = input.strip_prefix(b"<~").unwrap_or(input);
        let mut output = Vec::with_capacity(input.len() * 4 / 5 + 4);
        let mut acc: u32 = 0;
        let mut count = 0usize;

        for &byte in input {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0; 4]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ))
                },
                b'!'..=b'u' => {
                    acc = push_digit(acc, byte - b'!')?;
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&acc.to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                c if crate::lexer::is_pdf_whitespace(c) => {},
                other => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character 0x{:02x}",
                        other
                    )))
                },
            }
        }

        match count {
            0 => {},
            1 => {
                return Err(Error::Decode(
                    "ASCII85Decode: final group has a single character".to_string(),
                ))
            },
            _ => {
                for _ in count..5 {
                    acc = push_digit(acc, 84)?;
                }
                output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
            },
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}
