//! LZWDecode.
//!
//! PDF LZW is MSB-first with 9..=12 bit codes, clear code 256, end-of-data 257,
//! and (by default) `EarlyChange` 1: the code width grows one code early. The
//! `weezl` decoder in TIFF mode handles the common case; a hand-rolled table
//! decoder covers streams that weezl rejects.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// LZWDecode filter.
pub struct LzwDecoder;

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        match decoder.decode(input) {
            Ok(output) => Ok(output),
            Err(e) => {
                log::debug!("weezl LZW decode failed ({:?}), using table decoder", e);
                decode_lzw_table(input)
            },
        }
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

const CLEAR_CODE: usize = 256;
const EOD_CODE: usize = 257;
const FIRST_CODE: usize = 258;
const MAX_CODE_BITS: u32 = 12;

fn fresh_table() -> Vec<Vec<u8>> {
    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    // Placeholders for the clear and end-of-data codes
    table.push(Vec::new());
    table.push(Vec::new());
    table
}

fn decode_lzw_table(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut table = fresh_table();
    let mut code_bits = 9;
    let mut reader = BitReader::new(input);
    let mut prev: Option<usize> = None;

    loop {
        if code_bits < MAX_CODE_BITS && table.len() + 1 >= 1 << code_bits {
            code_bits += 1;
        }

        let code = match reader.read_bits(code_bits) {
            Some(c) => c as usize,
            None => break,
        };

        match code {
            EOD_CODE => break,
            CLEAR_CODE => {
                table = fresh_table();
                code_bits = 9;
                prev = None;
                continue;
            },
            _ => {},
        }

        let entry = match (table.get(code), prev) {
            (Some(known), _) if code < CLEAR_CODE || code >= FIRST_CODE => known.clone(),
            (None, Some(p)) if code == table.len() => {
                let mut s = table[p].clone();
                s.push(table[p][0]);
                s
            },
            _ => {
                return Err(Error::Decode(format!(
                    "LZWDecode: invalid code {} with {} table entries",
                    code,
                    table.len()
                )))
            },
        };

        output.extend_from_slice(&entry);

        if let Some(p) = prev {
            if table.len() < 1 << MAX_CODE_BITS {
                let mut s = table[p].clone();
                s.push(entry[0]);
                table.push(s);
            }
        }
        prev = Some(code);
    }

    Ok(output)
}

/// MSB-first bit reader.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn read_bits(&mut self, n: u32) -> Option<u32> {
        if self.bit_pos + n as usize > self.data.len() * 8 {
            return None;
        }
        let mut value = 0u32;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            value = (value << 1) | u32::from(bit);
            self.bit_pos += 1;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(data: &[u8]) -> Vec<u8> {
        weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .encode(data)
            .unwrap()
    }

    #[test]
    fn test_lzw_decode_round_trip() {
        let original = b"The quick brown fox jumps over the lazy dog. ".repeat(20);
        assert_eq!(LzwDecoder.decode(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn test_table_decoder_matches_weezl() {
        let original = b"ABCABCABCABCABABABABCCCCCCCC".repeat(50);
        assert_eq!(decode_lzw_table(&encode(&original)).unwrap(), original);
    }

    #[test]
    fn test_table_decoder_hand_encoded() {
        // 9-bit codes: clear, 'A', 'B', end-of-data
        assert_eq!(decode_lzw_table(&[0x80, 0x10, 0x48, 0x50, 0x10]).unwrap(), b"AB");
    }

    #[test]
    fn test_table_decoder_rejects_unknown_code() {
        // 9-bit code 300 with an empty table
        let bits: u16 = 300 << 7;
        assert!(decode_lzw_table(&bits.to_be_bytes()).is_err());
    }
}
