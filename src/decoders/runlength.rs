//! RunLengthDecode.
//!
//! Length byte 0..=127 copies the next n + 1 bytes, 129..=255 repeats the next
//! byte 257 - n times, 128 ends the data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// RunLengthDecode filter.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 2);
        let mut i = 0;

        while let Some(&length) = input.get(i) {
            i += 1;
            match length {
                0..=127 => {
                    let count = usize::from(length) + 1;
                    let run = input.get(i..i + count).ok_or_else(|| {
                        Error::Decode(format!(
                            "RunLengthDecode: literal run of {} bytes overruns the data",
                            count
                        ))
                    })?;
                    output.extend_from_slice(run);
                    i += count;
                },
                128 => break,
                _ => {
                    let byte = *input.get(i).ok_or_else(|| {
                        Error::Decode("RunLengthDecode: missing byte for repeat run".to_string())
                    })?;
                    i += 1;
                    output.resize(output.len() + 257 - usize::from(length), byte);
                },
            }
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_repeat_runs() {
        let input = [2, b'a', b'b', b'c', 254, b'z', 128, b'x'];
        assert_eq!(RunLengthDecoder.decode(&input).unwrap(), b"abczzz");
    }

    #[test]
    fn test_truncated_literal_run() {
        assert!(RunLengthDecoder.decode(&[5, b'a']).is_err());
    }

    #[test]
    fn test_missing_repeat_byte() {
        assert!(RunLengthDecoder.decode(&[200]).is_err());
    }
}
