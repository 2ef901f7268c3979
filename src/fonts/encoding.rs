//! WinAnsiEncoding for the standard 14 text fonts.

use crate::error::{Error, Result};
use phf::phf_map;

/// Code points of WinAnsi that differ from Latin-1 (the 0x80..0x9F block).
static WIN_ANSI_HIGH: phf::Map<char, u8> = phf_map! {
    '€' => 0x80, '‚' => 0x82, 'ƒ' => 0x83, '„' => 0x84, '…' => 0x85, '†' => 0x86,
    '‡' => 0x87, 'ˆ' => 0x88, '‰' => 0x89, 'Š' => 0x8A, '‹' => 0x8B, 'Œ' => 0x8C,
    'Ž' => 0x8E, '‘' => 0x91, '’' => 0x92, '“' => 0x93, '”' => 0x94, '•' => 0x95,
    '–' => 0x96, '—' => 0x97, '˜' => 0x98, '™' => 0x99, 'š' => 0x9A, '›' => 0x9B,
    'œ' => 0x9C, 'ž' => 0x9E, 'Ÿ' => 0x9F,
};

/// WinAnsi code for one character, if it has one.
///
/// ```
/// use pdf_seal::fonts::win_ansi_code;
///
/// assert_eq!(win_ansi_code('A'), Some(0x41));
/// assert_eq!(win_ansi_code('é'), Some(0xE9));
/// assert_eq!(win_ansi_code('€'), Some(0x80));
/// assert_eq!(win_ansi_code('한'), None);
/// ```
pub fn win_ansi_code(c: char) -> Option<u8> {
    match u32::from(c) {
        0x20..=0x7E | 0xA0..=0xFF => Some(u32::from(c) as u8),
        _ => WIN_ANSI_HIGH.get(&c).copied(),
    }
}

/// Encode text for a `Tj` operand, failing on the first character outside WinAnsi.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            win_ansi_code(c).ok_or_else(|| {
                Error::Unrenderable(format!(
                    "character {:?} (U+{:04X}) is not available in the standard fonts",
                    c,
                    u32::from(c)
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_identity() {
        assert_eq!(encode_win_ansi("Hello (1)").unwrap(), b"Hello (1)");
    }

    #[test]
    fn test_high_block() {
        assert_eq!(encode_win_ansi("“€”").unwrap(), vec![0x93, 0x80, 0x94]);
        assert_eq!(encode_win_ansi("Ÿ").unwrap(), vec![0x9F]);
    }

    #[test]
    fn test_rejects_controls_and_cjk() {
        assert!(encode_win_ansi("a\tb").is_err());
        match encode_win_ansi("구매자") {
            Err(Error::Unrenderable(msg)) => assert!(msg.contains("U+AD6C")),
            other => panic!("expected Unrenderable, got {:?}", other),
        }
    }
}
