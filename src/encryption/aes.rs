//! AES-CBC for the AESV2 (128-bit) and AESV3 (256-bit) crypt filters.
//!
//! Encrypted strings and streams carry a 16-byte IV in front of the ciphertext
//! and use PKCS#7 padding. The key-derivation helpers for revision 6 need the
//! unpadded variants.

use crate::error::{Error, Result};
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

fn check_lengths(key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != 16 && key.len() != 32 {
        return Err(Error::Encryption(format!("AES key of {} bytes", key.len())));
    }
    if iv.len() != 16 {
        return Err(Error::Encryption(format!("AES IV of {} bytes", iv.len())));
    }
    Ok(())
}

/// CBC-encrypt `data` whose length is already a multiple of 16.
pub fn cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, iv)?;
    if data.len() % 16 != 0 {
        return Err(Error::Encryption("unpadded AES input is not block aligned".to_string()));
    }
    let mut buf = data.to_vec();
    let len = buf.len();
    let failed = |_| Error::Encryption("AES encryption failed".to_string());
    if key.len() == 16 {
        Aes128CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(failed)?;
    } else {
        Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(failed)?;
    }
    Ok(buf)
}

/// CBC-decrypt block-aligned `data` without removing padding.
pub fn cbc_decrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_lengths(key, iv)?;
    if data.len() % 16 != 0 {
        return Err(Error::Encryption(format!(
            "AES ciphertext of {} bytes is not block aligned",
            data.len()
        )));
    }
    let mut buf = data.to_vec();
    let failed = |_| Error::Encryption("AES decryption failed".to_string());
    let len = if key.len() == 16 {
        Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(failed)?
            .len()
    } else {
        Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(failed)?
            .len()
    };
    buf.truncate(len);
    Ok(buf)
}

/// Encrypt with PKCS#7 padding and return `iv || ciphertext`.
pub fn encrypt_with_iv(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    let pad = 16 - data.len() % 16;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);

    let cipher = cbc_encrypt_no_pad(key, iv, &padded)?;
    let mut out = Vec::with_capacity(16 + cipher.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&cipher);
    Ok(out)
}

/// Decrypt `iv || ciphertext` and strip PKCS#7 padding.
///
/// Empty input decrypts to empty output. Inputs shorter than one block after the
/// IV are rejected.
pub fn decrypt_with_iv(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 32 {
        return Err(Error::Encryption(format!(
            "AES payload of {} bytes is shorter than IV plus one block",
            data.len()
        )));
    }
    let (iv, body) = data.split_at(16);
    let mut plain = cbc_decrypt_no_pad(key, iv, body)?;

    let pad = plain.last().copied().unwrap_or(0) as usize;
    let valid = (1..=16).contains(&pad)
        && plain.len() >= pad
        && plain[plain.len() - pad..].iter().all(|&b| b as usize == pad);
    if !valid {
        return Err(Error::Encryption("invalid PKCS#7 padding".to_string()));
    }
    plain.truncate(plain.len() - pad);
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes128_fips_vector() {
        // NIST SP 800-38A F.2.1, first block
        let key = hex("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex("000102030405060708090a0b0c0d0e0f");
        let plain = hex("6bc1bee22e409f96e93d7e117393172a");
        let cipher = cbc_encrypt_no_pad(&key, &iv, &plain).unwrap();
        assert_eq!(cipher, hex("7649abac8119b246cee98e9b12e9197d"));
        assert_eq!(cbc_decrypt_no_pad(&key, &iv, &cipher).unwrap(), plain);
    }

    #[test]
    fn test_padded_round_trip_both_key_sizes() {
        let iv = [7u8; 16];
        for key in [vec![1u8; 16], vec![2u8; 32]] {
            for msg in [&b""[..], b"x", b"exactly 16 bytes", b"a longer string that spans blocks"] {
                let enc = encrypt_with_iv(&key, &iv, msg).unwrap();
                assert_eq!(&enc[..16], &iv);
                assert_eq!((enc.len() - 16) % 16, 0);
                assert_eq!(decrypt_with_iv(&key, &enc).unwrap(), msg);
            }
        }
    }

    #[test]
    fn test_bad_padding_rejected() {
        let key = [3u8; 16];
        let iv = [0u8; 16];
        let mut payload = iv.to_vec();
        payload.extend(cbc_encrypt_no_pad(&key, &iv, &[0u8; 16]).unwrap());
        assert!(decrypt_with_iv(&key, &payload).is_err());
    }

    #[test]
    fn test_wrong_key_length() {
        assert!(cbc_encrypt_no_pad(&[0u8; 5], &[0u8; 16], &[0u8; 16]).is_err());
    }

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }
}
