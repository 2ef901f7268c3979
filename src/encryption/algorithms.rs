//! Standard security handler key derivation.
//!
//! Revisions 2 to 4 derive keys from MD5 and RC4 over padded passwords.
//! Revision 6 uses the iterated SHA-2/AES hash and wraps a random file key
//! under password-derived keys.

use super::aes::{cbc_decrypt_no_pad, cbc_encrypt_no_pad};
use super::rc4::rc4_crypt;
use crate::error::{Error, Result};
use crate::object::ObjectRef;
use md5::{Digest, Md5};
use sha2::{Sha256, Sha384, Sha512};

/// Password padding string.
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Inputs shared by revisions 2 to 4.
#[derive(Debug, Clone)]
pub struct LegacyKeyInputs<'a> {
    /// `/O`
    pub owner_hash: &'a [u8],
    /// `/P`
    pub permissions: i32,
    /// First element of the trailer `/ID`
    pub file_id: &'a [u8],
    /// `/R`
    pub revision: u32,
    /// Key length in bytes
    pub key_len: usize,
    /// `/EncryptMetadata`
    pub encrypt_metadata: bool,
}

/// Pad or truncate a password to 32 bytes.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PADDING;
    let n = password.len().min(32);
    padded[..n].copy_from_slice(&password[..n]);
    padded[n..].copy_from_slice(&PADDING[..32 - n]);
    padded
}

fn md5_rounds(seed: &[u8], key_len: usize, revision: u32) -> Vec<u8> {
    let mut hash = Md5::digest(seed).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_len]).to_vec();
        }
    }
    hash.truncate(key_len);
    hash
}

/// File key from a user password (revisions 2 to 4).
pub fn compute_file_key(password: &[u8], inputs: &LegacyKeyInputs<'_>) -> Vec<u8> {
    let mut seed = Vec::with_capacity(32 + 32 + 4 + inputs.file_id.len() + 4);
    seed.extend_from_slice(&pad_password(password));
    seed.extend_from_slice(inputs.owner_hash);
    seed.extend_from_slice(&inputs.permissions.to_le_bytes());
    seed.extend_from_slice(inputs.file_id);
    if inputs.revision >= 4 && !inputs.encrypt_metadata {
        seed.extend_from_slice(&[0xFF; 4]);
    }
    let key_len = if inputs.revision == 2 { 5 } else { inputs.key_len.min(16) };
    md5_rounds(&seed, key_len, inputs.revision)
}

fn owner_rc4_key(owner_password: &[u8], revision: u32, key_len: usize) -> Vec<u8> {
    let key_len = if revision == 2 { 5 } else { key_len.min(16) };
    md5_rounds(&pad_password(owner_password), key_len, revision)
}

fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// The `/O` value (revisions 2 to 4). An empty owner password falls back to the
/// user password.
pub fn compute_owner_hash(owner_password: &[u8], user_password: &[u8], revision: u32, key_len: usize) -> Vec<u8> {
    let owner = if owner_password.is_empty() { user_password } else { owner_password };
    let key = owner_rc4_key(owner, revision, key_len);

    let mut result = rc4_crypt(&key, &pad_password(user_password));
    if revision >= 3 {
        for round in 1..=19u8 {
            result = rc4_crypt(&xor_key(&key, round), &result);
        }
    }
    result
}

/// The `/U` value for a file key (revisions 2 to 4).
pub fn compute_user_hash(file_key: &[u8], revision: u32, file_id: &[u8]) -> Vec<u8> {
    if revision == 2 {
        return rc4_crypt(file_key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut result = hasher.finalize().to_vec();
    for round in 0..20u8 {
        result = rc4_crypt(&xor_key(file_key, round), &result);
    }
    // Arbitrary padding up to 32 bytes
    result.extend_from_slice(&[0u8; 16]);
    result
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a user password; returns the file key on success.
pub fn authenticate_user(password: &[u8], user_hash: &[u8], inputs: &LegacyKeyInputs<'_>) -> Option<Vec<u8>> {
    let key = compute_file_key(password, inputs);
    let expected = compute_user_hash(&key, inputs.revision, inputs.file_id);
    let n = if inputs.revision == 2 { 32 } else { 16 };
    if user_hash.len() >= n && constant_time_eq(&user_hash[..n], &expected[..n]) {
        Some(key)
    } else {
        None
    }
}

/// Check an owner password by recovering the user password from `/O`; returns
/// the file key on success.
pub fn authenticate_owner(password: &[u8], user_hash: &[u8], inputs: &LegacyKeyInputs<'_>) -> Option<Vec<u8>> {
    let key = owner_rc4_key(password, inputs.revision, inputs.key_len);
    let mut user_password = inputs.owner_hash.to_vec();
    if inputs.revision == 2 {
        user_password = rc4_crypt(&key, &user_password);
    } else {
        for round in (0..20u8).rev() {
            user_password = rc4_crypt(&xor_key(&key, round), &user_password);
        }
    }
    authenticate_user(&user_password, user_hash, inputs)
}

/// Key for one object: MD5 of the file key, object number, generation and (for
/// AES) `sAlT`, truncated to `min(n + 5, 16)` bytes.
pub fn object_key(file_key: &[u8], obj: ObjectRef, aes: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&obj.id.to_le_bytes()[..3]);
    hasher.update(&obj.gen.to_le_bytes()[..2]);
    if aes {
        hasher.update(b"sAlT");
    }
    let mut key = hasher.finalize().to_vec();
    key.truncate((file_key.len() + 5).min(16));
    key
}

// ----------------------------------------------------------------------------
// Revision 6
// ----------------------------------------------------------------------------

/// UTF-8 password truncated to 127 bytes.
pub fn r6_password(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(127)]
}

/// Hardened hash of revision 6 (SHA-256, then rounds of AES-128 and SHA-2).
pub fn hash_r6(password: &[u8], salt: &[u8], user_data: &[u8]) -> Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(user_data);
    let mut k = hasher.finalize().to_vec();

    let mut round: u32 = 0;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + user_data.len()));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(user_data);
        }
        let e = cbc_encrypt_no_pad(&k[..16], &k[16..32], &k1)?;

        let selector: u32 = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        let last = u32::from(*e.last().unwrap_or(&0));
        if round >= 64 && last <= round - 32 {
            break;
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    Ok(out)
}

/// Values written into a revision 6 `/Encrypt` dictionary.
#[derive(Debug, Clone)]
pub struct R6Values {
    /// `/U` (48 bytes)
    pub u: Vec<u8>,
    /// `/UE` (32 bytes)
    pub ue: Vec<u8>,
    /// `/O` (48 bytes)
    pub o: Vec<u8>,
    /// `/OE` (32 bytes)
    pub oe: Vec<u8>,
    /// `/Perms` (16 bytes)
    pub perms: Vec<u8>,
}

/// Compute `/U`, `/UE`, `/O`, `/OE` and `/Perms` for a random 32-byte file key.
///
/// `salts` supplies the four 8-byte salts (user validation, user key, owner
/// validation, owner key) and `perms_tail` the four random bytes ending `/Perms`.
pub fn compute_r6_values(
    user_password: &str,
    owner_password: &str,
    file_key: &[u8; 32],
    permissions: i32,
    encrypt_metadata: bool,
    salts: &[u8; 32],
    perms_tail: &[u8; 4],
) -> Result<R6Values> {
    let user = r6_password(user_password);
    let owner = r6_password(owner_password);
    let zero_iv = [0u8; 16];

    let mut u = hash_r6(user, &salts[0..8], &[])?.to_vec();
    u.extend_from_slice(&salts[0..16]);
    let ue = cbc_encrypt_no_pad(&hash_r6(user, &salts[8..16], &[])?, &zero_iv, file_key)?;

    let mut o = hash_r6(owner, &salts[16..24], &u)?.to_vec();
    o.extend_from_slice(&salts[16..32]);
    let oe = cbc_encrypt_no_pad(&hash_r6(owner, &salts[24..32], &u)?, &zero_iv, file_key)?;

    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9..12].copy_from_slice(b"adb");
    block[12..].copy_from_slice(perms_tail);
    // One block under a zero IV is plain ECB
    let perms = cbc_encrypt_no_pad(file_key, &zero_iv, &block)?;

    Ok(R6Values { u, ue, o, oe, perms })
}

/// Authenticate a revision 6 password as user or owner; returns the file key.
pub fn authenticate_r6(password: &str, u: &[u8], ue: &[u8], o: &[u8], oe: &[u8]) -> Result<Option<Vec<u8>>> {
    if u.len() < 48 || o.len() < 48 || ue.len() < 32 || oe.len() < 32 {
        return Err(Error::Encryption("revision 6 /U, /O, /UE or /OE too short".to_string()));
    }
    let pw = r6_password(password);
    let zero_iv = [0u8; 16];

    if constant_time_eq(&hash_r6(pw, &o[32..40], &u[..48])?, &o[..32]) {
        let key = hash_r6(pw, &o[40..48], &u[..48])?;
        return cbc_decrypt_no_pad(&key, &zero_iv, &oe[..32]).map(Some);
    }
    if constant_time_eq(&hash_r6(pw, &u[32..40], &[])?, &u[..32]) {
        let key = hash_r6(pw, &u[40..48], &[])?;
        return cbc_decrypt_no_pad(&key, &zero_iv, &ue[..32]).map(Some);
    }
    Ok(None)
}
