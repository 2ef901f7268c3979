//! Standard Security Handler.
//!
//! Reading: [`EncryptionHandler`] authenticates a user or owner password and
//! decrypts strings and streams as objects are loaded, so a parsed
//! [`Document`](crate::document::Document) is always plaintext.
//!
//! Writing: [`apply_encryption`] derives the keys, adds the `/Encrypt`
//! dictionary and attaches an [`EncryptionState`] to the document. The
//! objects stay plaintext in memory; the writer encrypts them on the way out.
//!
//! Supported revisions:
//!
//! - R2 (V1): RC4, 40-bit key
//! - R3 (V2): RC4, 128-bit key
//! - R4 (V4): RC4 or AES-128 through crypt filters
//! - R6 (V5): AES-256, SHA-2 based password hash

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use md5::{Digest, Md5};
use sha2::Sha256;

mod aes;
mod algorithms;
mod handler;
mod params;
mod rc4;
mod write_handler;

pub use handler::EncryptionHandler;
pub use params::{EncryptionAlgorithm, EncryptionParams, Permissions};
pub use write_handler::EncryptionState;

/// Cipher applied to one class of data (strings or streams).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// Data is stored in the clear
    Identity,
    /// RC4 with a per-object key
    Rc4,
    /// AES-128 CBC with a per-object key
    AesV2,
    /// AES-256 CBC with the file key
    AesV3,
}

/// Parsed `/Encrypt` dictionary.
#[derive(Debug, Clone)]
pub struct EncryptDict {
    /// Security handler name (`/Filter`)
    pub filter: String,
    /// `/V`
    pub version: u32,
    /// `/R`
    pub revision: u32,
    /// Key length in bits (`/Length`)
    pub length: Option<u32>,
    /// `/O`
    pub owner_hash: Vec<u8>,
    /// `/U`
    pub user_hash: Vec<u8>,
    /// `/OE` (R6)
    pub owner_key: Option<Vec<u8>>,
    /// `/UE` (R6)
    pub user_key: Option<Vec<u8>>,
    /// `/Perms` (R6)
    pub perms: Option<Vec<u8>>,
    /// `/P`
    pub permissions: i32,
    /// `/EncryptMetadata`, true when absent
    pub encrypt_metadata: bool,
    /// Method for streams (`/StmF`)
    pub stream_method: CryptMethod,
    /// Method for strings (`/StrF`)
    pub string_method: CryptMethod,
    /// Key length in bytes taken from the crypt filter (V4)
    pub filter_key_len: Option<usize>,
}

impl EncryptDict {
    /// Parse an `/Encrypt` dictionary.
    pub fn from_object(obj: &Object) -> Result<Self> {
        let dict = obj
            .as_dict()
            .ok_or_else(|| Error::InvalidPdf("Encrypt entry is not a dictionary".to_string()))?;

        let filter = dict
            .get("Filter")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /Filter".to_string()))?
            .to_string();
        if filter != "Standard" {
            return Err(Error::Unsupported(format!("security handler /{}", filter)));
        }

        let int = |key: &str| dict.get(key).and_then(|o| o.as_integer());
        let bytes = |key: &str| dict.get(key).and_then(|o| o.as_string()).map(|s| s.to_vec());

        let version = int("V").unwrap_or(0) as u32;
        let revision = int("R")
            .ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /R".to_string()))?
            as u32;
        let owner_hash =
            bytes("O").ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /O".to_string()))?;
        let user_hash =
            bytes("U").ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /U".to_string()))?;
        let permissions = int("P")
            .ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /P".to_string()))?
            as i32;
        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|o| o.as_bool())
            .unwrap_or(true);

        let (stream_method, string_method, filter_key_len) = match version {
            1 | 2 => (CryptMethod::Rc4, CryptMethod::Rc4, None),
            4 | 5 => {
                let (stm, stm_len) = crypt_filter_method(dict, "StmF")?;
                let (str_, str_len) = crypt_filter_method(dict, "StrF")?;
                (stm, str_, stm_len.or(str_len))
            },
            v => return Err(Error::Unsupported(format!("encryption /V {}", v))),
        };

        Ok(Self {
            filter,
            version,
            revision,
            length: int("Length").map(|l| l as u32),
            owner_hash,
            user_hash,
            owner_key: bytes("OE"),
            user_key: bytes("UE"),
            perms: bytes("Perms"),
            permissions,
            encrypt_metadata,
            stream_method,
            string_method,
            filter_key_len,
        })
    }

    /// File key length in bytes for revisions 2 to 4.
    pub fn key_len(&self) -> usize {
        match self.version {
            1 => 5,
            4 => self.filter_key_len.unwrap_or(16),
            _ => self
                .length
                .map(|bits| (bits as usize / 8).clamp(5, 16))
                .unwrap_or(5),
        }
    }
}

/// Resolve `/StmF` or `/StrF` through `/CF`.
fn crypt_filter_method(dict: &Dict, key: &str) -> Result<(CryptMethod, Option<usize>)> {
    let name = dict.get(key).and_then(|o| o.as_name()).unwrap_or("Identity");
    if name == "Identity" {
        return Ok((CryptMethod::Identity, None));
    }
    let filter = dict
        .get("CF")
        .and_then(|cf| cf.as_dict())
        .and_then(|cf| cf.get(name))
        .and_then(|f| f.as_dict())
        .ok_or_else(|| Error::InvalidPdf(format!("crypt filter /{} not defined in /CF", name)))?;

    // Some writers put bits here instead of bytes
    let len = filter
        .get("Length")
        .and_then(|l| l.as_integer())
        .map(|l| if l > 32 { l as usize / 8 } else { l as usize });

    let method = match filter.get("CFM").and_then(|o| o.as_name()).unwrap_or("None") {
        "None" => CryptMethod::Identity,
        "V2" => CryptMethod::Rc4,
        "AESV2" => CryptMethod::AesV2,
        "AESV3" => CryptMethod::AesV3,
        other => return Err(Error::Unsupported(format!("crypt filter method /{}", other))),
    };
    Ok((method, len))
}

/// Fresh random bytes for salts, IVs and file keys.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 32);
    let mut counter = 0u64;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(counter.to_le_bytes());
        hasher.update(
            chrono::Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}

/// First element of a new `/ID`: MD5 over the current time, a random UUID and
/// the object count.
pub fn generate_file_id(object_count: usize) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(chrono::Utc::now().to_rfc3339().as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update((object_count as u64).to_le_bytes());
    hasher.finalize().to_vec()
}

fn crypt_filter(cfm: &str, len: i64) -> Object {
    Object::dict([(
        "StdCF",
        Object::dict([
            ("Type", Object::name("CryptFilter")),
            ("CFM", Object::name(cfm)),
            ("AuthEvent", Object::name("DocOpen")),
            ("Length", Object::Integer(len)),
        ]),
    )])
}

/// Encrypt `doc` on its next serialization.
///
/// Validates `params`, makes sure the trailer carries a file identifier, builds
/// the `/Encrypt` dictionary as a new indirect object and attaches the derived
/// [`EncryptionState`]. Calling it again replaces the previous settings.
pub fn apply_encryption(doc: &mut Document, params: &EncryptionParams) -> Result<()> {
    params.validate()?;
    let algorithm = params.algorithm;
    let p = params.permissions.p_value();

    let file_id = match doc.trailer().id.as_ref() {
        Some((first, _)) if !first.is_empty() => first.clone(),
        _ => {
            let id = generate_file_id(doc.object_count());
            doc.trailer_mut().id = Some((id.clone(), id.clone()));
            id
        },
    };

    let mut dict = Dict::new();
    dict.insert("Filter".to_string(), Object::name("Standard"));
    dict.insert("V".to_string(), Object::Integer(algorithm.version()));
    dict.insert("R".to_string(), Object::Integer(i64::from(algorithm.revision())));
    dict.insert("Length".to_string(), Object::Integer(algorithm.key_len() as i64 * 8));
    dict.insert("P".to_string(), Object::Integer(i64::from(p)));

    let file_key = if algorithm == EncryptionAlgorithm::Aes256 {
        let key_bytes = random_bytes(32 + 32 + 4);
        let mut file_key = [0u8; 32];
        file_key.copy_from_slice(&key_bytes[..32]);
        let mut salts = [0u8; 32];
        salts.copy_from_slice(&key_bytes[32..64]);
        let mut tail = [0u8; 4];
        tail.copy_from_slice(&key_bytes[64..68]);

        let values = algorithms::compute_r6_values(
            &params.user_password,
            params.effective_owner_password(),
            &file_key,
            p,
            params.encrypt_metadata,
            &salts,
            &tail,
        )?;
        dict.insert("O".to_string(), Object::String(values.o));
        dict.insert("U".to_string(), Object::String(values.u));
        dict.insert("OE".to_string(), Object::String(values.oe));
        dict.insert("UE".to_string(), Object::String(values.ue));
        dict.insert("Perms".to_string(), Object::String(values.perms));
        file_key.to_vec()
    } else {
        let user = params::legacy_password_bytes(&params.user_password);
        let owner = params::legacy_password_bytes(params.effective_owner_password());
        let revision = algorithm.revision();
        let owner_hash = algorithms::compute_owner_hash(&owner, &user, revision, algorithm.key_len());
        let inputs = algorithms::LegacyKeyInputs {
            owner_hash: &owner_hash,
            permissions: p,
            file_id: &file_id,
            revision,
            key_len: algorithm.key_len(),
            encrypt_metadata: params.encrypt_metadata,
        };
        let file_key = algorithms::compute_file_key(&user, &inputs);
        let user_hash = algorithms::compute_user_hash(&file_key, revision, &file_id);
        dict.insert("O".to_string(), Object::String(owner_hash));
        dict.insert("U".to_string(), Object::String(user_hash));
        file_key
    };

    match algorithm {
        EncryptionAlgorithm::Aes128 => {
            dict.insert("CF".to_string(), crypt_filter("AESV2", 16));
        },
        EncryptionAlgorithm::Aes256 => {
            dict.insert("CF".to_string(), crypt_filter("AESV3", 32));
        },
        _ => {},
    }
    if algorithm.is_aes() {
        dict.insert("StmF".to_string(), Object::name("StdCF"));
        dict.insert("StrF".to_string(), Object::name("StdCF"));
        dict.insert("EncryptMetadata".to_string(), Object::Boolean(params.encrypt_metadata));
    }

    if let Some(old) = doc.trailer().encrypt {
        log::debug!("Replacing previous encryption dictionary {}", old);
    }
    let encrypt_ref = doc.add_object(Object::Dictionary(dict));
    doc.trailer_mut().encrypt = Some(encrypt_ref);
    doc.require_version(algorithm.min_pdf_version());
    doc.set_encryption(Some(EncryptionState::new(
        file_key,
        algorithm,
        params.encrypt_metadata,
        encrypt_ref,
    )));

    log::info!("Document will be encrypted with {} (/P {})", algorithm, p);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rc4_dict() {
        let obj = Object::dict([
            ("Filter", Object::name("Standard")),
            ("V", Object::Integer(2)),
            ("R", Object::Integer(3)),
            ("Length", Object::Integer(128)),
            ("O", Object::String(vec![0; 32])),
            ("U", Object::String(vec![0; 32])),
            ("P", Object::Integer(-4)),
        ]);
        let dict = EncryptDict::from_object(&obj).unwrap();
        assert_eq!(dict.key_len(), 16);
        assert_eq!(dict.stream_method, CryptMethod::Rc4);
        assert!(dict.encrypt_metadata);
    }

    #[test]
    fn test_parse_aesv2_crypt_filter() {
        let obj = Object::dict([
            ("Filter", Object::name("Standard")),
            ("V", Object::Integer(4)),
            ("R", Object::Integer(4)),
            ("O", Object::String(vec![0; 32])),
            ("U", Object::String(vec![0; 32])),
            ("P", Object::Integer(-4)),
            ("CF", crypt_filter("AESV2", 16)),
            ("StmF", Object::name("StdCF")),
            ("StrF", Object::name("Identity")),
        ]);
        let dict = EncryptDict::from_object(&obj).unwrap();
        assert_eq!(dict.stream_method, CryptMethod::AesV2);
        assert_eq!(dict.string_method, CryptMethod::Identity);
        assert_eq!(dict.key_len(), 16);
    }

    #[test]
    fn test_public_key_handler_unsupported() {
        let obj = Object::dict([("Filter", Object::name("Adobe.PubSec"))]);
        match EncryptDict::from_object(&obj) {
            Err(e) => assert_eq!(e.kind(), crate::error::ErrorKind::UnsupportedFeature),
            Ok(_) => panic!("public-key handler accepted"),
        }
    }

    #[test]
    fn test_random_bytes_differ() {
        let a = random_bytes(40);
        assert_eq!(a.len(), 40);
        assert_ne!(a, random_bytes(40));
    }

    #[test]
    fn test_file_id_is_md5_sized() {
        assert_eq!(generate_file_id(3).len(), 16);
    }
}
