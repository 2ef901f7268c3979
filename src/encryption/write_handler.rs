//! Encryption applied while a document is serialized.

use super::aes::encrypt_with_iv;
use super::algorithms;
use super::params::EncryptionAlgorithm;
use super::random_bytes;
use super::rc4::rc4_crypt;
use crate::error::Result;
use crate::object::{Object, ObjectRef};

/// File key and cipher attached to a document by
/// [`apply_encryption`](super::apply_encryption).
#[derive(Clone)]
pub struct EncryptionState {
    file_key: Vec<u8>,
    algorithm: EncryptionAlgorithm,
    encrypt_metadata: bool,
    encrypt_dict: ObjectRef,
}

impl std::fmt::Debug for EncryptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionState")
            .field("algorithm", &self.algorithm)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("encrypt_dict", &self.encrypt_dict)
            .finish_non_exhaustive()
    }
}

impl EncryptionState {
    /// Wrap an already derived file key.
    pub fn new(
        file_key: Vec<u8>,
        algorithm: EncryptionAlgorithm,
        encrypt_metadata: bool,
        encrypt_dict: ObjectRef,
    ) -> Self {
        Self {
            file_key,
            algorithm,
            encrypt_metadata,
            encrypt_dict,
        }
    }

    /// Cipher in use.
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// The `/Encrypt` dictionary, which is written unencrypted.
    pub fn encrypt_dict_ref(&self) -> ObjectRef {
        self.encrypt_dict
    }

    fn object_key(&self, obj: ObjectRef) -> Vec<u8> {
        match self.algorithm {
            EncryptionAlgorithm::Aes256 => self.file_key.clone(),
            alg => algorithms::object_key(&self.file_key, obj, alg.is_aes()),
        }
    }

    /// Encrypt one string or stream body belonging to `obj`.
    pub fn encrypt_bytes(&self, obj: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.object_key(obj);
        if self.algorithm.is_aes() {
            let mut iv = [0u8; 16];
            iv.copy_from_slice(&random_bytes(16));
            encrypt_with_iv(&key, &iv, data)
        } else {
            Ok(rc4_crypt(&key, data))
        }
    }

    fn encrypt_strings(&self, obj: ObjectRef, value: &mut Object) -> Result<()> {
        match value {
            Object::String(s) => *s = self.encrypt_bytes(obj, s)?,
            Object::Array(items) => {
                for item in items {
                    self.encrypt_strings(obj, item)?;
                }
            },
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                for v in dict.values_mut() {
                    self.encrypt_strings(obj, v)?;
                }
            },
            _ => {},
        }
        Ok(())
    }

    /// Encrypted copy of indirect object `obj`.
    ///
    /// The `/Encrypt` dictionary and cross-reference streams come back
    /// unchanged. Metadata stream bodies stay readable when metadata encryption
    /// is off.
    pub fn encrypt_object(&self, obj: ObjectRef, value: &Object) -> Result<Object> {
        if obj == self.encrypt_dict || value.has_type("XRef") {
            return Ok(value.clone());
        }
        let mut out = value.clone();
        self.encrypt_strings(obj, &mut out)?;

        let skip_body = !self.encrypt_metadata && value.has_type("Metadata");
        if let Object::Stream { data, .. } = &mut out {
            if !skip_body {
                *data = bytes::Bytes::from(self.encrypt_bytes(obj, data)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::aes::decrypt_with_iv;

    #[test]
    fn test_rc4_is_deterministic() {
        let state = EncryptionState::new(vec![1, 2, 3, 4, 5], EncryptionAlgorithm::Rc4_40, true, ObjectRef::new(9, 0));
        let r = ObjectRef::new(1, 0);
        let a = state.encrypt_bytes(r, b"Hello").unwrap();
        assert_eq!(a, state.encrypt_bytes(r, b"Hello").unwrap());
        assert_ne!(a, state.encrypt_bytes(ObjectRef::new(2, 0), b"Hello").unwrap());
        let key = algorithms::object_key(&[1, 2, 3, 4, 5], r, false);
        assert_eq!(rc4_crypt(&key, &a), b"Hello");
    }

    #[test]
    fn test_aes_uses_fresh_iv() {
        let state = EncryptionState::new(vec![0; 16], EncryptionAlgorithm::Aes128, true, ObjectRef::new(9, 0));
        let r = ObjectRef::new(3, 0);
        let a = state.encrypt_bytes(r, b"same input").unwrap();
        let b = state.encrypt_bytes(r, b"same input").unwrap();
        assert_ne!(a, b);
        let key = algorithms::object_key(&[0; 16], r, true);
        assert_eq!(decrypt_with_iv(&key, &a).unwrap(), b"same input");
    }

    #[test]
    fn test_aes256_uses_file_key() {
        let key = vec![5u8; 32];
        let state = EncryptionState::new(key.clone(), EncryptionAlgorithm::Aes256, true, ObjectRef::new(9, 0));
        let enc = state.encrypt_bytes(ObjectRef::new(1, 0), b"x").unwrap();
        assert_eq!(decrypt_with_iv(&key, &enc).unwrap(), b"x");
    }

    #[test]
    fn test_encrypt_dict_and_metadata_exemptions() {
        let encrypt_ref = ObjectRef::new(9, 0);
        let state = EncryptionState::new(vec![0; 16], EncryptionAlgorithm::Aes128, false, encrypt_ref);

        let dict = Object::dict([("O", Object::String(vec![1; 32]))]);
        assert_eq!(state.encrypt_object(encrypt_ref, &dict).unwrap(), dict);

        let metadata = Object::Stream {
            dict: [("Type".to_string(), Object::name("Metadata"))].into_iter().collect(),
            data: bytes::Bytes::from_static(b"<x:xmpmeta/>"),
        };
        assert_eq!(state.encrypt_object(ObjectRef::new(4, 0), &metadata).unwrap(), metadata);
    }

    #[test]
    fn test_nested_strings_encrypted() {
        let state = EncryptionState::new(vec![7; 16], EncryptionAlgorithm::Rc4_128, true, ObjectRef::new(9, 0));
        let obj = Object::Array(vec![Object::dict([("T", Object::String(b"abc".to_vec()))])]);
        let out = state.encrypt_object(ObjectRef::new(2, 0), &obj).unwrap();
        let inner = out.as_array().unwrap()[0].as_dict().unwrap().get("T").unwrap();
        assert_ne!(inner.as_string().unwrap(), b"abc");
    }
}
