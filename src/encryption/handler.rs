//! Decryption of password-protected input.

use super::aes::decrypt_with_iv;
use super::algorithms::{self, LegacyKeyInputs};
use super::params::{legacy_password_bytes, Permissions};
use super::rc4::rc4_crypt;
use super::{CryptMethod, EncryptDict};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// Read-side state for an encrypted document.
#[derive(Clone)]
pub struct EncryptionHandler {
    dict: EncryptDict,
    file_id: Vec<u8>,
    file_key: Option<Vec<u8>>,
}

impl std::fmt::Debug for EncryptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionHandler")
            .field("version", &self.dict.version)
            .field("revision", &self.dict.revision)
            .field("authenticated", &self.file_key.is_some())
            .finish()
    }
}

impl EncryptionHandler {
    /// Create a handler from the `/Encrypt` dictionary and the first `/ID` element.
    pub fn new(encrypt_obj: &Object, file_id: Vec<u8>) -> Result<Self> {
        let dict = EncryptDict::from_object(encrypt_obj)?;
        if !matches!(
            (dict.version, dict.revision),
            (1, 2) | (2, 3) | (4, 4) | (5, 6)
        ) {
            return Err(Error::Unsupported(format!(
                "security handler revision {} (V {})",
                dict.revision, dict.version
            )));
        }
        log::info!(
            "Input is encrypted (V {}, R {}, /P {})",
            dict.version,
            dict.revision,
            dict.permissions
        );
        Ok(Self {
            dict,
            file_id,
            file_key: None,
        })
    }

    /// Create and authenticate in one step.
    ///
    /// Without a password the empty user password is tried, which opens files
    /// that only restrict permissions.
    pub fn open(encrypt_obj: &Object, file_id: Vec<u8>, password: Option<&str>) -> Result<Self> {
        let mut handler = Self::new(encrypt_obj, file_id)?;
        match password {
            Some(pw) => {
                if !handler.authenticate(pw)? {
                    return Err(Error::IncorrectPassword);
                }
            },
            None => {
                if !handler.authenticate("")? {
                    return Err(Error::PasswordRequired);
                }
            },
        }
        Ok(handler)
    }

    /// Try `password` as owner password, then as user password.
    pub fn authenticate(&mut self, password: &str) -> Result<bool> {
        let key = if self.dict.revision == 6 {
            let missing = || Error::InvalidPdf("revision 6 dictionary without /OE or /UE".to_string());
            let oe = self.dict.owner_key.as_deref().ok_or_else(missing)?;
            let ue = self.dict.user_key.as_deref().ok_or_else(missing)?;
            algorithms::authenticate_r6(password, &self.dict.user_hash, ue, &self.dict.owner_hash, oe)?
        } else {
            let pw = legacy_password_bytes(password);
            let inputs = LegacyKeyInputs {
                owner_hash: &self.dict.owner_hash,
                permissions: self.dict.permissions,
                file_id: &self.file_id,
                revision: self.dict.revision,
                key_len: self.dict.key_len(),
                encrypt_metadata: self.dict.encrypt_metadata,
            };
            algorithms::authenticate_owner(&pw, &self.dict.user_hash, &inputs)
                .or_else(|| algorithms::authenticate_user(&pw, &self.dict.user_hash, &inputs))
        };

        match key {
            Some(key) => {
                log::debug!("Password accepted, file key is {} bytes", key.len());
                self.file_key = Some(key);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Whether a password has been accepted.
    pub fn is_authenticated(&self) -> bool {
        self.file_key.is_some()
    }

    /// Permissions recorded in `/P`.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_p_value(self.dict.permissions)
    }

    /// Whether `/Type /Metadata` streams are encrypted.
    pub fn encrypts_metadata(&self) -> bool {
        self.dict.encrypt_metadata
    }

    fn decrypt_bytes(&self, method: CryptMethod, obj: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.file_key.as_deref().ok_or(Error::PasswordRequired)?;
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Rc4 => Ok(rc4_crypt(&algorithms::object_key(key, obj, false), data)),
            CryptMethod::AesV2 => decrypt_with_iv(&algorithms::object_key(key, obj, true), data),
            CryptMethod::AesV3 => decrypt_with_iv(key, data),
        }
    }

    fn decrypt_strings(&self, obj: ObjectRef, value: &mut Object) -> Result<()> {
        match value {
            Object::String(s) => {
                *s = self.decrypt_bytes(self.dict.string_method, obj, s)?;
            },
            Object::Array(items) => {
                for item in items {
                    self.decrypt_strings(obj, item)?;
                }
            },
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                for v in dict.values_mut() {
                    self.decrypt_strings(obj, v)?;
                }
            },
            _ => {},
        }
        Ok(())
    }

    /// Decrypt every string and the stream data of indirect object `obj`.
    ///
    /// Cross-reference streams are never encrypted and are returned as is, as are
    /// metadata streams when `/EncryptMetadata` is false.
    pub fn decrypt_object(&self, obj: ObjectRef, mut value: Object) -> Result<Object> {
        if value.has_type("XRef") {
            return Ok(value);
        }
        self.decrypt_strings(obj, &mut value)?;

        if let Object::Stream { dict, data } = &mut value {
            let is_metadata = dict
                .get("Type")
                .and_then(|t| t.as_name())
                .is_some_and(|t| t == "Metadata");
            let crypt_filter = match dict.get("Filter") {
                Some(Object::Name(n)) => n == "Crypt",
                Some(Object::Array(a)) => a.first().and_then(|f| f.as_name()) == Some("Crypt"),
                _ => false,
            };
            if crypt_filter {
                log::debug!("Stream {} carries its own /Crypt filter; left as is", obj);
            } else if !(is_metadata && !self.dict.encrypt_metadata) {
                *data = bytes::Bytes::from(self.decrypt_bytes(self.dict.stream_method, obj, data)?);
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::write_handler::EncryptionState;
    use crate::encryption::EncryptionAlgorithm;

    fn legacy_encrypt_dict(user: &str, owner: &str, id: &[u8]) -> (Object, Vec<u8>) {
        let o = algorithms::compute_owner_hash(owner.as_bytes(), user.as_bytes(), 3, 16);
        let inputs = LegacyKeyInputs {
            owner_hash: &o,
            permissions: -4,
            file_id: id,
            revision: 3,
            key_len: 16,
            encrypt_metadata: true,
        };
        let key = algorithms::compute_file_key(user.as_bytes(), &inputs);
        let u = algorithms::compute_user_hash(&key, 3, id);
        let dict = Object::dict([
            ("Filter", Object::name("Standard")),
            ("V", Object::Integer(2)),
            ("R", Object::Integer(3)),
            ("Length", Object::Integer(128)),
            ("O", Object::String(o)),
            ("U", Object::String(u)),
            ("P", Object::Integer(-4)),
        ]);
        (dict, key)
    }

    #[test]
    fn test_open_with_user_and_owner_password() {
        let id = b"0123456789abcdef".to_vec();
        let (dict, key) = legacy_encrypt_dict("user", "owner", &id);

        let h = EncryptionHandler::open(&dict, id.clone(), Some("user")).unwrap();
        assert_eq!(h.file_key.as_deref(), Some(&key[..]));
        let h = EncryptionHandler::open(&dict, id.clone(), Some("owner")).unwrap();
        assert_eq!(h.file_key.as_deref(), Some(&key[..]));
        assert_eq!(h.permissions(), Permissions::all());
    }

    #[test]
    fn test_wrong_or_missing_password() {
        let id = b"0123456789abcdef".to_vec();
        let (dict, _) = legacy_encrypt_dict("user", "owner", &id);
        assert!(matches!(
            EncryptionHandler::open(&dict, id.clone(), Some("guess")),
            Err(Error::IncorrectPassword)
        ));
        assert!(matches!(
            EncryptionHandler::open(&dict, id, None),
            Err(Error::PasswordRequired)
        ));
    }

    #[test]
    fn test_empty_user_password_opens_without_password() {
        let id = b"fedcba9876543210".to_vec();
        let (dict, _) = legacy_encrypt_dict("", "owner", &id);
        assert!(EncryptionHandler::open(&dict, id, None).unwrap().is_authenticated());
    }

    #[test]
    fn test_decrypts_what_the_writer_encrypts() {
        let id = b"0123456789abcdef".to_vec();
        let (dict, key) = legacy_encrypt_dict("user", "owner", &id);
        let handler = EncryptionHandler::open(&dict, id, Some("user")).unwrap();

        let state = EncryptionState::new(key, EncryptionAlgorithm::Rc4_128, true, ObjectRef::new(99, 0));
        let r = ObjectRef::new(4, 0);
        let plain = Object::Stream {
            dict: [("Title".to_string(), Object::String(b"secret".to_vec()))]
                .into_iter()
                .collect(),
            data: bytes::Bytes::from_static(b"BT /F1 12 Tf (Hi) Tj ET"),
        };
        let cipher = state.encrypt_object(r, &plain).unwrap();
        assert_ne!(cipher, plain);
        assert_eq!(handler.decrypt_object(r, cipher).unwrap(), plain);
    }

    #[test]
    fn test_xref_stream_untouched() {
        let id = b"0123456789abcdef".to_vec();
        let (dict, _) = legacy_encrypt_dict("user", "owner", &id);
        let handler = EncryptionHandler::open(&dict, id, Some("user")).unwrap();
        let xref = Object::Stream {
            dict: [("Type".to_string(), Object::name("XRef"))].into_iter().collect(),
            data: bytes::Bytes::from_static(b"\x01\x00\x10"),
        };
        assert_eq!(handler.decrypt_object(ObjectRef::new(5, 0), xref.clone()).unwrap(), xref);
    }
}
