use aes_gcm::{
    aead::{Aead, NewAead}, // NewAead for 0.9/0.4
    Aes256Gcm,
    Nonce,
};

use crate::error::SecurityError;

/// Scrypt cost matching Node's `crypto.scryptSync` defaults (N=16384, r=8, p=1).
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const KEY_LEN: usize = 32;

pub struct SecurityUtils;

impl SecurityUtils {
    /// Decrypts an AES-256-GCM block whose key is derived from `password` with scrypt.
    ///
    /// All components are hex strings as written by the wallet generator. The
    /// authentication tag is stored separately and appended to the ciphertext
    /// before decryption.
    pub fn decrypt_components(
        ciphertext_hex: &str,
        iv_hex: &str,
        salt_hex: &str,
        tag_hex: &str,
        password: &str,
    ) -> Result<String, SecurityError> {
        let ciphertext = decode_field("ciphertext", ciphertext_hex)?;
        let iv = decode_field("iv", iv_hex)?;
        let salt = decode_field("salt", salt_hex)?;
        let mut tag = decode_field("tag", tag_hex)?;

        if iv.len() != 12 {
            return Err(SecurityError::CryptographyFailed {
                reason: format!("expected 12 byte IV, got {}", iv.len()),
            });
        }

        let key = Self::derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new(&key.into());
        let nonce = Nonce::from_slice(&iv);

        let mut full_payload = ciphertext;
        full_payload.append(&mut tag);

        let plaintext = cipher
            .decrypt(nonce, full_payload.as_ref())
            .map_err(|e| SecurityError::CryptographyFailed {
                reason: e.to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|_| SecurityError::CryptographyFailed {
            reason: "decrypted data is not valid UTF-8".to_string(),
        })
    }

    pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], SecurityError> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
            SecurityError::CryptographyFailed {
                reason: format!("invalid scrypt params: {}", e),
            }
        })?;
        let mut key = [0u8; KEY_LEN];
        scrypt::scrypt(password.as_bytes(), salt, &params, &mut key).map_err(|e| {
            SecurityError::CryptographyFailed {
                reason: format!("scrypt failed: {}", e),
            }
        })?;
        Ok(key)
    }
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, SecurityError> {
    hex::decode(value).map_err(|_| SecurityError::InvalidHex {
        field: field.to_string(),
    })
}
