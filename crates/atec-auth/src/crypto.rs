//! Deterministic field encryption and password hashing.
//!
//! Encryption is AES-256-CBC with a fixed IV so that the same plaintext
//! always produces the same ciphertext. E-mail lookups depend on that.

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const BLOCK_SIZE: usize = 16;

pub struct SharedCryptor {
    key: [u8; 32],
    iv: [u8; BLOCK_SIZE],
    hash_cost: u32,
}

impl SharedCryptor {
    /// `key_material` is hashed with SHA-256 to derive the AES and HMAC key.
    pub fn new(key_material: &[u8], iv_hex: &str, hash_cost: u32) -> Result<Self, CryptoError> {
        let iv_bytes = hex::decode(iv_hex.trim())?;
        let iv: [u8; BLOCK_SIZE] = iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidIv {
                expected: BLOCK_SIZE,
                actual: iv_bytes.len(),
            })?;

        Ok(Self {
            key: Sha256::digest(key_material).into(),
            iv,
            hash_cost,
        })
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.key
    }

    /// Hex-encoded ciphertext.
    pub fn encrypt(&self, plain: &str) -> Result<String, CryptoError> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &self.iv).map_err(|_| CryptoError::Cipher)?;
        let out = cipher.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, cipher_hex: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(cipher_hex)?;
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.iv).map_err(|_| CryptoError::Cipher)?;
        let plain = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| CryptoError::Padding)?;
        Ok(String::from_utf8(plain)?)
    }

    pub fn decrypt_opt(&self, cipher_hex: Option<&str>) -> Result<Option<String>, CryptoError> {
        cipher_hex.map(|c| self.decrypt(c)).transpose()
    }

    /// bcrypt hash, base64-encoded for storage.
    pub fn hash_password(&self, plain: &str) -> Result<String, CryptoError> {
        let hashed = bcrypt::hash(plain, self.hash_cost)?;
        Ok(STANDARD.encode(hashed))
    }

    /// `Ok(false)` on mismatch. Errors only when the stored hash is malformed.
    pub fn verify_password(&self, stored: &str, plain: &str) -> Result<bool, CryptoError> {
        let decoded = String::from_utf8(STANDARD.decode(stored)?)?;
        Ok(bcrypt::verify(plain, &decoded)?)
    }
}

impl std::fmt::Debug for SharedCryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCryptor")
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}
