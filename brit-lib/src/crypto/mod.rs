//! Asymmetric crypto box.
//!
//! Hybrid public-key encryption with PGP-shaped framing: a fresh session key
//! per message, wrapped either to an X25519 recipient key or to shared session
//! material, with an optional modification detection code and optional ASCII
//! armor. The module never retains key material beyond a call.
//!
//! # Example
//!
//! ```
//! use brit_lib::crypto::{generate_key_pair, CryptoBox, EncryptOptions};
//!
//! let (public, secret) = generate_key_pair("matcher", "", chrono::Utc::now()).unwrap();
//! let key = CryptoBox::read_public_key(&public.to_bytes()).unwrap();
//!
//! let ciphertext = CryptoBox::encrypt(b"hello", &key, &EncryptOptions::default()).unwrap();
//! let plaintext = CryptoBox::decrypt(&ciphertext, &secret, "").unwrap();
//! assert_eq!(plaintext, b"hello");
//! ```

pub mod armor;
mod envelope;
mod keys;
mod packet;

use serde::{Deserialize, Serialize};

pub use armor::{is_armored, ArmorError, ArmorKind};
pub use keys::{
    generate_key_pair, KeyId, PublicKey, PublicKeyRing, SecretKey, SecretKeyRing,
    KEY_FLAG_CERTIFY, KEY_FLAG_ENCRYPT, KEY_FLAG_SIGN,
};
pub use packet::{PacketError, PacketTag};

/// Largest plaintext the envelope accepts.
pub const MAX_PLAINTEXT_LEN: usize = 16 * 1024 * 1024;

/// Errors from key handling and envelope encryption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("no secret key for recipient key ids [{}]", key_ids.join(", "))]
    KeyNotFound { key_ids: Vec<String> },

    #[error("integrity check failed: {0}")]
    IntegrityCheckFailed(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("key ring contains no encryption-capable key")]
    NoEncryptionKey,

    #[error("wrong passphrase for protected secret key")]
    InvalidPassphrase,

    #[error("plaintext of {size} bytes exceeds limit of {max} bytes")]
    PlaintextTooLarge { size: usize, max: usize },
}

/// Output shaping for [`CryptoBox::encrypt`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptOptions {
    /// Produce ASCII armor instead of binary.
    #[serde(default)]
    pub armor: bool,
    /// Append a modification detection packet inside the encrypted data.
    #[serde(default = "default_integrity_check")]
    pub integrity_check: bool,
}

fn default_integrity_check() -> bool {
    true
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            armor: false,
            integrity_check: default_integrity_check(),
        }
    }
}

impl EncryptOptions {
    /// Armored output with integrity protection.
    pub fn armored() -> Self {
        Self {
            armor: true,
            ..Self::default()
        }
    }

    pub fn with_armor(mut self, armor: bool) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_integrity_check(mut self, integrity_check: bool) -> Self {
        self.integrity_check = integrity_check;
        self
    }
}

/// Stateless entry points for the envelope.
pub struct CryptoBox;

impl CryptoBox {
    /// Encrypt `plaintext` to `recipient`.
    ///
    /// Fails with [`CryptoError::InvalidKey`] when the key cannot receive
    /// encrypted data.
    pub fn encrypt(
        plaintext: &[u8],
        recipient: &PublicKey,
        options: &EncryptOptions,
    ) -> Result<Vec<u8>, CryptoError> {
        envelope::encrypt_to_key(plaintext, recipient, options)
    }

    /// Decrypt a message addressed to any key in `keyring`.
    ///
    /// Armored input is detected automatically.
    pub fn decrypt(
        ciphertext: &[u8],
        keyring: &SecretKeyRing,
        passphrase: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        envelope::decrypt_with_keyring(ciphertext, keyring, passphrase)
    }

    /// Encrypt `plaintext` under session material both sides already share.
    pub fn encrypt_with_session(
        plaintext: &[u8],
        session_material: &[u8],
        options: &EncryptOptions,
    ) -> Result<Vec<u8>, CryptoError> {
        envelope::encrypt_to_session(plaintext, session_material, options)
    }

    /// Decrypt a message produced by [`CryptoBox::encrypt_with_session`].
    pub fn decrypt_with_session(
        ciphertext: &[u8],
        session_material: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        envelope::decrypt_with_session(ciphertext, session_material)
    }

    /// Return the first encryption-capable key in a key ring blob.
    pub fn read_public_key(source: &[u8]) -> Result<PublicKey, CryptoError> {
        read_public_key(source)
    }
}

/// Return the first encryption-capable key in a binary or armored key ring.
pub fn read_public_key(source: &[u8]) -> Result<PublicKey, CryptoError> {
    let ring = PublicKeyRing::from_bytes(source)?;
    ring.first_encryption_key()
        .cloned()
        .ok_or(CryptoError::NoEncryptionKey)
}
