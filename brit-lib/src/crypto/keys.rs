//! Key material and key rings.
//!
//! Keys are X25519. A key ring is a packet stream of key packets, each
//! optionally followed by a user id packet.
//!
//! # Key packet body
//!
//! ```text
//! public: [1 version][8 created_at][1 flags][1 algorithm][32 public key]
//! secret: <public body>[1 protection]
//!           protection 0: [32 secret]
//!           protection 1: [16 salt][12 nonce][48 AES-256-GCM(secret)]
//! ```
//!
//! Protected secrets use an Argon2id key derived from the passphrase.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use chrono::{DateTime, TimeZone, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use super::armor::{self, ArmorKind};
use super::packet::{parse_packets, write_packet, ByteReader, PacketTag};
use super::CryptoError;

/// Key may certify other keys.
pub const KEY_FLAG_CERTIFY: u8 = 0x01;
/// Key may sign data.
pub const KEY_FLAG_SIGN: u8 = 0x02;
/// Key may receive encrypted messages.
pub const KEY_FLAG_ENCRYPT: u8 = 0x04;

const KEY_VERSION: u8 = 1;
/// X25519, using the OpenPGP algorithm registry number.
const ALGORITHM_X25519: u8 = 25;
const PUBLIC_BODY_LEN: usize = 43;

const PROTECTION_NONE: u8 = 0;
const PROTECTION_ARGON2_AES_GCM: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

const FINGERPRINT_DOMAIN: &[u8] = b"brit-key-fingerprint-v1";

/// First eight bytes of a key fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyId(pub [u8; 8]);

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// A public encryption key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    created_at: i64,
    flags: u8,
    material: [u8; 32],
    user_id: Option<String>,
}

impl PublicKey {
    /// SHA-256 fingerprint over the key packet body.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(self.to_body());
        hasher.finalize().into()
    }

    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.fingerprint()[..8]);
        KeyId(id)
    }

    pub fn can_encrypt(&self) -> bool {
        self.flags & KEY_FLAG_ENCRYPT != 0
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at, 0).single()
    }

    pub(crate) fn x25519(&self) -> X25519Public {
        X25519Public::from(self.material)
    }

    pub(crate) fn material(&self) -> &[u8; 32] {
        &self.material
    }

    fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(PUBLIC_BODY_LEN);
        body.push(KEY_VERSION);
        body.extend_from_slice(&self.created_at.to_be_bytes());
        body.push(self.flags);
        body.push(ALGORITHM_X25519);
        body.extend_from_slice(&self.material);
        body
    }

    fn read_body(reader: &mut ByteReader<'_>) -> Result<Self, CryptoError> {
        let truncated = || CryptoError::InvalidKey("truncated key packet".into());
        let version = reader.u8().ok_or_else(truncated)?;
        if version != KEY_VERSION {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported key version {}",
                version
            )));
        }
        let created_at = reader.i64().ok_or_else(truncated)?;
        let flags = reader.u8().ok_or_else(truncated)?;
        let algorithm = reader.u8().ok_or_else(truncated)?;
        if algorithm != ALGORITHM_X25519 {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported key algorithm {}",
                algorithm
            )));
        }
        let material = reader.array::<32>().ok_or_else(truncated)?;
        Ok(Self {
            created_at,
            flags,
            material,
            user_id: None,
        })
    }
}

enum Protection {
    None(Zeroizing<[u8; 32]>),
    Argon2 {
        salt: [u8; SALT_LEN],
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    },
}

/// A secret key, possibly protected by a passphrase.
pub struct SecretKey {
    public: PublicKey,
    protection: Protection,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("key_id", &self.public.key_id())
            .field("protected", &self.is_protected())
            .finish()
    }
}

impl SecretKey {
    /// Generate a fresh key.
    ///
    /// An empty passphrase stores the secret unprotected.
    pub fn generate(
        user_id: Option<&str>,
        flags: u8,
        passphrase: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey {
            created_at: created_at.timestamp(),
            flags,
            material: X25519Public::from(&secret).to_bytes(),
            user_id: user_id.map(str::to_string),
        };
        let secret_bytes = Zeroizing::new(secret.to_bytes());

        let protection = if passphrase.is_empty() {
            Protection::None(secret_bytes)
        } else {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            let mut nonce = [0u8; NONCE_LEN];
            OsRng.fill_bytes(&mut nonce);
            let kek = derive_passphrase_key(passphrase, &salt)?;
            let cipher = Aes256Gcm::new_from_slice(&kek[..])
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce), &secret_bytes[..])
                .map_err(|_| CryptoError::InvalidKey("secret key encryption failed".into()))?;
            Protection::Argon2 {
                salt,
                nonce,
                ciphertext,
            }
        };

        Ok(Self { public, protection })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.protection, Protection::Argon2 { .. })
    }

    /// Recover the X25519 secret. The passphrase is ignored for unprotected keys.
    pub(crate) fn unlock(&self, passphrase: &str) -> Result<StaticSecret, CryptoError> {
        match &self.protection {
            Protection::None(secret) => Ok(StaticSecret::from(**secret)),
            Protection::Argon2 {
                salt,
                nonce,
                ciphertext,
            } => {
                let kek = derive_passphrase_key(passphrase, salt)?;
                let cipher = Aes256Gcm::new_from_slice(&kek[..])
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
                let plain = Zeroizing::new(
                    cipher
                        .decrypt(Nonce::from_slice(nonce), ciphertext.as_slice())
                        .map_err(|_| CryptoError::InvalidPassphrase)?,
                );
                let bytes: [u8; 32] = plain
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidKey("bad secret key length".into()))?;
                Ok(StaticSecret::from(bytes))
            }
        }
    }

    fn to_body(&self) -> Vec<u8> {
        let mut body = self.public.to_body();
        match &self.protection {
            Protection::None(secret) => {
                body.push(PROTECTION_NONE);
                body.extend_from_slice(&secret[..]);
            }
            Protection::Argon2 {
                salt,
                nonce,
                ciphertext,
            } => {
                body.push(PROTECTION_ARGON2_AES_GCM);
                body.extend_from_slice(salt);
                body.extend_from_slice(nonce);
                body.extend_from_slice(ciphertext);
            }
        }
        body
    }

    fn from_body(body: &[u8]) -> Result<Self, CryptoError> {
        let mut reader = ByteReader::new(body);
        let public = PublicKey::read_body(&mut reader)?;
        let truncated = || CryptoError::InvalidKey("truncated secret key packet".into());
        let protection = match reader.u8().ok_or_else(truncated)? {
            PROTECTION_NONE => Protection::None(Zeroizing::new(
                reader.array::<32>().ok_or_else(truncated)?,
            )),
            PROTECTION_ARGON2_AES_GCM => Protection::Argon2 {
                salt: reader.array::<SALT_LEN>().ok_or_else(truncated)?,
                nonce: reader.array::<NONCE_LEN>().ok_or_else(truncated)?,
                ciphertext: reader.take(48).ok_or_else(truncated)?.to_vec(),
            },
            other => {
                return Err(CryptoError::InvalidKey(format!(
                    "unknown secret key protection {}",
                    other
                )))
            }
        };
        if !reader.is_empty() {
            return Err(CryptoError::InvalidKey("trailing bytes in secret key".into()));
        }
        Ok(Self { public, protection })
    }
}

fn derive_passphrase_key(
    passphrase: &str,
    salt: &[u8; SALT_LEN],
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::InvalidKey(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

fn attach_user_id(last: Option<&mut PublicKey>, body: &[u8]) -> Result<(), CryptoError> {
    let key = last.ok_or_else(|| CryptoError::InvalidKey("user id without key".into()))?;
    let uid = std::str::from_utf8(body)
        .map_err(|_| CryptoError::InvalidKey("user id is not UTF-8".into()))?;
    key.user_id = Some(uid.to_string());
    Ok(())
}

fn unarmor(source: &[u8], expected: ArmorKind) -> Result<Vec<u8>, CryptoError> {
    if !armor::is_armored(source) {
        return Ok(source.to_vec());
    }
    let (kind, data) =
        armor::dearmor(source).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    if kind != expected {
        return Err(CryptoError::InvalidKey(format!(
            "expected {:?} armor, found {:?}",
            expected, kind
        )));
    }
    Ok(data)
}

/// An ordered set of public keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicKeyRing {
    keys: Vec<PublicKey>,
}

impl PublicKeyRing {
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self { keys }
    }

    /// Parse a binary or armored key ring.
    ///
    /// Secret key packets are accepted too; only their public half is kept.
    pub fn from_bytes(source: &[u8]) -> Result<Self, CryptoError> {
        let data = if armor::is_armored(source) {
            let (_, data) =
                armor::dearmor(source).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            data
        } else {
            source.to_vec()
        };
        let packets = parse_packets(&data).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut keys: Vec<PublicKey> = Vec::new();
        for packet in packets {
            match packet.tag {
                PacketTag::PublicKey => {
                    let mut reader = ByteReader::new(packet.body);
                    let key = PublicKey::read_body(&mut reader)?;
                    if !reader.is_empty() {
                        return Err(CryptoError::InvalidKey("trailing bytes in public key".into()));
                    }
                    keys.push(key);
                }
                PacketTag::SecretKey => keys.push(SecretKey::from_body(packet.body)?.public),
                PacketTag::UserId => attach_user_id(keys.last_mut(), packet.body)?,
                other => {
                    return Err(CryptoError::InvalidKey(format!(
                        "unexpected {:?} packet in key ring",
                        other
                    )))
                }
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// First key flagged as encryption-capable.
    pub fn first_encryption_key(&self) -> Option<&PublicKey> {
        self.keys.iter().find(|key| key.can_encrypt())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for key in &self.keys {
            write_packet(&mut out, PacketTag::PublicKey, &key.to_body());
            if let Some(uid) = &key.user_id {
                write_packet(&mut out, PacketTag::UserId, uid.as_bytes());
            }
        }
        out
    }

    pub fn to_armored(&self) -> String {
        armor::armor(ArmorKind::PublicKeyRing, &self.to_bytes())
    }
}

/// An ordered set of secret keys.
#[derive(Debug, Default)]
pub struct SecretKeyRing {
    keys: Vec<SecretKey>,
}

impl SecretKeyRing {
    pub fn new(keys: Vec<SecretKey>) -> Self {
        Self { keys }
    }

    /// Parse a binary or armored secret key ring.
    pub fn from_bytes(source: &[u8]) -> Result<Self, CryptoError> {
        let data = unarmor(source, ArmorKind::SecretKeyRing)?;
        let packets = parse_packets(&data).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut keys: Vec<SecretKey> = Vec::new();
        for packet in packets {
            match packet.tag {
                PacketTag::SecretKey => keys.push(SecretKey::from_body(packet.body)?),
                PacketTag::UserId => {
                    attach_user_id(keys.last_mut().map(|k| &mut k.public), packet.body)?
                }
                other => {
                    return Err(CryptoError::InvalidKey(format!(
                        "unexpected {:?} packet in secret key ring",
                        other
                    )))
                }
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SecretKey] {
        &self.keys
    }

    pub fn find(&self, key_id: &KeyId) -> Option<&SecretKey> {
        self.keys.iter().find(|key| key.public.key_id() == *key_id)
    }

    /// The public halves of every key, in order.
    pub fn public_ring(&self) -> PublicKeyRing {
        PublicKeyRing::new(self.keys.iter().map(|k| k.public.clone()).collect())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for key in &self.keys {
            write_packet(&mut out, PacketTag::SecretKey, &key.to_body());
            if let Some(uid) = &key.public.user_id {
                write_packet(&mut out, PacketTag::UserId, uid.as_bytes());
            }
        }
        out
    }

    pub fn to_armored(&self) -> String {
        armor::armor(ArmorKind::SecretKeyRing, &self.to_bytes())
    }
}

/// Generate an encryption key and return both rings.
///
/// # Example
///
/// ```
/// use brit_lib::crypto::generate_key_pair;
///
/// let (public, secret) =
///     generate_key_pair("matcher@example.org", "", chrono::Utc::now()).unwrap();
/// assert!(public.first_encryption_key().is_some());
/// assert_eq!(secret.keys().len(), 1);
/// ```
pub fn generate_key_pair(
    user_id: &str,
    passphrase: &str,
    created_at: DateTime<Utc>,
) -> Result<(PublicKeyRing, SecretKeyRing), CryptoError> {
    let secret = SecretKey::generate(
        Some(user_id),
        KEY_FLAG_CERTIFY | KEY_FLAG_ENCRYPT,
        passphrase,
        created_at,
    )?;
    let ring = SecretKeyRing::new(vec![secret]);
    Ok((ring.public_ring(), ring))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_public_ring_roundtrip() {
        let (public, _) = generate_key_pair("alice", "", now()).unwrap();
        let parsed = PublicKeyRing::from_bytes(&public.to_bytes()).unwrap();
        assert_eq!(parsed, public);
        assert_eq!(parsed.keys()[0].user_id(), Some("alice"));
        assert_eq!(parsed.keys()[0].created_at(), Some(now()));

        let armored = PublicKeyRing::from_bytes(public.to_armored().as_bytes()).unwrap();
        assert_eq!(armored, public);
    }

    #[test]
    fn test_secret_ring_roundtrip() {
        let (public, secret) = generate_key_pair("bob", "", now()).unwrap();
        let parsed = SecretKeyRing::from_bytes(secret.to_armored().as_bytes()).unwrap();
        assert_eq!(parsed.public_ring(), public);
        let key_id = public.keys()[0].key_id();
        assert!(parsed.find(&key_id).is_some());
    }

    #[test]
    fn test_first_encryption_key_skips_signing_keys() {
        let signer = SecretKey::generate(Some("signer"), KEY_FLAG_SIGN, "", now()).unwrap();
        let encrypter = SecretKey::generate(Some("enc"), KEY_FLAG_ENCRYPT, "", now()).unwrap();
        let ring = SecretKeyRing::new(vec![signer, encrypter]).public_ring();

        let key = ring.first_encryption_key().unwrap();
        assert_eq!(key.user_id(), Some("enc"));
    }

    #[test]
    fn test_protected_key_unlock() {
        let key = SecretKey::generate(None, KEY_FLAG_ENCRYPT, "hunter2", now()).unwrap();
        assert!(key.is_protected());
        let unlocked = key.unlock("hunter2").unwrap();
        assert_eq!(
            X25519Public::from(&unlocked).to_bytes(),
            *key.public_key().material()
        );
        assert!(matches!(
            key.unlock("wrong"),
            Err(CryptoError::InvalidPassphrase)
        ));

        let reparsed =
            SecretKeyRing::from_bytes(&SecretKeyRing::new(vec![key]).to_bytes()).unwrap();
        assert!(reparsed.keys()[0].unlock("hunter2").is_ok());
    }

    #[test]
    fn test_key_id_is_stable() {
        let (public, _) = generate_key_pair("carol", "", now()).unwrap();
        let key = &public.keys()[0];
        assert_eq!(key.key_id(), key.key_id());
        assert_eq!(key.key_id().to_string().len(), 16);
        assert_eq!(&key.fingerprint()[..8], &key.key_id().0);
    }

    #[test]
    fn test_rejects_malformed_rings() {
        assert!(matches!(
            PublicKeyRing::from_bytes(b"garbage"),
            Err(CryptoError::InvalidKey(_))
        ));

        let mut bad_algo = Vec::new();
        let mut body = vec![KEY_VERSION];
        body.extend_from_slice(&0i64.to_be_bytes());
        body.push(KEY_FLAG_ENCRYPT);
        body.push(1);
        body.extend_from_slice(&[9u8; 32]);
        write_packet(&mut bad_algo, PacketTag::PublicKey, &body);
        assert!(matches!(
            PublicKeyRing::from_bytes(&bad_algo),
            Err(CryptoError::InvalidKey(_))
        ));

        let mut orphan_uid = Vec::new();
        write_packet(&mut orphan_uid, PacketTag::UserId, b"nobody");
        assert!(PublicKeyRing::from_bytes(&orphan_uid).is_err());
    }
}
