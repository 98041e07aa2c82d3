//! Wallet identity derivation.
//!
//! The identity is `RIPEMD160(SHA256(DOMAIN || seed))`. It lets a Matcher
//! recognise a returning wallet without holding anything that leads back to
//! the seed.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::{BritError, Result};

/// Domain separation prefix mixed into the seed before hashing.
const IDENTITY_DOMAIN: &[u8] = b"brit-wallet-identity-v1";

/// Length of a wallet identity in bytes.
pub const WALLET_IDENTITY_LEN: usize = 20;

/// Deterministic, privacy-preserving identifier derived from a wallet seed.
///
/// # Example
///
/// ```
/// use brit_lib::WalletIdentity;
///
/// let seed = [7u8; 64];
/// let a = WalletIdentity::derive(&seed).unwrap();
/// let b = WalletIdentity::derive(&seed).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_hex().len(), 40);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletIdentity([u8; WALLET_IDENTITY_LEN]);

impl WalletIdentity {
    /// Derive the identity for `seed`.
    ///
    /// Fails only for an empty seed.
    pub fn derive(seed: &[u8]) -> Result<Self> {
        if seed.is_empty() {
            return Err(BritError::invalid_data("seed", "must not be empty"));
        }

        let mut sha = Sha256::new();
        sha.update(IDENTITY_DOMAIN);
        sha.update(seed);
        let digest = Ripemd160::digest(sha.finalize());

        let mut bytes = [0u8; WALLET_IDENTITY_LEN];
        bytes.copy_from_slice(&digest);
        Ok(Self(bytes))
    }

    /// Wrap raw identity bytes, e.g. after decoding a request.
    pub fn from_bytes(bytes: [u8; WALLET_IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 40-character hex identity.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; WALLET_IDENTITY_LEN] = raw.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; WALLET_IDENTITY_LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Abbreviated so identities do not end up whole in logs.
impl std::fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletIdentity({}..)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let seed = [1u8; 32];
        assert_eq!(
            WalletIdentity::derive(&seed).unwrap(),
            WalletIdentity::derive(&seed).unwrap()
        );
    }

    #[test]
    fn test_known_vector() {
        let id = WalletIdentity::derive(&[1u8; 32]).unwrap();
        assert_eq!(id.to_hex(), "599cadcbe62a91f91a709dc42ea1e9917205f64e");
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = WalletIdentity::derive(b"seed one").unwrap();
        let b = WalletIdentity::derive(b"seed two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert!(WalletIdentity::derive(&[]).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let id = WalletIdentity::derive(b"hex").unwrap();
        assert_eq!(WalletIdentity::from_hex(&id.to_hex()), Some(id));
        assert_eq!(WalletIdentity::from_hex("abcd"), None);
        assert_eq!(WalletIdentity::from_hex("zz"), None);
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let id = WalletIdentity::derive(b"debug").unwrap();
        let debug = format!("{:?}", id);
        assert!(!debug.contains(&id.to_hex()));
        assert!(debug.starts_with("WalletIdentity("));
    }
}
