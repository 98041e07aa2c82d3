//! Pinned identity vectors.
//!
//! The expected hex values were produced by this crate's own derivation
//! with its `brit-wallet-identity-v1` domain prefix. They guard against
//! regressions here; another implementation only reproduces them if it uses
//! the same prefix. Replace them if a vector from an independent
//! implementation becomes available.

use bip39::{Language, Mnemonic, Seed};
use brit_lib::WalletIdentity;

const PHRASE: &str =
    "letter advice cage absurd amount doctor acoustic avoid letter advice cage above";

#[test]
fn test_mnemonic_identity_vector() {
    let mnemonic = Mnemonic::from_phrase(PHRASE, Language::English).unwrap();
    let seed = Seed::new(&mnemonic, "");
    let identity = WalletIdentity::derive(seed.as_bytes()).unwrap();
    assert_eq!(identity.to_hex(), "b0fce0f7a918dfee6f7d3811b931785732e6a522");
}

#[test]
fn test_passphrase_changes_identity() {
    let mnemonic = Mnemonic::from_phrase(PHRASE, Language::English).unwrap();
    let plain = WalletIdentity::derive(Seed::new(&mnemonic, "").as_bytes()).unwrap();
    let protected = WalletIdentity::derive(Seed::new(&mnemonic, "TREZOR").as_bytes()).unwrap();
    assert_ne!(plain, protected);
}

#[test]
fn test_fixed_seed_vector() {
    let identity = WalletIdentity::derive(&[1u8; 32]).unwrap();
    assert_eq!(identity.to_hex(), "599cadcbe62a91f91a709dc42ea1e9917205f64e");
    assert_eq!(WalletIdentity::from_hex(&identity.to_hex()), Some(identity));
}
