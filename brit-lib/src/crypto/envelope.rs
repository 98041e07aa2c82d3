//! Hybrid envelope encryption.
//!
//! A message is a packet stream:
//!
//! ```text
//! session packet   (tag 1: to a public key, or tag 3: to shared session material)
//! encrypted data   (tag 18: [1 version][12 nonce][AES-256-GCM(inner)])
//! ```
//!
//! `inner` is itself a packet stream holding one literal data packet and, when
//! the integrity check is enabled, a modification detection packet carrying
//! SHA-256 over the serialized literal packet.
//!
//! Session keys are fresh per message. Key encryption keys come from
//! HKDF-SHA256, over an X25519 shared secret for public-key recipients or
//! over the shared session material otherwise.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public};
use zeroize::Zeroizing;

use super::armor::{self, ArmorKind};
use super::keys::{KeyId, PublicKey, SecretKeyRing};
use super::packet::{parse_packets, write_packet, ByteReader, Packet, PacketTag};
use super::{CryptoError, EncryptOptions, MAX_PLAINTEXT_LEN};

const PACKET_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 16;
const WRAPPED_KEY_LEN: usize = 32 + 16;

const PKESK_INFO: &[u8] = b"brit-pkesk-v1";
const SKESK_INFO: &[u8] = b"brit-skesk-v1";
const DATA_AAD: &[u8] = b"brit-seipd-v1";

const LITERAL_BINARY: u8 = b'b';

type SessionKey = Zeroizing<[u8; 32]>;

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

fn hkdf_key(salt: &[u8], ikm: &[u8], info: &[u8]) -> Result<SessionKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(info, &mut key[..])
        .map_err(|e| CryptoError::InvalidKey(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

fn cipher(key: &SessionKey) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(&key[..]).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

fn wrap_session_key(kek: &SessionKey, session_key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    let nonce = random_bytes::<NONCE_LEN>();
    let wrapped = cipher(kek)?
        .encrypt(Nonce::from_slice(&nonce), &session_key[..])
        .map_err(|_| CryptoError::InvalidKey("session key wrap failed".into()))?;
    let mut out = Vec::with_capacity(NONCE_LEN + wrapped.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&wrapped);
    Ok(out)
}

fn unwrap_session_key(kek: &SessionKey, wrapped: &[u8]) -> Result<SessionKey, CryptoError> {
    let (nonce, body) = wrapped.split_at(NONCE_LEN);
    let plain = Zeroizing::new(
        cipher(kek)?
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| CryptoError::IntegrityCheckFailed("session key".into()))?,
    );
    let key: [u8; 32] = plain
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::MalformedCiphertext("session key length".into()))?;
    Ok(Zeroizing::new(key))
}

fn ensure_size(plaintext: &[u8]) -> Result<(), CryptoError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(CryptoError::PlaintextTooLarge {
            size: plaintext.len(),
            max: MAX_PLAINTEXT_LEN,
        });
    }
    Ok(())
}

fn build_inner(plaintext: &[u8], integrity_check: bool) -> Vec<u8> {
    let mut literal_body = Vec::with_capacity(plaintext.len() + 6);
    literal_body.push(LITERAL_BINARY);
    literal_body.push(0); // empty file name
    literal_body.extend_from_slice(&0u32.to_be_bytes());
    literal_body.extend_from_slice(plaintext);

    let mut inner = Vec::with_capacity(literal_body.len() + 48);
    write_packet(&mut inner, PacketTag::Literal, &literal_body);
    if integrity_check {
        let mdc: [u8; 32] = Sha256::digest(&inner).into();
        write_packet(&mut inner, PacketTag::ModificationDetection, &mdc);
    }
    inner
}

fn encrypt_data(
    out: &mut Vec<u8>,
    session_key: &SessionKey,
    plaintext: &[u8],
    options: &EncryptOptions,
) -> Result<(), CryptoError> {
    let inner = Zeroizing::new(build_inner(plaintext, options.integrity_check));
    let nonce = random_bytes::<NONCE_LEN>();
    let ciphertext = cipher(session_key)?
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &inner,
                aad: DATA_AAD,
            },
        )
        .map_err(|_| CryptoError::MalformedCiphertext("data encryption failed".into()))?;

    let mut body = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    body.push(PACKET_VERSION);
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    write_packet(out, PacketTag::EncryptedData, &body);
    Ok(())
}

fn finish(message: Vec<u8>, options: &EncryptOptions) -> Vec<u8> {
    if options.armor {
        armor::armor(ArmorKind::Message, &message).into_bytes()
    } else {
        message
    }
}

/// Encrypt `plaintext` to `recipient`.
pub fn encrypt_to_key(
    plaintext: &[u8],
    recipient: &PublicKey,
    options: &EncryptOptions,
) -> Result<Vec<u8>, CryptoError> {
    ensure_size(plaintext)?;
    if !recipient.can_encrypt() {
        return Err(CryptoError::InvalidKey(format!(
            "key {} is not encryption-capable",
            recipient.key_id()
        )));
    }

    let recipient_public = recipient.x25519();
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519Public::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient_public);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey("low-order public key".into()));
    }

    let mut salt = Vec::with_capacity(64);
    salt.extend_from_slice(ephemeral_public.as_bytes());
    salt.extend_from_slice(recipient.material());
    let kek = hkdf_key(&salt, shared.as_bytes(), PKESK_INFO)?;

    let session_key: SessionKey = Zeroizing::new(random_bytes::<32>());
    let wrapped = wrap_session_key(&kek, &session_key)?;

    let mut pkesk = Vec::with_capacity(1 + 8 + 32 + wrapped.len());
    pkesk.push(PACKET_VERSION);
    pkesk.extend_from_slice(&recipient.key_id().0);
    pkesk.extend_from_slice(ephemeral_public.as_bytes());
    pkesk.extend_from_slice(&wrapped);

    let mut message = Vec::new();
    write_packet(&mut message, PacketTag::PublicKeySession, &pkesk);
    encrypt_data(&mut message, &session_key, plaintext, options)?;
    Ok(finish(message, options))
}

/// Encrypt `plaintext` under shared session material.
pub fn encrypt_to_session(
    plaintext: &[u8],
    session_material: &[u8],
    options: &EncryptOptions,
) -> Result<Vec<u8>, CryptoError> {
    ensure_size(plaintext)?;
    if session_material.is_empty() {
        return Err(CryptoError::InvalidKey("empty session material".into()));
    }

    let salt = random_bytes::<SALT_LEN>();
    let kek = hkdf_key(&salt, session_material, SKESK_INFO)?;
    let session_key: SessionKey = Zeroizing::new(random_bytes::<32>());
    let wrapped = wrap_session_key(&kek, &session_key)?;

    let mut skesk = Vec::with_capacity(1 + SALT_LEN + wrapped.len());
    skesk.push(PACKET_VERSION);
    skesk.extend_from_slice(&salt);
    skesk.extend_from_slice(&wrapped);

    let mut message = Vec::new();
    write_packet(&mut message, PacketTag::SessionKeySession, &skesk);
    encrypt_data(&mut message, &session_key, plaintext, options)?;
    Ok(finish(message, options))
}

struct ParsedPkesk<'a> {
    key_id: KeyId,
    ephemeral: [u8; 32],
    wrapped: &'a [u8],
}

struct ParsedSkesk<'a> {
    salt: [u8; SALT_LEN],
    wrapped: &'a [u8],
}

struct ParsedMessage<'a> {
    pkesks: Vec<ParsedPkesk<'a>>,
    skesks: Vec<ParsedSkesk<'a>>,
    data: &'a [u8],
}

fn malformed(reason: impl Into<String>) -> CryptoError {
    CryptoError::MalformedCiphertext(reason.into())
}

fn check_version(reader: &mut ByteReader<'_>, what: &str) -> Result<(), CryptoError> {
    match reader.u8() {
        Some(PACKET_VERSION) => Ok(()),
        Some(other) => Err(malformed(format!("unsupported {} version {}", what, other))),
        None => Err(malformed(format!("empty {} packet", what))),
    }
}

fn parse_message(bytes: &[u8]) -> Result<ParsedMessage<'_>, CryptoError> {
    let packets = parse_packets(bytes).map_err(|e| malformed(e.to_string()))?;
    let (last, session_packets) = packets
        .split_last()
        .ok_or_else(|| malformed("empty message"))?;

    let mut pkesks = Vec::new();
    let mut skesks = Vec::new();
    for packet in session_packets {
        let mut reader = ByteReader::new(packet.body);
        match packet.tag {
            PacketTag::PublicKeySession => {
                check_version(&mut reader, "session key")?;
                let key_id = KeyId(
                    reader
                        .array::<8>()
                        .ok_or_else(|| malformed("truncated key id"))?,
                );
                let ephemeral = reader
                    .array::<32>()
                    .ok_or_else(|| malformed("truncated ephemeral key"))?;
                let wrapped = reader.rest();
                if wrapped.len() != NONCE_LEN + WRAPPED_KEY_LEN {
                    return Err(malformed("wrapped session key length"));
                }
                pkesks.push(ParsedPkesk {
                    key_id,
                    ephemeral,
                    wrapped,
                });
            }
            PacketTag::SessionKeySession => {
                check_version(&mut reader, "session key")?;
                let salt = reader
                    .array::<SALT_LEN>()
                    .ok_or_else(|| malformed("truncated session salt"))?;
                let wrapped = reader.rest();
                if wrapped.len() != NONCE_LEN + WRAPPED_KEY_LEN {
                    return Err(malformed("wrapped session key length"));
                }
                skesks.push(ParsedSkesk { salt, wrapped });
            }
            other => return Err(unexpected(other)),
        }
    }

    if last.tag != PacketTag::EncryptedData {
        return Err(unexpected(last.tag));
    }
    if pkesks.is_empty() && skesks.is_empty() {
        return Err(malformed("no session key packet"));
    }

    Ok(ParsedMessage {
        pkesks,
        skesks,
        data: last.body,
    })
}

fn unexpected(tag: PacketTag) -> CryptoError {
    let what = match tag {
        PacketTag::Compressed => "compressed data",
        PacketTag::Signature | PacketTag::OnePassSignature => "signed data",
        PacketTag::Literal => "unencrypted literal data",
        _ => "packet",
    };
    malformed(format!("unexpected {} ({:?})", what, tag))
}

fn decrypt_data(session_key: &SessionKey, body: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut reader = ByteReader::new(body);
    check_version(&mut reader, "encrypted data")?;
    let nonce = reader
        .array::<NONCE_LEN>()
        .ok_or_else(|| malformed("truncated data nonce"))?;
    let ciphertext = reader.rest();

    let inner = Zeroizing::new(
        cipher(session_key)?
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext,
                    aad: DATA_AAD,
                },
            )
            .map_err(|_| CryptoError::IntegrityCheckFailed("encrypted data".into()))?,
    );

    read_inner(&inner)
}

fn read_inner(inner: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let packets = parse_packets(inner).map_err(|e| malformed(e.to_string()))?;
    let mut iter = packets.iter();

    let literal: &Packet<'_> = iter.next().ok_or_else(|| malformed("empty payload"))?;
    if literal.tag != PacketTag::Literal {
        return Err(unexpected(literal.tag));
    }

    if let Some(mdc) = iter.next() {
        if mdc.tag != PacketTag::ModificationDetection {
            return Err(unexpected(mdc.tag));
        }
        // The literal packet is the first 5 + body bytes of the inner stream.
        let literal_len = 5 + literal.body.len();
        let expected: [u8; 32] = Sha256::digest(&inner[..literal_len]).into();
        if mdc.body != expected.as_slice() {
            return Err(CryptoError::IntegrityCheckFailed(
                "modification detection code mismatch".into(),
            ));
        }
    }
    if iter.next().is_some() {
        return Err(malformed("trailing packets after payload"));
    }

    let mut reader = ByteReader::new(literal.body);
    let format = reader.u8().ok_or_else(|| malformed("truncated literal data"))?;
    if format != LITERAL_BINARY {
        return Err(malformed(format!(
            "literal data type {:?} is not binary",
            format as char
        )));
    }
    let name_len = reader.u8().ok_or_else(|| malformed("truncated literal data"))? as usize;
    reader
        .take(name_len)
        .ok_or_else(|| malformed("truncated literal file name"))?;
    reader.u32().ok_or_else(|| malformed("truncated literal date"))?;
    Ok(reader.rest().to_vec())
}

fn unarmor_message(ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if !armor::is_armored(ciphertext) {
        return Ok(ciphertext.to_vec());
    }
    let (kind, data) = armor::dearmor(ciphertext).map_err(|e| malformed(e.to_string()))?;
    if kind != ArmorKind::Message {
        return Err(malformed(format!("expected message armor, found {:?}", kind)));
    }
    Ok(data)
}

/// Decrypt a message addressed to a key held in `keyring`.
pub fn decrypt_with_keyring(
    ciphertext: &[u8],
    keyring: &SecretKeyRing,
    passphrase: &str,
) -> Result<Vec<u8>, CryptoError> {
    let bytes = unarmor_message(ciphertext)?;
    let message = parse_message(&bytes)?;

    let (pkesk, secret) = message
        .pkesks
        .iter()
        .find_map(|p| keyring.find(&p.key_id).map(|secret| (p, secret)))
        .ok_or_else(|| CryptoError::KeyNotFound {
            key_ids: message.pkesks.iter().map(|p| p.key_id.to_string()).collect(),
        })?;

    let static_secret = secret.unlock(passphrase)?;
    let ephemeral = X25519Public::from(pkesk.ephemeral);
    let shared = static_secret.diffie_hellman(&ephemeral);
    if !shared.was_contributory() {
        return Err(malformed("low-order ephemeral key"));
    }

    let mut salt = Vec::with_capacity(64);
    salt.extend_from_slice(&pkesk.ephemeral);
    salt.extend_from_slice(secret.public_key().material());
    let kek = hkdf_key(&salt, shared.as_bytes(), PKESK_INFO)?;
    let session_key = unwrap_session_key(&kek, pkesk.wrapped)?;

    decrypt_data(&session_key, message.data)
}

/// Decrypt a message encrypted under shared session material.
pub fn decrypt_with_session(
    ciphertext: &[u8],
    session_material: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let bytes = unarmor_message(ciphertext)?;
    let message = parse_message(&bytes)?;

    let skesk = message
        .skesks
        .first()
        .ok_or_else(|| CryptoError::KeyNotFound { key_ids: Vec::new() })?;
    let kek = hkdf_key(&skesk.salt, session_material, SKESK_INFO)?;
    let session_key = unwrap_session_key(&kek, skesk.wrapped)?;

    decrypt_data(&session_key, message.data)
}
