//! Encrypted messages travel as the crypto box output, binary or armored.
//! Decoding only checks the outer shape; the crypto box does the rest.

use super::{CodecError, WireFormat};
use crate::crypto::{is_armored, PacketTag};
use crate::messages::{EncryptedMatcherResponse, EncryptedPayerRequest};

fn check_envelope(bytes: &[u8], what: &'static str) -> Result<(), CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::malformed(what, "empty"));
    }
    if is_armored(bytes) {
        return Ok(());
    }
    let first = bytes[0];
    if first == PacketTag::PublicKeySession as u8 || first == PacketTag::SessionKeySession as u8 {
        Ok(())
    } else {
        Err(CodecError::malformed(
            what,
            format!("unexpected leading packet tag {}", first),
        ))
    }
}

impl WireFormat for EncryptedPayerRequest {
    const WHAT: &'static str = "encrypted payer request";

    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        check_envelope(bytes, Self::WHAT)?;
        Ok(Self::new(bytes.to_vec()))
    }
}

impl WireFormat for EncryptedMatcherResponse {
    const WHAT: &'static str = "encrypted matcher response";

    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        check_envelope(bytes, Self::WHAT)?;
        Ok(Self::new(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_binary_and_armored() {
        assert!(EncryptedPayerRequest::decode(&[1, 0, 0, 0, 0]).is_ok());
        assert!(EncryptedMatcherResponse::decode(&[3, 0, 0, 0, 0]).is_ok());
        assert!(EncryptedMatcherResponse::decode(b"-----BEGIN BRIT MESSAGE-----\n").is_ok());
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(EncryptedPayerRequest::decode(b"").is_err());
        assert!(EncryptedPayerRequest::decode(b"plain text").is_err());
        assert!(EncryptedMatcherResponse::decode(&[18, 0, 0, 0, 0]).is_err());
    }
}
