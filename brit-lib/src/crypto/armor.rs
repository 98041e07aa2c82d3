//! ASCII armor for messages and key rings.
//!
//! ```text
//! -----BEGIN BRIT MESSAGE-----
//! Version: brit 1
//!
//! <base64, 64 columns>
//! =<base64 of the 24-bit CRC>
//! -----END BRIT MESSAGE-----
//! ```
//!
//! The checksum is the OpenPGP CRC-24 over the decoded bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crc::{Crc, CRC_24_OPENPGP};

const CRC24: Crc<u32> = Crc::<u32>::new(&CRC_24_OPENPGP);
const LINE_WIDTH: usize = 64;
const VERSION_HEADER: &str = "Version: brit 1";

/// What an armored block contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmorKind {
    Message,
    PublicKeyRing,
    SecretKeyRing,
}

impl ArmorKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Message => "BRIT MESSAGE",
            Self::PublicKeyRing => "BRIT PUBLIC KEY BLOCK",
            Self::SecretKeyRing => "BRIT PRIVATE KEY BLOCK",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        [Self::Message, Self::PublicKeyRing, Self::SecretKeyRing]
            .into_iter()
            .find(|kind| kind.label() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArmorError {
    #[error("missing BEGIN line")]
    MissingBegin,
    #[error("unknown armor label: {0}")]
    UnknownLabel(String),
    #[error("missing or mismatched END line")]
    MissingEnd,
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("checksum mismatch")]
    Checksum,
}

/// Whether `bytes` look like an armored block.
pub fn is_armored(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"-----BEGIN ")
}

/// Wrap `data` in an armored block.
pub fn armor(kind: ArmorKind, data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let crc = CRC24.checksum(data).to_be_bytes();

    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 128);
    out.push_str(&format!("-----BEGIN {}-----\n", kind.label()));
    out.push_str(VERSION_HEADER);
    out.push_str("\n\n");
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII, so chunks are valid UTF-8
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push('=');
    out.push_str(&STANDARD.encode(&crc[1..]));
    out.push('\n');
    out.push_str(&format!("-----END {}-----\n", kind.label()));
    out
}

/// Strip the armor from `input` and verify its checksum.
pub fn dearmor(input: &[u8]) -> Result<(ArmorKind, Vec<u8>), ArmorError> {
    let text = std::str::from_utf8(input).map_err(|_| ArmorError::MissingBegin)?;
    let mut lines = text.lines().map(str::trim).skip_while(|line| line.is_empty());

    let begin = lines.next().ok_or(ArmorError::MissingBegin)?;
    let label = begin
        .strip_prefix("-----BEGIN ")
        .and_then(|rest| rest.strip_suffix("-----"))
        .ok_or(ArmorError::MissingBegin)?;
    let kind = ArmorKind::from_label(label).ok_or_else(|| ArmorError::UnknownLabel(label.into()))?;
    let end_line = format!("-----END {}-----", label);

    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;
    let mut ended = false;
    for line in lines {
        if line == end_line {
            ended = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }
        // Trailing base64 padding never forms a 5 character line.
        if line.len() == 5 && line.starts_with('=') {
            checksum = Some(line[1..].to_string());
        } else if !line.is_empty() {
            body.push_str(line);
        }
    }
    if !ended {
        return Err(ArmorError::MissingEnd);
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| ArmorError::Base64(e.to_string()))?;

    if let Some(crc) = checksum {
        let expected = STANDARD
            .decode(crc.as_bytes())
            .map_err(|e| ArmorError::Base64(e.to_string()))?;
        let actual = CRC24.checksum(&data).to_be_bytes();
        if expected.as_slice() != &actual[1..] {
            return Err(ArmorError::Checksum);
        }
    }

    Ok((kind, data))
}
