//! Packet framing shared by key rings and encrypted messages.
//!
//! ```text
//! [1 byte tag][4 bytes big-endian body length][body]
//! ```

/// Upper bound on a single packet body. Large enough for the biggest
/// plaintext the envelope accepts plus AEAD and inner framing overhead.
pub(crate) const MAX_PACKET_LEN: usize = super::MAX_PLAINTEXT_LEN + 1024;

const HEADER_LEN: usize = 5;

/// Packet types understood by the envelope and key ring parsers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketTag {
    /// Session key encrypted to a recipient public key.
    PublicKeySession = 1,
    /// Signature (never produced, rejected on input).
    Signature = 2,
    /// Session key encrypted under shared session material.
    SessionKeySession = 3,
    /// One-pass signature header (never produced, rejected on input).
    OnePassSignature = 4,
    /// Secret key.
    SecretKey = 5,
    /// Public key.
    PublicKey = 6,
    /// Compressed data (never produced, rejected on input).
    Compressed = 8,
    /// Literal data.
    Literal = 11,
    /// User id attached to the preceding key.
    UserId = 13,
    /// Integrity protected encrypted data.
    EncryptedData = 18,
    /// Modification detection code.
    ModificationDetection = 19,
}

impl PacketTag {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::PublicKeySession,
            2 => Self::Signature,
            3 => Self::SessionKeySession,
            4 => Self::OnePassSignature,
            5 => Self::SecretKey,
            6 => Self::PublicKey,
            8 => Self::Compressed,
            11 => Self::Literal,
            13 => Self::UserId,
            18 => Self::EncryptedData,
            19 => Self::ModificationDetection,
            _ => return None,
        })
    }
}

/// Framing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("empty packet stream")]
    Empty,
    #[error("truncated packet at offset {0}")]
    Truncated(usize),
    #[error("unknown packet tag {0}")]
    UnknownTag(u8),
    #[error("packet body of {0} bytes exceeds limit")]
    TooLarge(usize),
}

/// A borrowed packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet<'a> {
    pub tag: PacketTag,
    pub body: &'a [u8],
}

/// Append a framed packet to `out`.
pub fn write_packet(out: &mut Vec<u8>, tag: PacketTag, body: &[u8]) {
    out.reserve(HEADER_LEN + body.len());
    out.push(tag as u8);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}

/// Split a byte stream into packets.
pub fn parse_packets(bytes: &[u8]) -> Result<Vec<Packet<'_>>, PacketError> {
    if bytes.is_empty() {
        return Err(PacketError::Empty);
    }

    let mut packets = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        if bytes.len() - offset < HEADER_LEN {
            return Err(PacketError::Truncated(offset));
        }
        let tag = PacketTag::from_u8(bytes[offset]).ok_or(PacketError::UnknownTag(bytes[offset]))?;
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[offset + 1..offset + HEADER_LEN]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > MAX_PACKET_LEN {
            return Err(PacketError::TooLarge(len));
        }
        let start = offset + HEADER_LEN;
        let end = start.checked_add(len).ok_or(PacketError::Truncated(offset))?;
        if end > bytes.len() {
            return Err(PacketError::Truncated(offset));
        }
        packets.push(Packet {
            tag,
            body: &bytes[start..end],
        });
        offset = end;
    }
    Ok(packets)
}

/// Cursor over a packet body. Every read returns `None` past the end.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn u8(&mut self) -> Option<u8> {
        let value = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Some(out)
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.array::<4>().map(u32::from_be_bytes)
    }

    pub fn i64(&mut self) -> Option<i64> {
        self.array::<8>().map(i64::from_be_bytes)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        rest
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}
