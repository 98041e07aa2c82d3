//! Wire and persistence encodings.
//!
//! Every layout is plain text so stored slots stay inspectable:
//!
//! | Value | Layout |
//! |-------|--------|
//! | [`PayerRequest`] | `<version>\n<identity hex>\n<session hex>\n<first tx millis>\n` |
//! | [`MatcherResponse`] | `<replay millis>\n` then one `<address>\n` per address |
//! | [`SendFeeState`] | `<count>\|<address>\|` with optional `<last send millis>\|` |
//!
//! Absent optional fields are written as [`NOT_PRESENT`]. Encoding is
//! deterministic so the same value always produces the same bytes.
//!
//! [`PayerRequest`]: crate::messages::PayerRequest
//! [`MatcherResponse`]: crate::messages::MatcherResponse
//! [`SendFeeState`]: crate::fees::SendFeeState

mod encrypted;
mod fee_state;
mod request;
mod response;

use chrono::{DateTime, TimeZone, Utc};

/// Marker written in place of an absent optional field.
pub const NOT_PRESENT: &str = "not-present";

/// Decoding failures. Decoders never panic on any input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("unsupported wire format version {0}")]
    UnsupportedVersion(u32),
}

impl CodecError {
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }

    /// Whether the input was unusable, which covers versions this build
    /// cannot read.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::UnsupportedVersion(_))
    }
}

/// A value with a canonical byte encoding.
pub trait WireFormat: Sized {
    /// Human readable name used in error messages.
    const WHAT: &'static str;

    fn encode(&self) -> Vec<u8>;

    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// Decode a value read from a persistence slot.
///
/// An empty slot means nothing has been stored yet and yields `Ok(None)`.
pub fn decode_optional<T: WireFormat>(bytes: &[u8]) -> Result<Option<T>, CodecError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    T::decode(bytes).map(Some)
}

/// Encode an optional value for a persistence slot; `None` becomes empty.
pub fn encode_optional<T: WireFormat>(value: Option<&T>) -> Vec<u8> {
    value.map(T::encode).unwrap_or_default()
}

fn as_text<'a>(bytes: &'a [u8], what: &'static str) -> Result<&'a str, CodecError> {
    std::str::from_utf8(bytes).map_err(|_| CodecError::malformed(what, "not valid UTF-8"))
}

fn encode_optional_field<T>(value: Option<T>, f: impl FnOnce(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| NOT_PRESENT.to_string())
}

fn encode_date(date: Option<DateTime<Utc>>) -> String {
    encode_optional_field(date, |d| d.timestamp_millis().to_string())
}

fn decode_date(field: &str, what: &'static str) -> Result<Option<DateTime<Utc>>, CodecError> {
    if field == NOT_PRESENT {
        return Ok(None);
    }
    let millis: i64 = field
        .parse()
        .map_err(|_| CodecError::malformed(what, format!("invalid timestamp {:?}", field)))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Some)
        .ok_or_else(|| CodecError::malformed(what, format!("timestamp {} out of range", millis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_field() {
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let encoded = encode_date(Some(date));
        assert_eq!(encoded, "1700000000123");
        assert_eq!(decode_date(&encoded, "t").unwrap(), Some(date));
        assert_eq!(decode_date(NOT_PRESENT, "t").unwrap(), None);
        assert_eq!(encode_date(None), NOT_PRESENT);
    }

    #[test]
    fn test_bad_date_field() {
        assert!(decode_date("", "t").unwrap_err().is_malformed());
        assert!(decode_date("12x", "t").unwrap_err().is_malformed());
        assert!(decode_date("99999999999999999999", "t").unwrap_err().is_malformed());
        assert!(decode_date(&i64::MAX.to_string(), "t").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = CodecError::malformed("send fee state", "missing separator");
        assert_eq!(err.to_string(), "malformed send fee state: missing separator");
        assert!(CodecError::UnsupportedVersion(9).is_malformed());
    }
}
