//! Error types for BRIT operations.
//!
//! Each component reports a narrow error enum (`CryptoError`, `CodecError`,
//! `TransportError`, `StorageError`, `MatcherError`). `BritError` wraps them
//! for callers that drive a whole exchange and need a single type with a
//! stable numeric code.

use std::fmt;

use crate::codec::CodecError;
use crate::crypto::CryptoError;
use crate::matcher::MatcherError;
use crate::storage::StorageError;
use crate::transport::TransportError;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BritErrorCode {
    /// Transport/network layer error
    Transport = 2000,
    /// Connection timeout
    TransportTimeout = 2002,
    /// Non-success status from the Matcher endpoint
    TransportStatus = 2003,
    /// Public key could not be parsed
    InvalidKey = 3000,
    /// No secret key matches the message recipient
    KeyNotFound = 3001,
    /// Integrity or authentication tag did not verify
    IntegrityCheckFailed = 3002,
    /// Ciphertext is structurally invalid
    MalformedCiphertext = 3003,
    /// Key ring holds no encryption-capable key
    NoEncryptionKey = 3004,
    /// Secret key passphrase is wrong
    InvalidPassphrase = 3005,
    /// Plaintext exceeds the envelope size bound
    PlaintextTooLarge = 3006,
    /// Malformed wire or persisted data
    Malformed = 5000,
    /// Invalid input to a constructor
    InvalidData = 5001,
    /// Storage error
    Storage = 7000,
    /// Matcher could not serve the request
    Matcher = 8000,
}

/// Comprehensive error type for BRIT operations.
#[derive(Debug)]
pub enum BritError {
    /// Envelope encryption or decryption failed.
    Crypto(CryptoError),

    /// Wire or persisted data could not be decoded.
    Codec(CodecError),

    /// The Matcher could not be reached.
    Transport(TransportError),

    /// An extension slot could not be read or written.
    Storage(StorageError),

    /// The Matcher failed to serve a request.
    Matcher(MatcherError),

    /// Invalid data provided.
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

impl BritError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> BritErrorCode {
        match self {
            Self::Crypto(err) => match err {
                CryptoError::InvalidKey(_) => BritErrorCode::InvalidKey,
                CryptoError::KeyNotFound { .. } => BritErrorCode::KeyNotFound,
                CryptoError::IntegrityCheckFailed(_) => BritErrorCode::IntegrityCheckFailed,
                CryptoError::MalformedCiphertext(_) => BritErrorCode::MalformedCiphertext,
                CryptoError::NoEncryptionKey => BritErrorCode::NoEncryptionKey,
                CryptoError::InvalidPassphrase => BritErrorCode::InvalidPassphrase,
                CryptoError::PlaintextTooLarge { .. } => BritErrorCode::PlaintextTooLarge,
            },
            Self::Codec(_) => BritErrorCode::Malformed,
            Self::Transport(err) => match err {
                TransportError::Timeout { .. } => BritErrorCode::TransportTimeout,
                TransportError::Status { .. } => BritErrorCode::TransportStatus,
                _ => BritErrorCode::Transport,
            },
            Self::Storage(_) => BritErrorCode::Storage,
            Self::Matcher(_) => BritErrorCode::Matcher,
            Self::InvalidData { .. } => BritErrorCode::InvalidData,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying.
    ///
    /// Only transport and storage failures qualify. Crypto and codec failures
    /// mean the exchange cannot be trusted and retrying the same bytes will
    /// not help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Storage(_))
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Transport(TransportError::Timeout { .. }) => Some(30_000),
            Self::Transport(TransportError::Status { status, .. }) if *status >= 500 => {
                Some(60_000)
            }
            Self::Transport(_) => Some(10_000),
            Self::Storage(_) => Some(500),
            _ => None,
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BritError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crypto(err) => write!(f, "crypto error: {}", err),
            Self::Codec(err) => write!(f, "codec error: {}", err),
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Storage(err) => write!(f, "storage error: {}", err),
            Self::Matcher(err) => write!(f, "matcher error: {}", err),
            Self::InvalidData { field, reason } => write!(f, "invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for BritError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Crypto(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Matcher(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<CryptoError> for BritError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err)
    }
}

impl From<CodecError> for BritError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

impl From<TransportError> for BritError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<StorageError> for BritError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<MatcherError> for BritError {
    fn from(err: MatcherError) -> Self {
        Self::Matcher(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BritError::from(TransportError::Timeout { timeout_ms: 500 });
        assert_eq!(err.code(), BritErrorCode::TransportTimeout);
        assert!(err.is_retryable());
        assert_eq!(err.retry_after_ms(), Some(30_000));

        let err = BritError::from(CryptoError::NoEncryptionKey);
        assert_eq!(err.code(), BritErrorCode::NoEncryptionKey);
        assert!(!err.is_retryable());
        assert_eq!(err.retry_after_ms(), None);
    }

    #[test]
    fn test_status_retry_delay() {
        let server = BritError::from(TransportError::Status {
            status: 503,
            url: "https://matcher.example/brit".into(),
        });
        let client = BritError::from(TransportError::Status {
            status: 404,
            url: "https://matcher.example/brit".into(),
        });
        assert_eq!(server.retry_after_ms(), Some(60_000));
        assert_eq!(client.retry_after_ms(), Some(10_000));
    }

    #[test]
    fn test_error_display() {
        let err = BritError::from(CodecError::malformed("send fee state", "missing separator"));
        assert!(err.to_string().contains("codec error"));
        assert!(err.to_string().contains("missing separator"));

        let err = BritError::invalid_data("session id", "too short");
        assert_eq!(err.code(), BritErrorCode::InvalidData);
        assert_eq!(err.to_string(), "invalid session id: too short");
    }
}
