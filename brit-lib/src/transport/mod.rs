//! Transport boundary between Payer and Matcher.
//!
//! The protocol needs exactly one operation: post a payload and read back the
//! reply. Implementations own their timeouts and cancellation; the core never
//! retries.

#[cfg(feature = "http-transport")]
mod http;
mod loopback;

#[cfg(feature = "http-transport")]
pub use http::HttpTransport;
pub use loopback::LoopbackTransport;

/// Why a post did not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request cancelled")]
    Cancelled,
}

/// Synchronous request/response channel to a Matcher.
pub trait Transport {
    /// Post `payload` to `url` and return the response body.
    ///
    /// Non-success statuses are errors; the body of a failed request is
    /// discarded.
    fn post(&self, url: &str, payload: &[u8], content_type: &str)
        -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(
        &self,
        url: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).post(url, payload, content_type)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(
        &self,
        url: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).post(url, payload, content_type)
    }
}
