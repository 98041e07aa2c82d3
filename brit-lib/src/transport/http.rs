//! Blocking HTTP transport.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::{Transport, TransportError};

/// HTTPS POST via `reqwest`'s blocking client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn with_timeout_secs(secs: u64) -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(secs))
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<Vec<u8>, TransportError> {
        debug!(url, bytes = payload.len(), "posting to matcher");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(payload.to_vec())
            .send()
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "matcher returned an error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().map_err(|e| self.map_error(e))?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_host_is_connection_error() {
        let transport = HttpTransport::with_timeout_secs(2).unwrap();
        // port 9 on localhost is not expected to accept connections
        let err = transport
            .post("http://127.0.0.1:9/brit", b"x", "application/octet-stream")
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connection(_) | TransportError::Timeout { .. }
        ));
    }
}
