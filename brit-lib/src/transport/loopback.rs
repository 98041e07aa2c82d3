//! In-process transport that hands requests straight to a [`Matcher`].

use tracing::warn;

use super::{Transport, TransportError};
use crate::matcher::Matcher;
use crate::messages::EncryptedPayerRequest;

/// Routes every post into a local Matcher.
///
/// Matcher failures are reported the way an HTTP front end would: as a status
/// derived from [`crate::matcher::MatcherError::http_status`].
#[derive(Debug)]
pub struct LoopbackTransport<'a> {
    matcher: &'a Matcher,
}

impl<'a> LoopbackTransport<'a> {
    pub fn new(matcher: &'a Matcher) -> Self {
        Self { matcher }
    }
}

impl Transport for LoopbackTransport<'_> {
    fn post(
        &self,
        url: &str,
        payload: &[u8],
        _content_type: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let request = EncryptedPayerRequest::new(payload.to_vec());
        match self.matcher.handle(&request) {
            Ok(response) => Ok(response.into_bytes()),
            Err(err) => {
                warn!(error = %err, "loopback matcher rejected request");
                Err(TransportError::Status {
                    status: err.http_status(),
                    url: url.to_string(),
                })
            }
        }
    }
}
