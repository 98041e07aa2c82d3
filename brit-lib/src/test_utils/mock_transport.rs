//! Scripted transport.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::transport::{Transport, TransportError};

/// A recorded `post` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedPost {
    pub url: String,
    pub payload: Vec<u8>,
    pub content_type: String,
}

/// Transport that replays queued replies and records what was posted.
///
/// When the queue is empty every post fails with the default error
/// (`Connection` unless set with [`MockTransport::failing`]).
#[derive(Debug)]
pub struct MockTransport {
    replies: RwLock<VecDeque<Result<Vec<u8>, TransportError>>>,
    default_error: TransportError,
    calls: RwLock<Vec<RecordedPost>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            replies: RwLock::new(VecDeque::new()),
            default_error: TransportError::Connection("no scripted reply".into()),
            calls: RwLock::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every post fails with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self {
            default_error: error,
            ..Self::default()
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, body: Vec<u8>) {
        self.replies.write().unwrap().push_back(Ok(body));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: TransportError) {
        self.replies.write().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedPost> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn post(
        &self,
        url: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.write().unwrap().push(RecordedPost {
            url: url.to_string(),
            payload: payload.to_vec(),
            content_type: content_type.to_string(),
        });
        self.replies
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(self.default_error.clone()))
    }
}
