//! Test utilities for BRIT.
//!
//! - Fixtures: identities, address pools and ready-made Matchers
//! - [`MockTransport`]: scripted replies and call recording
//!
//! ```rust,ignore
//! use brit_lib::test_utils::{test_matcher, MockTransport};
//!
//! let fixture = test_matcher();
//! let transport = MockTransport::failing(TransportError::Cancelled);
//! ```

mod fixtures;
mod mock_transport;

pub use fixtures::{
    test_client, test_identity, test_matcher, test_matcher_with, test_pool, MatcherFixture,
};
pub use mock_transport::{MockTransport, RecordedPost};

pub use crate::transport::LoopbackTransport;
