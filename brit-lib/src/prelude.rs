//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use brit_lib::prelude::*;
//! ```

// Core types
pub use crate::{
    BitcoinAddress, BitcoinNetwork, EncryptedMatcherResponse, EncryptedPayerRequest,
    MatcherResponse, PayerRequest, SessionId, WalletIdentity,
};

// Error handling
pub use crate::errors::{BritError, BritErrorCode};
pub use crate::Result;

// Crypto box
pub use crate::crypto::{CryptoBox, EncryptOptions, PublicKey, PublicKeyRing, SecretKeyRing};

// Wire format
pub use crate::codec::WireFormat;

// Payer and Matcher
pub use crate::matcher::{Matcher, MatcherConfig};
pub use crate::payer::{
    open_matcher_response, sync_matcher_response, ExchangeState, MatcherClient, PayerConfig,
};

// Fees
pub use crate::fees::{FeePolicy, FeeScheduler, SendFeeState, WalletActivity};

// Collaborator traits
pub use crate::storage::ExtensionStore;
pub use crate::transport::Transport;
