//! Fee scheduling.
//!
//! Decides, from the wallet's activity and the stored [`SendFeeState`],
//! whether a fee payment is due and which address receives it. Addresses come
//! from the stored Matcher response or, failing that, from the fallback list
//! shipped with the crate.
//!
//! Nothing here performs I/O; callers load and store the schedule through
//! [`crate::storage`].

pub mod fallback;
mod policy;
pub mod selection;
mod scheduler;
mod state;

pub use fallback::{fallback_addresses, is_fallback_address};
pub use policy::FeePolicy;
pub use scheduler::{DueFeeSend, FeeDecision, FeeScheduler, PoolSource, WalletActivity};
pub use state::SendFeeState;
