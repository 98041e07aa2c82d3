//! Persisted fee schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::BitcoinAddress;

/// Which fee payment is next and where it goes.
///
/// Once `next_fee_send_count` and `next_fee_send_address` are set they stay
/// put until the send is recorded as done, or a new Matcher response no longer
/// contains the address. Transitions return a new value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFeeState {
    /// Ordinal of the next fee payment, starting at zero.
    pub next_fee_send_count: Option<u64>,
    /// Destination committed for the next fee payment.
    pub next_fee_send_address: Option<BitcoinAddress>,
    /// When the previous fee payment was recorded.
    pub last_fee_send_date: Option<DateTime<Utc>>,
}

impl SendFeeState {
    /// A schedule with both count and address set.
    pub fn committed(count: u64, address: BitcoinAddress) -> Self {
        Self {
            next_fee_send_count: Some(count),
            next_fee_send_address: Some(address),
            last_fee_send_date: None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.next_fee_send_count.is_some() && self.next_fee_send_address.is_some()
    }

    pub fn with_address(&self, address: BitcoinAddress) -> Self {
        Self {
            next_fee_send_address: Some(address),
            ..self.clone()
        }
    }

    pub fn with_last_fee_send_date(&self, date: Option<DateTime<Utc>>) -> Self {
        Self {
            last_fee_send_date: date,
            ..self.clone()
        }
    }
}
