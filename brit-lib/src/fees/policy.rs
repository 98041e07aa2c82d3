//! Fee cadence configuration.

use serde::{Deserialize, Serialize};

/// How often and how much the wallet pays.
///
/// # Example
///
/// ```
/// use brit_lib::fees::FeePolicy;
///
/// let policy = FeePolicy::default()
///     .with_fee_per_send_sats(500)
///     .with_min_sends_between_fees(10);
/// assert_eq!(policy.owed_sats(4), 2_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Fee accrued per wallet send, in satoshis.
    #[serde(default = "default_fee_per_send_sats")]
    pub fee_per_send_sats: u64,

    /// Minimum sends between two fee payments before jitter.
    #[serde(default = "default_min_sends_between_fees")]
    pub min_sends_between_fees: u64,

    /// Upper bound (exclusive) of the per-payment send jitter.
    #[serde(default = "default_send_jitter")]
    pub send_jitter: u64,

    /// Minimum seconds between two fee payments.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Amounts below this are never paid.
    #[serde(default = "default_dust_limit_sats")]
    pub dust_limit_sats: u64,

    /// Cap on a single fee payment.
    #[serde(default = "default_max_fee_sats")]
    pub max_fee_sats: u64,
}

fn default_fee_per_send_sats() -> u64 {
    1_000
}

fn default_min_sends_between_fees() -> u64 {
    20
}

fn default_send_jitter() -> u64 {
    10
}

fn default_min_interval_secs() -> u64 {
    86_400 // one day
}

fn default_dust_limit_sats() -> u64 {
    546
}

fn default_max_fee_sats() -> u64 {
    50_000
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            fee_per_send_sats: default_fee_per_send_sats(),
            min_sends_between_fees: default_min_sends_between_fees(),
            send_jitter: default_send_jitter(),
            min_interval_secs: default_min_interval_secs(),
            dust_limit_sats: default_dust_limit_sats(),
            max_fee_sats: default_max_fee_sats(),
        }
    }
}

impl FeePolicy {
    pub fn with_fee_per_send_sats(mut self, sats: u64) -> Self {
        self.fee_per_send_sats = sats;
        self
    }

    pub fn with_min_sends_between_fees(mut self, sends: u64) -> Self {
        self.min_sends_between_fees = sends;
        self
    }

    pub fn with_send_jitter(mut self, jitter: u64) -> Self {
        self.send_jitter = jitter;
        self
    }

    pub fn with_min_interval_secs(mut self, secs: u64) -> Self {
        self.min_interval_secs = secs;
        self
    }

    pub fn with_dust_limit_sats(mut self, sats: u64) -> Self {
        self.dust_limit_sats = sats;
        self
    }

    pub fn with_max_fee_sats(mut self, sats: u64) -> Self {
        self.max_fee_sats = sats;
        self
    }

    /// Amount owed after `sends` wallet sends, capped at `max_fee_sats`.
    pub fn owed_sats(&self, sends: u64) -> u64 {
        sends
            .saturating_mul(self.fee_per_send_sats)
            .min(self.max_fee_sats)
    }

    /// Whether `elapsed_secs` satisfies the minimum interval.
    pub fn interval_elapsed(&self, elapsed_secs: i64) -> bool {
        elapsed_secs >= 0 && elapsed_secs as u64 >= self.min_interval_secs
    }
}
