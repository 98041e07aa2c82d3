//! Fee scheduling state machine.
//!
//! The scheduler is a pure function over plain data. [`FeeScheduler::evaluate`]
//! commits a count and address when none exist and reports whether a payment
//! is due, but never advances the count. Only [`FeeScheduler::record_fee_sent`]
//! moves to the next payment, so a failed broadcast cannot skip one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fallback::fallback_addresses;
use super::policy::FeePolicy;
use super::selection::{select_address, send_jitter};
use super::state::SendFeeState;
use crate::address::{BitcoinAddress, BitcoinNetwork};
use crate::identity::WalletIdentity;
use crate::messages::MatcherResponse;

/// What the wallet did since the last fee payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletActivity {
    /// Outgoing wallet sends since the last fee payment.
    pub sends_since_last_fee: u64,
}

impl WalletActivity {
    pub fn new(sends_since_last_fee: u64) -> Self {
        Self {
            sends_since_last_fee,
        }
    }

    /// Count the sends strictly after `since`, or all of them when `since` is
    /// `None`.
    pub fn from_send_dates<I>(send_dates: I, since: Option<DateTime<Utc>>) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let sends = send_dates
            .into_iter()
            .filter(|date| since.map_or(true, |since| *date > since))
            .count();
        Self::new(sends as u64)
    }
}

/// Where the address pool came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSource {
    Matcher,
    Fallback,
}

/// A fee payment the caller should make now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueFeeSend {
    pub address: BitcoinAddress,
    pub amount_sats: u64,
    /// Ordinal of this payment.
    pub send_count: u64,
}

/// Result of one evaluation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeDecision {
    /// The schedule to persist.
    pub state: SendFeeState,
    pub due: Option<DueFeeSend>,
    pub source: PoolSource,
}

/// Decides when fees are due and where they go.
///
/// # Example
///
/// ```
/// use brit_lib::fees::{FeePolicy, FeeScheduler, SendFeeState, WalletActivity};
/// use brit_lib::{BitcoinNetwork, WalletIdentity};
///
/// let identity = WalletIdentity::derive(&[9u8; 32]).unwrap();
/// let scheduler = FeeScheduler::new(identity, BitcoinNetwork::Mainnet, FeePolicy::default());
///
/// let now = chrono::Utc::now();
/// let decision = scheduler.evaluate(&SendFeeState::default(), &WalletActivity::new(0), None, now);
/// assert!(decision.state.is_committed());
/// assert!(decision.due.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct FeeScheduler {
    identity: WalletIdentity,
    network: BitcoinNetwork,
    policy: FeePolicy,
}

impl FeeScheduler {
    pub fn new(identity: WalletIdentity, network: BitcoinNetwork, policy: FeePolicy) -> Self {
        Self {
            identity,
            network,
            policy,
        }
    }

    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    pub fn network(&self) -> BitcoinNetwork {
        self.network
    }

    /// The pool fee addresses are drawn from.
    ///
    /// Matcher addresses for another network are ignored. When nothing usable
    /// remains the hardwired fallback list is used.
    pub fn address_pool(
        &self,
        response: Option<&MatcherResponse>,
    ) -> (Vec<BitcoinAddress>, PoolSource) {
        let matcher_pool: Vec<BitcoinAddress> = response
            .map(|r| {
                r.addresses
                    .iter()
                    .filter(|a| BitcoinAddress::parse(a.as_str(), self.network).is_ok())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if matcher_pool.is_empty() {
            (fallback_addresses(self.network), PoolSource::Fallback)
        } else {
            (matcher_pool, PoolSource::Matcher)
        }
    }

    /// Start of the window in which wallet sends count toward the next fee:
    /// the later of the last fee payment and the Matcher's replay date.
    pub fn activity_since(
        &self,
        state: &SendFeeState,
        response: Option<&MatcherResponse>,
    ) -> Option<DateTime<Utc>> {
        let replay = response.and_then(|r| r.replay_date);
        match (state.last_fee_send_date, replay) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Evaluate the schedule.
    ///
    /// Calling this twice with the same inputs returns the same decision, and
    /// feeding the returned state back in changes nothing.
    pub fn evaluate(
        &self,
        state: &SendFeeState,
        activity: &WalletActivity,
        response: Option<&MatcherResponse>,
        now: DateTime<Utc>,
    ) -> FeeDecision {
        let (pool, source) = self.address_pool(response);
        let count = state.next_fee_send_count.unwrap_or(0);

        let address = match &state.next_fee_send_address {
            Some(address) if pool.contains(address) => Some(address.clone()),
            Some(address) => {
                debug!(%address, ?source, "committed fee address left the pool, reselecting");
                select_address(&self.identity, count, &pool).cloned()
            }
            None => select_address(&self.identity, count, &pool).cloned(),
        };

        let next = SendFeeState {
            next_fee_send_count: Some(count),
            next_fee_send_address: address.clone(),
            last_fee_send_date: state.last_fee_send_date,
        };

        let due = address.and_then(|address| {
            self.due_amount(count, activity, state.last_fee_send_date, now)
                .map(|amount_sats| DueFeeSend {
                    address,
                    amount_sats,
                    send_count: count,
                })
        });

        debug!(
            send_count = count,
            sends = activity.sends_since_last_fee,
            ?source,
            due = due.is_some(),
            "evaluated fee schedule"
        );

        FeeDecision {
            state: next,
            due,
            source,
        }
    }

    /// Sends required before payment `count` is due.
    pub fn threshold(&self, count: u64) -> u64 {
        self.policy
            .min_sends_between_fees
            .saturating_add(send_jitter(&self.identity, count, self.policy.send_jitter))
    }

    fn due_amount(
        &self,
        count: u64,
        activity: &WalletActivity,
        last_fee_send_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<u64> {
        let sends = activity.sends_since_last_fee;
        if sends < self.threshold(count) {
            return None;
        }
        if let Some(last) = last_fee_send_date {
            if !self.policy.interval_elapsed((now - last).num_seconds()) {
                return None;
            }
        }
        let owed = self.policy.owed_sats(sends);
        if owed == 0 || owed < self.policy.dust_limit_sats {
            return None;
        }
        Some(owed)
    }

    /// Advance the schedule after the caller broadcast the due payment.
    pub fn record_fee_sent(
        &self,
        state: &SendFeeState,
        response: Option<&MatcherResponse>,
        now: DateTime<Utc>,
    ) -> SendFeeState {
        let (pool, _) = self.address_pool(response);
        let count = state.next_fee_send_count.unwrap_or(0).saturating_add(1);
        SendFeeState {
            next_fee_send_count: Some(count),
            next_fee_send_address: select_address(&self.identity, count, &pool).cloned(),
            last_fee_send_date: Some(now),
        }
    }

    /// Re-pick the committed address against a freshly received response,
    /// keeping the count. Returns the state unchanged when the address is
    /// still in the pool.
    pub fn reconcile(
        &self,
        state: &SendFeeState,
        response: Option<&MatcherResponse>,
    ) -> SendFeeState {
        let (pool, _) = self.address_pool(response);
        match &state.next_fee_send_address {
            Some(address) if pool.contains(address) => state.clone(),
            Some(_) => {
                let count = state.next_fee_send_count.unwrap_or(0);
                SendFeeState {
                    next_fee_send_address: select_address(&self.identity, count, &pool).cloned(),
                    ..state.clone()
                }
            }
            None => state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::fallback::is_fallback_address;
    use chrono::{Duration, TimeZone};

    fn scheduler() -> FeeScheduler {
        FeeScheduler::new(
            WalletIdentity::derive(&[5u8; 32]).unwrap(),
            BitcoinNetwork::Mainnet,
            FeePolicy::default(),
        )
    }

    fn response() -> MatcherResponse {
        MatcherResponse::new(
            [
                "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
                "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
                "12c6DSiU4Rq3P4ZxziKxzrGxvLN6ZeN28",
            ]
            .iter()
            .map(|s| BitcoinAddress::parse_any(s).unwrap())
            .collect(),
            None,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_initialises_schedule() {
        let decision = scheduler().evaluate(
            &SendFeeState::default(),
            &WalletActivity::new(0),
            Some(&response()),
            now(),
        );
        assert_eq!(decision.state.next_fee_send_count, Some(0));
        assert!(response().contains(decision.state.next_fee_send_address.as_ref().unwrap()));
        assert_eq!(decision.source, PoolSource::Matcher);
        assert!(decision.due.is_none());
    }

    #[test]
    fn test_fixed_count_selects_same_address_and_advances() {
        let s = scheduler();
        let response = response();
        let state = SendFeeState {
            next_fee_send_count: Some(2),
            ..Default::default()
        };
        let first = s.evaluate(&state, &WalletActivity::new(0), Some(&response), now());
        for _ in 0..5 {
            let again = s.evaluate(&state, &WalletActivity::new(0), Some(&response), now());
            assert_eq!(again, first);
        }

        let after = s.record_fee_sent(&first.state, Some(&response), now());
        assert_eq!(after.next_fee_send_count, Some(3));
        assert_eq!(after.last_fee_send_date, Some(now()));
    }

    #[test]
    fn test_due_after_threshold() {
        let s = scheduler();
        let response = response();
        let threshold = s.threshold(0);
        assert!((20..30).contains(&threshold));

        let state = s
            .evaluate(&SendFeeState::default(), &WalletActivity::new(0), Some(&response), now())
            .state;

        let below = s.evaluate(&state, &WalletActivity::new(threshold - 1), Some(&response), now());
        assert!(below.due.is_none());

        let at = s.evaluate(&state, &WalletActivity::new(threshold), Some(&response), now());
        let due = at.due.unwrap();
        assert_eq!(due.send_count, 0);
        assert_eq!(due.amount_sats, threshold * 1_000);
        assert_eq!(Some(due.address), state.next_fee_send_address);
        assert_eq!(at.state, state);
    }

    #[test]
    fn test_min_interval_blocks() {
        let s = scheduler();
        let state = SendFeeState {
            last_fee_send_date: Some(now() - Duration::hours(1)),
            ..Default::default()
        };
        let decision = s.evaluate(&state, &WalletActivity::new(1_000), None, now());
        assert!(decision.due.is_none());

        let later = s.evaluate(
            &decision.state,
            &WalletActivity::new(1_000),
            None,
            now() + Duration::days(1),
        );
        assert_eq!(later.due.unwrap().amount_sats, 50_000);
    }

    #[test]
    fn test_dust_limit() {
        let s = FeeScheduler::new(
            WalletIdentity::derive(&[5u8; 32]).unwrap(),
            BitcoinNetwork::Mainnet,
            FeePolicy::default()
                .with_fee_per_send_sats(10)
                .with_min_sends_between_fees(1)
                .with_send_jitter(0),
        );
        let decision = s.evaluate(&SendFeeState::default(), &WalletActivity::new(5), None, now());
        assert!(decision.due.is_none());
        let decision = s.evaluate(&decision.state, &WalletActivity::new(60), None, now());
        assert_eq!(decision.due.unwrap().amount_sats, 600);
    }

    #[test]
    fn test_fallback_when_absent_or_empty() {
        let s = scheduler();
        for response in [None, Some(MatcherResponse::default())] {
            let decision = s.evaluate(
                &SendFeeState::default(),
                &WalletActivity::new(10_000),
                response.as_ref(),
                now(),
            );
            assert_eq!(decision.source, PoolSource::Fallback);
            assert!(is_fallback_address(&decision.due.unwrap().address));
        }
    }

    #[test]
    fn test_fallback_address_replaced_when_pool_arrives() {
        let s = scheduler();
        let fallback_state = s
            .evaluate(&SendFeeState::default(), &WalletActivity::new(0), None, now())
            .state;
        assert!(is_fallback_address(fallback_state.next_fee_send_address.as_ref().unwrap()));

        let response = response();
        let decision = s.evaluate(&fallback_state, &WalletActivity::new(0), Some(&response), now());
        assert_eq!(decision.state.next_fee_send_count, Some(0));
        assert!(response.contains(decision.state.next_fee_send_address.as_ref().unwrap()));
    }

    #[test]
    fn test_committed_address_survives_evaluation() {
        let s = scheduler();
        let response = response();
        let committed = SendFeeState::committed(7, response.addresses[1].clone());
        let decision = s.evaluate(&committed, &WalletActivity::new(3), Some(&response), now());
        assert_eq!(decision.state, committed);
    }

    #[test]
    fn test_reconcile() {
        let s = scheduler();
        let response = response();
        let kept = SendFeeState::committed(4, response.addresses[0].clone());
        assert_eq!(s.reconcile(&kept, Some(&response)), kept);

        let stale =
            SendFeeState::committed(4, fallback_addresses(BitcoinNetwork::Mainnet)[0].clone());
        let fixed = s.reconcile(&stale, Some(&response));
        assert_eq!(fixed.next_fee_send_count, Some(4));
        assert!(response.contains(fixed.next_fee_send_address.as_ref().unwrap()));
    }

    #[test]
    fn test_activity_window() {
        let s = scheduler();
        let replay = now() - Duration::days(10);
        let last = now() - Duration::days(3);
        let mut response = response();
        response.replay_date = Some(replay);

        let state = SendFeeState::default().with_last_fee_send_date(Some(last));
        assert_eq!(s.activity_since(&state, Some(&response)), Some(last));
        assert_eq!(s.activity_since(&SendFeeState::default(), Some(&response)), Some(replay));
        assert_eq!(s.activity_since(&SendFeeState::default(), None), None);

        let dates = (0..10).map(|d| now() - Duration::days(d));
        assert_eq!(WalletActivity::from_send_dates(dates, Some(last)).sends_since_last_fee, 3);
    }

    #[test]
    fn test_other_network_addresses_ignored() {
        let s = scheduler();
        let testnet_only = MatcherResponse::new(
            vec![BitcoinAddress::parse_any("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx").unwrap()],
            None,
        );
        let (_, source) = s.address_pool(Some(&testnet_only));
        assert_eq!(source, PoolSource::Fallback);
    }
}
