//! Protocol parameters: governance terms and the default fee schedule.
//!
//! Every governance field can be changed by an admin or by an executed
//! parameter-change proposal. Changes only bind proposals created afterwards.

use serde::{Deserialize, Serialize};

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// How a voter's weight is read from the balance ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteWeightPolicy {
    /// Balance checkpoint as of the proposal's creation time.
    #[default]
    Snapshot,
    /// Balance at the moment the vote is cast. Tokens can be moved in, voted
    /// with, and moved out again before the next voter uses them.
    Live,
}

/// Governance configuration read by every proposal evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Share of cast weight that must be "yes" (basis points, 1..=10_000).
    pub quorum_bps: u32,

    /// Seconds between proposal creation and the end of voting. Must be > 0.
    pub voting_period_secs: u64,

    /// Seconds between the end of voting and the earliest execution.
    pub timelock_secs: u64,

    /// Balance a proposer is expected to hold (raw units).
    #[serde(with = "amount_serde")]
    pub min_proposal_stake: u128,

    /// Minimum seconds between two votes by the same voter on one proposal.
    pub min_vote_buffer_secs: u64,

    /// Whether `min_proposal_stake` is checked when a proposal is created.
    pub enforce_min_proposal_stake: bool,

    /// Where vote weight is read from.
    pub vote_weight: VoteWeightPolicy,
}

impl GovernanceParams {
    /// Defaults for a fresh deployment.
    pub fn agora_defaults() -> Self {
        Self {
            quorum_bps: 5000,                    // 50%
            voting_period_secs: 3 * 24 * 3600,   // 3 days
            timelock_secs: 2 * 24 * 3600,        // 2 days
            min_proposal_stake: 0,
            min_vote_buffer_secs: 3600,          // 1 hour
            enforce_min_proposal_stake: false,
            vote_weight: VoteWeightPolicy::Snapshot,
        }
    }

    /// Check the ranges the engine relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum_bps == 0 || self.quorum_bps > BPS_DENOMINATOR {
            return Err(format!(
                "quorum_bps must be within 1..={BPS_DENOMINATOR}, got {}",
                self.quorum_bps
            ));
        }
        if self.voting_period_secs == 0 {
            return Err("voting_period_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::agora_defaults()
    }
}

/// Serde adapter for `u128` amounts.
///
/// TOML integers are 64-bit, so human-readable formats write amounts as
/// decimal strings and accept either strings or integers. Binary formats
/// keep the raw `u128`.
pub mod amount_serde {
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(value)
        } else {
            serializer.serialize_u128(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        if !deserializer.is_human_readable() {
            return u128::deserialize(deserializer);
        }
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.parse()
                .map_err(|_| E::custom(format!("invalid amount {v:?}")))
        }
    }
}

/// Fee rates (basis points of the gross amount) per fee-bearing operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub invest_bps: u32,
    pub divest_bps: u32,
    /// Emergency exit pays more than a regular divest.
    pub rage_quit_bps: u32,
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<(), String> {
        for (name, bps) in [
            ("invest_bps", self.invest_bps),
            ("divest_bps", self.divest_bps),
            ("rage_quit_bps", self.rage_quit_bps),
        ] {
            if bps > BPS_DENOMINATOR {
                return Err(format!("{name} must be at most {BPS_DENOMINATOR}, got {bps}"));
            }
        }
        if self.rage_quit_bps < self.divest_bps {
            return Err(format!(
                "rage_quit_bps ({}) must not be below divest_bps ({})",
                self.rage_quit_bps, self.divest_bps
            ));
        }
        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            invest_bps: 100,     // 1%
            divest_bps: 50,      // 0.5%
            rage_quit_bps: 500,  // 5%
        }
    }
}
