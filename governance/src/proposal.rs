//! Proposal data model.

use crate::params::GovernableParam;
use agora_types::{
    AssetId, GovernanceParams, ProposalId, ProposalKind, Timestamp, VoteWeightPolicy,
    WalletAddress, BPS_DENOMINATOR,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a proposal.
///
/// Proposals are created `Active`. `Pending`, `Rejected` and `Approved` are
/// part of the persisted vocabulary but are never assigned: a proposal that
/// fails its quorum simply stays `Active` and can never execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Active,
    Rejected,
    Approved,
    Executed,
    Canceled,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Canceled)
    }
}

/// What a proposer submits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub kind: ProposalKind,
    /// Target asset (`Investment` / `Divestment`).
    pub asset: Option<AssetId>,
    /// Settlement units to invest, shares to divest, or the new parameter value.
    pub amount: Option<u128>,
    /// Parameter to change (`ParameterChange`).
    pub parameter: Option<GovernableParam>,
    pub description: String,
}

impl ProposalRequest {
    pub fn investment(asset: AssetId, amount: u128, description: impl Into<String>) -> Self {
        Self {
            kind: ProposalKind::Investment,
            asset: Some(asset),
            amount: Some(amount),
            parameter: None,
            description: description.into(),
        }
    }

    pub fn divestment(asset: AssetId, shares: u128, description: impl Into<String>) -> Self {
        Self {
            kind: ProposalKind::Divestment,
            asset: Some(asset),
            amount: Some(shares),
            parameter: None,
            description: description.into(),
        }
    }

    pub fn parameter_change(
        parameter: GovernableParam,
        value: u128,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: ProposalKind::ParameterChange,
            asset: None,
            amount: Some(value),
            parameter: Some(parameter),
            description: description.into(),
        }
    }

    pub fn other(description: impl Into<String>) -> Self {
        Self {
            kind: ProposalKind::Other,
            asset: None,
            amount: None,
            parameter: None,
            description: description.into(),
        }
    }
}

/// A voter's current vote on one proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub support: bool,
    /// Weight counted into the tally for this vote.
    pub weight: u128,
    pub last_vote_at: Timestamp,
}

/// Governance terms frozen at proposal creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTerms {
    pub quorum_bps: u32,
    pub min_vote_buffer_secs: u64,
    pub vote_weight: VoteWeightPolicy,
}

impl From<&GovernanceParams> for ProposalTerms {
    fn from(params: &GovernanceParams) -> Self {
        Self {
            quorum_bps: params.quorum_bps,
            min_vote_buffer_secs: params.min_vote_buffer_secs,
            vote_weight: params.vote_weight,
        }
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub kind: ProposalKind,
    pub asset: Option<AssetId>,
    pub amount: Option<u128>,
    pub parameter: Option<GovernableParam>,
    pub description: String,
    pub proposer: WalletAddress,
    pub created_at: Timestamp,
    pub voting_ends: Timestamp,
    pub timelock_ends: Timestamp,
    pub yes_weight: u128,
    pub no_weight: u128,
    pub status: ProposalStatus,
    pub executed: bool,
    pub terms: ProposalTerms,
    pub votes: HashMap<WalletAddress, VoteRecord>,
}

impl Proposal {
    pub(crate) fn new(
        id: ProposalId,
        request: ProposalRequest,
        proposer: WalletAddress,
        created_at: Timestamp,
        params: &GovernanceParams,
    ) -> Self {
        let voting_ends = created_at.saturating_add(params.voting_period_secs);
        Self {
            id,
            kind: request.kind,
            asset: request.asset,
            amount: request.amount,
            parameter: request.parameter,
            description: request.description,
            proposer,
            created_at,
            voting_ends,
            timelock_ends: voting_ends.saturating_add(params.timelock_secs),
            yes_weight: 0,
            no_weight: 0,
            status: ProposalStatus::Active,
            executed: false,
            terms: ProposalTerms::from(params),
            votes: HashMap::new(),
        }
    }

    pub fn has_voted(&self, voter: &WalletAddress) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn vote_of(&self, voter: &WalletAddress) -> Option<&VoteRecord> {
        self.votes.get(voter)
    }

    /// Total weight cast, yes and no.
    pub fn total_weight(&self) -> Option<u128> {
        self.yes_weight.checked_add(self.no_weight)
    }

    /// Yes-weight required to meet quorum: `(yes + no) * quorum_bps / 10_000`.
    ///
    /// `None` on overflow.
    pub fn quorum_votes(&self) -> Option<u128> {
        self.total_weight()?
            .checked_mul(u128::from(self.terms.quorum_bps))
            .map(|w| w / u128::from(BPS_DENOMINATOR))
    }

    /// Whether the recorded votes add up to the tallies.
    pub fn is_consistent(&self) -> bool {
        let (mut yes, mut no) = (0u128, 0u128);
        for record in self.votes.values() {
            let tally = if record.support { &mut yes } else { &mut no };
            match tally.checked_add(record.weight) {
                Some(sum) => *tally = sum,
                None => return false,
            }
        }
        yes == self.yes_weight && no == self.no_weight
    }
}
