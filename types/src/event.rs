//! Notification records emitted by the engines.
//!
//! Records are appended to an audit log after an operation commits. They are
//! never read back by the engines and carry no state of their own.

use crate::{AssetId, AssetState, ProposalId, ProposalKind, Timestamp, WalletAddress};
use serde::{Deserialize, Serialize};

/// A structured notification for external observers and auditors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    AssetCreated {
        asset: AssetId,
        creator: WalletAddress,
        name: String,
        at: Timestamp,
    },
    AssetStateChanged {
        asset: AssetId,
        actor: WalletAddress,
        from: AssetState,
        to: AssetState,
    },
    Invested {
        asset: AssetId,
        investor: WalletAddress,
        gross: u128,
        fee: u128,
        shares_issued: u128,
        total_shares_before: u128,
        total_shares_after: u128,
    },
    Divested {
        asset: AssetId,
        investor: WalletAddress,
        shares_redeemed: u128,
        fee: u128,
        payout: u128,
        total_shares_before: u128,
        total_shares_after: u128,
    },
    RageQuit {
        asset: AssetId,
        investor: WalletAddress,
        shares_redeemed: u128,
        fee: u128,
        payout: u128,
        total_shares_before: u128,
        total_shares_after: u128,
    },
    /// The whitelist oracle could not answer during an emergency exit; the
    /// exit went ahead without the check.
    WhitelistCheckSkipped {
        asset: AssetId,
        investor: WalletAddress,
        reason: String,
    },
    ProposalCreated {
        proposal: ProposalId,
        proposer: WalletAddress,
        kind: ProposalKind,
        voting_ends: Timestamp,
        timelock_ends: Timestamp,
    },
    VoteCast {
        proposal: ProposalId,
        voter: WalletAddress,
        support: bool,
        weight: u128,
        /// `(support, weight)` of the vote this one replaced.
        replaced: Option<(bool, u128)>,
        yes_weight: u128,
        no_weight: u128,
    },
    ProposalExecuted {
        proposal: ProposalId,
        executor: WalletAddress,
        yes_weight: u128,
        no_weight: u128,
    },
    ProposalCanceled {
        proposal: ProposalId,
        actor: WalletAddress,
    },
    GovernanceParamChanged {
        param: String,
        actor: WalletAddress,
        before: u128,
        after: u128,
    },
}

impl ProtocolEvent {
    /// Short machine-readable name, used as the log target field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssetCreated { .. } => "asset_created",
            Self::AssetStateChanged { .. } => "asset_state_changed",
            Self::Invested { .. } => "invested",
            Self::Divested { .. } => "divested",
            Self::RageQuit { .. } => "rage_quit",
            Self::WhitelistCheckSkipped { .. } => "whitelist_check_skipped",
            Self::ProposalCreated { .. } => "proposal_created",
            Self::VoteCast { .. } => "vote_cast",
            Self::ProposalExecuted { .. } => "proposal_executed",
            Self::ProposalCanceled { .. } => "proposal_canceled",
            Self::GovernanceParamChanged { .. } => "governance_param_changed",
        }
    }
}
