//! Governable configuration parameters.
//!
//! Each variant names one field of [`GovernanceParams`]. Admin setters and
//! executed `ParameterChange` proposals both go through [`GovernableParam::apply`],
//! so the same range rules hold on either path.

use agora_types::{GovernanceParams, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernableParam {
    QuorumBps,
    VotingPeriodSecs,
    TimelockSecs,
    MinProposalStake,
    MinVoteBufferSecs,
}

impl GovernableParam {
    /// Human-readable name of this parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuorumBps => "quorum_bps",
            Self::VotingPeriodSecs => "voting_period_secs",
            Self::TimelockSecs => "timelock_secs",
            Self::MinProposalStake => "min_proposal_stake",
            Self::MinVoteBufferSecs => "min_vote_buffer_secs",
        }
    }

    /// Current value of this parameter.
    pub fn current(&self, params: &GovernanceParams) -> u128 {
        match self {
            Self::QuorumBps => u128::from(params.quorum_bps),
            Self::VotingPeriodSecs => u128::from(params.voting_period_secs),
            Self::TimelockSecs => u128::from(params.timelock_secs),
            Self::MinProposalStake => params.min_proposal_stake,
            Self::MinVoteBufferSecs => u128::from(params.min_vote_buffer_secs),
        }
    }

    /// Range check without applying.
    pub fn validate(&self, value: u128) -> Result<(), String> {
        let mut scratch = GovernanceParams::default();
        self.apply(&mut scratch, value)
    }

    /// Write `value` into `params` if it is in range.
    pub fn apply(&self, params: &mut GovernanceParams, value: u128) -> Result<(), String> {
        match self {
            Self::QuorumBps => {
                let bps = u32::try_from(value)
                    .ok()
                    .filter(|bps| (1..=BPS_DENOMINATOR).contains(bps))
                    .ok_or_else(|| {
                        format!("quorum_bps must be within 1..={BPS_DENOMINATOR}, got {value}")
                    })?;
                params.quorum_bps = bps;
            }
            Self::VotingPeriodSecs => {
                let secs = to_secs(self, value)?;
                if secs == 0 {
                    return Err("voting_period_secs must be greater than zero".to_string());
                }
                params.voting_period_secs = secs;
            }
            Self::TimelockSecs => params.timelock_secs = to_secs(self, value)?,
            Self::MinProposalStake => params.min_proposal_stake = value,
            Self::MinVoteBufferSecs => params.min_vote_buffer_secs = to_secs(self, value)?,
        }
        Ok(())
    }
}

fn to_secs(param: &GovernableParam, value: u128) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("{} does not fit in u64: {value}", param.name()))
}
