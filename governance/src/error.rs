use agora_gateway::GatewayError;
use agora_types::{ProposalId, Timestamp};
use thiserror::Error;

use crate::proposal::ProposalStatus;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error("{0} not found")]
    ProposalNotFound(ProposalId),

    #[error("zero address is not a valid identity")]
    ZeroAddress,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{proposal} is {status:?}, operation not allowed")]
    InvalidProposalState {
        proposal: ProposalId,
        status: ProposalStatus,
    },

    #[error("voting ended at {ends} (now {now})")]
    VotingPeriodEnded { ends: Timestamp, now: Timestamp },

    #[error("voting runs until {ends} (now {now})")]
    VotingPeriodNotEnded { ends: Timestamp, now: Timestamp },

    #[error("timelock runs until {ends} (now {now})")]
    TimelockPeriodNotElapsed { ends: Timestamp, now: Timestamp },

    #[error("vote buffer not elapsed: next vote allowed at {next_allowed}")]
    VotingBufferNotElapsed { next_allowed: Timestamp },

    #[error("quorum not reached: {yes} yes < {required} required")]
    QuorumNotReached { yes: u128, required: u128 },

    #[error("majority not reached: {yes} yes vs {no} no")]
    MajorityNotReached { yes: u128, no: u128 },

    #[error("{0} has already been executed")]
    ProposalAlreadyExecuted(ProposalId),

    #[error("caller is neither the proposer nor an admin")]
    Unauthorized,

    #[error("capability grant was issued to a different identity")]
    CallerNotOwner,

    #[error("caller is not an admin")]
    CallerNotAdmin,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("batch of {requested} exceeds the limit of {limit}")]
    ExceedsBatchLimit { requested: usize, limit: usize },

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("arithmetic overflow in vote tally")]
    Overflow,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<GatewayError> for GovernanceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::CapabilityDenied { .. } => Self::CallerNotAdmin,
            GatewayError::NotGrantHolder { .. } => Self::CallerNotOwner,
            GatewayError::ZeroAddress => Self::ZeroAddress,
            GatewayError::Dependency(e) => Self::OperationFailed(e.to_string()),
        }
    }
}

/// Failure reported by a [`ProposalExecutor`](crate::ProposalExecutor).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ExecutionError(pub String);

impl ExecutionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
