//! Proposal governance for the Agora protocol.
//!
//! Lifecycle: a proposal is created `Active`, collects weighted yes/no votes
//! until `voting_ends`, waits out the timelock until `timelock_ends`, and is
//! then executed if yes-weight clears the quorum of cast weight and beats
//! no-weight. Either the proposer or an admin may cancel it first.
//! `Executed` and `Canceled` are terminal.
//!
//! Voters may change their vote, but not more often than the minimum vote
//! buffer allows, which throttles last-second vote flipping.

pub mod engine;
pub mod error;
pub mod executor;
pub mod params;
pub mod proposal;

pub use engine::{ExecutionOutcome, GovernanceEngine, VoteReceipt};
pub use error::{ExecutionError, GovernanceError};
pub use executor::{NoopExecutor, ProposalExecutor};
pub use params::GovernableParam;
pub use proposal::{Proposal, ProposalRequest, ProposalStatus, ProposalTerms, VoteRecord};
