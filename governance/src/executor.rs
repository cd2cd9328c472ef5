//! Execution hook for proposals whose effect lives outside the governance
//! engine.

use crate::error::ExecutionError;
use crate::proposal::Proposal;

/// Carries out `Investment`, `Divestment` and `Other` proposals.
///
/// Called after every governance check has passed and before the proposal
/// is marked executed. An `Err` aborts the execution and leaves the
/// proposal executable.
pub trait ProposalExecutor {
    fn execute(&self, proposal: &Proposal) -> Result<(), ExecutionError>;
}

/// Executor that accepts every proposal and does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopExecutor;

impl ProposalExecutor for NoopExecutor {
    fn execute(&self, proposal: &Proposal) -> Result<(), ExecutionError> {
        tracing::debug!(proposal = %proposal.id, kind = %proposal.kind, "no-op execution");
        Ok(())
    }
}
