//! Treasury execution of approved investment and divestment proposals.

use std::sync::Mutex;

use agora_assets::AssetEngine;
use agora_gateway::Collaborators;
use agora_governance::{ExecutionError, Proposal, ProposalExecutor};
use agora_types::{ProposalKind, WalletAddress};

/// Carries out proposals against the asset engine from the treasury account.
///
/// `Investment` invests `amount` settlement units from the treasury into the
/// target asset; `Divestment` redeems `amount` treasury shares. The caller
/// already holds the governance lock, so this takes the asset lock second.
pub struct TreasuryExecutor<'a> {
    assets: &'a Mutex<AssetEngine>,
    env: &'a Collaborators,
    treasury: &'a WalletAddress,
}

impl<'a> TreasuryExecutor<'a> {
    pub fn new(
        assets: &'a Mutex<AssetEngine>,
        env: &'a Collaborators,
        treasury: &'a WalletAddress,
    ) -> Self {
        Self {
            assets,
            env,
            treasury,
        }
    }
}

impl ProposalExecutor for TreasuryExecutor<'_> {
    fn execute(&self, proposal: &Proposal) -> Result<(), ExecutionError> {
        let target = || {
            proposal
                .asset
                .zip(proposal.amount)
                .ok_or_else(|| ExecutionError::new(format!("{} has no target", proposal.id)))
        };
        match proposal.kind {
            ProposalKind::Investment => {
                let (asset, amount) = target()?;
                let mut assets = self
                    .assets
                    .lock()
                    .map_err(|_| ExecutionError::new("asset engine lock poisoned"))?;
                let receipt = assets
                    .invest(self.env, self.treasury, asset, amount)
                    .map_err(|e| ExecutionError::new(format!("treasury investment: {e}")))?;
                tracing::info!(proposal = %proposal.id, %asset, amount, shares = receipt.shares_issued, "treasury invested");
            }
            ProposalKind::Divestment => {
                let (asset, shares) = target()?;
                let mut assets = self
                    .assets
                    .lock()
                    .map_err(|_| ExecutionError::new("asset engine lock poisoned"))?;
                let receipt = assets
                    .divest(self.env, self.treasury, asset, shares)
                    .map_err(|e| ExecutionError::new(format!("treasury divestment: {e}")))?;
                tracing::info!(proposal = %proposal.id, %asset, shares, payout = receipt.payout, "treasury divested");
            }
            ProposalKind::ParameterChange | ProposalKind::Other => {
                tracing::debug!(proposal = %proposal.id, kind = %proposal.kind, "nothing for the treasury to do");
            }
        }
        Ok(())
    }
}
