//! The protocol facade: one lock per engine, shared collaborators.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use agora_assets::{
    Asset, AssetEngine, AssetError, DivestReceipt, InvestReceipt, InvestorPosition,
};
use agora_gateway::{
    authorize, BalanceLedger, CapabilityGrant, Clock, Collaborators, EventSink, GatewayError,
    RoleRegistry, ScheduleFeeGateway, WhitelistRegistry,
};
use agora_governance::{
    ExecutionOutcome, GovernableParam, GovernanceEngine, GovernanceError, Proposal,
    ProposalRequest, VoteReceipt, VoteRecord,
};
use agora_types::{
    AssetId, AssetState, Capability, GovernanceParams, ProposalId, SettlementToken, WalletAddress,
};
use agora_utils::format_duration;

use crate::config::ProtocolConfig;
use crate::executor::TreasuryExecutor;
use crate::NodeError;

/// Entry point for every protocol operation.
///
/// Each engine sits behind its own mutex and a public operation holds that
/// lock for its whole duration. Proposal execution takes the governance
/// lock and then the asset lock; nothing takes them in the other order.
pub struct Protocol {
    assets: Mutex<AssetEngine>,
    governance: Mutex<GovernanceEngine>,
    env: Collaborators,
    roles: Arc<RoleRegistry>,
    tokens: Arc<WhitelistRegistry>,
    treasury: WalletAddress,
}

/// Serialized state of both engines.
#[derive(Serialize, Deserialize)]
struct ProtocolSnapshot {
    assets: Vec<u8>,
    governance: Vec<u8>,
}

impl Protocol {
    /// Wire a protocol from configuration.
    ///
    /// Fees, whitelist and permissions use the in-process adapters seeded
    /// from `config`. The host supplies the balance ledger, the clock and
    /// the event sink.
    pub fn bootstrap(
        config: &ProtocolConfig,
        ledger: Arc<dyn BalanceLedger>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let roles = Arc::new(RoleRegistry::with_admins(config.admin_addresses()));
        let tokens = Arc::new(WhitelistRegistry::with_tokens(
            config
                .whitelisted_tokens
                .iter()
                .map(|t| SettlementToken::new(t.as_str())),
        ));
        let env = Collaborators {
            ledger,
            fees: Arc::new(ScheduleFeeGateway::new(config.fees.clone())),
            whitelist: tokens.clone(),
            permissions: roles.clone(),
            clock,
            events,
        };
        let assets = AssetEngine::new(
            SettlementToken::new(config.settlement_token.as_str()),
            config.pool(),
            config.max_batch,
        );
        let governance = GovernanceEngine::new(config.governance.clone(), config.max_batch)?;

        tracing::info!(
            settlement = %config.settlement_token,
            pool = %config.pool_account,
            treasury = %config.treasury_account,
            admins = config.admins.len(),
            voting_period = %format_duration(config.governance.voting_period_secs),
            timelock = %format_duration(config.governance.timelock_secs),
            "protocol bootstrapped"
        );
        Ok(Self {
            assets: Mutex::new(assets),
            governance: Mutex::new(governance),
            env,
            roles,
            tokens,
            treasury: config.treasury(),
        })
    }

    fn asset_engine(&self) -> Result<MutexGuard<'_, AssetEngine>, NodeError> {
        self.assets
            .lock()
            .map_err(|_| NodeError::LockPoisoned("asset engine"))
    }

    fn governance_engine(&self) -> Result<MutexGuard<'_, GovernanceEngine>, NodeError> {
        self.governance
            .lock()
            .map_err(|_| NodeError::LockPoisoned("governance engine"))
    }

    fn admin_grant(&self, caller: &WalletAddress) -> Result<CapabilityGrant, GatewayError> {
        authorize(self.env.permissions.as_ref(), caller, Capability::Admin)
    }

    // ── Assets ──────────────────────────────────────────────────────────

    pub fn create_asset(
        &self,
        caller: &WalletAddress,
        name: &str,
        description: &str,
    ) -> Result<AssetId, NodeError> {
        Ok(self
            .asset_engine()?
            .create_asset(&self.env, caller, name, description)?)
    }

    pub fn invest(
        &self,
        caller: &WalletAddress,
        asset: AssetId,
        amount: u128,
    ) -> Result<InvestReceipt, NodeError> {
        Ok(self.asset_engine()?.invest(&self.env, caller, asset, amount)?)
    }

    pub fn divest(
        &self,
        caller: &WalletAddress,
        asset: AssetId,
        shares: u128,
    ) -> Result<DivestReceipt, NodeError> {
        Ok(self.asset_engine()?.divest(&self.env, caller, asset, shares)?)
    }

    pub fn rage_quit(
        &self,
        caller: &WalletAddress,
        asset: AssetId,
        shares: u128,
    ) -> Result<DivestReceipt, NodeError> {
        Ok(self
            .asset_engine()?
            .rage_quit(&self.env, caller, asset, shares)?)
    }

    /// Admin only. Returns the previous state.
    pub fn update_asset_state(
        &self,
        caller: &WalletAddress,
        asset: AssetId,
        state: AssetState,
    ) -> Result<AssetState, NodeError> {
        let grant = self.admin_grant(caller).map_err(AssetError::from)?;
        Ok(self
            .asset_engine()?
            .update_asset_state(&self.env, &grant, asset, state)?)
    }

    // ── Governance ──────────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        caller: &WalletAddress,
        request: ProposalRequest,
    ) -> Result<ProposalId, NodeError> {
        Ok(self
            .governance_engine()?
            .create_proposal(&self.env, caller, request)?)
    }

    pub fn vote(
        &self,
        caller: &WalletAddress,
        proposal: ProposalId,
        support: bool,
    ) -> Result<VoteReceipt, NodeError> {
        Ok(self
            .governance_engine()?
            .vote(&self.env, caller, proposal, support)?)
    }

    /// Execute an approved proposal. Investment and divestment proposals
    /// move treasury funds through the asset engine.
    pub fn execute_proposal(
        &self,
        caller: &WalletAddress,
        proposal: ProposalId,
    ) -> Result<ExecutionOutcome, NodeError> {
        let mut governance = self.governance_engine()?;
        let executor = TreasuryExecutor::new(&self.assets, &self.env, &self.treasury);
        Ok(governance.execute_proposal(&self.env, &executor, caller, proposal)?)
    }

    /// Cancel a proposal. Allowed for its proposer, or for an admin.
    pub fn cancel_proposal(
        &self,
        caller: &WalletAddress,
        proposal: ProposalId,
    ) -> Result<(), NodeError> {
        let grant = self.admin_grant(caller).ok();
        Ok(self
            .governance_engine()?
            .cancel_proposal(&self.env, caller, grant.as_ref(), proposal)?)
    }

    /// Admin only. Returns the previous value.
    pub fn set_governance_param(
        &self,
        caller: &WalletAddress,
        param: GovernableParam,
        value: u128,
    ) -> Result<u128, NodeError> {
        let grant = self.admin_grant(caller).map_err(GovernanceError::from)?;
        Ok(self
            .governance_engine()?
            .set_param(&self.env, &grant, param, value)?)
    }

    // ── Registries ──────────────────────────────────────────────────────

    pub fn grant_admin(&self, caller: &WalletAddress, who: &WalletAddress) -> Result<(), NodeError> {
        let grant = self.admin_grant(caller)?;
        Ok(self.roles.grant_role(&grant, who, Capability::Admin)?)
    }

    pub fn revoke_admin(&self, caller: &WalletAddress, who: &WalletAddress) -> Result<(), NodeError> {
        let grant = self.admin_grant(caller)?;
        Ok(self.roles.revoke_role(&grant, who, Capability::Admin)?)
    }

    /// Returns whether the token was newly added.
    pub fn whitelist_token(&self, caller: &WalletAddress, token: &str) -> Result<bool, NodeError> {
        let grant = self.admin_grant(caller)?;
        Ok(self.tokens.add(&grant, SettlementToken::new(token))?)
    }

    /// Returns whether the token was listed.
    pub fn delist_token(&self, caller: &WalletAddress, token: &str) -> Result<bool, NodeError> {
        let grant = self.admin_grant(caller)?;
        Ok(self.tokens.remove(&grant, &SettlementToken::new(token))?)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn asset(&self, asset: AssetId) -> Result<Asset, NodeError> {
        self.asset_engine()?
            .asset(asset)
            .cloned()
            .ok_or_else(|| AssetError::AssetNotFound(asset).into())
    }

    /// A page of assets in id order.
    pub fn assets(&self, offset: usize, limit: usize) -> Result<Vec<Asset>, NodeError> {
        Ok(self
            .asset_engine()?
            .asset_page(offset, limit)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn asset_count(&self) -> Result<usize, NodeError> {
        Ok(self.asset_engine()?.asset_count())
    }

    pub fn shares_of(&self, asset: AssetId, investor: &WalletAddress) -> Result<u128, NodeError> {
        Ok(self.asset_engine()?.shares_of(asset, investor)?)
    }

    pub fn investors(
        &self,
        asset: AssetId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<InvestorPosition>, NodeError> {
        Ok(self.asset_engine()?.investors(asset, offset, limit)?.to_vec())
    }

    pub fn proposal(&self, proposal: ProposalId) -> Result<Proposal, NodeError> {
        self.governance_engine()?
            .proposal(proposal)
            .cloned()
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal).into())
    }

    pub fn proposals(&self, offset: usize, limit: usize) -> Result<Vec<Proposal>, NodeError> {
        Ok(self
            .governance_engine()?
            .proposals(offset, limit)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn has_voted(&self, proposal: ProposalId, voter: &WalletAddress) -> Result<bool, NodeError> {
        Ok(self.governance_engine()?.has_voted(proposal, voter)?)
    }

    pub fn vote_of(
        &self,
        proposal: ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteRecord>, NodeError> {
        Ok(self.governance_engine()?.vote_of(proposal, voter)?.cloned())
    }

    pub fn governance_params(&self) -> Result<GovernanceParams, NodeError> {
        Ok(self.governance_engine()?.params().clone())
    }

    pub fn admins(&self) -> Vec<WalletAddress> {
        self.roles.holders(Capability::Admin)
    }

    pub fn whitelisted_tokens(&self) -> Vec<SettlementToken> {
        self.tokens.tokens()
    }

    pub fn settlement(&self) -> Result<SettlementToken, NodeError> {
        Ok(self.asset_engine()?.settlement().clone())
    }

    pub fn pool(&self) -> Result<WalletAddress, NodeError> {
        Ok(self.asset_engine()?.pool().clone())
    }

    pub fn treasury(&self) -> &WalletAddress {
        &self.treasury
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.env
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Serialize both engines.
    pub fn save_state(&self) -> Result<Vec<u8>, NodeError> {
        let governance = self.governance_engine()?;
        let assets = self.asset_engine()?;
        let snapshot = ProtocolSnapshot {
            assets: assets.save_state()?,
            governance: governance.save_state()?,
        };
        bincode::serialize(&snapshot).map_err(|e| NodeError::Snapshot(e.to_string()))
    }

    /// Replace both engines with the state in `data`.
    ///
    /// Both halves are decoded and validated before either engine is
    /// touched.
    pub fn restore_state(&self, data: &[u8]) -> Result<(), NodeError> {
        let snapshot: ProtocolSnapshot =
            bincode::deserialize(data).map_err(|e| NodeError::Snapshot(e.to_string()))?;
        let restored_assets = AssetEngine::load_state(&snapshot.assets)?;
        let restored_governance = GovernanceEngine::load_state(&snapshot.governance)?;

        let mut governance = self.governance_engine()?;
        let mut assets = self.asset_engine()?;
        *governance = restored_governance;
        *assets = restored_assets;
        tracing::info!(
            assets = assets.asset_count(),
            proposals = governance.proposal_count(),
            "protocol state restored"
        );
        Ok(())
    }
}
