//! Core asset accounting engine.

use crate::asset::{Asset, InvestorPosition};
use crate::error::AssetError;
use agora_gateway::{
    CapabilityGrant, Collaborators, FeeKind, LedgerError, WhitelistStatus,
};
use agora_types::{
    AssetId, AssetState, Capability, ProtocolEvent, SettlementToken, WalletAddress,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;


/// Outcome of a committed investment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvestReceipt {
    pub asset: AssetId,
    pub gross: u128,
    pub fee: u128,
    pub shares_issued: u128,
    /// The investor's holding after the investment.
    pub investor_shares: u128,
    /// Whether this call added the investor to the book.
    pub first_stake: bool,
}

/// Outcome of a committed divestment or rage-quit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivestReceipt {
    pub asset: AssetId,
    pub shares_redeemed: u128,
    pub fee: u128,
    pub payout: u128,
    pub investor_shares: u128,
    /// Rage-quit only: the whitelist oracle was unreachable and was skipped.
    pub whitelist_skipped: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Regular,
    Emergency,
}

impl Exit {
    fn fee_kind(self) -> FeeKind {
        match self {
            Self::Regular => FeeKind::Divest,
            Self::Emergency => FeeKind::RageQuit,
        }
    }
}

/// The asset engine: owns every asset and every investor position.
///
/// Each mutating method validates and prices the whole operation first, then
/// performs its single ledger transfer, then commits. The commit step cannot
/// fail, so an `Err` from any method means no asset state changed.
pub struct AssetEngine {
    assets: BTreeMap<AssetId, Asset>,
    next_asset_id: AssetId,
    /// Token every pool settles in.
    settlement: SettlementToken,
    /// Ledger account holding pooled funds.
    pool: WalletAddress,
    /// Largest page a paged accessor will return.
    max_batch: usize,
}

impl AssetEngine {
    pub fn new(settlement: SettlementToken, pool: WalletAddress, max_batch: usize) -> Self {
        Self {
            assets: BTreeMap::new(),
            next_asset_id: AssetId::FIRST,
            settlement,
            pool,
            max_batch,
        }
    }

    /// Register a new pool. The creator is listed as an investor with zero shares.
    pub fn create_asset(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<AssetId, AssetError> {
        ensure_identity(caller)?;
        let name = name.into();
        let description = description.into();

        let id = self.next_asset_id;
        let next = id.next().ok_or(AssetError::Overflow)?;
        let now = env.now();
        self.assets.insert(
            id,
            Asset::new(id, name.clone(), description, caller.clone(), now),
        );
        self.next_asset_id = next;

        tracing::info!(asset = %id, creator = %caller, %name, "asset created");
        env.events.record(ProtocolEvent::AssetCreated {
            asset: id,
            creator: caller.clone(),
            name,
            at: now,
        });
        Ok(id)
    }

    /// Buy shares of an active asset with `amount` settlement units (gross).
    pub fn invest(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        asset_id: AssetId,
        amount: u128,
    ) -> Result<InvestReceipt, AssetError> {
        ensure_identity(caller)?;
        let asset = self
            .assets
            .get_mut(&asset_id)
            .ok_or(AssetError::AssetNotFound(asset_id))?;
        if !asset.state.accepts_investment() {
            return Err(AssetError::InvalidAssetState {
                asset: asset_id,
                state: asset.state,
            });
        }
        if amount == 0 {
            return Err(AssetError::InvalidAmount);
        }

        let fee = quote_fee(env, FeeKind::Invest, &self.settlement, amount)?;
        let net = amount - fee;
        let shares = shares_for_value(net);
        if shares == 0 {
            return Err(AssetError::InvalidAmount);
        }
        let first_stake = !asset.investors.contains(caller);
        let total_investment = asset
            .total_investment
            .checked_add(net)
            .ok_or(AssetError::Overflow)?;
        let total_shares = asset
            .total_shares
            .checked_add(shares)
            .ok_or(AssetError::Overflow)?;
        let holding = asset
            .shares_of(caller)
            .checked_add(shares)
            .ok_or(AssetError::Overflow)?;

        env.ledger
            .transfer_from(caller, &self.pool, amount)
            .map_err(ledger_failure)?;

        let total_shares_before = asset.total_shares;
        asset.total_investment = total_investment;
        asset.total_shares = total_shares;
        asset.investors.set_shares(caller, holding);

        tracing::info!(
            asset = %asset_id,
            investor = %caller,
            gross = amount,
            fee,
            shares,
            "investment committed"
        );
        env.events.record(ProtocolEvent::Invested {
            asset: asset_id,
            investor: caller.clone(),
            gross: amount,
            fee,
            shares_issued: shares,
            total_shares_before,
            total_shares_after: total_shares,
        });
        Ok(InvestReceipt {
            asset: asset_id,
            gross: amount,
            fee,
            shares_issued: shares,
            investor_shares: holding,
            first_stake,
        })
    }

    /// Redeem `shares` from an active or liquidating asset.
    pub fn divest(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        asset_id: AssetId,
        shares: u128,
    ) -> Result<DivestReceipt, AssetError> {
        self.redeem(env, caller, asset_id, shares, Exit::Regular)
    }

    /// Emergency redemption: any asset state, rage-quit fee rate, and a
    /// whitelist check that is skipped (not failed) when the oracle is down.
    pub fn rage_quit(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        asset_id: AssetId,
        shares: u128,
    ) -> Result<DivestReceipt, AssetError> {
        self.redeem(env, caller, asset_id, shares, Exit::Emergency)
    }

    fn redeem(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        asset_id: AssetId,
        shares: u128,
        exit: Exit,
    ) -> Result<DivestReceipt, AssetError> {
        ensure_identity(caller)?;
        let asset = self
            .assets
            .get_mut(&asset_id)
            .ok_or(AssetError::AssetNotFound(asset_id))?;
        if exit == Exit::Regular && !asset.state.allows_divestment() {
            return Err(AssetError::InvalidAssetState {
                asset: asset_id,
                state: asset.state,
            });
        }
        if shares == 0 {
            return Err(AssetError::InvalidAmount);
        }
        let held = asset.shares_of(caller);
        if held < shares {
            return Err(AssetError::InsufficientFunds {
                needed: shares,
                available: held,
            });
        }

        let skipped_reason = match exit {
            Exit::Regular => None,
            Exit::Emergency => match env.whitelist.is_whitelisted(&self.settlement) {
                WhitelistStatus::Whitelisted => None,
                WhitelistStatus::NotWhitelisted => {
                    return Err(AssetError::TokenNotWhitelisted(
                        self.settlement.to_string(),
                    ));
                }
                WhitelistStatus::Unavailable(err) => Some(err.to_string()),
            },
        };

        let gross = value_for_shares(shares);
        let fee = quote_fee(env, exit.fee_kind(), &self.settlement, gross)?;
        let payout = gross - fee;
        let total_investment = asset
            .total_investment
            .checked_sub(gross)
            .ok_or(AssetError::Overflow)?;
        let total_shares = asset
            .total_shares
            .checked_sub(shares)
            .ok_or(AssetError::Overflow)?;
        let holding = held - shares;

        if payout > 0 {
            env.ledger
                .transfer(&self.pool, caller, payout)
                .map_err(ledger_failure)?;
        }

        let total_shares_before = asset.total_shares;
        asset.total_investment = total_investment;
        asset.total_shares = total_shares;
        asset.investors.set_shares(caller, holding);

        if let Some(reason) = &skipped_reason {
            tracing::warn!(
                asset = %asset_id,
                investor = %caller,
                token = %self.settlement,
                %reason,
                "whitelist oracle unavailable, rage-quit proceeded without the check"
            );
            env.events.record(ProtocolEvent::WhitelistCheckSkipped {
                asset: asset_id,
                investor: caller.clone(),
                reason: reason.clone(),
            });
        }
        match exit {
            Exit::Regular => {
                tracing::info!(asset = %asset_id, investor = %caller, shares, fee, payout, "divestment committed");
                env.events.record(ProtocolEvent::Divested {
                    asset: asset_id,
                    investor: caller.clone(),
                    shares_redeemed: shares,
                    fee,
                    payout,
                    total_shares_before,
                    total_shares_after: total_shares,
                });
            }
            Exit::Emergency => {
                tracing::info!(asset = %asset_id, investor = %caller, shares, fee, payout, "rage-quit committed");
                env.events.record(ProtocolEvent::RageQuit {
                    asset: asset_id,
                    investor: caller.clone(),
                    shares_redeemed: shares,
                    fee,
                    payout,
                    total_shares_before,
                    total_shares_after: total_shares,
                });
            }
        }
        Ok(DivestReceipt {
            asset: asset_id,
            shares_redeemed: shares,
            fee,
            payout,
            investor_shares: holding,
            whitelist_skipped: skipped_reason.is_some(),
        })
    }

    /// Move an asset to another lifecycle state. `Closed` is final.
    ///
    /// Returns the previous state.
    pub fn update_asset_state(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        asset_id: AssetId,
        new_state: AssetState,
    ) -> Result<AssetState, AssetError> {
        if !grant.confers(Capability::Admin) {
            return Err(AssetError::CallerNotAdmin);
        }
        let asset = self
            .assets
            .get_mut(&asset_id)
            .ok_or(AssetError::AssetNotFound(asset_id))?;
        let previous = asset.state;
        if previous.is_terminal() || previous == new_state {
            return Err(AssetError::InvalidAssetState {
                asset: asset_id,
                state: previous,
            });
        }
        asset.state = new_state;

        tracing::info!(asset = %asset_id, admin = %grant.holder(), from = %previous, to = %new_state, "asset state changed");
        env.events.record(ProtocolEvent::AssetStateChanged {
            asset: asset_id,
            actor: grant.holder().clone(),
            from: previous,
            to: new_state,
        });
        Ok(previous)
    }

    pub fn asset(&self, asset_id: AssetId) -> Option<&Asset> {
        self.assets.get(&asset_id)
    }

    /// All assets in id order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// A page of assets in id order.
    pub fn asset_page(&self, offset: usize, limit: usize) -> Result<Vec<&Asset>, AssetError> {
        self.check_batch(limit)?;
        Ok(self.assets.values().skip(offset).take(limit).collect())
    }

    pub fn shares_of(&self, asset_id: AssetId, investor: &WalletAddress) -> Result<u128, AssetError> {
        self.assets
            .get(&asset_id)
            .map(|a| a.shares_of(investor))
            .ok_or(AssetError::AssetNotFound(asset_id))
    }

    /// A page of an asset's investor book, in first-seen order.
    pub fn investors(
        &self,
        asset_id: AssetId,
        offset: usize,
        limit: usize,
    ) -> Result<&[InvestorPosition], AssetError> {
        self.check_batch(limit)?;
        self.assets
            .get(&asset_id)
            .map(|a| a.investors.page(offset, limit))
            .ok_or(AssetError::AssetNotFound(asset_id))
    }

    pub fn settlement(&self) -> &SettlementToken {
        &self.settlement
    }

    pub fn pool(&self) -> &WalletAddress {
        &self.pool
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn check_batch(&self, limit: usize) -> Result<(), AssetError> {
        if limit > self.max_batch {
            return Err(AssetError::ExceedsBatchLimit {
                requested: limit,
                limit: self.max_batch,
            });
        }
        Ok(())
    }
}

/// Serializable snapshot of the engine's state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub assets: Vec<Asset>,
    pub next_asset_id: AssetId,
    pub settlement: SettlementToken,
    pub pool: WalletAddress,
    pub max_batch: usize,
}

impl AssetEngine {
    /// Serialize every asset and the id counter.
    pub fn save_state(&self) -> Result<Vec<u8>, AssetError> {
        let snapshot = AssetSnapshot {
            assets: self.assets.values().cloned().collect(),
            next_asset_id: self.next_asset_id,
            settlement: self.settlement.clone(),
            pool: self.pool.clone(),
            max_batch: self.max_batch,
        };
        bincode::serialize(&snapshot).map_err(|e| AssetError::Snapshot(e.to_string()))
    }

    /// Restore an engine from [`save_state`](Self::save_state) output.
    ///
    /// Rejects snapshots whose investor books are malformed (dangling or
    /// duplicate listings) or do not add up to their totals.
    pub fn load_state(data: &[u8]) -> Result<Self, AssetError> {
        let snapshot: AssetSnapshot =
            bincode::deserialize(data).map_err(|e| AssetError::Snapshot(e.to_string()))?;
        let mut assets = BTreeMap::new();
        for asset in snapshot.assets {
            if !asset.investors.is_well_formed() {
                return Err(AssetError::Snapshot(format!(
                    "{} investor book is malformed",
                    asset.id
                )));
            }
            if !asset.is_consistent() {
                return Err(AssetError::Snapshot(format!(
                    "{} shares do not sum to its total",
                    asset.id
                )));
            }
            if asset.id >= snapshot.next_asset_id {
                return Err(AssetError::Snapshot(format!(
                    "{} is not below the id counter",
                    asset.id
                )));
            }
            assets.insert(asset.id, asset);
        }
        Ok(Self {
            assets,
            next_asset_id: snapshot.next_asset_id,
            settlement: snapshot.settlement,
            pool: snapshot.pool,
            max_batch: snapshot.max_batch,
        })
    }
}

/// Shares issued for `value` settlement units. One share per unit.
fn shares_for_value(value: u128) -> u128 {
    value
}

/// Settlement units a redemption of `shares` is worth. One unit per share.
fn value_for_shares(shares: u128) -> u128 {
    shares
}

fn ensure_identity(caller: &WalletAddress) -> Result<(), AssetError> {
    if caller.is_zero() {
        return Err(AssetError::ZeroAddress);
    }
    Ok(())
}

/// Ask the fee gateway for a fee on `gross`. A failed quote, or a fee larger
/// than the amount it is charged on, aborts the operation.
fn quote_fee(
    env: &Collaborators,
    kind: FeeKind,
    settlement: &SettlementToken,
    gross: u128,
) -> Result<u128, AssetError> {
    let fee = env.fees.quote(kind, settlement, gross).map_err(|e| {
        tracing::debug!(%kind, gross, error = %e, "fee quote failed");
        AssetError::OperationFailed(format!("{kind} fee: {e}"))
    })?;
    if fee > gross {
        return Err(AssetError::OperationFailed(format!(
            "{kind} fee {fee} exceeds gross amount {gross}"
        )));
    }
    Ok(fee)
}

fn ledger_failure(err: LedgerError) -> AssetError {
    match err {
        LedgerError::InsufficientBalance { needed, available } => {
            AssetError::InsufficientFunds { needed, available }
        }
        LedgerError::Overflow { .. } => AssetError::Overflow,
        LedgerError::Unavailable(e) => AssetError::OperationFailed(format!("ledger: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::InvestorBook;
    use agora_gateway::{authorize, BalanceLedger, RoleRegistry};
    use agora_nullables::{NullClock, NullFeeGateway, NullLedger, NullWhitelist};
    use agora_utils::EventLog;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Harness {
        env: Collaborators,
        ledger: Arc<NullLedger>,
        fees: Arc<NullFeeGateway>,
        whitelist: Arc<NullWhitelist>,
        roles: Arc<RoleRegistry>,
        events: Arc<EventLog>,
        engine: AssetEngine,
    }

    impl Harness {
        fn admin(&self) -> CapabilityGrant {
            authorize(self.roles.as_ref(), &addr("root"), Capability::Admin).unwrap()
        }

        fn balance(&self, who: &WalletAddress) -> u128 {
            self.ledger.balance_of(who).unwrap()
        }
    }

    fn addr(name: &str) -> WalletAddress {
        WalletAddress::new(format!("agr_{name}"))
    }

    fn harness(invest_bps: u32, divest_bps: u32, rage_quit_bps: u32) -> Harness {
        let clock = Arc::new(NullClock::new(1_000));
        let ledger = Arc::new(NullLedger::new(clock.clone()));
        let fees = Arc::new(NullFeeGateway::with_rates(invest_bps, divest_bps, rage_quit_bps));
        let whitelist = Arc::new(NullWhitelist::allowing());
        let roles = Arc::new(RoleRegistry::with_admins([addr("root")]));
        let events = Arc::new(EventLog::new());
        ledger.mint(&addr("alice"), 10_000);
        ledger.mint(&addr("bob"), 10_000);
        let env = Collaborators {
            ledger: ledger.clone(),
            fees: fees.clone(),
            whitelist: whitelist.clone(),
            permissions: roles.clone(),
            clock,
            events: events.clone(),
        };
        Harness {
            env,
            ledger,
            fees,
            whitelist,
            roles,
            events,
            engine: AssetEngine::new(SettlementToken::new("USDC"), addr("pool"), 50),
        }
    }

    fn with_asset(h: &mut Harness) -> AssetId {
        h.engine
            .create_asset(&h.env, &addr("creator"), "Growth Fund", "long-only basket")
            .unwrap()
    }

    fn snapshot_counters(h: &Harness, id: AssetId) -> (u128, u128, Vec<InvestorPosition>) {
        let asset = h.engine.asset(id).unwrap();
        (
            asset.total_investment,
            asset.total_shares,
            asset.investors.iter().cloned().collect(),
        )
    }

    // ── create_asset ─────────────────────────────────────────────────────

    #[test]
    fn test_asset_ids_are_sequential() {
        let mut h = harness(0, 0, 0);
        let a = with_asset(&mut h);
        let b = with_asset(&mut h);
        assert_eq!(a, AssetId::new(1));
        assert_eq!(b, AssetId::new(2));
        assert_eq!(h.engine.asset_count(), 2);
    }

    #[test]
    fn test_new_asset_is_active_with_creator_listed() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        let asset = h.engine.asset(id).unwrap();
        assert_eq!(asset.state, AssetState::Active);
        assert_eq!(asset.created_at.as_secs(), 1_000);
        assert_eq!(asset.total_shares, 0);
        assert_eq!(asset.total_investment, 0);
        assert_eq!(asset.investors.len(), 1);
        assert_eq!(asset.shares_of(&addr("creator")), 0);
        assert!(matches!(
            h.events.records().last(),
            Some(ProtocolEvent::AssetCreated { .. })
        ));
    }

    #[test]
    fn test_create_asset_only_checks_caller_identity() {
        let mut h = harness(0, 0, 0);
        assert_eq!(
            h.engine.create_asset(&h.env, &WalletAddress::new(""), "x", ""),
            Err(AssetError::ZeroAddress)
        );
        assert_eq!(h.engine.asset_count(), 0);

        let blank = h
            .engine
            .create_asset(&h.env, &addr("creator"), "   ", "")
            .unwrap();
        let long = h
            .engine
            .create_asset(&h.env, &addr("creator"), "n".repeat(10_000), "d".repeat(100_000))
            .unwrap();
        assert_eq!(h.engine.asset(blank).unwrap().name, "   ");
        assert_eq!(h.engine.asset(long).unwrap().description.len(), 100_000);
        assert_eq!(h.engine.asset_count(), 2);
    }

    // ── invest ───────────────────────────────────────────────────────────

    #[test]
    fn test_invest_with_ten_percent_fee() {
        let mut h = harness(1000, 0, 0);
        let id = with_asset(&mut h);

        let receipt = h.engine.invest(&h.env, &addr("alice"), id, 1_000).unwrap();
        assert_eq!(receipt.fee, 100);
        assert_eq!(receipt.shares_issued, 900);
        assert_eq!(receipt.investor_shares, 900);
        assert!(receipt.first_stake);

        let asset = h.engine.asset(id).unwrap();
        assert_eq!(asset.total_shares, 900);
        assert_eq!(asset.total_investment, 900);
        assert!(asset.is_consistent());
        // gross moves into the pool
        assert_eq!(h.balance(&addr("pool")), 1_000);
        assert_eq!(h.balance(&addr("alice")), 9_000);
    }

    #[test]
    fn test_repeat_investor_is_listed_once() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        let second = h.engine.invest(&h.env, &addr("alice"), id, 50).unwrap();
        assert!(!second.first_stake);
        assert_eq!(second.investor_shares, 150);

        let asset = h.engine.asset(id).unwrap();
        let investors: Vec<_> = asset.investors.iter().map(|p| p.investor.clone()).collect();
        assert_eq!(investors, vec![addr("creator"), addr("alice")]);
    }

    #[test]
    fn test_creator_first_investment_is_not_a_new_listing() {
        let mut h = harness(0, 0, 0);
        h.ledger.mint(&addr("creator"), 500);
        let id = with_asset(&mut h);
        let receipt = h.engine.invest(&h.env, &addr("creator"), id, 500).unwrap();
        assert!(!receipt.first_stake);
        assert_eq!(h.engine.asset(id).unwrap().investors.len(), 1);
    }

    #[test]
    fn test_invest_rejections() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        assert_eq!(
            h.engine.invest(&h.env, &addr("alice"), AssetId::new(99), 10),
            Err(AssetError::AssetNotFound(AssetId::new(99)))
        );
        assert_eq!(
            h.engine.invest(&h.env, &addr("alice"), id, 0),
            Err(AssetError::InvalidAmount)
        );

        let admin = h.admin();
        h.engine
            .update_asset_state(&h.env, &admin, id, AssetState::Inactive)
            .unwrap();
        assert_eq!(
            h.engine.invest(&h.env, &addr("alice"), id, 10),
            Err(AssetError::InvalidAssetState {
                asset: id,
                state: AssetState::Inactive
            })
        );
    }

    #[test]
    fn test_fee_gateway_failure_leaves_no_trace() {
        let mut h = harness(1000, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 1_000).unwrap();
        let before = snapshot_counters(&h, id);
        let events_before = h.events.len();
        let transfers_before = h.ledger.transfers().len();

        h.fees.set_failing(true);
        let err = h.engine.invest(&h.env, &addr("bob"), id, 500).unwrap_err();
        assert!(matches!(err, AssetError::OperationFailed(_)));

        assert_eq!(snapshot_counters(&h, id), before);
        assert_eq!(h.events.len(), events_before);
        assert_eq!(h.ledger.transfers().len(), transfers_before);
        assert_eq!(h.balance(&addr("bob")), 10_000);
    }

    #[test]
    fn test_fee_above_gross_is_rejected() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.fees.set_rate(FeeKind::Invest, 20_000);
        assert!(matches!(
            h.engine.invest(&h.env, &addr("alice"), id, 100),
            Err(AssetError::OperationFailed(_))
        ));
        assert_eq!(h.engine.asset(id).unwrap().total_shares, 0);
    }

    #[test]
    fn test_invest_with_insufficient_balance_changes_nothing() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        let before = snapshot_counters(&h, id);
        let err = h.engine.invest(&h.env, &addr("alice"), id, 10_001).unwrap_err();
        assert_eq!(
            err,
            AssetError::InsufficientFunds {
                needed: 10_001,
                available: 10_000
            }
        );
        assert_eq!(snapshot_counters(&h, id), before);
        assert!(!h.engine.asset(id).unwrap().investors.contains(&addr("alice")));
    }

    // ── divest ───────────────────────────────────────────────────────────

    #[test]
    fn test_divest_with_five_percent_fee() {
        let mut h = harness(0, 500, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 1_000).unwrap();

        let receipt = h.engine.divest(&h.env, &addr("alice"), id, 400).unwrap();
        assert_eq!(receipt.fee, 20);
        assert_eq!(receipt.payout, 380);
        assert_eq!(receipt.investor_shares, 600);
        assert!(!receipt.whitelist_skipped);

        let asset = h.engine.asset(id).unwrap();
        assert_eq!(asset.total_shares, 600);
        assert_eq!(asset.total_investment, 600);
        assert!(asset.is_consistent());
        assert_eq!(h.balance(&addr("alice")), 9_000 + 380);
        assert_eq!(h.balance(&addr("pool")), 1_000 - 380);
    }

    #[test]
    fn test_divest_more_than_held_fails() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        assert_eq!(
            h.engine.divest(&h.env, &addr("alice"), id, 101),
            Err(AssetError::InsufficientFunds {
                needed: 101,
                available: 100
            })
        );
        assert_eq!(
            h.engine.divest(&h.env, &addr("alice"), id, 0),
            Err(AssetError::InvalidAmount)
        );
    }

    #[test]
    fn test_divest_allowed_while_liquidating_not_closed() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        let admin = h.admin();

        h.engine
            .update_asset_state(&h.env, &admin, id, AssetState::Liquidating)
            .unwrap();
        h.engine.divest(&h.env, &addr("alice"), id, 10).unwrap();

        h.engine
            .update_asset_state(&h.env, &admin, id, AssetState::Closed)
            .unwrap();
        assert_eq!(
            h.engine.divest(&h.env, &addr("alice"), id, 10),
            Err(AssetError::InvalidAssetState {
                asset: id,
                state: AssetState::Closed
            })
        );
    }

    #[test]
    fn test_divest_payout_failure_rolls_back() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        let before = snapshot_counters(&h, id);

        h.ledger.set_failing(true);
        assert!(matches!(
            h.engine.divest(&h.env, &addr("alice"), id, 50),
            Err(AssetError::OperationFailed(_))
        ));
        h.ledger.set_failing(false);
        assert_eq!(snapshot_counters(&h, id), before);
    }

    // ── rage_quit ────────────────────────────────────────────────────────

    #[test]
    fn test_rage_quit_works_on_closed_asset() {
        let mut h = harness(0, 500, 2000);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 1_000).unwrap();
        let admin = h.admin();
        h.engine
            .update_asset_state(&h.env, &admin, id, AssetState::Closed)
            .unwrap();

        let receipt = h.engine.rage_quit(&h.env, &addr("alice"), id, 1_000).unwrap();
        assert_eq!(receipt.fee, 200);
        assert_eq!(receipt.payout, 800);
        assert_eq!(receipt.investor_shares, 0);
        assert_eq!(h.engine.asset(id).unwrap().total_shares, 0);
        assert!(matches!(
            h.events.records().last(),
            Some(ProtocolEvent::RageQuit { .. })
        ));
    }

    #[test]
    fn test_rage_quit_rejects_explicitly_unlisted_token() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        let before = snapshot_counters(&h, id);

        h.whitelist.set_answer(WhitelistStatus::NotWhitelisted);
        assert_eq!(
            h.engine.rage_quit(&h.env, &addr("alice"), id, 50),
            Err(AssetError::TokenNotWhitelisted("USDC".to_string()))
        );
        assert_eq!(snapshot_counters(&h, id), before);
    }

    #[test]
    fn test_rage_quit_tolerates_unavailable_oracle() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();

        h.whitelist.set_answer(WhitelistStatus::Unavailable(
            agora_gateway::DependencyError::new("oracle timeout"),
        ));
        let receipt = h.engine.rage_quit(&h.env, &addr("alice"), id, 60).unwrap();
        assert!(receipt.whitelist_skipped);
        assert_eq!(receipt.investor_shares, 40);

        let records = h.events.records();
        assert!(records.iter().any(|e| matches!(
            e,
            ProtocolEvent::WhitelistCheckSkipped { reason, .. } if reason.contains("oracle timeout")
        )));
    }

    #[test]
    fn test_failed_rage_quit_emits_no_whitelist_warning() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 100).unwrap();
        h.whitelist.set_answer(WhitelistStatus::Unavailable(
            agora_gateway::DependencyError::new("oracle timeout"),
        ));
        h.fees.set_failing(true);
        let events_before = h.events.len();

        assert!(h.engine.rage_quit(&h.env, &addr("alice"), id, 60).is_err());
        assert_eq!(h.events.len(), events_before);
    }

    // ── update_asset_state ───────────────────────────────────────────────

    #[test]
    fn test_closed_is_terminal() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        let admin = h.admin();
        assert_eq!(
            h.engine.update_asset_state(&h.env, &admin, id, AssetState::Closed),
            Ok(AssetState::Active)
        );
        assert_eq!(
            h.engine.update_asset_state(&h.env, &admin, id, AssetState::Active),
            Err(AssetError::InvalidAssetState {
                asset: id,
                state: AssetState::Closed
            })
        );
    }

    #[test]
    fn test_same_state_transition_is_rejected() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        let admin = h.admin();
        assert!(h
            .engine
            .update_asset_state(&h.env, &admin, id, AssetState::Active)
            .is_err());
    }

    // ── accessors & snapshots ────────────────────────────────────────────

    #[test]
    fn test_investor_pages_respect_batch_limit() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 10).unwrap();
        h.engine.invest(&h.env, &addr("bob"), id, 20).unwrap();

        let page = h.engine.investors(id, 1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].investor, addr("alice"));
        assert_eq!(page[1].shares, 20);
        assert_eq!(
            h.engine.investors(id, 0, 51),
            Err(AssetError::ExceedsBatchLimit {
                requested: 51,
                limit: 50
            })
        );
    }

    #[test]
    fn test_asset_pages() {
        let mut h = harness(0, 0, 0);
        for _ in 0..3 {
            with_asset(&mut h);
        }
        let ids: Vec<_> = h
            .engine
            .asset_page(1, 5)
            .unwrap()
            .iter()
            .map(|a| a.id.raw())
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(matches!(
            h.engine.asset_page(0, 51),
            Err(AssetError::ExceedsBatchLimit { .. })
        ));
    }

    #[test]
    fn test_snapshot_restores_state_and_counter() {
        let mut h = harness(0, 0, 0);
        let id = with_asset(&mut h);
        h.engine.invest(&h.env, &addr("alice"), id, 70).unwrap();

        let bytes = h.engine.save_state().unwrap();
        let mut restored = AssetEngine::load_state(&bytes).unwrap();
        assert_eq!(restored.shares_of(id, &addr("alice")), Ok(70));
        let next = restored
            .create_asset(&h.env, &addr("creator"), "Second", "")
            .unwrap();
        assert_eq!(next, AssetId::new(2));
    }

    #[test]
    fn test_garbage_snapshot_is_rejected() {
        assert!(matches!(
            AssetEngine::load_state(&[1, 2, 3]),
            Err(AssetError::Snapshot(_))
        ));
    }

    fn snapshot_with_book(h: &mut Harness, book: InvestorBook, total_shares: u128) -> Vec<u8> {
        let id = with_asset(h);
        let mut asset = h.engine.asset(id).unwrap().clone();
        asset.investors = book;
        asset.total_shares = total_shares;
        let snapshot = AssetSnapshot {
            assets: vec![asset],
            next_asset_id: id.next().unwrap(),
            settlement: h.engine.settlement().clone(),
            pool: h.engine.pool().clone(),
            max_batch: h.engine.max_batch(),
        };
        bincode::serialize(&snapshot).unwrap()
    }

    #[test]
    fn test_snapshot_with_dangling_index_is_rejected() {
        let mut h = harness(0, 0, 0);
        let book = InvestorBook::from_parts(Vec::new(), HashMap::from([(addr("alice"), 7)]));
        let bytes = snapshot_with_book(&mut h, book, 0);
        assert!(matches!(
            AssetEngine::load_state(&bytes),
            Err(AssetError::Snapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_listing_an_investor_twice_is_rejected() {
        let mut h = harness(0, 0, 0);
        let position = InvestorPosition {
            investor: addr("alice"),
            shares: 5,
        };
        let book = InvestorBook::from_parts(
            vec![position.clone(), position],
            HashMap::from([(addr("alice"), 0)]),
        );
        let bytes = snapshot_with_book(&mut h, book, 10);
        assert!(matches!(
            AssetEngine::load_state(&bytes),
            Err(AssetError::Snapshot(_))
        ));
    }
}
