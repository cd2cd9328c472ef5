//! Asset pools and their investor books.

use agora_types::{AssetId, AssetState, Timestamp, WalletAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One investor's holding in an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorPosition {
    pub investor: WalletAddress,
    pub shares: u128,
}

/// Investors of one asset, in first-seen order.
///
/// Positions live in a dense `Vec`; `index` maps each investor to its slot so
/// membership and share lookups are O(1) and an investor is listed at most once.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InvestorBook {
    positions: Vec<InvestorPosition>,
    index: HashMap<WalletAddress, usize>,
}

impl InvestorBook {
    pub fn contains(&self, investor: &WalletAddress) -> bool {
        self.index.contains_key(investor)
    }

    /// Shares held by `investor`, zero if never seen.
    pub fn shares_of(&self, investor: &WalletAddress) -> u128 {
        self.index
            .get(investor)
            .and_then(|&i| self.positions.get(i))
            .map_or(0, |p| p.shares)
    }

    /// Append `investor` with zero shares. Returns `false` if already listed.
    pub fn register(&mut self, investor: &WalletAddress) -> bool {
        if self.index.contains_key(investor) {
            return false;
        }
        self.index.insert(investor.clone(), self.positions.len());
        self.positions.push(InvestorPosition {
            investor: investor.clone(),
            shares: 0,
        });
        true
    }

    /// Overwrite the share count of `investor`, registering them first if needed.
    pub(crate) fn set_shares(&mut self, investor: &WalletAddress, shares: u128) {
        self.register(investor);
        if let Some(position) = self
            .index
            .get(investor)
            .and_then(|&i| self.positions.get_mut(i))
        {
            position.shares = shares;
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvestorPosition> {
        self.positions.iter()
    }

    /// Up to `limit` positions starting at `offset`; empty past the end.
    pub fn page(&self, offset: usize, limit: usize) -> &[InvestorPosition] {
        let start = offset.min(self.positions.len());
        let end = start.saturating_add(limit).min(self.positions.len());
        &self.positions[start..end]
    }

    /// Whether `index` maps every listed investor to its own slot and nothing else.
    ///
    /// A duplicate listing leaves `index` shorter than `positions`, so it fails too.
    pub fn is_well_formed(&self) -> bool {
        self.index.len() == self.positions.len()
            && self
                .positions
                .iter()
                .enumerate()
                .all(|(i, p)| self.index.get(&p.investor) == Some(&i))
    }

    /// Sum of all positions, `None` on overflow.
    pub fn sum_shares(&self) -> Option<u128> {
        self.positions
            .iter()
            .try_fold(0u128, |acc, p| acc.checked_add(p.shares))
    }
}

/// A named pool of settlement value divided into shares.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub description: String,
    pub creator: WalletAddress,
    pub created_at: Timestamp,
    pub state: AssetState,
    /// Net settlement value paid in, minus gross value redeemed.
    pub total_investment: u128,
    pub total_shares: u128,
    pub investors: InvestorBook,
}

impl Asset {
    pub(crate) fn new(
        id: AssetId,
        name: String,
        description: String,
        creator: WalletAddress,
        created_at: Timestamp,
    ) -> Self {
        let mut investors = InvestorBook::default();
        investors.register(&creator);
        Self {
            id,
            name,
            description,
            creator,
            created_at,
            state: AssetState::Active,
            total_investment: 0,
            total_shares: 0,
            investors,
        }
    }

    pub fn shares_of(&self, investor: &WalletAddress) -> u128 {
        self.investors.shares_of(investor)
    }

    /// Whether the investor book is well formed and adds up to `total_shares`.
    pub fn is_consistent(&self) -> bool {
        self.investors.is_well_formed() && self.investors.sum_shares() == Some(self.total_shares)
    }
}

#[cfg(test)]
impl InvestorBook {
    /// Assemble a book from raw parts, bypassing `register`.
    pub(crate) fn from_parts(
        positions: Vec<InvestorPosition>,
        index: HashMap<WalletAddress, usize>,
    ) -> Self {
        Self { positions, index }
    }
}
