//! Whitelist oracle: is a settlement token approved for payouts?

use crate::capability::CapabilityGrant;
use crate::error::{DependencyError, GatewayError};
use agora_types::{Capability, SettlementToken};
use std::collections::HashMap;
use std::sync::RwLock;

/// The three possible answers of a whitelist lookup.
///
/// `Unavailable` is not a "no": callers decide per operation whether to
/// tolerate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WhitelistStatus {
    Whitelisted,
    NotWhitelisted,
    Unavailable(DependencyError),
}

/// Trait for whitelist lookups.
pub trait WhitelistOracle: Send + Sync {
    fn is_whitelisted(&self, token: &SettlementToken) -> WhitelistStatus;
}

#[derive(Default)]
struct Entries {
    tokens: Vec<SettlementToken>,
    index: HashMap<SettlementToken, usize>,
}

/// Admin-maintained list of supported settlement tokens.
///
/// Tokens live in a dense `Vec` with a token→position index; removal swaps
/// the last entry into the freed slot, so both add and remove are O(1).
pub struct WhitelistRegistry {
    entries: RwLock<Entries>,
}

impl WhitelistRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Seed the registry at start-up, before any admin exists to call `add`.
    pub fn with_tokens(tokens: impl IntoIterator<Item = SettlementToken>) -> Self {
        let mut entries = Entries::default();
        for token in tokens {
            if !entries.index.contains_key(&token) {
                entries.index.insert(token.clone(), entries.tokens.len());
                entries.tokens.push(token);
            }
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Add a token. Returns `false` if it was already listed.
    pub fn add(&self, grant: &CapabilityGrant, token: SettlementToken) -> Result<bool, GatewayError> {
        Self::require_admin(grant)?;
        let mut entries = self.write()?;
        if entries.index.contains_key(&token) {
            return Ok(false);
        }
        let position = entries.tokens.len();
        entries.index.insert(token.clone(), position);
        tracing::info!(admin = %grant.holder(), %token, "settlement token whitelisted");
        entries.tokens.push(token);
        Ok(true)
    }

    /// Remove a token. Returns `false` if it was not listed.
    pub fn remove(&self, grant: &CapabilityGrant, token: &SettlementToken) -> Result<bool, GatewayError> {
        Self::require_admin(grant)?;
        let mut entries = self.write()?;
        let Some(position) = entries.index.remove(token) else {
            return Ok(false);
        };
        entries.tokens.swap_remove(position);
        if let Some(moved) = entries.tokens.get(position).cloned() {
            entries.index.insert(moved, position);
        }
        tracing::info!(admin = %grant.holder(), %token, "settlement token removed from whitelist");
        Ok(true)
    }

    /// Listed tokens in storage order (not insertion order after removals).
    pub fn tokens(&self) -> Vec<SettlementToken> {
        self.entries
            .read()
            .map(|e| e.tokens.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.tokens.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Entries>, GatewayError> {
        self.entries
            .write()
            .map_err(|_| DependencyError::new("whitelist registry lock poisoned").into())
    }

    fn require_admin(grant: &CapabilityGrant) -> Result<(), GatewayError> {
        if !grant.confers(Capability::Admin) {
            return Err(GatewayError::CapabilityDenied {
                holder: grant.holder().clone(),
                capability: Capability::Admin,
            });
        }
        Ok(())
    }
}

impl WhitelistOracle for WhitelistRegistry {
    fn is_whitelisted(&self, token: &SettlementToken) -> WhitelistStatus {
        match self.entries.read() {
            Ok(entries) if entries.index.contains_key(token) => WhitelistStatus::Whitelisted,
            Ok(_) => WhitelistStatus::NotWhitelisted,
            Err(_) => WhitelistStatus::Unavailable(DependencyError::new(
                "whitelist registry lock poisoned",
            )),
        }
    }
}

impl Default for WhitelistRegistry {
    fn default() -> Self {
        Self::new()
    }
}
