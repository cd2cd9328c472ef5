//! Fungible-balance ledger collaborator.

use crate::error::LedgerError;
use agora_types::{Timestamp, WalletAddress};

/// Trait for the settlement token's balance ledger.
///
/// Both transfer methods are all-or-nothing: on `Err` no balance changed.
pub trait BalanceLedger: Send + Sync {
    /// Current balance of `account`.
    fn balance_of(&self, account: &WalletAddress) -> Result<u128, LedgerError>;

    /// Balance of `account` as of the end of second `at` (checkpointed).
    fn balance_at(&self, account: &WalletAddress, at: Timestamp) -> Result<u128, LedgerError>;

    /// Pull `amount` from `from` into `to` (caller-approved spend).
    fn transfer_from(
        &self,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: u128,
    ) -> Result<(), LedgerError>;

    /// Push `amount` out of an account the protocol controls.
    fn transfer(
        &self,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: u128,
    ) -> Result<(), LedgerError>;
}
