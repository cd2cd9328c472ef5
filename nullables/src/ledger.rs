//! Nullable balance ledger: in-memory balances with checkpoints.

use agora_gateway::{BalanceLedger, Clock, DependencyError, LedgerError};
use agora_types::{Timestamp, WalletAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Accounts {
    balances: HashMap<WalletAddress, u128>,
    /// Per-account `(time, balance after change)`, oldest first.
    checkpoints: HashMap<WalletAddress, Vec<(Timestamp, u128)>>,
    transfers: Vec<(WalletAddress, WalletAddress, u128)>,
}

impl Accounts {
    fn set(&mut self, account: &WalletAddress, balance: u128, at: Timestamp) {
        self.balances.insert(account.clone(), balance);
        let history = self.checkpoints.entry(account.clone()).or_default();
        match history.last_mut() {
            Some(last) if last.0 == at => last.1 = balance,
            _ => history.push((at, balance)),
        }
    }

    fn balance(&self, account: &WalletAddress) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

/// An in-memory ledger for testing.
///
/// Every balance change is checkpointed at the clock's current time so that
/// snapshot vote weights can be asserted against.
pub struct NullLedger {
    clock: Arc<dyn Clock>,
    accounts: Mutex<Accounts>,
    failing: AtomicBool,
}

impl NullLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accounts: Mutex::new(Accounts::default()),
            failing: AtomicBool::new(false),
        }
    }

    /// Credit `amount` out of thin air.
    pub fn mint(&self, account: &WalletAddress, amount: u128) {
        let now = self.clock.now();
        let mut accounts = self.accounts.lock().unwrap();
        let balance = accounts.balance(account) + amount;
        accounts.set(account, balance, now);
    }

    /// Make every subsequent transfer and lookup fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful transfer, in order.
    pub fn transfers(&self) -> Vec<(WalletAddress, WalletAddress, u128)> {
        self.accounts.lock().unwrap().transfers.clone()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::new("null ledger set to fail").into());
        }
        Ok(())
    }

    fn move_funds(
        &self,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        let now = self.clock.now();
        let mut accounts = self.accounts.lock().unwrap();
        let available = accounts.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from != to {
            let credited = accounts
                .balance(to)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow { account: to.clone() })?;
            accounts.set(from, available - amount, now);
            accounts.set(to, credited, now);
        }
        accounts.transfers.push((from.clone(), to.clone(), amount));
        Ok(())
    }
}

impl BalanceLedger for NullLedger {
    fn balance_of(&self, account: &WalletAddress) -> Result<u128, LedgerError> {
        self.check_available()?;
        Ok(self.accounts.lock().unwrap().balance(account))
    }

    fn balance_at(&self, account: &WalletAddress, at: Timestamp) -> Result<u128, LedgerError> {
        self.check_available()?;
        let accounts = self.accounts.lock().unwrap();
        let balance = accounts
            .checkpoints
            .get(account)
            .and_then(|history| {
                let idx = history.partition_point(|(ts, _)| *ts <= at);
                idx.checked_sub(1).map(|i| history[i].1)
            })
            .unwrap_or(0);
        Ok(balance)
    }

    fn transfer_from(
        &self,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_funds(from, to, amount)
    }

    fn transfer(
        &self,
        from: &WalletAddress,
        to: &WalletAddress,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_funds(from, to, amount)
    }
}
