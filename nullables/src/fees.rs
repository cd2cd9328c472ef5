//! Nullable fee gateway: fixed rates with switchable failure.

use agora_gateway::fees::bps_of;
use agora_gateway::{DependencyError, FeeGateway, FeeKind, FeeQuote};
use agora_types::SettlementToken;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A fee gateway with per-kind basis-point rates that can be told to fail.
pub struct NullFeeGateway {
    rates: Mutex<HashMap<FeeKind, u32>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl NullFeeGateway {
    /// Zero fees for every kind.
    pub fn free() -> Self {
        Self::with_rates(0, 0, 0)
    }

    pub fn with_rates(invest_bps: u32, divest_bps: u32, rage_quit_bps: u32) -> Self {
        let mut rates = HashMap::new();
        rates.insert(FeeKind::Invest, invest_bps);
        rates.insert(FeeKind::Divest, divest_bps);
        rates.insert(FeeKind::RageQuit, rage_quit_bps);
        Self {
            rates: Mutex::new(rates),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent quote fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Override the rate for one fee kind. Rates above 10_000 bps produce fees
    /// larger than the gross amount.
    pub fn set_rate(&self, kind: FeeKind, bps: u32) {
        self.rates.lock().unwrap().insert(kind, bps);
    }

    /// How many quotes have been requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FeeGateway for NullFeeGateway {
    fn quote(&self, kind: FeeKind, _settlement: &SettlementToken, gross: u128) -> FeeQuote {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::new("null fee gateway set to fail"));
        }
        let bps = self.rates.lock().unwrap().get(&kind).copied().unwrap_or(0);
        bps_of(gross, bps).ok_or_else(|| DependencyError::new("fee overflow"))
    }
}
