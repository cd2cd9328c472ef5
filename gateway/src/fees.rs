//! Fee gateway: prices each fee-bearing operation.

use crate::error::DependencyError;
use agora_types::{FeeSchedule, SettlementToken, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which operation a fee is being quoted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    Invest,
    Divest,
    RageQuit,
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invest => "invest",
            Self::Divest => "divest",
            Self::RageQuit => "rage_quit",
        };
        f.write_str(s)
    }
}

/// A fee in raw settlement units, or the reason no fee could be produced.
pub type FeeQuote = Result<u128, DependencyError>;

/// Trait for fee calculation.
pub trait FeeGateway: Send + Sync {
    fn quote(&self, kind: FeeKind, settlement: &SettlementToken, gross: u128) -> FeeQuote;
}

/// Flat basis-point fees from a [`FeeSchedule`], rounded down.
pub struct ScheduleFeeGateway {
    schedule: FeeSchedule,
}

impl ScheduleFeeGateway {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    fn bps_for(&self, kind: FeeKind) -> u32 {
        match kind {
            FeeKind::Invest => self.schedule.invest_bps,
            FeeKind::Divest => self.schedule.divest_bps,
            FeeKind::RageQuit => self.schedule.rage_quit_bps,
        }
    }
}

impl FeeGateway for ScheduleFeeGateway {
    fn quote(&self, kind: FeeKind, _settlement: &SettlementToken, gross: u128) -> FeeQuote {
        bps_of(gross, self.bps_for(kind))
            .ok_or_else(|| DependencyError::new(format!("{kind} fee overflows for gross {gross}")))
    }
}

/// `amount * bps / 10_000`, `None` on overflow.
pub fn bps_of(amount: u128, bps: u32) -> Option<u128> {
    amount
        .checked_mul(u128::from(bps))
        .map(|scaled| scaled / u128::from(BPS_DENOMINATOR))
}
