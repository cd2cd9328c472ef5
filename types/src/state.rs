//! Lifecycle enums for assets and proposal kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of an asset pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetState {
    /// Registered but not yet open to investors.
    Inactive,
    /// Open for investment and divestment.
    Active,
    /// Winding down: divestment only.
    Liquidating,
    /// Soft-retired. Only the emergency exit still works.
    Closed,
}

impl AssetState {
    /// Whether new capital may enter the pool.
    pub fn accepts_investment(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the regular (non-emergency) exit is open.
    pub fn allows_divestment(&self) -> bool {
        matches!(self, Self::Active | Self::Liquidating)
    }

    /// Whether an administrative transition out of this state is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Liquidating => "liquidating",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// What a governance proposal asks the protocol to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    /// Move treasury funds into an asset pool.
    Investment,
    /// Redeem treasury shares from an asset pool.
    Divestment,
    /// Change a governance parameter.
    ParameterChange,
    /// Free-form signalling proposal with no on-protocol effect.
    Other,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Investment => "investment",
            Self::Divestment => "divestment",
            Self::ParameterChange => "parameter_change",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}
