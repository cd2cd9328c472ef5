use agora_types::{Capability, WalletAddress};
use thiserror::Error;

/// A collaborator could not produce an answer.
///
/// Distinct from a definite negative answer (insufficient balance, not
/// whitelisted), which each trait models separately.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("dependency unavailable: {0}")]
pub struct DependencyError(pub String);

impl DependencyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("balance overflow crediting {account}")]
    Overflow { account: WalletAddress },

    #[error(transparent)]
    Unavailable(#[from] DependencyError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{holder} does not hold the {capability} capability")]
    CapabilityDenied {
        holder: WalletAddress,
        capability: Capability,
    },

    #[error("capability grant belongs to {holder}, not {caller}")]
    NotGrantHolder {
        holder: WalletAddress,
        caller: WalletAddress,
    },

    #[error("zero address is not a valid identity")]
    ZeroAddress,

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}
