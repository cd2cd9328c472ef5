//! Asset-engine errors.

use agora_gateway::GatewayError;
use agora_types::{AssetId, AssetState};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("zero address is not a valid identity")]
    ZeroAddress,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("{asset} is {state}, operation not allowed")]
    InvalidAssetState { asset: AssetId, state: AssetState },

    #[error("{0} not found")]
    AssetNotFound(AssetId),

    #[error("caller is not an admin")]
    CallerNotAdmin,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("settlement token {0} is not whitelisted")]
    TokenNotWhitelisted(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("batch of {requested} exceeds the limit of {limit}")]
    ExceedsBatchLimit { requested: usize, limit: usize },

    #[error("arithmetic overflow in asset accounting")]
    Overflow,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<GatewayError> for AssetError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::CapabilityDenied { .. } | GatewayError::NotGrantHolder { .. } => {
                Self::CallerNotAdmin
            }
            GatewayError::ZeroAddress => Self::ZeroAddress,
            GatewayError::Dependency(e) => Self::OperationFailed(e.to_string()),
        }
    }
}
