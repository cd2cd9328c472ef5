use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("asset error: {0}")]
    Asset(#[from] agora_assets::AssetError),

    #[error("governance error: {0}")]
    Governance(#[from] agora_governance::GovernanceError),

    #[error("gateway error: {0}")]
    Gateway(#[from] agora_gateway::GatewayError),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
