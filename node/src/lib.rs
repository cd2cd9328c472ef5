//! Agora protocol facade.
//!
//! Loads a [`ProtocolConfig`], wires the asset and governance engines to
//! their collaborators, and exposes every protocol operation through
//! [`Protocol`]:
//! - Asset pools: create, invest, divest, rage-quit, admin state changes
//! - Governance: proposals, voting, timelocked execution, cancellation
//! - Registries: admin roles and whitelisted settlement tokens
//! - Snapshots of both engines

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod protocol;

pub use config::ProtocolConfig;
pub use error::NodeError;
pub use executor::TreasuryExecutor;
pub use logging::{init_logging, LogFormat};
pub use protocol::Protocol;
