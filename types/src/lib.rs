//! Fundamental types for the Agora protocol.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, identifiers, timestamps, governance parameters, lifecycle enums and the
//! notification records emitted by the engines.

pub mod address;
pub mod capability;
pub mod event;
pub mod ids;
pub mod params;
pub mod state;
pub mod time;

pub use address::WalletAddress;
pub use capability::Capability;
pub use event::ProtocolEvent;
pub use ids::{AssetId, ProposalId, SettlementToken};
pub use params::{FeeSchedule, GovernanceParams, VoteWeightPolicy, BPS_DENOMINATOR};
pub use state::{AssetState, ProposalKind};
pub use time::Timestamp;
