//! External collaborators of the Agora engines.
//!
//! The engines never talk to a token contract, fee service or role store
//! directly. Every dependency is a trait defined here; the rest of the
//! workspace depends only on the traits. This crate also ships the default
//! adapters a deployment wires in: a basis-point fee schedule, a whitelist
//! registry, a role registry and a monotonic system clock.

pub mod capability;
pub mod clock;
pub mod error;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod permission;
pub mod whitelist;

use std::sync::Arc;

pub use capability::{authorize, CapabilityGrant};
pub use clock::{Clock, SystemClock};
pub use error::{DependencyError, GatewayError, LedgerError};
pub use events::EventSink;
pub use fees::{FeeGateway, FeeKind, FeeQuote, ScheduleFeeGateway};
pub use ledger::BalanceLedger;
pub use permission::{PermissionGate, RoleRegistry};
pub use whitelist::{WhitelistOracle, WhitelistRegistry, WhitelistStatus};

/// The set of collaborators an engine operation may consult.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn BalanceLedger>,
    pub fees: Arc<dyn FeeGateway>,
    pub whitelist: Arc<dyn WhitelistOracle>,
    pub permissions: Arc<dyn PermissionGate>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// Current time as observed through the clock collaborator.
    pub fn now(&self) -> agora_types::Timestamp {
        self.clock.now()
    }
}
