//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, balance ledger, fee gateway, whitelist
//! oracle) are abstracted behind traits in `agora-gateway`. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod fees;
pub mod ledger;
pub mod whitelist;

pub use clock::NullClock;
pub use fees::NullFeeGateway;
pub use ledger::NullLedger;
pub use whitelist::NullWhitelist;
