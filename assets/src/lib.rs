//! Asset accounting: pooled value and proportional shares.
//!
//! An asset is a named pool in the settlement token. Investors pay in and
//! receive shares; divesting redeems shares for a payout; rage-quit is the
//! emergency exit that ignores the pool's lifecycle state.
//!
//! `Σ investor shares == total_shares` holds for every asset after every
//! operation, successful or not.

pub mod asset;
pub mod engine;
pub mod error;

pub use asset::{Asset, InvestorBook, InvestorPosition};
pub use engine::{AssetEngine, DivestReceipt, InvestReceipt};
pub use error::AssetError;
