//! Nullable whitelist oracle: answers whatever it is told to.

use agora_gateway::{DependencyError, WhitelistOracle, WhitelistStatus};
use agora_types::SettlementToken;
use std::sync::Mutex;

/// A whitelist oracle returning a programmable answer for every token.
pub struct NullWhitelist {
    answer: Mutex<WhitelistStatus>,
}

impl NullWhitelist {
    pub fn allowing() -> Self {
        Self::answering(WhitelistStatus::Whitelisted)
    }

    pub fn denying() -> Self {
        Self::answering(WhitelistStatus::NotWhitelisted)
    }

    /// An oracle whose every lookup fails.
    pub fn unavailable() -> Self {
        Self::answering(WhitelistStatus::Unavailable(DependencyError::new(
            "null whitelist oracle offline",
        )))
    }

    pub fn answering(answer: WhitelistStatus) -> Self {
        Self {
            answer: Mutex::new(answer),
        }
    }

    pub fn set_answer(&self, answer: WhitelistStatus) {
        *self.answer.lock().unwrap() = answer;
    }
}

impl WhitelistOracle for NullWhitelist {
    fn is_whitelisted(&self, _token: &SettlementToken) -> WhitelistStatus {
        self.answer.lock().unwrap().clone()
    }
}
