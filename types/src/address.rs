//! Wallet address type with `agr_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An Agora participant identity, conventionally prefixed with `agr_`.
///
/// Addresses are opaque to the engines: they are compared, hashed and logged,
/// never decoded. Signature checks happen before a caller reaches the protocol.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The standard prefix for all Agora addresses.
    pub const PREFIX: &'static str = "agr_";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The zero identity: empty, a bare prefix, or nothing but `0` after the prefix.
    pub fn is_zero(&self) -> bool {
        let body = self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0);
        body.chars().all(|c| c == '0')
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && !self.is_zero()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for WalletAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_addresses_are_detected() {
        assert!(WalletAddress::new("").is_zero());
        assert!(WalletAddress::new("agr_").is_zero());
        assert!(WalletAddress::new("agr_0000").is_zero());
        assert!(!WalletAddress::new("agr_alice").is_zero());
    }

    #[test]
    fn validity_requires_prefix_and_body() {
        assert!(WalletAddress::new("agr_alice").is_valid());
        assert!(!WalletAddress::new("alice").is_valid());
        assert!(!WalletAddress::new("agr_000").is_valid());
    }
}
