//! Capabilities checked by the permission gate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named permission a caller may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Change asset lifecycle state, governance configuration and registries,
    /// and cancel proposals on behalf of their proposer.
    Admin,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
