//! Capability grants: proof that the permission gate was consulted.
//!
//! A [`CapabilityGrant`] can only be minted by [`authorize`], so an engine
//! that receives one knows the check already happened at the boundary and
//! never asks the gate again mid-operation.

use crate::error::GatewayError;
use crate::permission::PermissionGate;
use agora_types::{Capability, WalletAddress};

/// Evidence that `holder` held `capability` when the grant was issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityGrant {
    holder: WalletAddress,
    capability: Capability,
}

impl CapabilityGrant {
    pub fn holder(&self) -> &WalletAddress {
        &self.holder
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Whether this grant confers `capability`.
    pub fn confers(&self, capability: Capability) -> bool {
        self.capability == capability
    }

    /// Check that `caller` is the identity the grant was issued to.
    pub fn ensure_held_by(&self, caller: &WalletAddress) -> Result<(), GatewayError> {
        if &self.holder != caller {
            return Err(GatewayError::NotGrantHolder {
                holder: self.holder.clone(),
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}

/// Ask the permission gate whether `caller` holds `capability`.
pub fn authorize(
    gate: &dyn PermissionGate,
    caller: &WalletAddress,
    capability: Capability,
) -> Result<CapabilityGrant, GatewayError> {
    if caller.is_zero() {
        return Err(GatewayError::ZeroAddress);
    }
    if !gate.has_capability(caller, capability) {
        tracing::debug!(%caller, %capability, "capability denied");
        return Err(GatewayError::CapabilityDenied {
            holder: caller.clone(),
            capability,
        });
    }
    Ok(CapabilityGrant {
        holder: caller.clone(),
        capability,
    })
}
