//! Permission gate: answers "does caller X hold capability Y?".

use crate::capability::CapabilityGrant;
use crate::error::GatewayError;
use agora_types::{Capability, WalletAddress};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Trait for capability lookups.
pub trait PermissionGate: Send + Sync {
    fn has_capability(&self, caller: &WalletAddress, capability: Capability) -> bool;
}

/// In-process role table, seeded at start and changed only by admins.
pub struct RoleRegistry {
    roles: RwLock<HashMap<Capability, HashSet<WalletAddress>>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
        }
    }

    /// Bootstrap the registry with an initial admin set.
    pub fn with_admins(admins: impl IntoIterator<Item = WalletAddress>) -> Self {
        let admins: HashSet<WalletAddress> = admins.into_iter().collect();
        let mut roles = HashMap::new();
        roles.insert(Capability::Admin, admins);
        Self {
            roles: RwLock::new(roles),
        }
    }

    /// Give `who` a capability. Requires an admin grant.
    pub fn grant_role(
        &self,
        grant: &CapabilityGrant,
        who: &WalletAddress,
        capability: Capability,
    ) -> Result<(), GatewayError> {
        Self::require_admin(grant)?;
        if who.is_zero() {
            return Err(GatewayError::ZeroAddress);
        }
        let mut roles = self
            .roles
            .write()
            .map_err(|_| crate::DependencyError::new("role registry lock poisoned"))?;
        roles.entry(capability).or_default().insert(who.clone());
        tracing::info!(admin = %grant.holder(), %who, %capability, "role granted");
        Ok(())
    }

    /// Take a capability away from `who`. Requires an admin grant.
    ///
    /// An admin may not revoke their own admin role; that would leave the
    /// grant they are holding describing a role nobody has.
    pub fn revoke_role(
        &self,
        grant: &CapabilityGrant,
        who: &WalletAddress,
        capability: Capability,
    ) -> Result<(), GatewayError> {
        Self::require_admin(grant)?;
        if capability == Capability::Admin && who == grant.holder() {
            return Err(GatewayError::CapabilityDenied {
                holder: who.clone(),
                capability,
            });
        }
        let mut roles = self
            .roles
            .write()
            .map_err(|_| crate::DependencyError::new("role registry lock poisoned"))?;
        if let Some(set) = roles.get_mut(&capability) {
            set.remove(who);
        }
        tracing::info!(admin = %grant.holder(), %who, %capability, "role revoked");
        Ok(())
    }

    /// All identities currently holding `capability`, sorted.
    pub fn holders(&self, capability: Capability) -> Vec<WalletAddress> {
        let mut holders: Vec<WalletAddress> = self
            .roles
            .read()
            .map(|roles| {
                roles
                    .get(&capability)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        holders.sort();
        holders
    }

    fn require_admin(grant: &CapabilityGrant) -> Result<(), GatewayError> {
        if !grant.confers(Capability::Admin) {
            return Err(GatewayError::CapabilityDenied {
                holder: grant.holder().clone(),
                capability: Capability::Admin,
            });
        }
        Ok(())
    }
}

impl PermissionGate for RoleRegistry {
    /// A poisoned lock fails closed.
    fn has_capability(&self, caller: &WalletAddress, capability: Capability) -> bool {
        self.roles
            .read()
            .map(|roles| roles.get(&capability).is_some_and(|s| s.contains(caller)))
            .unwrap_or(false)
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
