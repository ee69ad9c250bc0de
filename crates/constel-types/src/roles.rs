//! Identity registry collaborator.
//!
//! The core never dispatches on caller type; every privileged operation asks
//! `has_role(identity, role)` synchronously before touching state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Identity, Role};

/// Read-only role lookup consulted before every privileged mutation.
pub trait IdentityRegistry {
    /// Return `true` if `identity` currently holds `role`.
    fn has_role(&self, identity: &Identity, role: Role) -> bool;

    /// Return `true` if `identity` holds any of `roles`.
    fn has_any_role(&self, identity: &Identity, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(identity, *role))
    }
}

/// In-memory role directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoleDirectory {
    grants: BTreeMap<Role, BTreeSet<Identity>>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `identity`. Granting twice is harmless.
    pub fn grant(&mut self, role: Role, identity: Identity) {
        tracing::debug!(?role, %identity, "role granted");
        self.grants.entry(role).or_default().insert(identity);
    }

    /// Revoke `role` from `identity`. Returns whether it was held.
    pub fn revoke(&mut self, role: Role, identity: &Identity) -> bool {
        let removed = self
            .grants
            .get_mut(&role)
            .map(|holders| holders.remove(identity))
            .unwrap_or(false);
        if removed {
            tracing::debug!(?role, %identity, "role revoked");
        }
        removed
    }

    /// All identities currently holding `role`.
    pub fn holders(&self, role: Role) -> Vec<Identity> {
        self.grants
            .get(&role)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl IdentityRegistry for RoleDirectory {
    fn has_role(&self, identity: &Identity, role: Role) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|holders| holders.contains(identity))
    }
}
