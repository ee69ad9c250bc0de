//! Identity and epoch nonce book.
//!
//! Both counters start at zero, only ever move up by one, and fail with
//! [`AuthError::NonceOverflow`] rather than wrap.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use constel_types::Identity;

use crate::{AuthError, Result};

/// Live nonce values checked against every grant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceBook {
    identity_nonces: BTreeMap<Identity, u64>,
    epoch: u64,
}

impl NonceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nonce of `identity` (zero if never advanced).
    pub fn identity_nonce(&self, identity: &Identity) -> u64 {
        self.identity_nonces.get(identity).copied().unwrap_or(0)
    }

    /// Current global epoch nonce.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The value the identity nonce would take after one advance.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NonceOverflow`] if the nonce is at `u64::MAX`
    pub fn next_identity_nonce(&self, identity: &Identity) -> Result<u64> {
        self.identity_nonce(identity)
            .checked_add(1)
            .ok_or(AuthError::NonceOverflow)
    }

    /// Advance the identity nonce by one and return the new value.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NonceOverflow`] if the nonce is at `u64::MAX`
    pub fn advance_identity(&mut self, identity: Identity) -> Result<u64> {
        let next = self.next_identity_nonce(&identity)?;
        self.identity_nonces.insert(identity, next);
        Ok(next)
    }

    /// Advance the epoch nonce by one and return the new value.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NonceOverflow`] if the epoch is at `u64::MAX`
    pub fn advance_epoch(&mut self) -> Result<u64> {
        self.epoch = self.epoch.checked_add(1).ok_or(AuthError::NonceOverflow)?;
        Ok(self.epoch)
    }
}
