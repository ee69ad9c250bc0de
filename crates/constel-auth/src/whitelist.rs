//! Operator whitelist.
//!
//! Operators are onboarded with a grant from the admin server binding the
//! operator identity to its identity nonce. The distributor tracks how many
//! minipools each operator runs through the validator counters here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use constel_crypto::blake3::contexts;
use constel_crypto::ed25519::Endorsement;
use constel_types::roles::IdentityRegistry;
use constel_types::{Identity, Role};

use crate::grant::{grant_digest, SignedClaimAuthorization};
use crate::{AuthError, Result};

/// A whitelisted operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub operator: Identity,
    /// Ledger time the operator was onboarded.
    pub onboarded_at: u64,
    /// Minipools currently run by this operator.
    pub active_validators: u64,
}

/// Digest the admin server signs to onboard `operator`.
pub fn onboarding_digest(
    auth: &SignedClaimAuthorization,
    operator: &Identity,
    identity_nonce: u64,
    epoch: u64,
) -> [u8; 32] {
    grant_digest(
        contexts::OPERATOR_ONBOARDING,
        &[operator.as_bytes()],
        identity_nonce,
        epoch,
        auth.domain(),
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    operators: BTreeMap<Identity, OperatorRecord>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_whitelisted(&self, operator: &Identity) -> bool {
        self.operators.contains_key(operator)
    }

    pub fn operator(&self, operator: &Identity) -> Option<&OperatorRecord> {
        self.operators.get(operator)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Onboard an operator with a signed grant.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignature`] if the grant does not verify
    /// - [`AuthError::AlreadyWhitelisted`] if the operator is already listed
    ///   (the grant is not consumed)
    pub fn add_operator<R: IdentityRegistry + ?Sized>(
        &mut self,
        auth: &mut SignedClaimAuthorization,
        registry: &R,
        operator: Identity,
        grant: &Endorsement,
        now: u64,
    ) -> Result<()> {
        let authorization = auth.authorize(
            registry,
            contexts::OPERATOR_ONBOARDING,
            &operator,
            &[operator.as_bytes()],
            grant,
        )?;

        if self.is_whitelisted(&operator) {
            return Err(AuthError::AlreadyWhitelisted(operator));
        }

        auth.commit(authorization)?;
        self.operators.insert(
            operator,
            OperatorRecord {
                operator,
                onboarded_at: now,
                active_validators: 0,
            },
        );

        tracing::info!(%operator, onboarded_at = now, "operator whitelisted");
        Ok(())
    }

    /// Remove an operator. Admin only.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`] if `caller` is not an admin
    /// - [`AuthError::NotWhitelisted`] if the operator is unknown
    /// - [`AuthError::OperatorHasValidators`] if minipools are still running
    pub fn remove_operator<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        operator: &Identity,
    ) -> Result<OperatorRecord> {
        if !registry.has_role(caller, Role::Admin) {
            return Err(AuthError::Unauthorized { caller: *caller });
        }
        let record = self
            .operators
            .get(operator)
            .ok_or(AuthError::NotWhitelisted(*operator))?;
        if record.active_validators > 0 {
            return Err(AuthError::OperatorHasValidators {
                operator: *operator,
                active: record.active_validators,
            });
        }

        let removed = self
            .operators
            .remove(operator)
            .ok_or(AuthError::NotWhitelisted(*operator))?;
        tracing::info!(%operator, "operator removed from whitelist");
        Ok(removed)
    }

    /// Record a new minipool for `operator`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotWhitelisted`] if the operator is unknown
    /// - [`AuthError::ValidatorCountOutOfRange`] on overflow
    pub fn increment_validators(&mut self, operator: &Identity) -> Result<u64> {
        let record = self
            .operators
            .get_mut(operator)
            .ok_or(AuthError::NotWhitelisted(*operator))?;
        record.active_validators = record
            .active_validators
            .checked_add(1)
            .ok_or(AuthError::ValidatorCountOutOfRange(*operator))?;
        Ok(record.active_validators)
    }

    /// Record an exited minipool for `operator`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotWhitelisted`] if the operator is unknown
    /// - [`AuthError::ValidatorCountOutOfRange`] if the count is already zero
    pub fn decrement_validators(&mut self, operator: &Identity) -> Result<u64> {
        let record = self
            .operators
            .get_mut(operator)
            .ok_or(AuthError::NotWhitelisted(*operator))?;
        record.active_validators = record
            .active_validators
            .checked_sub(1)
            .ok_or(AuthError::ValidatorCountOutOfRange(*operator))?;
        Ok(record.active_validators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constel_crypto::ed25519::KeyPair;
    use constel_types::roles::RoleDirectory;
    use constel_types::SigningDomain;

    fn setup() -> (Whitelist, SignedClaimAuthorization, RoleDirectory, KeyPair) {
        let signer = KeyPair::from_bytes(&[21u8; 32]);
        let mut registry = RoleDirectory::new();
        registry.grant(Role::AdminServer, Identity(signer.identity()));
        registry.grant(Role::Admin, Identity([0xAD; 32]));
        let auth = SignedClaimAuthorization::new(SigningDomain::new(Identity([0xC2; 32]), 1));
        (Whitelist::new(), auth, registry, signer)
    }

    #[test]
    fn test_add_operator_with_grant() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let grant = signer.endorse(&onboarding_digest(&auth, &op, 0, 0));

        wl.add_operator(&mut auth, &registry, op, &grant, 1_000).expect("onboard");
        let record = wl.operator(&op).expect("record");
        assert_eq!(record.onboarded_at, 1_000);
        assert_eq!(record.active_validators, 0);
        assert_eq!(auth.nonces().identity_nonce(&op), 1);
    }

    #[test]
    fn test_onboarding_grant_cannot_be_replayed() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let grant = signer.endorse(&onboarding_digest(&auth, &op, 0, 0));

        wl.add_operator(&mut auth, &registry, op, &grant, 1_000).expect("onboard");
        wl.remove_operator(&registry, &Identity([0xAD; 32]), &op).expect("remove");

        let err = wl
            .add_operator(&mut auth, &registry, op, &grant, 2_000)
            .expect_err("replayed grant");
        assert!(matches!(err, AuthError::InvalidSignature));
        assert!(!wl.is_whitelisted(&op));
    }

    #[test]
    fn test_duplicate_onboarding_keeps_nonce() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let first = signer.endorse(&onboarding_digest(&auth, &op, 0, 0));
        wl.add_operator(&mut auth, &registry, op, &first, 1_000).expect("onboard");

        let second = signer.endorse(&onboarding_digest(&auth, &op, 1, 0));
        let err = wl
            .add_operator(&mut auth, &registry, op, &second, 1_001)
            .expect_err("duplicate");
        assert!(matches!(err, AuthError::AlreadyWhitelisted(_)));
        assert_eq!(auth.nonces().identity_nonce(&op), 1);
    }

    #[test]
    fn test_reward_claim_grant_is_not_an_onboarding_grant() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let digest = grant_digest(
            contexts::REWARD_CLAIM,
            &[op.as_bytes()],
            0,
            0,
            auth.domain(),
        );
        let grant = signer.endorse(&digest);
        assert!(matches!(
            wl.add_operator(&mut auth, &registry, op, &grant, 1),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_validator_counts() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let grant = signer.endorse(&onboarding_digest(&auth, &op, 0, 0));
        wl.add_operator(&mut auth, &registry, op, &grant, 0).expect("onboard");

        assert_eq!(wl.increment_validators(&op).expect("inc"), 1);
        assert_eq!(wl.increment_validators(&op).expect("inc"), 2);
        assert_eq!(wl.decrement_validators(&op).expect("dec"), 1);
        assert_eq!(wl.decrement_validators(&op).expect("dec"), 0);
        assert!(matches!(
            wl.decrement_validators(&op),
            Err(AuthError::ValidatorCountOutOfRange(_))
        ));
        assert!(matches!(
            wl.increment_validators(&Identity([9; 32])),
            Err(AuthError::NotWhitelisted(_))
        ));
    }

    #[test]
    fn test_remove_operator_rules() {
        let (mut wl, mut auth, registry, signer) = setup();
        let op = Identity([1; 32]);
        let grant = signer.endorse(&onboarding_digest(&auth, &op, 0, 0));
        wl.add_operator(&mut auth, &registry, op, &grant, 0).expect("onboard");
        wl.increment_validators(&op).expect("inc");

        assert!(matches!(
            wl.remove_operator(&registry, &Identity([5; 32]), &op),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(matches!(
            wl.remove_operator(&registry, &Identity([0xAD; 32]), &op),
            Err(AuthError::OperatorHasValidators { active: 1, .. })
        ));

        wl.decrement_validators(&op).expect("dec");
        wl.remove_operator(&registry, &Identity([0xAD; 32]), &op).expect("remove");
        assert!(wl.is_empty());
    }
}
