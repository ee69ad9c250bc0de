//! Grant digest construction and verification.
//!
//! A grant is an [`Endorsement`] over
//!
//! ```text
//! derive_key(context,
//!     LP(subject_field_1) || ... || LP(subject_field_n)
//!     || LP(LE64(identity_nonce)) || LP(LE64(epoch_nonce))
//!     || LP(contract_identity) || LP(LE64(chain_id)))
//! ```
//!
//! where `LP` is the LE32 length prefix from
//! [`encode_multi_field`](constel_crypto::blake3::encode_multi_field).
//!
//! The verifier never reads nonces out of the payload. It rebuilds the
//! digest from the *live* nonces, so a stale nonce, a different subject
//! field, another target or another chain all produce a digest the
//! signature does not cover, and every such case lands on the same
//! [`AuthError::InvalidSignature`].

use serde::{Deserialize, Serialize};

use constel_crypto::blake3;
use constel_crypto::ed25519::Endorsement;
use constel_types::roles::IdentityRegistry;
use constel_types::{Identity, Role, SigningDomain};

use crate::nonces::NonceBook;
use crate::{AuthError, Result};

/// Capability a grant signer must hold.
pub const AUTHORIZER_ROLE: Role = Role::AdminServer;

/// Compute the digest an authorizer signs for a grant.
///
/// Signers call this with the nonces they read at signing time; the verifier
/// calls it with the live nonces.
pub fn grant_digest(
    context: &str,
    subject_fields: &[&[u8]],
    identity_nonce: u64,
    epoch: u64,
    domain: &SigningDomain,
) -> [u8; 32] {
    let identity_nonce = identity_nonce.to_le_bytes();
    let epoch = epoch.to_le_bytes();
    let chain_id = domain.chain_id.to_le_bytes();

    let mut fields: Vec<&[u8]> = Vec::with_capacity(subject_fields.len() + 4);
    fields.extend_from_slice(subject_fields);
    fields.push(&identity_nonce);
    fields.push(&epoch);
    fields.push(domain.contract.as_bytes());
    fields.push(&chain_id);

    blake3::payload_digest(context, &fields)
}

/// A verified grant that has not yet consumed its nonce.
///
/// Callers perform their own fallible work (payouts, duplicate checks)
/// between [`SignedClaimAuthorization::authorize`] and
/// [`SignedClaimAuthorization::commit`], so a rejected operation leaves the
/// nonce untouched.
///
/// Only [`SignedClaimAuthorization::authorize`] creates one, and
/// [`SignedClaimAuthorization::commit`] accepts it only while the nonces it
/// was verified against are still live.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct Authorization {
    subject: Identity,
    signer: Identity,
    nonce: u64,
    epoch: u64,
}

impl Authorization {
    /// Subject whose nonce the grant consumes.
    pub fn subject(&self) -> &Identity {
        &self.subject
    }

    /// Identity that signed the grant.
    pub fn signer(&self) -> &Identity {
        &self.signer
    }

    /// Nonce value the grant was bound to.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

/// Verifier state: signing domain plus the nonce book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaimAuthorization {
    domain: SigningDomain,
    nonces: NonceBook,
}

impl SignedClaimAuthorization {
    pub fn new(domain: SigningDomain) -> Self {
        Self {
            domain,
            nonces: NonceBook::new(),
        }
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn nonces(&self) -> &NonceBook {
        &self.nonces
    }

    /// Digest a grant for `subject` must cover right now.
    pub fn expected_digest(
        &self,
        context: &str,
        subject: &Identity,
        subject_fields: &[&[u8]],
    ) -> [u8; 32] {
        grant_digest(
            context,
            subject_fields,
            self.nonces.identity_nonce(subject),
            self.nonces.epoch(),
            &self.domain,
        )
    }

    /// Verify a grant against the live nonces without consuming it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignature`] for any signature, field, target,
    ///   chain, nonce or signer-capability mismatch
    /// - [`AuthError::NonceOverflow`] if the subject nonce cannot advance
    pub fn authorize<R: IdentityRegistry + ?Sized>(
        &self,
        registry: &R,
        context: &str,
        subject: &Identity,
        subject_fields: &[&[u8]],
        endorsement: &Endorsement,
    ) -> Result<Authorization> {
        let digest = self.expected_digest(context, subject, subject_fields);

        let signer = endorsement
            .signer_identity(&digest)
            .map(Identity::from_bytes)
            .map_err(|_| AuthError::InvalidSignature)?;

        if !registry.has_role(&signer, AUTHORIZER_ROLE) {
            tracing::warn!(%signer, "grant signed by identity without authorizer role");
            return Err(AuthError::InvalidSignature);
        }

        self.nonces.next_identity_nonce(subject)?;

        Ok(Authorization {
            subject: *subject,
            signer,
            nonce: self.nonces.identity_nonce(subject),
            epoch: self.nonces.epoch(),
        })
    }

    /// Consume a verified grant by advancing its subject nonce.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignature`] if the subject nonce or the epoch
    ///   moved since the grant was authorized
    /// - [`AuthError::NonceOverflow`] if the subject nonce cannot advance
    pub fn commit(&mut self, authorization: Authorization) -> Result<u64> {
        let live = self.nonces.identity_nonce(&authorization.subject);
        if authorization.nonce != live || authorization.epoch != self.nonces.epoch() {
            tracing::warn!(
                subject = %authorization.subject,
                nonce = authorization.nonce,
                live,
                "stale authorization rejected"
            );
            return Err(AuthError::InvalidSignature);
        }
        let next = self.nonces.advance_identity(authorization.subject)?;
        tracing::debug!(
            subject = %authorization.subject,
            signer = %authorization.signer,
            nonce = next,
            "grant consumed"
        );
        Ok(next)
    }

    /// Verify and immediately consume a grant.
    pub fn verify_and_consume<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        context: &str,
        subject: &Identity,
        subject_fields: &[&[u8]],
        endorsement: &Endorsement,
    ) -> Result<u64> {
        let authorization =
            self.authorize(registry, context, subject, subject_fields, endorsement)?;
        self.commit(authorization)
    }

    /// Revoke every outstanding grant for `identity`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`] if `caller` is not an authorizer
    /// - [`AuthError::NonceOverflow`] if the nonce cannot advance
    pub fn bump_identity_nonce<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
        identity: Identity,
    ) -> Result<u64> {
        require_authorizer(registry, caller)?;
        let nonce = self.nonces.advance_identity(identity)?;
        tracing::info!(%identity, nonce, "identity nonce bumped");
        Ok(nonce)
    }

    /// Revoke every outstanding grant system-wide.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthorized`] if `caller` is not an authorizer
    /// - [`AuthError::NonceOverflow`] if the epoch cannot advance
    pub fn bump_global_epoch<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        caller: &Identity,
    ) -> Result<u64> {
        require_authorizer(registry, caller)?;
        let epoch = self.nonces.advance_epoch()?;
        tracing::info!(epoch, "global epoch bumped");
        Ok(epoch)
    }
}

fn require_authorizer<R: IdentityRegistry + ?Sized>(registry: &R, caller: &Identity) -> Result<()> {
    if registry.has_role(caller, AUTHORIZER_ROLE) {
        Ok(())
    } else {
        tracing::warn!(%caller, "nonce bump by non-authorizer rejected");
        Err(AuthError::Unauthorized { caller: *caller })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constel_crypto::blake3::contexts;
    use constel_crypto::ed25519::KeyPair;
    use constel_types::roles::RoleDirectory;

    const CHAIN: u64 = 17_000;

    fn setup() -> (SignedClaimAuthorization, RoleDirectory, KeyPair) {
        let signer = KeyPair::from_bytes(&[9u8; 32]);
        let mut registry = RoleDirectory::new();
        registry.grant(Role::AdminServer, Identity(signer.identity()));
        let auth = SignedClaimAuthorization::new(SigningDomain::new(Identity([0xC0; 32]), CHAIN));
        (auth, registry, signer)
    }

    fn sign(
        signer: &KeyPair,
        subject: &Identity,
        identity_nonce: u64,
        epoch: u64,
        domain: &SigningDomain,
    ) -> Endorsement {
        let digest = grant_digest(
            contexts::REWARD_CLAIM,
            &[subject.as_bytes()],
            identity_nonce,
            epoch,
            domain,
        );
        signer.endorse(&digest)
    }

    #[test]
    fn test_valid_grant_advances_identity_nonce_only() {
        let (mut auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let grant = sign(&signer, &subject, 0, 0, auth.domain());

        let nonce = auth
            .verify_and_consume(
                &registry,
                contexts::REWARD_CLAIM,
                &subject,
                &[subject.as_bytes()],
                &grant,
            )
            .expect("valid grant");
        assert_eq!(nonce, 1);
        assert_eq!(auth.nonces().identity_nonce(&subject), 1);
        assert_eq!(auth.nonces().epoch(), 0);
    }

    #[test]
    fn test_second_grant_at_same_nonce_is_replay() {
        let (mut auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let first = sign(&signer, &subject, 0, 0, auth.domain());
        let second = sign(&signer, &subject, 0, 0, auth.domain());

        auth.verify_and_consume(
            &registry,
            contexts::REWARD_CLAIM,
            &subject,
            &[subject.as_bytes()],
            &first,
        )
        .expect("first grant");
        let err = auth
            .verify_and_consume(
                &registry,
                contexts::REWARD_CLAIM,
                &subject,
                &[subject.as_bytes()],
                &second,
            )
            .expect_err("replay");
        assert!(matches!(err, AuthError::InvalidSignature));
        assert_eq!(auth.nonces().identity_nonce(&subject), 1);
    }

    #[test]
    fn test_every_mismatch_is_the_same_error() {
        let (auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let fields: [&[u8]; 1] = [subject.as_bytes()];

        let wrong_chain = SigningDomain::new(auth.domain().contract, CHAIN + 1);
        let wrong_target = SigningDomain::new(Identity([0xEE; 32]), CHAIN);
        let cases = [
            sign(&signer, &subject, 1, 0, auth.domain()),
            sign(&signer, &subject, 0, 1, auth.domain()),
            sign(&signer, &subject, 0, 0, &wrong_chain),
            sign(&signer, &subject, 0, 0, &wrong_target),
            sign(&signer, &Identity([2; 32]), 0, 0, auth.domain()),
        ];

        for grant in &cases {
            let err = auth
                .authorize(&registry, contexts::REWARD_CLAIM, &subject, &fields, grant)
                .expect_err("mismatch");
            assert!(matches!(err, AuthError::InvalidSignature));
        }

        // Right payload, wrong context.
        let grant = sign(&signer, &subject, 0, 0, auth.domain());
        let err = auth
            .authorize(&registry, contexts::OPERATOR_ONBOARDING, &subject, &fields, &grant)
            .expect_err("context mismatch");
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_signer_without_role_rejected() {
        let (auth, registry, _) = setup();
        let outsider = KeyPair::from_bytes(&[3u8; 32]);
        let subject = Identity([1; 32]);
        let grant = sign(&outsider, &subject, 0, 0, auth.domain());

        let err = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &[subject.as_bytes()], &grant)
            .expect_err("no role");
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_bump_identity_nonce_revokes_outstanding_grant() {
        let (mut auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let grant = sign(&signer, &subject, 0, 0, auth.domain());

        let admin = Identity(signer.identity());
        assert_eq!(auth.bump_identity_nonce(&registry, &admin, subject).expect("bump"), 1);

        let err = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &[subject.as_bytes()], &grant)
            .expect_err("revoked");
        assert!(matches!(err, AuthError::InvalidSignature));

        let fresh = sign(&signer, &subject, 1, 0, auth.domain());
        let _ = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &[subject.as_bytes()], &fresh)
            .expect("fresh grant");
    }

    #[test]
    fn test_bump_global_epoch_revokes_everyone() {
        let (mut auth, registry, signer) = setup();
        let alice = Identity([1; 32]);
        let bob = Identity([2; 32]);
        let alice_grant = sign(&signer, &alice, 0, 0, auth.domain());
        let bob_grant = sign(&signer, &bob, 0, 0, auth.domain());

        let admin = Identity(signer.identity());
        auth.bump_global_epoch(&registry, &admin).expect("bump");

        for (subject, grant) in [(alice, &alice_grant), (bob, &bob_grant)] {
            let err = auth
                .authorize(
                    &registry,
                    contexts::REWARD_CLAIM,
                    &subject,
                    &[subject.as_bytes()],
                    grant,
                )
                .expect_err("epoch moved");
            assert!(matches!(err, AuthError::InvalidSignature));
        }
        assert_eq!(auth.nonces().identity_nonce(&alice), 0);
    }

    #[test]
    fn test_bumps_require_authorizer() {
        let (mut auth, registry, _) = setup();
        let stranger = Identity([5; 32]);
        assert!(matches!(
            auth.bump_global_epoch(&registry, &stranger),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(matches!(
            auth.bump_identity_nonce(&registry, &stranger, stranger),
            Err(AuthError::Unauthorized { .. })
        ));
        assert_eq!(auth.nonces().epoch(), 0);
    }

    #[test]
    fn test_authorize_does_not_consume() {
        let (auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let grant = sign(&signer, &subject, 0, 0, auth.domain());
        let authorization = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &[subject.as_bytes()], &grant)
            .expect("valid");
        assert_eq!(authorization.nonce(), 0);
        assert_eq!(authorization.signer(), &Identity(signer.identity()));
        assert_eq!(auth.nonces().identity_nonce(&subject), 0);
    }

    #[test]
    fn test_commit_accepts_one_authorization_per_nonce() {
        let (mut auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let grant = sign(&signer, &subject, 0, 0, auth.domain());
        let fields: [&[u8]; 1] = [subject.as_bytes()];

        let first = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &fields, &grant)
            .expect("valid");
        let second = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &fields, &grant)
            .expect("still valid before commit");

        assert_eq!(auth.commit(first).expect("first commit"), 1);
        assert!(matches!(auth.commit(second), Err(AuthError::InvalidSignature)));
        assert_eq!(auth.nonces().identity_nonce(&subject), 1);
    }

    #[test]
    fn test_commit_rejects_unverified_nonce() {
        let (mut auth, _, _) = setup();
        let subject = Identity([1; 32]);
        let forged = Authorization {
            subject,
            signer: Identity([7; 32]),
            nonce: 999,
            epoch: 0,
        };
        assert!(matches!(auth.commit(forged), Err(AuthError::InvalidSignature)));
        assert_eq!(auth.nonces().identity_nonce(&subject), 0);
    }

    #[test]
    fn test_commit_rejects_after_epoch_bump() {
        let (mut auth, registry, signer) = setup();
        let subject = Identity([1; 32]);
        let grant = sign(&signer, &subject, 0, 0, auth.domain());
        let authorization = auth
            .authorize(&registry, contexts::REWARD_CLAIM, &subject, &[subject.as_bytes()], &grant)
            .expect("valid");

        auth.bump_global_epoch(&registry, &Identity(signer.identity()))
            .expect("bump");
        assert!(matches!(auth.commit(authorization), Err(AuthError::InvalidSignature)));
        assert_eq!(auth.nonces().identity_nonce(&subject), 0);
    }
}
