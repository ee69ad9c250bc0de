//! Yield attestation state machine.
//!
//! Two states: *uninitialized* (`last_attestation_timestamp == 0`) and
//! *attested*. Only accepted attestations move the state.
//!
//! ## Reconciliation
//!
//! ```text
//! delta          = oracle_error - expected_oracle_error
//! accepted_yield = new_yield - delta
//! oracle_error  -= delta
//! ```
//!
//! `delta` is yield that became realized on-ledger after the signer took its
//! snapshot. The signer's figure still counts it as unrealized, so it is
//! removed from the accepted total and the oracle error collapses back to
//! the signer's snapshot.

use serde::{Deserialize, Serialize};

use constel_crypto::blake3::{self, contexts};
use constel_crypto::ed25519::Endorsement;
use constel_types::roles::IdentityRegistry;
use constel_types::{Amount, Identity, Role, SigningDomain};

use crate::{OracleError, Result};

/// The payload an oracle admin signs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldAttestation {
    /// Total yield accrued, possibly negative after penalties.
    pub new_yield: i128,
    /// Oracle error the signer observed when producing `new_yield`.
    pub expected_oracle_error: i128,
    /// Observation time.
    pub timestamp: u64,
}

/// An attestation together with its endorsement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    pub attestation: YieldAttestation,
    pub endorsement: Endorsement,
}

/// Digest binding an attestation to a verifier and chain.
pub fn attestation_digest(attestation: &YieldAttestation, domain: &SigningDomain) -> [u8; 32] {
    blake3::payload_digest(
        contexts::YIELD_ATTESTATION,
        &[
            &attestation.new_yield.to_le_bytes(),
            &attestation.expected_oracle_error.to_le_bytes(),
            &attestation.timestamp.to_le_bytes(),
            domain.contract.as_bytes(),
            &domain.chain_id.to_le_bytes(),
        ],
    )
}

/// Persisted oracle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    pub last_attested_yield: i128,
    pub last_attestation_timestamp: u64,
}

/// Yield signal consumed by the base vault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributableYield {
    pub magnitude: Amount,
    pub is_loss: bool,
}

impl DistributableYield {
    /// Apply the signal to an asset total, flooring at zero on losses.
    pub fn apply_to(&self, total: Amount) -> Option<Amount> {
        if self.is_loss {
            Some(total.saturating_sub(self.magnitude))
        } else {
            total.checked_add(self.magnitude)
        }
    }
}

/// Outcome of an accepted attestation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Yield recorded as the new attested total.
    pub accepted_yield: i128,
    /// Amount the distributor must subtract from its oracle error.
    pub oracle_error_reduction: i128,
    /// Oracle admin that signed the attestation.
    pub signer: Identity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldOracle {
    domain: SigningDomain,
    state: OracleState,
}

impl YieldOracle {
    pub fn new(domain: SigningDomain) -> Self {
        Self {
            domain,
            state: OracleState::default(),
        }
    }

    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    pub fn state(&self) -> &OracleState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.last_attestation_timestamp != 0
    }

    /// Accept a signed attestation and reconcile it against the live oracle
    /// error.
    ///
    /// Nothing is mutated unless every check passes. The returned
    /// [`Settlement`] tells the caller how far to reduce the oracle error.
    ///
    /// # Errors
    ///
    /// - [`OracleError::BadSigner`] if the signature or signer role is wrong
    /// - [`OracleError::FutureData`] if `timestamp > now`
    /// - [`OracleError::StaleData`] if `timestamp <= last_attestation_timestamp`
    /// - [`OracleError::NegativeExpectedError`] if the snapshot is negative
    /// - [`OracleError::ErrorRegression`] if `oracle_error < expected_oracle_error`
    /// - [`OracleError::Overflow`] on arithmetic overflow
    pub fn set_total_yield_accrued<R: IdentityRegistry + ?Sized>(
        &mut self,
        registry: &R,
        signed: &SignedAttestation,
        oracle_error: i128,
        now: u64,
    ) -> Result<Settlement> {
        let attestation = &signed.attestation;

        let digest = attestation_digest(attestation, &self.domain);
        let signer = signed
            .endorsement
            .signer_identity(&digest)
            .map(Identity::from_bytes)
            .map_err(|_| OracleError::BadSigner)?;
        if !registry.has_role(&signer, Role::OracleAdmin) {
            tracing::warn!(%signer, "attestation signed by non-oracle-admin");
            return Err(OracleError::BadSigner);
        }

        if attestation.timestamp > now {
            return Err(OracleError::FutureData {
                timestamp: attestation.timestamp,
                now,
            });
        }
        if attestation.timestamp <= self.state.last_attestation_timestamp {
            return Err(OracleError::StaleData {
                timestamp: attestation.timestamp,
                last: self.state.last_attestation_timestamp,
            });
        }

        if attestation.expected_oracle_error < 0 {
            return Err(OracleError::NegativeExpectedError(
                attestation.expected_oracle_error,
            ));
        }
        if oracle_error < attestation.expected_oracle_error {
            return Err(OracleError::ErrorRegression {
                actual: oracle_error,
                expected: attestation.expected_oracle_error,
            });
        }

        let delta = oracle_error
            .checked_sub(attestation.expected_oracle_error)
            .ok_or(OracleError::Overflow)?;
        let accepted_yield = attestation
            .new_yield
            .checked_sub(delta)
            .ok_or(OracleError::Overflow)?;

        self.state = OracleState {
            last_attested_yield: accepted_yield,
            last_attestation_timestamp: attestation.timestamp,
        };

        tracing::info!(
            %signer,
            new_yield = attestation.new_yield,
            delta,
            accepted_yield,
            timestamp = attestation.timestamp,
            "yield attestation accepted"
        );

        Ok(Settlement {
            accepted_yield,
            oracle_error_reduction: delta,
            signer,
        })
    }

    /// Current distributable yield as `(magnitude, is_loss)`.
    ///
    /// Uninitialized oracles report zero gain.
    pub fn distributable_yield(&self) -> DistributableYield {
        if !self.is_initialized() {
            return DistributableYield::default();
        }
        let value = self.state.last_attested_yield;
        DistributableYield {
            magnitude: value.unsigned_abs(),
            is_loss: value < 0,
        }
    }
}
