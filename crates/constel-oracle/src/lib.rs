//! # constel-oracle
//!
//! Signed yield attestations and the price feed used for coverage
//! normalization.
//!
//! The yield oracle accepts attestations of total accrued yield signed by an
//! oracle admin and reconciles them against the distributor's live oracle
//! error: yield that was realized on-ledger between signing and submission
//! is subtracted from the attested figure so it is never counted twice.
//!
//! ## Modules
//!
//! - [`attestation`] — Yield attestation state machine
//! - [`stub`] — Fixed-price feed for development and tests

pub mod attestation;
pub mod stub;

/// Error types for oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The attestation signature did not verify or the signer lacks the
    /// oracle admin role.
    #[error("signer is not an oracle admin")]
    BadSigner,

    /// Attestation timestamp is ahead of ledger time.
    #[error("cannot accept future data: timestamp {timestamp}, now {now}")]
    FutureData {
        /// The attested timestamp.
        timestamp: u64,
        /// Current ledger time.
        now: u64,
    },

    /// Attestation timestamp does not advance past the last accepted one.
    #[error("cannot accept stale data: timestamp {timestamp} <= last {last}")]
    StaleData {
        /// The attested timestamp.
        timestamp: u64,
        /// The last accepted timestamp.
        last: u64,
    },

    /// The live oracle error is below the signer's snapshot.
    #[error("actual error {actual} less than expected {expected}")]
    ErrorRegression {
        /// Live oracle error.
        actual: i128,
        /// Oracle error the signer observed.
        expected: i128,
    },

    /// The attestation carries a negative expected oracle error.
    #[error("expected oracle error must be non-negative, got {0}")]
    NegativeExpectedError(i128),

    /// Arithmetic overflow while reconciling.
    #[error("arithmetic overflow in yield reconciliation")]
    Overflow,
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
