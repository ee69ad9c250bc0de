//! # constel-auth
//!
//! Two-level nonce signature authorization.
//!
//! An authorizer (the admin server) signs grants off-ledger. Each grant binds
//! its subject data to the subject's current identity nonce, the global epoch
//! nonce, the verifying component and the chain. Advancing either nonce
//! invalidates outstanding grants: the identity nonce for one subject, the
//! epoch for everyone.
//!
//! ## Modules
//!
//! - [`nonces`] — Identity and epoch nonce book
//! - [`grant`] — Grant digest construction and verification
//! - [`rewards`] — Signed reward claims
//! - [`whitelist`] — Signed operator onboarding and validator counts

pub mod grant;
pub mod nonces;
pub mod rewards;
pub mod whitelist;

use constel_types::{Identity, LedgerError};

/// Error types for authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The caller lacks the capability required for this operation.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// The grant did not verify. Covers wrong signer, wrong fields, wrong
    /// target, wrong chain and stale nonces alike.
    #[error("bad signature")]
    InvalidSignature,

    /// A nonce would overflow.
    #[error("nonce overflow")]
    NonceOverflow,

    /// The operator is not on the whitelist.
    #[error("operator {0} is not whitelisted")]
    NotWhitelisted(Identity),

    /// The operator is already on the whitelist.
    #[error("operator {0} is already whitelisted")]
    AlreadyWhitelisted(Identity),

    /// The operator still runs validators and cannot be removed.
    #[error("operator {operator} still has {active} active validators")]
    OperatorHasValidators {
        /// The operator.
        operator: Identity,
        /// Its active validator count.
        active: u64,
    },

    /// Validator count would go below zero or overflow.
    #[error("validator count out of range for operator {0}")]
    ValidatorCountOutOfRange(Identity),

    /// Claim amount is zero.
    #[error("claim amount is zero")]
    ZeroAmount,

    /// The payout could not be delivered.
    #[error("transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthError>;
