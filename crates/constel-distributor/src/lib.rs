//! # constel-distributor
//!
//! Reward splitting and minipool accounting for the distribution pool.
//!
//! Realized rewards and exit proceeds are split three ways. Treasury and
//! operator portions are paid out immediately; the community portion stays
//! in the pool and is added to the oracle error until the next yield
//! attestation folds it in.
//!
//! ## Modules
//!
//! - [`splits`] — Fee splits and the conserving split function
//! - [`minipool`] — Minipool records with immutable fee snapshots
//! - [`engine`] — The reward-split engine and pool state

pub mod engine;
pub mod minipool;
pub mod splits;

use constel_auth::AuthError;
use constel_types::{Amount, Identity, LedgerError, Rate};

/// Error types for distribution operations.
#[derive(Debug, thiserror::Error)]
pub enum DistributorError {
    /// The caller lacks the role required for this operation.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// Treasury and operator portions exceed the reward.
    #[error("arithmetic underflow: reward {reward} < treasury {treasury} + operator {operator}")]
    ArithmeticUnderflow {
        /// The reward being split.
        reward: Amount,
        /// Treasury portion.
        treasury: Amount,
        /// Operator portion.
        operator: Amount,
    },

    /// Fee rates summing above 1.0.
    #[error("invalid fee split: treasury {treasury_rate} + operator {operator_rate} exceeds 1.0")]
    InvalidFeeSplit {
        /// Treasury rate.
        treasury_rate: Rate,
        /// Operator rate.
        operator_rate: Rate,
    },

    /// No record for this minipool.
    #[error("unknown minipool {0}")]
    UnknownMinipool(Identity),

    /// A record for this minipool already exists.
    #[error("minipool {0} already exists")]
    DuplicateMinipool(Identity),

    /// The pool cannot fund a new bond.
    #[error("insufficient pool liquidity: available {available}, required {required}")]
    InsufficientLiquidity {
        /// Pool base balance.
        available: Amount,
        /// Bond required.
        required: Amount,
    },

    /// Oracle error would go negative outside attestation reconciliation.
    #[error("oracle error {current} cannot absorb reduction {reduction}")]
    OracleErrorUnderflow {
        /// Current oracle error.
        current: i128,
        /// Requested reduction.
        reduction: i128,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in distribution calculation")]
    Overflow,

    /// Operator whitelist bookkeeping failed.
    #[error("operator registry: {0}")]
    Auth(#[from] AuthError),

    /// An asset transfer failed.
    #[error("transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for distribution operations.
pub type Result<T> = std::result::Result<T, DistributorError>;
