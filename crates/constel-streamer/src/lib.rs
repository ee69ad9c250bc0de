//! # constel-streamer
//!
//! Linear vesting of finalized claim proceeds.
//!
//! Each batch of finalized claims is locked in the streamer account and
//! recognized by the vaults gradually over the streaming interval. Once the
//! interval has elapsed the batch is fully vested and the protocol sweeps it
//! into the distribution pool.
//!
//! ## Modules
//!
//! - [`stream`] — Stream state, vesting query, sweep and finalization

pub mod stream;

use constel_types::{Amount, Asset, Identity, LedgerError};

/// Error types for claim streaming.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The caller lacks the role required for this operation.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// Ledger time went backwards relative to the last claim.
    #[error("clock regression: now {now} before last claim at {last_claim_time}")]
    ClockRegression {
        /// The supplied time.
        now: u64,
        /// The recorded claim time.
        last_claim_time: u64,
    },

    /// The current streaming interval has not elapsed.
    #[error("interval not finished: {elapsed}s of {interval}s elapsed")]
    IntervalNotFinished {
        /// Seconds since the last claim.
        elapsed: u64,
        /// Configured interval.
        interval: u64,
    },

    /// A streaming interval of zero.
    #[error("streaming interval must be nonzero")]
    ZeroInterval,

    /// The streamer account does not hold the claims being finalized.
    #[error("unfunded {asset} claims: available {available}, required {required}")]
    UnfundedClaims {
        /// The asset.
        asset: Asset,
        /// Streamer balance not already locked.
        available: Amount,
        /// Amount being finalized.
        required: Amount,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in stream calculation")]
    Overflow,

    /// An asset transfer failed.
    #[error("transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;
