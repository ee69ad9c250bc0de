//! # constel-vault
//!
//! Paired base/collateral share vaults and the coverage ratio guard.
//!
//! Each vault mints shares against deposits net of the mint fee and keeps a
//! liquidity reserve on hand; anything above the reserve is swept into the
//! distribution pool. Before shares are minted the coverage guard checks the
//! normalized ratio of base to collateral total assets against the bound the
//! minting vault owns.
//!
//! ## Modules
//!
//! - [`coverage`] — Coverage ratio, normalization and mint bounds
//! - [`vault`] — Share accounting, deposit/redeem and admin setters

pub mod coverage;
pub mod vault;

use constel_types::{Amount, Asset, Identity, LedgerError, Rate};

/// Error types for vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// A base mint would push the coverage ratio above the maximum.
    #[error("insufficient collateral coverage: ratio {ratio} above max {max}")]
    InsufficientCollateralCoverage {
        /// Post-deposit ratio.
        ratio: Rate,
        /// Configured maximum.
        max: Rate,
    },

    /// A collateral mint would push the coverage ratio below the minimum.
    #[error("insufficient base coverage: ratio {ratio} below min {min}")]
    InsufficientBaseCoverage {
        /// Post-deposit ratio.
        ratio: Rate,
        /// Configured minimum.
        min: Rate,
    },

    /// The caller lacks the admin role.
    #[error("caller {caller} is not authorized")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
    },

    /// Deposit of zero assets.
    #[error("deposit amount is zero")]
    ZeroDeposit,

    /// The operation would mint or burn zero shares.
    #[error("share amount is zero")]
    ZeroShares,

    /// Existing shares are backed by no assets; new deposits would be
    /// captured by them.
    #[error("{asset} vault has outstanding shares but no assets")]
    Insolvent {
        /// The affected vault.
        asset: Asset,
    },

    /// The owner does not hold enough shares.
    #[error("insufficient shares for {owner}: held {held}, requested {requested}")]
    InsufficientShares {
        /// The redeeming owner.
        owner: Identity,
        /// Shares held.
        held: Amount,
        /// Shares requested.
        requested: Amount,
    },

    /// Vault and pool together cannot cover the redemption.
    #[error("insufficient {asset} liquidity: available {available}, required {required}")]
    InsufficientLiquidity {
        /// The vault asset.
        asset: Asset,
        /// Vault holdings plus pool balance.
        available: Amount,
        /// Assets owed.
        required: Amount,
    },

    /// A fee or reserve rate above 1.0.
    #[error("rate {0} exceeds 1.0")]
    InvalidRate(Rate),

    /// The bound kind does not belong to this vault.
    #[error("{asset} vault cannot own this ratio bound")]
    BoundMismatch {
        /// The vault asked to hold the bound.
        asset: Asset,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in vault calculation")]
    Overflow,

    /// An asset transfer failed.
    #[error("transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
