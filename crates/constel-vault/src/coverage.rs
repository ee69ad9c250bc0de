//! Coverage ratio guard.
//!
//! ```text
//! ratio = normalize(total_assets(base)) / normalize(total_assets(collateral))
//! ```
//!
//! Base mints may not push the ratio above the base vault's maximum;
//! collateral mints may not push it below the collateral vault's minimum.
//! Redemptions are never gated. The ratio is always evaluated against the
//! post-deposit, post-fee totals.
//!
//! A zero base value gives a ratio of zero. Zero collateral value with a
//! nonzero base value is unbounded and reported as `Rate::MAX`, so only a
//! disabled maximum (`Rate::MAX`) admits it.

use serde::{Deserialize, Serialize};

use constel_types::math::{mul_rate, ratio};
use constel_types::price::PriceFeed;
use constel_types::{Amount, Asset, Rate};

use crate::{Result, VaultError};

/// Converts an asset amount into the common unit the ratio is taken in.
pub trait Normalize {
    /// Value of `amount` of `asset`, or `None` on overflow.
    fn normalize(&self, asset: Asset, amount: Amount) -> Option<Amount>;
}

/// Values collateral in base units using a price feed.
///
/// `base = collateral * price / RATE_SCALE`; base amounts pass through.
#[derive(Clone, Debug)]
pub struct PriceNormalizer<P> {
    feed: P,
}

impl<P: PriceFeed> PriceNormalizer<P> {
    pub fn new(feed: P) -> Self {
        Self { feed }
    }

    pub fn feed(&self) -> &P {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut P {
        &mut self.feed
    }
}

impl<P: PriceFeed> Normalize for PriceNormalizer<P> {
    fn normalize(&self, asset: Asset, amount: Amount) -> Option<Amount> {
        match asset {
            Asset::Base => Some(amount),
            Asset::Collateral => mul_rate(amount, self.feed.price()),
        }
    }
}

/// Mint bound owned by a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioBound {
    /// Upper bound, owned by the base vault.
    Max(Rate),
    /// Lower bound, owned by the collateral vault.
    Min(Rate),
}

impl RatioBound {
    /// The bound a vault of `asset` starts with: disabled.
    pub fn disabled_for(asset: Asset) -> Self {
        match asset {
            Asset::Base => RatioBound::Max(Rate::MAX),
            Asset::Collateral => RatioBound::Min(0),
        }
    }

    /// Whether a vault of `asset` may own this bound.
    pub fn belongs_to(&self, asset: Asset) -> bool {
        matches!(
            (asset, self),
            (Asset::Base, RatioBound::Max(_)) | (Asset::Collateral, RatioBound::Min(_))
        )
    }
}

/// Normalized base/collateral ratio.
///
/// # Errors
///
/// - [`VaultError::Overflow`] if normalization overflows
pub fn coverage_ratio<N: Normalize + ?Sized>(
    normalizer: &N,
    base_assets: Amount,
    collateral_assets: Amount,
) -> Result<Rate> {
    let base_value = normalizer
        .normalize(Asset::Base, base_assets)
        .ok_or(VaultError::Overflow)?;
    let collateral_value = normalizer
        .normalize(Asset::Collateral, collateral_assets)
        .ok_or(VaultError::Overflow)?;

    if base_value == 0 {
        return Ok(0);
    }
    // Nonzero denominator; `None` only means the quotient saturates.
    Ok(ratio(base_value, collateral_value).unwrap_or(Rate::MAX))
}

/// Check a mint of `asset` shares against `bound`.
///
/// `base_after` and `collateral_after` are the vault totals once the net
/// deposit has landed. Returns the post-deposit ratio.
///
/// # Errors
///
/// - [`VaultError::InsufficientCollateralCoverage`] if a base mint exceeds the max
/// - [`VaultError::InsufficientBaseCoverage`] if a collateral mint falls below the min
/// - [`VaultError::BoundMismatch`] if `bound` is not the minting vault's kind
pub fn check_mint<N: Normalize + ?Sized>(
    normalizer: &N,
    asset: Asset,
    bound: RatioBound,
    base_after: Amount,
    collateral_after: Amount,
) -> Result<Rate> {
    let current = coverage_ratio(normalizer, base_after, collateral_after)?;

    match (asset, bound) {
        (Asset::Base, RatioBound::Max(max)) if current > max => {
            tracing::warn!(ratio = current, max, "base mint rejected: collateral coverage");
            Err(VaultError::InsufficientCollateralCoverage { ratio: current, max })
        }
        (Asset::Collateral, RatioBound::Min(min)) if current < min => {
            tracing::warn!(ratio = current, min, "collateral mint rejected: base coverage");
            Err(VaultError::InsufficientBaseCoverage { ratio: current, min })
        }
        (Asset::Base, RatioBound::Max(_)) | (Asset::Collateral, RatioBound::Min(_)) => {
            tracing::debug!(%asset, ratio = current, "coverage check passed");
            Ok(current)
        }
        _ => Err(VaultError::BoundMismatch { asset }),
    }
}
