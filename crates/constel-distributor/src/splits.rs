//! Reward splits.
//!
//! ```text
//! treasury  = reward * treasury_rate     (floor)
//! operator  = reward * operator_rate     (floor)
//! community = reward - treasury - operator
//! ```
//!
//! The community portion absorbs rounding, so the three always sum to the
//! reward. Rates summing above 1.0 fail the split even when flooring would
//! hide the excess; [`FeeSplit::new`] refuses such rates up front.

use serde::{Deserialize, Serialize};

use constel_types::math::mul_rate;
use constel_types::{Amount, Rate, RATE_SCALE};

use crate::{DistributorError, Result};

/// Default treasury fee: 10%.
pub const DEFAULT_TREASURY_RATE: Rate = RATE_SCALE / 10;

/// Default operator fee: 10%.
pub const DEFAULT_OPERATOR_RATE: Rate = RATE_SCALE / 10;

/// Treasury and operator fee rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub treasury_rate: Rate,
    pub operator_rate: Rate,
}

impl FeeSplit {
    /// Validated fee split.
    ///
    /// # Errors
    ///
    /// - [`DistributorError::InvalidFeeSplit`] if the rates sum above 1.0
    pub fn new(treasury_rate: Rate, operator_rate: Rate) -> Result<Self> {
        let valid = treasury_rate
            .checked_add(operator_rate)
            .is_some_and(|sum| sum <= RATE_SCALE);
        if !valid {
            return Err(DistributorError::InvalidFeeSplit {
                treasury_rate,
                operator_rate,
            });
        }
        Ok(Self {
            treasury_rate,
            operator_rate,
        })
    }
}

impl Default for FeeSplit {
    fn default() -> Self {
        Self {
            treasury_rate: DEFAULT_TREASURY_RATE,
            operator_rate: DEFAULT_OPERATOR_RATE,
        }
    }
}

/// The three portions of a split reward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub treasury: Amount,
    pub operator: Amount,
    pub community: Amount,
}

impl Split {
    pub fn total(&self) -> Amount {
        self.treasury + self.operator + self.community
    }
}

/// Split `reward` at the given rates.
///
/// # Errors
///
/// - [`DistributorError::ArithmeticUnderflow`] if the rates sum above 1.0 or
///   the portions exceed the reward
/// - [`DistributorError::Overflow`] on arithmetic overflow
pub fn split_reward(reward: Amount, treasury_rate: Rate, operator_rate: Rate) -> Result<Split> {
    let within_one = treasury_rate
        .checked_add(operator_rate)
        .is_some_and(|sum| sum <= RATE_SCALE);
    if !within_one {
        return Err(DistributorError::ArithmeticUnderflow {
            reward,
            treasury: mul_rate(reward, treasury_rate).unwrap_or(Amount::MAX),
            operator: mul_rate(reward, operator_rate).unwrap_or(Amount::MAX),
        });
    }

    let treasury = mul_rate(reward, treasury_rate).ok_or(DistributorError::Overflow)?;
    let operator = mul_rate(reward, operator_rate).ok_or(DistributorError::Overflow)?;

    let community = reward
        .checked_sub(treasury)
        .and_then(|rest| rest.checked_sub(operator))
        .ok_or(DistributorError::ArithmeticUnderflow {
            reward,
            treasury,
            operator,
        })?;

    tracing::trace!(reward, treasury, operator, community, "reward split");

    Ok(Split {
        treasury,
        operator,
        community,
    })
}
