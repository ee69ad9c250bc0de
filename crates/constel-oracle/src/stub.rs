//! Fixed-price feed.
//!
//! The coverage guard only needs a synchronous price read. Deployments wire
//! in a real feed; development and tests use this stub, whose price can be
//! moved by hand.
//!
//! The default price is `RATE_SCALE / 100`: one collateral unit is worth
//! 0.01 base units.

use serde::{Deserialize, Serialize};

use constel_types::price::PriceFeed;
use constel_types::{Rate, RATE_SCALE};

/// Default price: 1 collateral = 0.01 base.
pub const DEFAULT_PRICE: Rate = RATE_SCALE / 100;

/// A price feed that returns a configured price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubPriceFeed {
    /// Base units per collateral unit, fixed point.
    price: Rate,
}

impl StubPriceFeed {
    /// Create a stub feed with the default price.
    pub fn new() -> Self {
        Self {
            price: DEFAULT_PRICE,
        }
    }

    /// Create a stub feed with a custom price.
    pub fn with_price(price: Rate) -> Self {
        Self { price }
    }

    /// Set the price (development/testing only).
    pub fn dev_set_price(&mut self, price: Rate) {
        tracing::warn!(new_price = price, "stub price feed: price changed (dev only)");
        self.price = price;
    }
}

impl Default for StubPriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFeed for StubPriceFeed {
    fn price(&self) -> Rate {
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_price() {
        assert_eq!(StubPriceFeed::new().price(), DEFAULT_PRICE);
        assert_eq!(StubPriceFeed::default().price(), DEFAULT_PRICE);
    }

    #[test]
    fn test_dev_set_price() {
        let mut feed = StubPriceFeed::with_price(RATE_SCALE);
        assert_eq!(feed.price(), RATE_SCALE);
        feed.dev_set_price(2 * RATE_SCALE);
        assert_eq!(feed.price(), 2 * RATE_SCALE);
    }
}
