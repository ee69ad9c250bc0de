//! Price feed collaborator.

use crate::Rate;

/// Supplies the price used to bring both assets into a common unit.
///
/// The price is the value of one whole collateral unit expressed in base
/// units, scaled by [`RATE_SCALE`](crate::RATE_SCALE). Staleness and zero
/// prices are the feed's concern; the core reads it synchronously.
pub trait PriceFeed {
    fn price(&self) -> Rate;
}

impl<P: PriceFeed + ?Sized> PriceFeed for &P {
    fn price(&self) -> Rate {
        (**self).price()
    }
}
