//! Fixed-point helpers.
//!
//! Rates and ratios are `u128` values where [`RATE_SCALE`] (10^18) is 1.0.
//! Products of two 18-decimal quantities overflow `u128` quickly, so
//! [`mul_div`] widens to 256 bits before dividing.

/// Fixed-point representation of 1.0.
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000;

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of two `u128` values as `(high, low)`.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    let mid = (lo_lo >> 64) + (lo_hi & LOW_MASK) + (hi_lo & LOW_MASK);
    let low = (lo_lo & LOW_MASK) | ((mid & LOW_MASK) << 64);
    let high = hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (mid >> 64);
    (high, low)
}

/// Compute `floor(a * b / denom)` without intermediate overflow.
///
/// Returns `None` if `denom` is zero or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Some(low / denom);
    }
    if high >= denom {
        return None;
    }

    // Restoring long division; `rem < denom` holds at the top of every step.
    let mut rem = high;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= denom {
            rem = rem.wrapping_sub(denom);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// Apply a fixed-point rate to an amount, rounding down.
pub fn mul_rate(amount: u128, rate: u128) -> Option<u128> {
    mul_div(amount, rate, RATE_SCALE)
}

/// Express `numerator / denominator` as a fixed-point ratio.
///
/// A zero denominator yields `None`; callers decide what an unbounded ratio
/// means for them.
pub fn ratio(numerator: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    mul_div(numerator, RATE_SCALE, denominator)
}
