//! Basis-point arithmetic over raw amounts.
//!
//! Amounts are raw `u128` units throughout the workspace to avoid
//! floating-point errors. Percentages (slashing rates, confidence, accuracy)
//! are basis points where 10 000 = 100.00 %.

/// 100.00 % expressed in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// `amount * bps / 10_000`, floored. Returns `None` on overflow.
pub fn bps_of(amount: u128, bps: u32) -> Option<u128> {
    amount
        .checked_mul(bps as u128)
        .map(|v| v / BPS_DENOMINATOR as u128)
}
