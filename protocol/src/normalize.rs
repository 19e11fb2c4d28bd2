//! # Decimal Normalization
//!
//! The external bridge carries at most [`config::BRIDGE_MAX_DECIMALS`]
//! decimals of precision, while the tokens it transports are typically
//! minted with 18. Before an amount hits the wire it is truncated — never
//! rounded up — to the bridge's precision: the low-order digits beyond the
//! target precision are zeroed, the high-order digits are untouched.
//!
//! Truncation only ever goes one way. If the token's native precision is
//! already at or below the target, the amount passes through unchanged;
//! there is no scale-up.

use crate::config;

/// Truncates `amount` from `from_decimals` precision to `target_decimals`.
///
/// Let `diff = from_decimals - min(from_decimals, target_decimals)`. When
/// `diff > 0`, the result is `(amount / 10^diff) * 10^diff` — integer floor
/// division followed by a rescale, which zeroes the `diff` low-order decimal
/// digits. When `diff == 0` the amount is returned unchanged.
///
/// Pure integer arithmetic; cannot fail and cannot overflow (the result is
/// never larger than the input). A gap beyond 38 decimals means `10^diff`
/// exceeds `u128::MAX`, so every representable amount truncates to zero.
pub fn adjust_amount(amount: u128, from_decimals: u8, target_decimals: u8) -> u128 {
    if from_decimals <= target_decimals {
        return amount;
    }
    match 10u128.checked_pow(u32::from(from_decimals - target_decimals)) {
        Some(scale) => (amount / scale) * scale,
        None => 0,
    }
}

/// Truncates `amount` to the bridge's maximum precision.
///
/// Equivalent to `adjust_amount(amount, from_decimals, BRIDGE_MAX_DECIMALS)`;
/// this is the form the connector uses on every forward.
pub fn bridge_amount(amount: u128, from_decimals: u8) -> u128 {
    adjust_amount(amount, from_decimals, config::BRIDGE_MAX_DECIMALS)
}
