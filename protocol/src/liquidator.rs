//! # Rewards Liquidation Strategy
//!
//! Between liquidations the vault's underlying balance drifts upward as
//! staking yield accrues. A liquidation converts that accrued yield into
//! the stable asset for distribution on the counterpart chain. How the
//! conversion happens — which venue, which route, what slippage bound —
//! is a strategy decision, so the vault only sees the
//! [`RewardsLiquidator`] trait: hand over an amount of underlying, get
//! back the stable proceeds or a failure.
//!
//! [`FixedRateLiquidator`] is the reference strategy: it swaps at a fixed
//! integer rate out of its own stable reserve. Production deployments swap
//! through a real venue; tests and in-process deployments use this one.

use thiserror::Error;
use tracing::info;

use crate::token::{Address, SharedToken, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a liquidation strategy can surface.
#[derive(Debug, Error)]
pub enum LiquidatorError {
    /// The strategy's stable reserve cannot cover the proceeds.
    #[error("liquidator reserve short: reserve {reserve}, proceeds {proceeds}")]
    ReserveShort {
        /// Stable tokens currently held by the strategy.
        reserve: u128,
        /// Proceeds the swap would owe.
        proceeds: u128,
    },

    /// The proceeds computation overflowed.
    #[error("liquidation proceeds overflow for amount {amount}")]
    ProceedsOverflow {
        /// The underlying amount being liquidated.
        amount: u128,
    },

    /// Moving tokens during the swap failed.
    #[error("liquidation transfer failed: {0}")]
    Transfer(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// RewardsLiquidator
// ---------------------------------------------------------------------------

/// Pluggable strategy converting accrued underlying yield into the stable
/// asset.
///
/// The vault transfers the yield to [`address`](RewardsLiquidator::address)
/// and then invokes [`liquidate`](RewardsLiquidator::liquidate). The
/// strategy delivers the stable proceeds to its configured beneficiary and
/// returns the proceeds amount. A failure aborts the vault's whole
/// liquidation call.
pub trait RewardsLiquidator: Send + Sync {
    /// The strategy's own identity, carried in configuration events.
    fn address(&self) -> Address;

    /// Converts `amount` of underlying (already held at the strategy's
    /// address) into stable proceeds. Returns the proceeds amount.
    fn liquidate(&self, amount: u128) -> Result<u128, LiquidatorError>;
}

// ---------------------------------------------------------------------------
// FixedRateLiquidator
// ---------------------------------------------------------------------------

/// Reference strategy: swaps at a fixed `rate_num / rate_den` ratio out of
/// its own stable reserve.
///
/// Proceeds are `amount * rate_num / rate_den`, flooring — the strategy
/// never pays out more than the rate implies. The underlying it receives
/// simply accumulates at its address; the stable side is delivered to the
/// beneficiary (the vault, in the standard wiring).
pub struct FixedRateLiquidator {
    address: Address,
    stable: SharedToken,
    beneficiary: Address,
    rate_num: u128,
    rate_den: u128,
}

impl FixedRateLiquidator {
    /// Creates a strategy paying `rate_num / rate_den` stable per unit of
    /// underlying, delivering proceeds to `beneficiary`.
    ///
    /// `rate_den` must be non-zero.
    pub fn new(
        address: Address,
        stable: SharedToken,
        beneficiary: Address,
        rate_num: u128,
        rate_den: u128,
    ) -> Self {
        assert!(rate_den != 0, "rate denominator must be non-zero");
        Self {
            address,
            stable,
            beneficiary,
            rate_num,
            rate_den,
        }
    }
}

impl RewardsLiquidator for FixedRateLiquidator {
    fn address(&self) -> Address {
        self.address
    }

    fn liquidate(&self, amount: u128) -> Result<u128, LiquidatorError> {
        let proceeds = amount
            .checked_mul(self.rate_num)
            .ok_or(LiquidatorError::ProceedsOverflow { amount })?
            / self.rate_den;

        if proceeds > 0 {
            let reserve = self.stable.balance_of(self.address);
            if reserve < proceeds {
                return Err(LiquidatorError::ReserveShort { reserve, proceeds });
            }
            self.stable.transfer(self.address, self.beneficiary, proceeds)?;
        }

        info!(
            strategy = %self.address,
            amount,
            proceeds,
            "liquidated accrued yield"
        );
        Ok(proceeds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn stable_with_reserve(liquidator_addr: Address, reserve: u128) -> SharedToken {
        let minter = Address::from_label("minter");
        let mut stable = Token::new(Address::from_label("token:stb"), "Stable", "STB", 18);
        stable.set_minter(minter);
        stable.mint(minter, liquidator_addr, reserve).unwrap();
        SharedToken::new(stable)
    }

    #[test]
    fn liquidate_pays_at_fixed_rate() {
        let addr = Address::from_label("liquidator");
        let vault = Address::from_label("vault");
        let stable = stable_with_reserve(addr, 10_000);

        // 2 stable per 1 underlying.
        let liq = FixedRateLiquidator::new(addr, stable.clone(), vault, 2, 1);
        let proceeds = liq.liquidate(1_500).unwrap();

        assert_eq!(proceeds, 3_000);
        assert_eq!(stable.balance_of(vault), 3_000);
        assert_eq!(stable.balance_of(addr), 7_000);
    }

    #[test]
    fn liquidate_floors_fractional_proceeds() {
        let addr = Address::from_label("liquidator");
        let vault = Address::from_label("vault");
        let stable = stable_with_reserve(addr, 10_000);

        // 1 stable per 3 underlying; 10 / 3 floors to 3.
        let liq = FixedRateLiquidator::new(addr, stable, vault, 1, 3);
        assert_eq!(liq.liquidate(10).unwrap(), 3);
    }

    #[test]
    fn liquidate_zero_is_a_noop() {
        let addr = Address::from_label("liquidator");
        let vault = Address::from_label("vault");
        let stable = stable_with_reserve(addr, 100);

        let liq = FixedRateLiquidator::new(addr, stable.clone(), vault, 1, 1);
        assert_eq!(liq.liquidate(0).unwrap(), 0);
        assert_eq!(stable.balance_of(vault), 0);
    }

    #[test]
    fn liquidate_fails_when_reserve_short() {
        let addr = Address::from_label("liquidator");
        let vault = Address::from_label("vault");
        let stable = stable_with_reserve(addr, 100);

        let liq = FixedRateLiquidator::new(addr, stable.clone(), vault, 1, 1);
        let result = liq.liquidate(500);

        assert!(matches!(
            result,
            Err(LiquidatorError::ReserveShort {
                reserve: 100,
                proceeds: 500
            })
        ));
        // Nothing paid out.
        assert_eq!(stable.balance_of(vault), 0);
        assert_eq!(stable.balance_of(addr), 100);
    }

    #[test]
    #[should_panic(expected = "rate denominator")]
    fn zero_denominator_rejected() {
        let addr = Address::from_label("liquidator");
        let stable = stable_with_reserve(addr, 0);
        FixedRateLiquidator::new(addr, stable, Address::from_label("vault"), 1, 0);
    }
}
