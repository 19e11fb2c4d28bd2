// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tidegate — Core Library
//!
//! Tidegate is a custodial vault for a yield-bearing staking token: deposit
//! the underlying, get a wrapped 1:1 representation delivered across a
//! token bridge to a counterpart chain, and withdraw the underlying back by
//! burning the wrapped claim. Accrued staking yield is periodically
//! liquidated into a stable asset and shipped to a rewards distributor on
//! the far side.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual custody
//! boundaries of the system:
//!
//! - **token** — Account-keyed ledgers: balances, allowances, gated supply.
//! - **vault** — The custodial core: deposits, withdrawals, governance,
//!   rewards liquidation.
//! - **connector** — The adapter between vault accounting and the bridge's
//!   wire format. Swappable, so the bridge network is too.
//! - **bridge** — The external bridge endpoint behind one narrow trait.
//! - **liquidator** — Pluggable strategy turning accrued yield into the
//!   stable asset.
//! - **normalize** — Decimal truncation to the bridge's wire precision.
//! - **config** — Deployment constants and wire parameters.
//!
//! ## Design Philosophy
//!
//! 1. Every entry point commits fully or leaves every ledger untouched.
//! 2. Nobody withdraws more underlying than the wrapped claim they burn.
//! 3. If it touches balances, it has tests. Plural.

pub mod bridge;
pub mod config;
pub mod connector;
pub mod liquidator;
pub mod normalize;
pub mod token;
pub mod vault;

pub use bridge::{BridgeEndpoint, BridgeTransfer, InMemoryBridge};
pub use connector::{BridgeConnector, TokenBridgeConnector};
pub use liquidator::{FixedRateLiquidator, RewardsLiquidator};
pub use token::{Address, RemoteAddress, SharedToken, Token};
pub use vault::{Vault, VaultError, VaultEvent};
