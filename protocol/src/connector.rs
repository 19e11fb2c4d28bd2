//! # Bridge Connector
//!
//! The connector is the adapter between the vault's accounting world and
//! the bridge's wire format. Given an asset and a raw amount in the asset's
//! native precision, it:
//!
//! 1. queries the asset's native decimals,
//! 2. truncates the amount to the bridge's precision
//!    ([`crate::normalize::adjust_amount`]),
//! 3. moves custody of the full raw amount from the caller to the bridge,
//! 4. invokes the bridge send primitive with the deployment's fixed wire
//!    fields (`recipient_chain = 3`, `arbiter_fee = 0`, `nonce = 0`) and
//!    the normalized amount.
//!
//! Connectors are immutable after construction and retain no balances
//! between calls. Swapping bridge networks means deploying a new connector
//! and rotating it in through the vault's `configure` — which is why the
//! vault only ever sees the [`BridgeConnector`] trait.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bridge::{BridgeEndpoint, BridgeError, BridgeTransfer};
use crate::config;
use crate::normalize::adjust_amount;
use crate::token::{Address, RemoteAddress, SharedToken, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while forwarding an asset to the bridge.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Pulling the forwarded amount from the caller failed — balance or
    /// allowance was short. No partial forwarding: nothing moved.
    #[error("connector custody pull failed: {0}")]
    Custody(#[from] TokenError),

    /// The bridge send primitive rejected the transfer. Custody has been
    /// returned to the caller.
    #[error("bridge send rejected: {0}")]
    Bridge(#[from] BridgeError),
}

// ---------------------------------------------------------------------------
// BridgeConnector
// ---------------------------------------------------------------------------

/// Capability set the vault requires from any connector implementation.
///
/// Two named entry points, each fixed to one of the two supported assets.
/// `from` is the account the forwarded amount is pulled from; the caller
/// must have approved the connector for at least that amount beforehand.
pub trait BridgeConnector: Send + Sync {
    /// The connector's own identity, carried in configuration events.
    fn address(&self) -> Address;

    /// Forwards the wrapped staking-derivative asset.
    fn forward_wrapped(
        &self,
        from: Address,
        amount: u128,
        recipient: RemoteAddress,
        extra: &[u8],
    ) -> Result<BridgeTransfer, ConnectorError>;

    /// Forwards the secondary (stable) asset.
    fn forward_stable(
        &self,
        from: Address,
        amount: u128,
        recipient: RemoteAddress,
        extra: &[u8],
    ) -> Result<BridgeTransfer, ConnectorError>;
}

// ---------------------------------------------------------------------------
// TokenBridgeConnector
// ---------------------------------------------------------------------------

/// Connector implementation over a token-bridge style endpoint.
///
/// Holds the two forwardable assets and the bridge endpoint; stateless
/// otherwise. The target precision defaults to the deployment's
/// [`config::BRIDGE_MAX_DECIMALS`] but is a constructor parameter, since
/// nothing about the truncation formula is specific to 8 decimals.
pub struct TokenBridgeConnector {
    address: Address,
    bridge: Arc<dyn BridgeEndpoint>,
    wrapped: SharedToken,
    stable: SharedToken,
    target_decimals: u8,
}

impl TokenBridgeConnector {
    /// Creates a connector forwarding to `bridge` at the default bridge
    /// precision.
    pub fn new(
        address: Address,
        bridge: Arc<dyn BridgeEndpoint>,
        wrapped: SharedToken,
        stable: SharedToken,
    ) -> Self {
        Self::with_target_decimals(address, bridge, wrapped, stable, config::BRIDGE_MAX_DECIMALS)
    }

    /// Creates a connector with an explicit target precision.
    pub fn with_target_decimals(
        address: Address,
        bridge: Arc<dyn BridgeEndpoint>,
        wrapped: SharedToken,
        stable: SharedToken,
        target_decimals: u8,
    ) -> Self {
        Self {
            address,
            bridge,
            wrapped,
            stable,
            target_decimals,
        }
    }

    /// Both named entry points funnel through here.
    fn forward(
        &self,
        token: &SharedToken,
        from: Address,
        amount: u128,
        recipient: RemoteAddress,
        extra: &[u8],
    ) -> Result<BridgeTransfer, ConnectorError> {
        let native_decimals = token.decimals();
        let wire_amount = adjust_amount(amount, native_decimals, self.target_decimals);

        // Custody first: pull the full raw amount from the caller straight
        // into bridge custody. Fails atomically on short balance/allowance.
        token.transfer_from(self.address, from, self.bridge.address(), amount)?;

        match self.bridge.send(
            token,
            wire_amount,
            config::RECIPIENT_CHAIN_ID,
            recipient,
            config::ARBITER_FEE,
            config::TRANSFER_NONCE,
        ) {
            Ok(transfer) => {
                info!(
                    token = %token.address(),
                    symbol = %token.symbol(),
                    raw_amount = amount,
                    wire_amount,
                    recipient = %recipient,
                    extra_len = extra.len(),
                    "forwarded asset to bridge"
                );
                Ok(transfer)
            }
            Err(e) => {
                // The bridge refused the send: unwind the custody transfer
                // so the caller is left exactly as before the call.
                let _ = token.transfer(self.bridge.address(), from, amount);
                Err(ConnectorError::Bridge(e))
            }
        }
    }
}

impl BridgeConnector for TokenBridgeConnector {
    fn address(&self) -> Address {
        self.address
    }

    fn forward_wrapped(
        &self,
        from: Address,
        amount: u128,
        recipient: RemoteAddress,
        extra: &[u8],
    ) -> Result<BridgeTransfer, ConnectorError> {
        let wrapped = self.wrapped.clone();
        self.forward(&wrapped, from, amount, recipient, extra)
    }

    fn forward_stable(
        &self,
        from: Address,
        amount: u128,
        recipient: RemoteAddress,
        extra: &[u8],
    ) -> Result<BridgeTransfer, ConnectorError> {
        let stable = self.stable.clone();
        self.forward(&stable, from, amount, recipient, extra)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
