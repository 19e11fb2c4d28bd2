//! # External Bridge Endpoint
//!
//! The bridge network itself is out of scope — consensus, guardians, and
//! message relay all live on the other side of one narrow interface: a
//! `send` primitive that emits a transfer record with the six wire fields
//! `(token, amount, recipient_chain, recipient, arbiter_fee, nonce)`.
//!
//! Custody is the caller's job: the connector moves the forwarded tokens
//! into the bridge's custody account *before* invoking `send`, and `send`
//! refuses to record a transfer its custody balance cannot cover.
//!
//! [`BridgeEndpoint`] is the interface. [`InMemoryBridge`] is the concrete
//! endpoint used by in-process deployments and tests: it appends every
//! transfer to an ordered log and offers a
//! [`release`](InMemoryBridge::release) helper that plays the counterpart
//! chain's return path (delivering wrapped tokens back to a local holder).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::token::{Address, RemoteAddress, SharedToken, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur at the bridge endpoint.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A `send` was invoked without enough tokens in bridge custody to
    /// cover it. The caller skipped or shorted the custody transfer.
    #[error("bridge custody shortfall for {token}: held {held}, sending {sending}")]
    CustodyShortfall {
        /// Contract identity of the token.
        token: Address,
        /// Tokens currently held in custody.
        held: u128,
        /// The amount the send tried to record.
        sending: u128,
    },

    /// A custody release on the return path failed.
    #[error("bridge release failed: {0}")]
    Release(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Transfer Record
// ---------------------------------------------------------------------------

/// The record emitted for every accepted bridge transfer.
///
/// Carries exactly the six wire fields of the send primitive, plus a
/// receipt id and timestamp for local bookkeeping. One record per send,
/// appended in acceptance order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeTransfer {
    /// Receipt identifier, unique per accepted send.
    pub id: Uuid,

    /// Contract identity of the forwarded token.
    pub token: Address,

    /// Forwarded amount, already normalized to the bridge's precision.
    pub amount: u128,

    /// Counterpart chain identifier.
    pub recipient_chain: u16,

    /// Recipient on the counterpart chain.
    pub recipient: RemoteAddress,

    /// Arbiter fee wire field.
    pub arbiter_fee: u128,

    /// Nonce wire field.
    pub nonce: u32,

    /// When the bridge accepted the transfer (UTC).
    pub sent_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// BridgeEndpoint
// ---------------------------------------------------------------------------

/// The bridge's send primitive, as the connector consumes it.
///
/// An implementation either fully accepts a send — exactly one transfer
/// record — or rejects it leaving every ledger untouched. Custody of the
/// forwarded amount must already sit at [`address`](BridgeEndpoint::address)
/// when `send` is invoked.
pub trait BridgeEndpoint: Send + Sync {
    /// The bridge's custody account on the home chain.
    fn address(&self) -> Address;

    /// Records a transfer of `amount` of `token` to `recipient` on
    /// `recipient_chain`.
    fn send(
        &self,
        token: &SharedToken,
        amount: u128,
        recipient_chain: u16,
        recipient: RemoteAddress,
        arbiter_fee: u128,
        nonce: u32,
    ) -> Result<BridgeTransfer, BridgeError>;
}

// ---------------------------------------------------------------------------
// InMemoryBridge
// ---------------------------------------------------------------------------

/// In-process bridge endpoint with a custody account and an ordered
/// transfer log.
///
/// The log is append-only; tests assert on it to verify that exactly one
/// transfer record exists per forward and that the wire fields match the
/// deployment constants.
pub struct InMemoryBridge {
    /// Custody account holding forwarded tokens.
    address: Address,

    /// Every accepted transfer, in order.
    transfers: Mutex<Vec<BridgeTransfer>>,

    /// Net amount in flight per token: accepted sends minus releases.
    outstanding: Mutex<HashMap<Address, u128>>,
}

impl InMemoryBridge {
    /// Creates a bridge endpoint with the given custody account.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            transfers: Mutex::new(Vec::new()),
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a snapshot of all accepted transfers, in acceptance order.
    pub fn transfers(&self) -> Vec<BridgeTransfer> {
        self.transfers.lock().clone()
    }

    /// Returns the most recent accepted transfer, if any.
    pub fn last_transfer(&self) -> Option<BridgeTransfer> {
        self.transfers.lock().last().cloned()
    }

    /// Plays the counterpart chain's return path: moves `amount` of `token`
    /// out of bridge custody to a local holder.
    ///
    /// The real network mints the wrapped representation on the other chain
    /// and burns it on the way back; in-process, custody release is the
    /// observable equivalent.
    pub fn release(
        &self,
        token: &SharedToken,
        to: Address,
        amount: u128,
    ) -> Result<(), BridgeError> {
        token.transfer(self.address, to, amount)?;
        let mut outstanding = self.outstanding.lock();
        let entry = outstanding.entry(token.address()).or_insert(0);
        *entry = entry.saturating_sub(amount);
        Ok(())
    }
}

impl BridgeEndpoint for InMemoryBridge {
    fn address(&self) -> Address {
        self.address
    }

    fn send(
        &self,
        token: &SharedToken,
        amount: u128,
        recipient_chain: u16,
        recipient: RemoteAddress,
        arbiter_fee: u128,
        nonce: u32,
    ) -> Result<BridgeTransfer, BridgeError> {
        // Custody must already be in place; in-flight sends may not exceed
        // what the custody account actually holds.
        let held = token.balance_of(self.address);
        let mut outstanding = self.outstanding.lock();
        let in_flight = outstanding.get(&token.address()).copied().unwrap_or(0);
        if held < in_flight.saturating_add(amount) {
            return Err(BridgeError::CustodyShortfall {
                token: token.address(),
                held,
                sending: amount,
            });
        }
        outstanding.insert(token.address(), in_flight + amount);
        drop(outstanding);

        let transfer = BridgeTransfer {
            id: Uuid::new_v4(),
            token: token.address(),
            amount,
            recipient_chain,
            recipient,
            arbiter_fee,
            nonce,
            sent_at: Utc::now(),
        };

        tracing::debug!(
            token = %transfer.token,
            amount = transfer.amount,
            recipient_chain = transfer.recipient_chain,
            recipient = %transfer.recipient,
            "bridge transfer accepted"
        );

        self.transfers.lock().push(transfer.clone());
        Ok(transfer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
