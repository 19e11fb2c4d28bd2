//! # Addresses & Fungible Token Ledger
//!
//! The vault, the bridge connector, and the bridge endpoint all move value
//! through the same primitive: an in-memory fungible token ledger with
//! standard `balance_of` / `transfer` / `transfer_from` / `approve`
//! semantics and a minter-gated `mint` / `burn` pair.
//!
//! Two identity types live here as well:
//!
//! - [`Address`] — a 20-byte account or contract identity on the home
//!   chain, rendered as `0x…` hex.
//! - [`RemoteAddress`] — a 32-byte recipient identity on the counterpart
//!   chain, as the bridge wire format expects it.
//!
//! ## Sharing Model
//!
//! A [`Token`] is plain mutable state. Components that need concurrent
//! handles to the same ledger (vault, connector, bridge, tests) hold a
//! [`SharedToken`] — a cloneable `Arc<parking_lot::RwLock<Token>>` wrapper
//! exposing the same operations. Every operation takes and releases the
//! lock within the call, so the serialized-transaction execution model
//! holds: no operation observes another mid-flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token ledger operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Attempted to move more than the holder's balance.
    #[error("insufficient {symbol} balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Ticker symbol of the token.
        symbol: String,
        /// The holder's current balance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// A `transfer_from` exceeded the spender's approved allowance.
    #[error(
        "insufficient {symbol} allowance for {spender}: approved {approved}, requested {requested}"
    )]
    InsufficientAllowance {
        /// Ticker symbol of the token.
        symbol: String,
        /// The spender whose allowance was checked.
        spender: Address,
        /// The currently approved amount.
        approved: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// A mint or burn was attempted by anyone other than the configured minter.
    #[error("{caller} is not the minter of {symbol}")]
    NotMinter {
        /// Ticker symbol of the token.
        symbol: String,
        /// The unauthorized caller.
        caller: Address,
    },

    /// A credit would overflow the supply or a holder balance.
    #[error("{symbol} balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// Ticker symbol of the token.
        symbol: String,
        /// The value before the failed credit.
        current: u128,
        /// The credit that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or contract identity on the home chain.
///
/// Rendered as `0x`-prefixed lowercase hex. The all-zero address is the
/// conventional "unset" value — the vault's `Configurated` event carries it
/// for configuration slots that were cleared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address, used for unset configuration slots.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a short label.
    ///
    /// The label's UTF-8 bytes fill the address from the left, truncated or
    /// zero-padded to 20 bytes. Intended for wiring up in-memory deployments
    /// and tests where readable, stable identities matter more than entropy.
    pub fn from_label(label: &str) -> Self {
        let mut bytes = [0u8; 20];
        for (dst, src) in bytes.iter_mut().zip(label.as_bytes()) {
            *dst = *src;
        }
        Self(bytes)
    }

    /// Returns the raw 20-byte identity.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the `0x`-prefixed hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a `0x`-prefixed (or bare) hex address.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns `true` for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RemoteAddress
// ---------------------------------------------------------------------------

/// A 32-byte recipient identity on the counterpart chain.
///
/// The bridge wire format carries recipients as opaque 32-byte values; the
/// home chain never interprets them beyond equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteAddress([u8; 32]);

impl RemoteAddress {
    /// The all-zero remote address, used for unset configuration slots.
    pub const ZERO: RemoteAddress = RemoteAddress([0u8; 32]);

    /// Creates a remote address from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identity.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the `0x`-prefixed hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a `0x`-prefixed (or bare) hex remote address.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Returns `true` for the all-zero remote address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteAddress({}...)", &self.to_hex()[..14])
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for RemoteAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RemoteAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RemoteAddress::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// An in-memory fungible token ledger.
///
/// All amounts are `u128` in the token's smallest denomination; `decimals`
/// describes the token's native precision and is what the bridge connector
/// queries before normalizing. Supply changes go exclusively through the
/// minter-gated [`mint`](Token::mint) / [`burn`](Token::burn) pair — for the
/// wrapped token, the vault is wired in as the sole minter at deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    /// The token's contract identity, carried in bridge transfer events.
    address: Address,

    /// Human-readable token name.
    name: String,

    /// Ticker symbol, used in error messages and logs.
    symbol: String,

    /// Native decimal precision.
    decimals: u8,

    /// Current total supply in smallest units.
    total_supply: u128,

    /// The only address permitted to mint and burn. `None` disables both.
    minter: Option<Address>,

    /// Holder balances.
    balances: HashMap<Address, u128>,

    /// Approved allowances: owner → spender → amount.
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl Token {
    /// Creates an empty ledger with no minter configured.
    pub fn new(address: Address, name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply: 0,
            minter: None,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Returns the token's contract identity.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the native decimal precision.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Returns the current total supply.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Sets the sole minter. Deployment-time wiring: the vault becomes the
    /// minter of the wrapped token right after construction.
    pub fn set_minter(&mut self, minter: Address) {
        self.minter = Some(minter);
    }

    /// Returns a holder's balance (zero for unknown holders).
    pub fn balance_of(&self, who: Address) -> u128 {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    /// Returns the approved allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&owner)
            .and_then(|m| m.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    /// Approves `spender` to move up to `amount` of `owner`'s balance.
    /// Overwrites any previous approval.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.allowances.entry(owner).or_default().insert(spender, amount);
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. The allowance check happens before the balance check, so a
    /// short approval surfaces as [`TokenError::InsufficientAllowance`] even
    /// when the balance is also short.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(from, spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                symbol: self.symbol.clone(),
                spender,
                approved,
                requested: amount,
            });
        }

        self.debit(from, amount)?;
        self.credit(to, amount)?;

        // Only consume the allowance once both legs have succeeded.
        if let Some(m) = self.allowances.get_mut(&from) {
            if let Some(a) = m.get_mut(&spender) {
                *a -= amount;
            }
        }
        Ok(())
    }

    /// Mints `amount` new units to `to`. Minter only.
    ///
    /// # Errors
    ///
    /// [`TokenError::NotMinter`] if `caller` is not the configured minter,
    /// [`TokenError::Overflow`] if the supply would exceed `u128::MAX`.
    pub fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.require_minter(caller)?;

        let new_supply =
            self.total_supply
                .checked_add(amount)
                .ok_or_else(|| TokenError::Overflow {
                    symbol: self.symbol.clone(),
                    current: self.total_supply,
                    credit: amount,
                })?;
        self.credit(to, amount)?;
        self.total_supply = new_supply;
        Ok(())
    }

    /// Burns `amount` units from `from`. Minter only.
    ///
    /// # Errors
    ///
    /// [`TokenError::NotMinter`] if `caller` is not the configured minter,
    /// [`TokenError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn burn(&mut self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        self.require_minter(caller)?;
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    fn require_minter(&self, caller: Address) -> Result<(), TokenError> {
        if self.minter != Some(caller) {
            return Err(TokenError::NotMinter {
                symbol: self.symbol.clone(),
                caller,
            });
        }
        Ok(())
    }

    fn debit(&mut self, from: Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                symbol: self.symbol.clone(),
                available,
                requested: amount,
            });
        }
        self.balances.insert(from, available - amount);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: u128) -> Result<(), TokenError> {
        let current = self.balance_of(to);
        let next = current.checked_add(amount).ok_or_else(|| TokenError::Overflow {
            symbol: self.symbol.clone(),
            current,
            credit: amount,
        })?;
        self.balances.insert(to, next);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SharedToken
// ---------------------------------------------------------------------------

/// A cloneable handle to a [`Token`] shared between components.
///
/// The vault, the connector, the bridge endpoint, and the tests all hold
/// clones of the same handle. Each operation acquires the lock for the
/// duration of a single ledger mutation, matching the serialized execution
/// model: there are no suspension points inside an operation.
#[derive(Clone)]
pub struct SharedToken {
    inner: Arc<RwLock<Token>>,
}

impl SharedToken {
    /// Wraps a ledger in a shared handle.
    pub fn new(token: Token) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    /// Returns the token's contract identity.
    pub fn address(&self) -> Address {
        self.inner.read().address()
    }

    /// Returns the ticker symbol.
    pub fn symbol(&self) -> String {
        self.inner.read().symbol().to_string()
    }

    /// Returns the native decimal precision.
    pub fn decimals(&self) -> u8 {
        self.inner.read().decimals()
    }

    /// Returns the current total supply.
    pub fn total_supply(&self) -> u128 {
        self.inner.read().total_supply()
    }

    /// Sets the sole minter.
    pub fn set_minter(&self, minter: Address) {
        self.inner.write().set_minter(minter)
    }

    /// Returns a holder's balance.
    pub fn balance_of(&self, who: Address) -> u128 {
        self.inner.read().balance_of(who)
    }

    /// Returns the approved allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.inner.read().allowance(owner, spender)
    }

    /// Approves `spender` to move up to `amount` of `owner`'s balance.
    pub fn approve(&self, owner: Address, spender: Address, amount: u128) {
        self.inner.write().approve(owner, spender, amount)
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.inner.write().transfer(from, to, amount)
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`.
    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.inner.write().transfer_from(spender, from, to, amount)
    }

    /// Mints `amount` to `to`. Minter only.
    pub fn mint(&self, caller: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        self.inner.write().mint(caller, to, amount)
    }

    /// Burns `amount` from `from`. Minter only.
    pub fn burn(&self, caller: Address, from: Address, amount: u128) -> Result<(), TokenError> {
        self.inner.write().burn(caller, from, amount)
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.inner.read();
        write!(f, "SharedToken({} @ {})", t.symbol(), t.address())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
