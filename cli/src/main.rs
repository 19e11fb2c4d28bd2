// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tidegate Harness
//!
//! Entry point for the `tidegate` binary. Parses CLI arguments, initializes
//! logging, and drives a complete in-memory deployment of the custody
//! stack through its lifecycle.
//!
//! The binary supports three subcommands:
//!
//! - `demo`      — run the full custody lifecycle and print the event log
//! - `normalize` — show the bridge truncation of an amount
//! - `version`   — print build version information

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use tidegate_protocol::bridge::InMemoryBridge;
use tidegate_protocol::connector::TokenBridgeConnector;
use tidegate_protocol::liquidator::FixedRateLiquidator;
use tidegate_protocol::normalize::bridge_amount;
use tidegate_protocol::token::{Address, RemoteAddress, SharedToken, Token};
use tidegate_protocol::vault::Vault;

use cli::{Commands, TidegateCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = TidegateCli::parse();

    match cli.command {
        Commands::Demo(args) => run_demo(args),
        Commands::Normalize(args) => {
            let truncated = bridge_amount(u128::from(args.amount), args.decimals);
            println!("{} -> {}", args.amount, truncated);
            Ok(())
        }
        Commands::Version => {
            println!("tidegate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Walks the whole custody lifecycle: deposit, bridge return, withdrawal,
/// yield accrual, liquidation. The vault's event log goes to stdout as
/// JSON; progress goes to stderr via tracing.
fn run_demo(args: cli::DemoArgs) -> Result<()> {
    logging::init_logging(
        "tidegate=info,tidegate_protocol=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let amount = u128::from(args.amount);
    let accrued_yield = u128::from(args.accrued_yield);

    let admin = Address::from_label("admin");
    let liquidations_admin = Address::from_label("liq-admin");
    let user = Address::from_label("user");
    let vault_addr = Address::from_label("vault");
    let faucet = Address::from_label("faucet");

    // --- Token deployment ---
    let mut underlying = Token::new(Address::from_label("token:stk"), "Staked Token", "STK", 18);
    underlying.set_minter(faucet);
    underlying.mint(faucet, user, amount.saturating_mul(2))?;
    let underlying = SharedToken::new(underlying);

    let mut wrapped = Token::new(
        Address::from_label("token:wstk"),
        "Wrapped Staked Token",
        "wSTK",
        18,
    );
    wrapped.set_minter(vault_addr);
    let wrapped = SharedToken::new(wrapped);

    let mut stable = Token::new(Address::from_label("token:stb"), "Stable", "STB", 18);
    stable.set_minter(faucet);
    let stable = SharedToken::new(stable);

    // --- Bridge, connector, liquidation strategy ---
    let bridge = Arc::new(InMemoryBridge::new(Address::from_label("bridge")));
    let connector = Arc::new(TokenBridgeConnector::new(
        Address::from_label("connector"),
        bridge.clone(),
        wrapped.clone(),
        stable.clone(),
    ));
    let liquidator_addr = Address::from_label("liquidator");
    let liquidator = Arc::new(FixedRateLiquidator::new(
        liquidator_addr,
        stable.clone(),
        vault_addr,
        1,
        1,
    ));
    stable.mint(faucet, liquidator_addr, accrued_yield.saturating_mul(2))?;

    // --- Vault wiring ---
    let mut vault = Vault::new(
        vault_addr,
        underlying.clone(),
        wrapped.clone(),
        stable.clone(),
        admin,
    );
    vault.configure(admin, Some(connector), Some(liquidator), liquidations_admin)?;
    let destination = RemoteAddress::from_bytes([0x42; 32]);
    vault.set_rewards_distributor(admin, destination)?;

    // --- Deposit, forwarded across the bridge ---
    underlying.approve(user, vault_addr, amount);
    let transfer = vault.submit(user, amount, destination, b"")?;
    tracing::info!(
        id = %transfer.id,
        wire_amount = transfer.amount,
        recipient_chain = transfer.recipient_chain,
        "deposit forwarded"
    );

    // --- Return path and withdrawal ---
    bridge.release(&wrapped, user, amount)?;
    vault.withdraw(user, amount)?;
    tracing::info!(
        user_balance = underlying.balance_of(user),
        "round trip complete"
    );

    // --- Yield accrual and liquidation ---
    underlying.transfer(user, vault_addr, accrued_yield)?;
    let (liquidated, dispatched) = vault.collect_rewards(liquidations_admin)?;
    tracing::info!(liquidated, dispatched, "rewards collected");

    println!("{}", serde_json::to_string_pretty(vault.events())?);
    Ok(())
}
