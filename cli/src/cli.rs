//! # CLI Interface
//!
//! Defines the command-line argument structure for the `tidegate` binary
//! using `clap` derive. Supports three subcommands: `demo`, `normalize`,
//! and `version`.

use clap::{Parser, Subcommand};

/// Tidegate vault harness.
///
/// Drives a complete in-memory deployment of the Tidegate custody stack:
/// tokens, bridge endpoint, connector, liquidation strategy, and vault.
/// Useful for demonstrating the custody lifecycle and for inspecting the
/// event and transfer logs a deployment produces.
#[derive(Parser, Debug)]
#[command(
    name = "tidegate",
    about = "Tidegate vault command-line harness",
    version,
    propagate_version = true
)]
pub struct TidegateCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `tidegate` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full custody lifecycle against an in-memory deployment and
    /// print the resulting event log as JSON.
    Demo(DemoArgs),
    /// Truncate an amount to the bridge's wire precision and print both
    /// values.
    Normalize(NormalizeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Deposit amount in the underlying token's smallest units.
    #[arg(long, env = "TIDEGATE_AMOUNT", default_value_t = 1_000_000_000_000_000_000)]
    pub amount: u64,

    /// Simulated staking yield accrued before the liquidation round, in
    /// smallest units.
    #[arg(long, env = "TIDEGATE_YIELD", default_value_t = 10_000_000_000_000_000)]
    pub accrued_yield: u64,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "TIDEGATE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `normalize` subcommand.
#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    /// The amount to truncate, in smallest units.
    pub amount: u64,

    /// The token's native decimal count.
    #[arg(long, default_value_t = 18)]
    pub decimals: u8,
}
