use crate::core::{DispatchConfig, RetryPolicy, MAX_RETRIES};
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Apply deposits and withdrawals to wallet balances under optimistic concurrency control
#[derive(Parser, Debug)]
#[command(name = "wallet-engine")]
#[command(about = "Apply wallet deposits and withdrawals with optimistic concurrency control", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "OPERATIONS", help = "Path to the operations CSV file")]
    pub operations_file: PathBuf,

    /// Seed CSV with the initial accounts
    #[arg(
        long = "accounts",
        value_name = "CSV",
        help = "Path to the account seed CSV file (account,balance)"
    )]
    pub accounts_file: PathBuf,

    /// Processing strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrently executing operations (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of operations executing concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Balance store backend
    #[arg(
        long = "store",
        value_name = "STORE",
        default_value = "memory",
        help = "Balance store: 'memory' or 'sqlite'"
    )]
    pub store: StoreType,

    /// SQLite database file
    #[arg(
        long = "database",
        value_name = "PATH",
        required_if_eq("store", "sqlite"),
        help = "SQLite database path (required with --store sqlite)"
    )]
    pub database: Option<PathBuf>,

    /// Attempts per operation before giving up with a conflict error
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        default_value_t = MAX_RETRIES,
        help = "Read-validate-commit attempts per operation"
    )]
    pub max_attempts: u32,

    /// Base backoff between attempts in milliseconds
    #[arg(
        long = "backoff-ms",
        value_name = "MS",
        default_value_t = 0,
        help = "Base retry backoff in milliseconds (0 retries immediately)"
    )]
    pub backoff_ms: u64,

    /// Resubmissions of operations that exhausted their attempts
    #[arg(
        long = "resubmit",
        value_name = "COUNT",
        default_value_t = 0,
        help = "Times the dispatcher resubmits an operation rejected for contention"
    )]
    pub resubmit: u32,

    /// Optional ledger export path
    #[arg(
        long = "ledger",
        value_name = "PATH",
        help = "Write the committed ledger to this CSV file"
    )]
    pub ledger_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        env = "WALLET_LOG",
        help = "Log level or filter directive"
    )]
    pub log_level: String,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Available balance stores
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    Memory,
    Sqlite,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take the defaults, zero values are replaced with the
    /// defaults by [`BatchConfig::new`].
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }

    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            resubmit: self.resubmit,
        }
    }
}
