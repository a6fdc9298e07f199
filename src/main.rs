//! Wallet Engine CLI
//!
//! Command-line interface for applying wallet operations from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv operations.csv > balances.csv
//! cargo run -- --accounts accounts.csv --strategy sync operations.csv > balances.csv
//! cargo run -- --accounts accounts.csv --batch-size 500 --max-concurrent 8 --resubmit 5 operations.csv
//! cargo run -- --accounts accounts.csv --store sqlite --database wallet.db --ledger ledger.csv operations.csv
//! ```
//!
//! Accounts are seeded from the `--accounts` file, every operation is applied
//! through the balance engine with the selected strategy, and the final
//! balances are written to stdout.
//!
//! # Exit Codes
//!
//! - 0: Success (individual operations may still have been rejected)
//! - 1: Error (missing arguments, unreadable files, store failure, etc.)

use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use wallet_engine::cli::{self, CliArgs, StoreType};
use wallet_engine::core::{
    AccountStore, BalanceEngine, Dispatcher, InMemoryStore, LedgerStore, SqliteStore,
};
use wallet_engine::io::{read_accounts, write_balances_csv, write_ledger_csv};
use wallet_engine::logging;
use wallet_engine::strategy;
use wallet_engine::types::{Account, StoreError};

fn main() {
    let args = cli::parse_args();
    logging::init_tracing(&args.log_level);

    if let Err(e) = run(&args) {
        error!(error = %e, "wallet engine failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), String> {
    match args.store {
        StoreType::Memory => execute(args, Arc::new(InMemoryStore::new())),
        StoreType::Sqlite => {
            let path = args
                .database
                .as_deref()
                .ok_or_else(|| "--database is required with --store sqlite".to_string())?;
            let store = SqliteStore::open(path)
                .map_err(|e| format!("Failed to open database '{}': {}", path.display(), e))?;
            execute(args, Arc::new(store))
        }
    }
}

fn execute<S>(args: &CliArgs, store: Arc<S>) -> Result<(), String>
where
    S: AccountStore + LedgerStore + 'static,
{
    let accounts = read_accounts(&args.accounts_file)?;
    seed(store.as_ref(), accounts).map_err(|e| format!("Failed to seed accounts: {}", e))?;

    let engine = Arc::new(BalanceEngine::with_policy(
        store.clone(),
        args.to_retry_policy(),
    ));
    let dispatcher = Dispatcher::new(engine, args.to_dispatch_config());

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let report = strategy.process(&dispatcher, &args.operations_file)?;
    report.log_summary();

    let balances = store
        .accounts()
        .map_err(|e| format!("Failed to read balances: {}", e))?;
    let mut output = std::io::stdout();
    write_balances_csv(&balances, &mut output)?;

    if let Some(path) = &args.ledger_file {
        let entries = store
            .entries()
            .map_err(|e| format!("Failed to read ledger: {}", e))?;
        let file = File::create(path)
            .map_err(|e| format!("Failed to create ledger file '{}': {}", path.display(), e))?;
        write_ledger_csv(&entries, &mut BufWriter::new(file))?;
        info!(entries = entries.len(), path = %path.display(), "ledger exported");
    }

    Ok(())
}

/// Create the seed accounts
///
/// Ids are unique within the seed file (`read_accounts` rejects repeats), so
/// an existing account can only come from an earlier run of a persistent
/// store. Its stored balance wins over the seed value.
fn seed(store: &dyn AccountStore, accounts: Vec<Account>) -> Result<(), StoreError> {
    let mut created = 0;
    let mut existing = 0;
    for account in accounts {
        match store.create(account) {
            Ok(()) => created += 1,
            Err(StoreError::DuplicateAccount { .. }) => existing += 1,
            Err(e) => return Err(e),
        }
    }
    info!(created, existing, "accounts seeded");
    Ok(())
}
