//! Benchmark suite for the balance engine under contention
//!
//! Compares uncontended `apply` calls with calls that race other threads on
//! the same account, for both stores.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

use std::sync::Arc;
use std::thread;
use wallet_engine::core::{BalanceEngine, InMemoryStore, RetryPolicy};
use wallet_engine::{Account, AccountId, Amount, SqliteStore};

fn main() {
    divan::main();
}

const OPERATIONS: u64 = 1_000;

fn memory_engine(accounts: &[AccountId]) -> BalanceEngine {
    let store = InMemoryStore::with_accounts(accounts.iter().map(|&id| Account::new(id, 0)))
        .expect("Failed to seed store");
    BalanceEngine::with_policy(Arc::new(store), RetryPolicy::immediate(u32::MAX))
}

/// Spread `OPERATIONS` deposits over `threads` workers, one account per
/// worker when `shared` is false
fn run_deposits(threads: usize, shared: bool) {
    let accounts: Vec<AccountId> = (0..threads).map(|_| AccountId::new()).collect();
    let engine = memory_engine(&accounts);
    let amount = Amount::new(1).expect("non-zero amount");
    let per_thread = OPERATIONS / threads as u64;

    thread::scope(|scope| {
        for worker in 0..threads {
            let id = if shared { accounts[0] } else { accounts[worker] };
            let engine = &engine;
            scope.spawn(move || {
                for _ in 0..per_thread {
                    engine.deposit(id, amount).expect("Deposit failed");
                }
            });
        }
    });
}

/// Sequential deposits on a single in-memory account
#[divan::bench]
fn memory_uncontended() {
    run_deposits(1, true);
}

/// Deposits spread over independent accounts
#[divan::bench(args = [2, 4, 8])]
fn memory_independent_accounts(threads: usize) {
    run_deposits(threads, false);
}

/// Deposits racing on one account
#[divan::bench(args = [2, 4, 8])]
fn memory_shared_account(threads: usize) {
    run_deposits(threads, true);
}

/// Sequential deposits through an in-memory SQLite store
#[divan::bench(sample_count = 10)]
fn sqlite_uncontended() {
    let id = AccountId::new();
    let store = SqliteStore::in_memory().expect("Failed to open database");
    wallet_engine::core::AccountStore::create(&store, Account::new(id, 0))
        .expect("Failed to seed store");
    let engine = BalanceEngine::new(Arc::new(store));
    let amount = Amount::new(1).expect("non-zero amount");

    for _ in 0..OPERATIONS {
        engine.deposit(id, amount).expect("Deposit failed");
    }
}
