//! Wallet Engine Library
//! # Overview
//!
//! This library applies deposits and withdrawals to wallet balances that may be
//! modified concurrently by many callers. Every operation follows the same
//! optimistic cycle: read the account and its version, validate, compute the
//! new balance, then commit the balance update together with a ledger entry,
//! conditional on the version being unchanged. Conflicting commits are retried
//! a bounded number of times.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Version, OperationRequest, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Read, validate, compute, commit, retry
//!   - [`core::retry`] - Attempt limit and backoff between attempts
//!   - [`core::traits`] - Store contracts with atomic conditional commit
//!   - [`core::memory_store`] - In-process store
//!   - [`core::sqlite_store`] - Persistent store shared between processes
//!   - [`core::dispatcher`] - Caller-facing outcome translation
//! - [`io`] - CSV readers and writers
//! - [`strategy`] - Sequential and concurrent processing pipelines
//! - [`logging`] - Tracing subscriber setup
//!
//! # Guarantees
//!
//! - No lost updates: concurrent operations on one account serialize through
//!   the version check.
//! - No negative balances: withdrawals are validated against the state they
//!   commit over.
//! - Balance and ledger never diverge: they are written in one atomic commit.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{BalanceEngine, Dispatcher, InMemoryStore, RetryPolicy, SqliteStore};
pub use types::{
    Account, AccountId, Amount, OperationKind, OperationRecord, OperationRequest, StoreError,
    Version, WalletError,
};
