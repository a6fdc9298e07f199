//! Core business logic module
//!
//! This module contains the balance mutation components:
//! - `traits` - Store abstractions the engine depends on
//! - `engine` - Optimistic-concurrency balance engine
//! - `retry` - Conflict retry policy
//! - `dispatcher` - Operation dispatch and outcome classification
//! - `memory_store` - Concurrent in-memory store
//! - `sqlite_store` - SQLite-backed store

pub mod dispatcher;
pub mod engine;
pub mod memory_store;
pub mod retry;
pub mod sqlite_store;
pub mod traits;

pub use dispatcher::{DispatchConfig, DispatchResult, Dispatcher, OutcomeStatus, ProcessingReport};
pub use engine::{next_balance, Applied, BalanceEngine};
pub use memory_store::InMemoryStore;
pub use retry::{RetryPolicy, MAX_RETRIES};
pub use sqlite_store::SqliteStore;
pub use traits::{AccountStore, CommitOutcome, LedgerStore, UnitOfWork};
