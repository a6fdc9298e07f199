//! Thread-safe in-memory account and ledger store
//!
//! This module provides the `InMemoryStore` struct, which keeps accounts and
//! ledger entries in concurrent maps so that many engines can operate on it
//! from multiple threads.
//!
//! # Design
//!
//! Accounts live in a `DashMap` keyed by account id. A commit holds the
//! account's entry guard while it checks the version, appends the ledger entry
//! and installs the new balance, which makes the three steps one atomic unit.
//! Reads never hold a guard across calls, so the engine's read and commit are
//! separate steps and genuine version races can occur between them.
//!
//! # Lock Ordering
//!
//! The only path that holds two guards at once is `commit` (account, then
//! ledger). Every other method takes a single guard.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::trace;

use super::traits::{AccountStore, CommitOutcome, LedgerStore, UnitOfWork};
use crate::types::{Account, AccountId, OperationRecord, StoreError};

/// In-memory store backed by `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Current account states, sharded for fine-grained locking
    accounts: DashMap<AccountId, Account>,

    /// Per-account ledger entries, each vector in commit order
    ledger: DashMap<AccountId, Vec<OperationRecord>>,

    /// Last assigned commit sequence
    sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self, StoreError> {
        let store = Self::new();
        for account in accounts {
            store.create(account)?;
        }
        Ok(store)
    }
}

impl AccountStore for InMemoryStore {
    fn create(&self, account: Account) -> Result<(), StoreError> {
        let id = account.id;
        let mut inserted = false;
        self.accounts.entry(id).or_insert_with(|| {
            inserted = true;
            account
        });

        if inserted {
            Ok(())
        } else {
            Err(StoreError::DuplicateAccount { account: id })
        }
    }

    fn read(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(id).map(|entry| entry.value().clone()))
    }

    fn commit(&self, unit: UnitOfWork) -> Result<CommitOutcome, StoreError> {
        // Accounts are never deleted, so a missing row can only mean the
        // caller's read is stale; report it as a mismatch and let it re-read.
        let Some(mut account) = self.accounts.get_mut(&unit.account_id) else {
            return Ok(CommitOutcome::VersionMismatch);
        };

        if account.version != unit.expected_version {
            trace!(
                account = %unit.account_id,
                expected = %unit.expected_version,
                stored = %account.version,
                "version mismatch"
            );
            return Ok(CommitOutcome::VersionMismatch);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = unit.entry.committed(sequence);
        self.ledger.entry(unit.account_id).or_default().push(record);

        account.balance = unit.new_balance;
        account.version = unit.new_version;

        Ok(CommitOutcome::Committed(record))
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

impl LedgerStore for InMemoryStore {
    fn entries_for(&self, id: &AccountId) -> Result<Vec<OperationRecord>, StoreError> {
        Ok(self
            .ledger
            .get(id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }

    fn entries(&self) -> Result<Vec<OperationRecord>, StoreError> {
        let mut all: Vec<OperationRecord> = self
            .ledger
            .iter()
            .flat_map(|entries| entries.value().clone())
            .collect();
        all.sort_by_key(|record| record.sequence);
        Ok(all)
    }
}
