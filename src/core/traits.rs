//! Store abstractions used by the balance mutation engine
//!
//! The engine never touches storage directly. It relies on an account store
//! that offers atomic point reads and an atomic conditional commit which
//! covers both the account update and the ledger append.

use crate::types::{Account, AccountId, OperationRecord, PendingEntry, StoreError, Version};

/// One atomic unit of work: a conditional account write plus its ledger entry
///
/// A store must apply both halves or neither. The account write only takes
/// effect if the stored version still equals `expected_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitOfWork {
    pub account_id: AccountId,

    /// Version observed when the account was read
    pub expected_version: Version,

    pub new_balance: u64,

    pub new_version: Version,

    /// Ledger entry to append if the write succeeds
    pub entry: PendingEntry,
}

/// Result of a commit that reached the store without a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Both the account write and the ledger append were applied
    Committed(OperationRecord),

    /// The stored version no longer matched; nothing was applied
    VersionMismatch,
}

/// Trait for account storage
///
/// Implementations must make `commit` atomic with respect to concurrent
/// `commit` calls on the same account: the version check and the write are
/// one indivisible step, and the ledger append belongs to the same unit.
pub trait AccountStore: Send + Sync {
    /// Create a new account
    ///
    /// Fails with `StoreError::DuplicateAccount` if the identifier is taken.
    fn create(&self, account: Account) -> Result<(), StoreError>;

    /// Point-in-time read of one account
    fn read(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Conditionally write the account and append the ledger entry
    ///
    /// A version mismatch is reported as `Ok(CommitOutcome::VersionMismatch)`;
    /// `Err` is reserved for genuine store faults.
    fn commit(&self, unit: UnitOfWork) -> Result<CommitOutcome, StoreError>;

    /// Snapshot of all accounts, in no particular order
    fn accounts(&self) -> Result<Vec<Account>, StoreError>;
}

/// Trait for reading the append-only ledger
///
/// There is no append method: entries are only ever written by
/// [`AccountStore::commit`].
pub trait LedgerStore: Send + Sync {
    /// All entries for one account, in commit order
    fn entries_for(&self, id: &AccountId) -> Result<Vec<OperationRecord>, StoreError>;

    /// All entries, in commit order
    fn entries(&self) -> Result<Vec<OperationRecord>, StoreError>;
}
