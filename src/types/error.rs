//! Error types for the wallet engine
//!
//! This module defines the failure taxonomy surfaced by the balance mutation
//! engine and the faults reported by the account and ledger stores.
//!
//! # Error Categories
//!
//! - **Request Errors**: invalid amounts or operation kinds, raised before the engine runs
//! - **Business Rejections**: unknown account, insufficient funds, balance overflow
//! - **Availability Errors**: too many conflicts, store unavailable
//!
//! Version conflicts are deliberately absent: they are an internal signal of
//! the retry loop and never reach a caller.

use super::account::AccountId;
use thiserror::Error;

/// Main error type for the wallet engine
///
/// Every failure of `apply` and `read_balance` is one of these variants.
/// None of them are retried by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Referenced account does not exist
    #[error("Account not found: {account}")]
    AccountNotFound {
        /// The account that was looked up
        account: AccountId,
    },

    /// Withdrawal exceeds the balance observed at validation time
    ///
    /// User-actionable: retrying without new funds cannot succeed.
    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: u64,
        requested: u64,
    },

    /// Deposit would overflow the balance representation
    #[error("Balance overflow for account {account}: balance {balance}, deposit {requested}")]
    BalanceOverflow {
        account: AccountId,
        balance: u64,
        requested: u64,
    },

    /// Every attempt lost the version race
    ///
    /// An availability signal under contention; the caller may retry the
    /// whole operation later.
    #[error("Too many concurrent modifications of account {account} after {attempts} attempts, please try again later")]
    TooManyConflicts {
        account: AccountId,
        /// Number of attempts made
        attempts: u32,
    },

    /// The underlying store failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Amount is not a positive integer
    #[error("Invalid amount '{amount}': must be a positive integer")]
    InvalidAmount {
        /// The rejected amount as provided
        amount: String,
    },

    /// Operation kind is not deposit or withdrawal
    #[error("Invalid operation type '{kind}'")]
    InvalidOperationKind { kind: String },
}

/// Faults reported by account and ledger stores
///
/// A version mismatch is not a fault and is reported through
/// [`crate::core::CommitOutcome`] instead, so that infrastructure failures
/// can never be mistaken for conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend I/O or database failure
    #[error("{message}")]
    Unavailable { message: String },

    /// Attempted to create an account that already exists
    #[error("account {account} already exists")]
    DuplicateAccount { account: AccountId },

    /// Stored data could not be decoded
    #[error("corrupt record: {message}")]
    Corrupt { message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::Unavailable {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl WalletError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        WalletError::AccountNotFound { account }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: u64, requested: u64) -> Self {
        WalletError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create a BalanceOverflow error
    pub fn balance_overflow(account: AccountId, balance: u64, requested: u64) -> Self {
        WalletError::BalanceOverflow {
            account,
            balance,
            requested,
        }
    }

    /// Create a TooManyConflicts error
    pub fn too_many_conflicts(account: AccountId, attempts: u32) -> Self {
        WalletError::TooManyConflicts { account, attempts }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl Into<String>) -> Self {
        WalletError::InvalidAmount {
            amount: amount.into(),
        }
    }

    /// Create an InvalidOperationKind error
    pub fn invalid_operation_kind(kind: &str) -> Self {
        WalletError::InvalidOperationKind {
            kind: kind.to_string(),
        }
    }
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            message: message.into(),
        }
    }
}
