//! Operation-related types for the wallet engine
//!
//! This module defines the operation kinds, validated amounts, transient
//! operation requests and the immutable ledger records produced by the engine.

use super::account::AccountId;
use super::error::WalletError;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use uuid::Uuid;

/// Operation kinds supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Credit funds to an account
    Deposit,

    /// Debit funds from an account
    ///
    /// Requires the current balance to cover the amount.
    Withdrawal,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = WalletError;

    /// Parse an operation kind, case-insensitively
    ///
    /// `withdraw` is accepted as an alias of `withdrawal`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(OperationKind::Deposit),
            "withdraw" | "withdrawal" => Ok(OperationKind::Withdrawal),
            _ => Err(WalletError::invalid_operation_kind(s)),
        }
    }
}

/// A strictly positive amount in the smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(NonZeroU64);

impl Amount {
    /// Validate a raw amount
    ///
    /// # Returns
    ///
    /// * `Ok(Amount)` if `value > 0`
    /// * `Err(WalletError::InvalidAmount)` for zero
    pub fn new(value: u64) -> Result<Self, WalletError> {
        NonZeroU64::new(value)
            .map(Self)
            .ok_or_else(|| WalletError::invalid_amount(value.to_string()))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A request to apply one operation to one account
///
/// Transient: requests are never persisted. Only the ledger record created
/// by a successful commit survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRequest {
    pub account_id: AccountId,
    pub kind: OperationKind,
    pub amount: Amount,
}

impl OperationRequest {
    pub fn new(account_id: AccountId, kind: OperationKind, amount: Amount) -> Self {
        Self {
            account_id,
            kind,
            amount,
        }
    }

    pub fn deposit(account_id: AccountId, amount: Amount) -> Self {
        Self::new(account_id, OperationKind::Deposit, amount)
    }

    pub fn withdrawal(account_id: AccountId, amount: Amount) -> Self {
        Self::new(account_id, OperationKind::Withdrawal, amount)
    }
}

/// A ledger entry that has not been committed yet
///
/// Built by the engine for every commit attempt and handed to the store,
/// which assigns the commit sequence when (and only when) the unit commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: Uuid,
    pub account_id: AccountId,
    pub kind: OperationKind,
    pub amount: Amount,
}

impl PendingEntry {
    pub fn new(account_id: AccountId, kind: OperationKind, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
        }
    }

    /// Seal the entry with the sequence number assigned by the store
    pub fn committed(self, sequence: u64) -> OperationRecord {
        OperationRecord {
            id: self.id,
            account_id: self.account_id,
            kind: self.kind,
            amount: self.amount,
            sequence,
        }
    }
}

/// Committed ledger entry
///
/// Immutable once committed. Entries are totally ordered by `sequence`,
/// the commit order recorded by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRecord {
    pub id: Uuid,

    /// The affected account
    ///
    /// The account does not track its ledger entries; this is the only link.
    pub account_id: AccountId,

    pub kind: OperationKind,

    pub amount: Amount,

    /// Commit sequence assigned by the store
    pub sequence: u64,
}

impl OperationRecord {
    /// Apply this entry to a running balance
    ///
    /// Used to replay an account's history. Returns `None` if the entry cannot
    /// be applied (a withdrawal exceeding the balance or an overflowing deposit),
    /// which would indicate a corrupted ledger.
    pub fn replay(&self, balance: u64) -> Option<u64> {
        match self.kind {
            OperationKind::Deposit => balance.checked_add(self.amount.get()),
            OperationKind::Withdrawal => balance.checked_sub(self.amount.get()),
        }
    }
}
