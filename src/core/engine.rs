//! Balance mutation engine
//!
//! This module provides the `BalanceEngine` struct, which applies deposits and
//! withdrawals to accounts using optimistic concurrency control.
//!
//! # Protocol
//!
//! Each attempt reads the account and its version, validates the operation,
//! computes the new balance and asks the store to commit the new account state
//! together with a ledger entry, conditioned on the version read. If another
//! writer committed in between, the store reports a version mismatch and the
//! engine starts over from a fresh read, up to the policy's attempt limit.
//!
//! ```text
//! Start → Read → Validate → Reject
//!                        └→ Commit → Success
//!                                 └→ Conflict → Read (next attempt)
//! ```
//!
//! # Thread Safety
//!
//! The engine holds no locks of its own. It is cheap to clone and any number
//! of clones, on any number of threads or processes, may target one store.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use super::retry::RetryPolicy;
use super::traits::{AccountStore, CommitOutcome, UnitOfWork};
use crate::types::{
    Account, AccountId, Amount, OperationKind, OperationRecord, OperationRequest, PendingEntry,
    StoreError, WalletError,
};

/// Receipt for a successfully applied operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// The ledger entry committed with the balance change
    pub record: OperationRecord,

    /// Balance installed by the commit
    pub balance: u64,

    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Outcome of a single attempt
enum Attempt {
    Committed { record: OperationRecord, balance: u64 },
    Conflict,
}

/// Optimistic-concurrency balance engine
#[derive(Clone)]
pub struct BalanceEngine {
    store: Arc<dyn AccountStore>,
    policy: RetryPolicy,
}

impl fmt::Debug for BalanceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BalanceEngine {
    /// Create an engine with the default retry policy
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn AccountStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Apply one operation to one account
    ///
    /// # Returns
    ///
    /// * `Ok(Applied)` - the balance and exactly one ledger entry were committed
    /// * `Err(WalletError::AccountNotFound)` - the account does not exist
    /// * `Err(WalletError::InsufficientFunds)` - withdrawal exceeds the balance
    /// * `Err(WalletError::BalanceOverflow)` - deposit would overflow the balance
    /// * `Err(WalletError::TooManyConflicts)` - every attempt lost a version race
    /// * `Err(WalletError::StoreUnavailable)` - the store failed
    ///
    /// No ledger entry is created by any failed call.
    pub fn apply(&self, request: OperationRequest) -> Result<Applied, WalletError> {
        let account_id = request.account_id;
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            match self.attempt(&request)? {
                Attempt::Committed { record, balance } => {
                    debug!(
                        account = %account_id,
                        kind = %request.kind,
                        amount = %request.amount,
                        balance,
                        attempt,
                        sequence = record.sequence,
                        "operation committed"
                    );
                    return Ok(Applied {
                        record,
                        balance,
                        attempts: attempt,
                    });
                }
                Attempt::Conflict => {
                    warn!(account = %account_id, attempt, "optimistic lock failed");
                    if attempt < max_attempts {
                        if let Some(delay) = self.policy.backoff(attempt) {
                            thread::sleep(delay);
                        }
                    }
                }
            }
        }

        warn!(
            account = %account_id,
            attempts = max_attempts,
            "giving up after repeated version conflicts"
        );
        Err(WalletError::too_many_conflicts(account_id, max_attempts))
    }

    /// Deposit `amount` into an account
    pub fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<Applied, WalletError> {
        self.apply(OperationRequest::deposit(account_id, amount))
    }

    /// Withdraw `amount` from an account
    pub fn withdraw(&self, account_id: AccountId, amount: Amount) -> Result<Applied, WalletError> {
        self.apply(OperationRequest::withdrawal(account_id, amount))
    }

    /// Current balance of an account
    ///
    /// A point-in-time read reflecting some commit at or before the call.
    pub fn read_balance(&self, account_id: AccountId) -> Result<u64, WalletError> {
        self.store
            .read(&account_id)?
            .map(|account| account.balance)
            .ok_or_else(|| WalletError::account_not_found(account_id))
    }

    /// One read-validate-commit pass
    ///
    /// Every failure except a version mismatch is returned as an error and
    /// ends the operation.
    fn attempt(&self, request: &OperationRequest) -> Result<Attempt, WalletError> {
        let account = self
            .store
            .read(&request.account_id)?
            .ok_or_else(|| WalletError::account_not_found(request.account_id))?;

        let new_balance = next_balance(&account, request.kind, request.amount)?;
        let new_version = account.version.next().ok_or_else(|| {
            StoreError::corrupt(format!("version of account {} is exhausted", account.id))
        })?;

        let unit = UnitOfWork {
            account_id: account.id,
            expected_version: account.version,
            new_balance,
            new_version,
            entry: PendingEntry::new(account.id, request.kind, request.amount),
        };

        match self.store.commit(unit)? {
            CommitOutcome::Committed(record) => Ok(Attempt::Committed {
                record,
                balance: new_balance,
            }),
            CommitOutcome::VersionMismatch => Ok(Attempt::Conflict),
        }
    }
}

/// Validate an operation against an account and compute the resulting balance
///
/// # Returns
///
/// * `Ok(u64)` - the balance after the operation
/// * `Err(WalletError::InsufficientFunds)` - withdrawal larger than the balance
/// * `Err(WalletError::BalanceOverflow)` - deposit past `u64::MAX`
pub fn next_balance(
    account: &Account,
    kind: OperationKind,
    amount: Amount,
) -> Result<u64, WalletError> {
    let requested = amount.get();
    match kind {
        OperationKind::Deposit => account
            .balance
            .checked_add(requested)
            .ok_or_else(|| WalletError::balance_overflow(account.id, account.balance, requested)),
        OperationKind::Withdrawal => account
            .balance
            .checked_sub(requested)
            .ok_or_else(|| WalletError::insufficient_funds(account.id, account.balance, requested)),
    }
}
