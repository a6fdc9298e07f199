//! Operation dispatch and outcome translation
//!
//! This module provides the `Dispatcher` struct, which sits between the
//! processing pipelines and the balance engine. It invokes the engine, may
//! resubmit operations that exhausted their conflict retries, and classifies
//! every outcome into an `OutcomeStatus` that transports can map onto their
//! own representation.
//!
//! # Concurrency
//!
//! `dispatch_batch` runs every operation of a batch concurrently on tokio's
//! blocking pool. Operations on the same account are not serialized here:
//! contention is resolved by the engine's optimistic concurrency control.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use super::engine::{Applied, BalanceEngine};
use crate::types::{AccountId, OperationRequest, StoreError, WalletError};

/// Classification of an operation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Balance and ledger entry committed
    Applied,
    /// Account does not exist
    NotFound,
    /// Business rule or request validation rejected the operation
    Rejected,
    /// Contention: the caller should try again later
    Busy,
    /// Store failure
    Failed,
}

impl OutcomeStatus {
    /// Classify an engine error
    pub fn from_error(error: &WalletError) -> Self {
        match error {
            WalletError::AccountNotFound { .. } => OutcomeStatus::NotFound,
            WalletError::InsufficientFunds { .. }
            | WalletError::BalanceOverflow { .. }
            | WalletError::InvalidAmount { .. }
            | WalletError::InvalidOperationKind { .. } => OutcomeStatus::Rejected,
            WalletError::TooManyConflicts { .. } => OutcomeStatus::Busy,
            WalletError::StoreUnavailable(_) => OutcomeStatus::Failed,
        }
    }

    /// HTTP-style status code for transport adapters
    pub fn status_code(&self) -> u16 {
        match self {
            OutcomeStatus::Applied => 200,
            OutcomeStatus::NotFound => 404,
            OutcomeStatus::Rejected => 422,
            OutcomeStatus::Busy => 503,
            OutcomeStatus::Failed => 500,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::NotFound => "not_found",
            OutcomeStatus::Rejected => "rejected",
            OutcomeStatus::Busy => "busy",
            OutcomeStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of dispatching a single operation
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// The request that was dispatched
    pub request: OperationRequest,

    /// The engine's outcome
    pub result: Result<Applied, WalletError>,
}

impl DispatchResult {
    pub fn status(&self) -> OutcomeStatus {
        match &self.result {
            Ok(_) => OutcomeStatus::Applied,
            Err(e) => OutcomeStatus::from_error(e),
        }
    }
}

/// Aggregated outcome counts for a processing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    pub applied: usize,
    pub not_found: usize,
    pub rejected: usize,
    pub busy: usize,
    pub failed: usize,
    /// Input rows that never reached the engine
    pub skipped: usize,
}

impl ProcessingReport {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Applied => self.applied += 1,
            OutcomeStatus::NotFound => self.not_found += 1,
            OutcomeStatus::Rejected => self.rejected += 1,
            OutcomeStatus::Busy => self.busy += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Number of operations that reached the engine
    pub fn dispatched(&self) -> usize {
        self.applied + self.not_found + self.rejected + self.busy + self.failed
    }

    pub fn log_summary(&self) {
        info!(
            applied = self.applied,
            not_found = self.not_found,
            rejected = self.rejected,
            busy = self.busy,
            failed = self.failed,
            skipped = self.skipped,
            "processing finished"
        );
    }
}

/// Configuration for the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// How often an operation that failed with `TooManyConflicts` is
    /// submitted again before the failure is reported
    pub resubmit: u32,
}

/// Entry point for callers of the balance engine
#[derive(Debug, Clone)]
pub struct Dispatcher {
    engine: Arc<BalanceEngine>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(engine: Arc<BalanceEngine>, config: DispatchConfig) -> Self {
        Self { engine, config }
    }

    /// Dispatch one operation
    ///
    /// Failures are logged and returned in the result; they never stop the caller.
    pub fn dispatch(&self, request: OperationRequest) -> DispatchResult {
        let mut result = self.engine.apply(request);

        let mut round = 0;
        while round < self.config.resubmit
            && matches!(result, Err(WalletError::TooManyConflicts { .. }))
        {
            round += 1;
            if let Some(delay) = self.engine.policy().backoff(round) {
                thread::sleep(delay);
            }
            warn!(account = %request.account_id, round, "resubmitting contended operation");
            result = self.engine.apply(request);
        }

        if let Err(e) = &result {
            warn!(
                account = %request.account_id,
                kind = %request.kind,
                amount = %request.amount,
                status = %OutcomeStatus::from_error(e),
                "operation failed: {}",
                e
            );
        }

        DispatchResult { request, result }
    }

    /// Current balance of an account
    pub fn balance(&self, account_id: AccountId) -> Result<u64, WalletError> {
        self.engine.read_balance(account_id)
    }

    /// Dispatch a batch of operations concurrently
    ///
    /// Results are returned in the order of the input, one per request. Every
    /// operation is attempted even if others fail. A task that panics yields
    /// a `StoreUnavailable` result for its request.
    pub async fn dispatch_batch(&self, batch: Vec<OperationRequest>) -> Vec<DispatchResult> {
        let tasks: Vec<_> = batch
            .into_iter()
            .map(|request| {
                let dispatcher = self.clone();
                let task = tokio::task::spawn_blocking(move || dispatcher.dispatch(request));
                (request, task)
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (request, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        account = %request.account_id,
                        kind = %request.kind,
                        amount = %request.amount,
                        "dispatch task failed: {}",
                        e
                    );
                    DispatchResult {
                        request,
                        result: Err(WalletError::StoreUnavailable(StoreError::unavailable(
                            format!("dispatch task failed: {}", e),
                        ))),
                    }
                }
            };
            results.push(result);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{AccountStore, CommitOutcome, UnitOfWork};
    use crate::core::{InMemoryStore, LedgerStore, RetryPolicy};
    use crate::types::{Account, Amount};
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn amount(value: u64) -> Amount {
        Amount::new(value).unwrap()
    }

    fn setup(balances: &[u64]) -> (Arc<InMemoryStore>, Dispatcher, Vec<AccountId>) {
        let store = Arc::new(InMemoryStore::new());
        let ids: Vec<AccountId> = balances
            .iter()
            .map(|&balance| {
                let id = AccountId::new();
                store.create(Account::new(id, balance)).unwrap();
                id
            })
            .collect();
        let engine = Arc::new(BalanceEngine::new(store.clone()));
        (store, Dispatcher::new(engine, DispatchConfig::default()), ids)
    }

    /// Store that loses the first `conflicts` commits
    struct Contended {
        inner: InMemoryStore,
        conflicts: AtomicU32,
    }

    impl AccountStore for Contended {
        fn create(&self, account: Account) -> Result<(), StoreError> {
            self.inner.create(account)
        }

        fn read(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
            self.inner.read(id)
        }

        fn commit(&self, unit: UnitOfWork) -> Result<CommitOutcome, StoreError> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Ok(CommitOutcome::VersionMismatch);
            }
            self.inner.commit(unit)
        }

        fn accounts(&self) -> Result<Vec<Account>, StoreError> {
            self.inner.accounts()
        }
    }

    #[rstest]
    #[case::not_found(WalletError::account_not_found(AccountId::new()), OutcomeStatus::NotFound, 404)]
    #[case::insufficient(WalletError::insufficient_funds(AccountId::new(), 1, 2), OutcomeStatus::Rejected, 422)]
    #[case::invalid_amount(WalletError::invalid_amount("0"), OutcomeStatus::Rejected, 422)]
    #[case::busy(WalletError::too_many_conflicts(AccountId::new(), 3), OutcomeStatus::Busy, 503)]
    #[case::failed(WalletError::StoreUnavailable(StoreError::unavailable("down")), OutcomeStatus::Failed, 500)]
    fn test_outcome_classification(
        #[case] error: WalletError,
        #[case] expected: OutcomeStatus,
        #[case] code: u16,
    ) {
        let status = OutcomeStatus::from_error(&error);
        assert_eq!(status, expected);
        assert_eq!(status.status_code(), code);
    }

    #[test]
    fn test_dispatch_success_and_balance() {
        let (_store, dispatcher, ids) = setup(&[1000]);

        let result = dispatcher.dispatch(OperationRequest::deposit(ids[0], amount(500)));

        assert_eq!(result.status(), OutcomeStatus::Applied);
        assert_eq!(dispatcher.balance(ids[0]).unwrap(), 1500);
    }

    #[test]
    fn test_dispatch_captures_failures() {
        let (_store, dispatcher, ids) = setup(&[10]);

        let result = dispatcher.dispatch(OperationRequest::withdrawal(ids[0], amount(11)));

        assert_eq!(result.status(), OutcomeStatus::Rejected);
        assert_eq!(result.request.amount, amount(11));
    }

    #[rstest]
    #[case::no_resubmit(0, 3, OutcomeStatus::Busy)]
    #[case::one_resubmit_not_enough(1, 6, OutcomeStatus::Busy)]
    #[case::one_resubmit_enough(1, 5, OutcomeStatus::Applied)]
    #[case::two_resubmits(2, 8, OutcomeStatus::Applied)]
    fn test_resubmission_after_too_many_conflicts(
        #[case] resubmit: u32,
        #[case] conflicts: u32,
        #[case] expected: OutcomeStatus,
    ) {
        let store = Arc::new(Contended {
            inner: InMemoryStore::new(),
            conflicts: AtomicU32::new(conflicts),
        });
        let id = AccountId::new();
        store.create(Account::new(id, 0)).unwrap();
        let engine = Arc::new(BalanceEngine::with_policy(
            store.clone(),
            RetryPolicy::immediate(3),
        ));
        let dispatcher = Dispatcher::new(engine, DispatchConfig { resubmit });

        let result = dispatcher.dispatch(OperationRequest::deposit(id, amount(7)));

        assert_eq!(result.status(), expected);
        let entries = store.inner.entries_for(&id).unwrap().len();
        assert_eq!(entries, usize::from(expected == OutcomeStatus::Applied));
    }

    #[test]
    fn test_report_counts() {
        let mut report = ProcessingReport::default();
        report.record(OutcomeStatus::Applied);
        report.record(OutcomeStatus::Applied);
        report.record(OutcomeStatus::Busy);
        report.record(OutcomeStatus::NotFound);
        report.record_skipped();

        assert_eq!(report.applied, 2);
        assert_eq!(report.busy, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dispatched(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_batch_preserves_input_order() {
        let (_store, dispatcher, ids) = setup(&[0, 0, 0]);
        let batch: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| OperationRequest::deposit(id, amount(i as u64 + 1)))
            .collect();

        let results = dispatcher.dispatch_batch(batch.clone()).await;

        let requests: Vec<_> = results.iter().map(|r| r.request).collect();
        assert_eq!(requests, batch);
        assert!(results.iter().all(|r| r.status() == OutcomeStatus::Applied));
    }

    #[tokio::test]
    async fn test_dispatch_batch_empty() {
        let (_store, dispatcher, _ids) = setup(&[]);
        assert!(dispatcher.dispatch_batch(Vec::new()).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_batch_same_account_no_lost_updates() {
        let (store, _dispatcher, ids) = setup(&[0]);
        let dispatcher = Dispatcher::new(
            Arc::new(BalanceEngine::new(store.clone())),
            DispatchConfig { resubmit: 50 },
        );
        let batch = vec![OperationRequest::deposit(ids[0], amount(10)); 64];

        let results = dispatcher.dispatch_batch(batch).await;

        let applied = results
            .iter()
            .filter(|r| r.status() == OutcomeStatus::Applied)
            .count() as u64;
        assert_eq!(dispatcher.balance(ids[0]).unwrap(), applied * 10);
        assert_eq!(store.entries_for(&ids[0]).unwrap().len() as u64, applied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_batch_continues_after_errors() {
        let (_store, dispatcher, ids) = setup(&[5]);
        let missing = AccountId::new();
        let batch = vec![
            OperationRequest::deposit(missing, amount(1)),
            OperationRequest::withdrawal(ids[0], amount(100)),
            OperationRequest::deposit(ids[0], amount(1)),
        ];

        let results = dispatcher.dispatch_batch(batch).await;

        let statuses: Vec<_> = results.iter().map(DispatchResult::status).collect();
        assert_eq!(statuses[0], OutcomeStatus::NotFound);
        assert_eq!(statuses[2], OutcomeStatus::Applied);
        // The withdrawal can never be covered: at most 6 units exist
        assert_eq!(statuses[1], OutcomeStatus::Rejected);
    }

    /// Store whose commit panics for one specific amount
    struct PanicsOn {
        inner: InMemoryStore,
        amount: u64,
    }

    impl AccountStore for PanicsOn {
        fn create(&self, account: Account) -> Result<(), StoreError> {
            self.inner.create(account)
        }

        fn read(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
            self.inner.read(id)
        }

        fn commit(&self, unit: UnitOfWork) -> Result<CommitOutcome, StoreError> {
            if unit.entry.amount.get() == self.amount {
                panic!("commit of {} blew up", self.amount);
            }
            self.inner.commit(unit)
        }

        fn accounts(&self) -> Result<Vec<Account>, StoreError> {
            self.inner.accounts()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_batch_reports_panicked_task_in_place() {
        let store = Arc::new(PanicsOn {
            inner: InMemoryStore::new(),
            amount: 13,
        });
        let id = AccountId::new();
        store.create(Account::new(id, 0)).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(BalanceEngine::new(store.clone())),
            DispatchConfig::default(),
        );
        let batch = vec![
            OperationRequest::deposit(id, amount(13)),
            OperationRequest::deposit(id, amount(2)),
        ];

        let results = dispatcher.dispatch_batch(batch.clone()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].request, batch[0]);
        assert_eq!(results[0].status(), OutcomeStatus::Failed);
        assert_eq!(results[1].request, batch[1]);
        assert_eq!(results[1].status(), OutcomeStatus::Applied);
        assert_eq!(dispatcher.balance(id).unwrap(), 2);
        assert_eq!(store.inner.entries_for(&id).unwrap().len(), 1);
    }
}
