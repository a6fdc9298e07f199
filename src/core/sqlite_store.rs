//! SQLite-backed account and ledger store
//!
//! Accounts and ledger entries live in two tables of one database. A commit
//! runs inside an immediate transaction that performs the version-checked
//! `UPDATE` and the ledger `INSERT`; if no row matched the expected version,
//! the transaction is rolled back and nothing is written.
//!
//! Several `SqliteStore` handles may open the same database file. They share
//! no in-process state and coordinate only through the database, exactly like
//! separate engine processes would.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, trace};

use super::traits::{AccountStore, CommitOutcome, LedgerStore, UnitOfWork};
use crate::types::{
    Account, AccountId, Amount, OperationKind, OperationRecord, StoreError, Version,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        balance INTEGER NOT NULL CHECK (balance >= 0),
        version INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ledger (
        sequence INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        account_id TEXT NOT NULL REFERENCES accounts(id),
        kind TEXT NOT NULL,
        amount INTEGER NOT NULL CHECK (amount > 0)
    );
    CREATE INDEX IF NOT EXISTS ledger_account ON ledger(account_id, sequence);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw ledger row as read from the database
type LedgerRow = (i64, String, String, String, i64);

/// Account and ledger store persisted in SQLite
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while another handle holds the write lock
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened sqlite store");
        Self::init(conn)
    }

    /// Private in-memory database, mostly useful for tests
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_sql(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::unavailable(format!("{what} {value} exceeds the storable range")))
}

fn from_sql(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::corrupt(format!("negative {what} {value}")))
}

fn parse_id(raw: &str) -> Result<AccountId, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::corrupt(format!("account id '{raw}': {e}")))
}

fn decode_account(id: AccountId, balance: i64, version: i64) -> Result<Account, StoreError> {
    Ok(Account {
        id,
        balance: from_sql(balance, "balance")?,
        version: Version::new(from_sql(version, "version")?),
    })
}

fn decode_record(row: LedgerRow) -> Result<OperationRecord, StoreError> {
    let (sequence, id, account_id, kind, amount) = row;
    let kind: OperationKind = kind
        .parse()
        .map_err(|_| StoreError::corrupt(format!("operation kind '{kind}'")))?;
    let amount = Amount::new(from_sql(amount, "amount")?)
        .map_err(|_| StoreError::corrupt("zero ledger amount"))?;

    Ok(OperationRecord {
        id: id
            .parse()
            .map_err(|e| StoreError::corrupt(format!("ledger id '{id}': {e}")))?,
        account_id: parse_id(&account_id)?,
        kind,
        amount,
        sequence: from_sql(sequence, "sequence")?,
    })
}

impl AccountStore for SqliteStore {
    fn create(&self, account: Account) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO accounts (id, balance, version) VALUES (?1, ?2, ?3)",
            params![
                account.id.to_string(),
                to_sql(account.balance, "balance")?,
                to_sql(account.version.get(), "version")?,
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::DuplicateAccount {
                account: account.id,
            });
        }
        Ok(())
    }

    fn read(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<(i64, i64)> = conn
            .query_row(
                "SELECT balance, version FROM accounts WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(balance, version)| decode_account(*id, balance, version))
            .transpose()
    }

    fn commit(&self, unit: UnitOfWork) -> Result<CommitOutcome, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE accounts SET balance = ?1, version = ?2 WHERE id = ?3 AND version = ?4",
            params![
                to_sql(unit.new_balance, "balance")?,
                to_sql(unit.new_version.get(), "version")?,
                unit.account_id.to_string(),
                to_sql(unit.expected_version.get(), "version")?,
            ],
        )?;

        if updated == 0 {
            trace!(account = %unit.account_id, expected = %unit.expected_version, "version mismatch");
            // Dropping the transaction rolls it back
            return Ok(CommitOutcome::VersionMismatch);
        }

        let entry = unit.entry;
        tx.execute(
            "INSERT INTO ledger (id, account_id, kind, amount) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id.to_string(),
                entry.account_id.to_string(),
                entry.kind.as_str(),
                to_sql(entry.amount.get(), "amount")?,
            ],
        )?;
        let sequence = from_sql(tx.last_insert_rowid(), "sequence")?;
        tx.commit()?;

        Ok(CommitOutcome::Committed(entry.committed(sequence)))
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, balance, version FROM accounts")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, balance, version)| decode_account(parse_id(&id)?, balance, version))
            .collect()
    }
}

impl SqliteStore {
    fn query_ledger(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<OperationRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<Result<Vec<LedgerRow>, _>>()?;

        rows.into_iter().map(decode_record).collect()
    }
}

impl LedgerStore for SqliteStore {
    fn entries_for(&self, id: &AccountId) -> Result<Vec<OperationRecord>, StoreError> {
        let id = id.to_string();
        self.query_ledger(
            "SELECT sequence, id, account_id, kind, amount FROM ledger
             WHERE account_id = ?1 ORDER BY sequence",
            &[&id],
        )
    }

    fn entries(&self) -> Result<Vec<OperationRecord>, StoreError> {
        self.query_ledger(
            "SELECT sequence, id, account_id, kind, amount FROM ledger ORDER BY sequence",
            &[],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BalanceEngine;
    use crate::types::{PendingEntry, WalletError};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn unit(account: &Account, new_balance: u64, amount: u64) -> UnitOfWork {
        UnitOfWork {
            account_id: account.id,
            expected_version: account.version,
            new_balance,
            new_version: account.version.next().unwrap(),
            entry: PendingEntry::new(account.id, OperationKind::Deposit, Amount::new(amount).unwrap()),
        }
    }

    #[test]
    fn test_create_read_and_list() {
        let store = SqliteStore::in_memory().unwrap();
        let account = Account::new(AccountId::new(), 1000);

        store.create(account.clone()).unwrap();

        assert_eq!(store.read(&account.id).unwrap(), Some(account.clone()));
        assert_eq!(store.accounts().unwrap(), vec![account]);
        assert_eq!(store.read(&AccountId::new()).unwrap(), None);
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let store = SqliteStore::in_memory().unwrap();
        let account = Account::new(AccountId::new(), 1);
        store.create(account.clone()).unwrap();

        assert_eq!(
            store.create(account.clone()),
            Err(StoreError::DuplicateAccount {
                account: account.id
            })
        );
    }

    #[test]
    fn test_commit_and_mismatch() {
        let store = SqliteStore::in_memory().unwrap();
        let account = Account::new(AccountId::new(), 1000);
        store.create(account.clone()).unwrap();

        let first = store.commit(unit(&account, 1500, 500)).unwrap();
        let second = store.commit(unit(&account, 1100, 100)).unwrap();

        let CommitOutcome::Committed(record) = first else {
            panic!("Expected first commit to succeed");
        };
        assert_eq!(second, CommitOutcome::VersionMismatch);
        assert_eq!(store.read(&account.id).unwrap().unwrap().balance, 1500);
        assert_eq!(store.entries_for(&account.id).unwrap(), vec![record]);
        assert_eq!(store.entries().unwrap(), vec![record]);
    }

    #[test]
    fn test_balance_beyond_storable_range_is_a_store_fault() {
        let store = SqliteStore::in_memory().unwrap();
        let account = Account::new(AccountId::new(), 0);
        store.create(account.clone()).unwrap();

        let result = store.commit(unit(&account, u64::MAX, 1));

        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.db");
        let id = AccountId::new();

        {
            let store = Arc::new(SqliteStore::open(&path).unwrap());
            store.create(Account::new(id, 10)).unwrap();
            let engine = BalanceEngine::new(store);
            engine.deposit(id, Amount::new(5).unwrap()).unwrap();
        }

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let engine = BalanceEngine::new(store.clone());
        assert_eq!(engine.read_balance(id).unwrap(), 15);
        assert_eq!(store.entries_for(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_two_handles_detect_each_others_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.db");
        let first = SqliteStore::open(&path).unwrap();
        let second = SqliteStore::open(&path).unwrap();
        let account = Account::new(AccountId::new(), 100);
        first.create(account.clone()).unwrap();

        // Both handles read the same version, first one wins
        let stale = second.read(&account.id).unwrap().unwrap();
        assert!(matches!(
            first.commit(unit(&account, 110, 10)).unwrap(),
            CommitOutcome::Committed(_)
        ));
        assert_eq!(
            second.commit(unit(&stale, 120, 20)).unwrap(),
            CommitOutcome::VersionMismatch
        );

        let engine = BalanceEngine::new(Arc::new(second));
        assert_eq!(engine.read_balance(account.id).unwrap(), 110);
        assert!(matches!(
            engine.withdraw(account.id, Amount::new(111).unwrap()),
            Err(WalletError::InsufficientFunds { balance: 110, .. })
        ));
    }
}
