//! Account-related types for the wallet engine
//!
//! This module defines the Account structure, its identifier and the
//! version token used for optimistic concurrency control.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account identifier
///
/// Opaque and immutable once the account exists. Backed by a UUID so that
/// identifiers can be generated independently by any caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Conflict-detection token
///
/// Strictly advances on every successful mutation of an account. It is only
/// ever compared for equality by the store's conditional write; callers must
/// not attach business meaning to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u64);

impl Version {
    /// Version assigned to a freshly created account
    pub const INITIAL: Version = Version(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version a successful commit will install
    ///
    /// `None` once the counter is exhausted; a version never wraps.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Account state
///
/// The current state of one account as held by an account store.
/// Balances are expressed in the smallest currency unit, so the unsigned
/// type enforces the non-negative balance invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// The account identifier
    pub id: AccountId,

    /// Current balance in the smallest currency unit
    pub balance: u64,

    /// Version token for optimistic concurrency control
    pub version: Version,
}

impl Account {
    /// Create a new account with the given opening balance
    ///
    /// The account starts at [`Version::INITIAL`].
    pub fn new(id: AccountId, balance: u64) -> Self {
        Account {
            id,
            balance,
            version: Version::INITIAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_at_initial_version() {
        let account = Account::new(AccountId::new(), 1000);
        assert_eq!(account.balance, 1000);
        assert_eq!(account.version, Version::INITIAL);
    }

    #[test]
    fn test_version_next_strictly_advances() {
        let v = Version::new(41);
        assert!(v.next().unwrap() > v);
        assert_eq!(v.next().unwrap().get(), 42);
        assert_eq!(Version::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_account_id_round_trips_through_display() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_account_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<AccountId>().is_err());
    }
}
