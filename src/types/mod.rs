//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account state, identifiers and version tokens
//! - `operation`: Operation kinds, requests and ledger records
//! - `error`: Error types for the engine and its stores

pub mod account;
pub mod error;
pub mod operation;

pub use account::{Account, AccountId, Version};
pub use error::{StoreError, WalletError};
pub use operation::{
    Amount, OperationKind, OperationRecord, OperationRequest, PendingEntry,
};
