//! CSV format handling for operation requests, seed accounts and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `OperationCsvRecord` for operation input (`account,type,amount`)
//! - `AccountCsvRecord` for seed accounts (`account,balance`)
//! - Conversion from CSV records to domain types
//! - Balance and ledger output serialization
//!
//! All functions are pure (no I/O beyond the provided writer) for easy testing.

use crate::types::{Account, AccountId, Amount, OperationKind, OperationRecord, OperationRequest};
use serde::Deserialize;
use std::io::Write;

/// Operation input row
///
/// All fields are read as strings so that conversion errors can name the
/// offending value.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OperationCsvRecord {
    pub account: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
}

/// Seed account row
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub account: String,
    pub balance: String,
}

fn parse_account_id(raw: &str) -> Result<AccountId, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("Invalid account id '{}': {}", raw, e))
}

/// Convert an OperationCsvRecord to an OperationRequest
///
/// This function:
/// - Parses the account id as a UUID
/// - Parses the operation type (case-insensitive, `withdraw` accepted)
/// - Parses the amount as a positive integer in the smallest currency unit
///
/// # Returns
///
/// * `Ok(OperationRequest)` - Successfully converted record
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_operation_record(record: OperationCsvRecord) -> Result<OperationRequest, String> {
    let account_id = parse_account_id(&record.account)?;
    let kind: OperationKind = record.kind.parse().map_err(|e| format!("{}", e))?;

    let raw_amount = record.amount.trim();
    let amount = raw_amount
        .parse::<u64>()
        .map_err(|_| raw_amount.to_string())
        .and_then(|value| Amount::new(value).map_err(|_| raw_amount.to_string()))
        .map_err(|raw| format!("Invalid amount '{}' for {} on account {}", raw, kind, account_id))?;

    Ok(OperationRequest::new(account_id, kind, amount))
}

/// Convert an AccountCsvRecord to a fresh Account
pub fn convert_account_record(record: AccountCsvRecord) -> Result<Account, String> {
    let id = parse_account_id(&record.account)?;
    let balance = record
        .balance
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Invalid balance '{}' for account {}", record.balance, id))?;

    Ok(Account::new(id, balance))
}

/// Write account balances to CSV format
///
/// Writes accounts with columns: account, balance. Accounts are sorted by id
/// for deterministic output. Versions are never written.
pub fn write_balances_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer
            .write_record([account.id.to_string(), account.balance.to_string()])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write ledger entries to CSV format
///
/// Writes entries with columns: sequence, id, account, type, amount,
/// in commit order.
pub fn write_ledger_csv(entries: &[OperationRecord], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["sequence", "id", "account", "type", "amount"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&OperationRecord> = entries.iter().collect();
    sorted.sort_by_key(|record| record.sequence);

    for record in sorted {
        writer
            .write_record([
                record.sequence.to_string(),
                record.id.to_string(),
                record.account_id.to_string(),
                record.kind.to_string(),
                record.amount.to_string(),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}
