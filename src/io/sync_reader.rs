//! Synchronous CSV readers
//!
//! Provides a streaming iterator over operation requests from a CSV file and
//! a loader for seed account files. Format concerns are delegated to the
//! csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<OperationRequest, String>` for each CSV row:
//!
//! ```no_run
//! use wallet_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Dispatching: {:?}", request),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants with line numbers
//! - Seed files are all-or-nothing: any bad row fails `read_accounts`

use crate::io::csv_format::{
    convert_account_record, convert_operation_record, AccountCsvRecord, OperationCsvRecord,
};
use crate::types::{Account, OperationRequest};
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

fn open_csv(path: &Path) -> Result<csv::Reader<File>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Synchronous operation reader
///
/// Streams rows one at a time with constant memory usage.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open an operations CSV file for streaming iteration
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<OperationRequest, String>;

    /// Get the next operation request from the CSV file
    ///
    /// Line numbers in errors count the header as line 1.
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<OperationCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(csv_record) => convert_operation_record(csv_record)
                .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
            Err(e) => Err(format!(
                "Line {}: CSV parse error: {}",
                self.line_num + 1,
                e
            )),
        })
    }
}

/// Load seed accounts from a CSV file with columns `account,balance`
///
/// # Returns
///
/// * `Ok(Vec<Account>)` - every row, in file order
/// * `Err(String)` - the file could not be read, a row was invalid or an
///   account id appeared twice
pub fn read_accounts(path: &Path) -> Result<Vec<Account>, String> {
    let mut reader = open_csv(path)?;
    let mut seen = HashSet::new();

    reader
        .deserialize::<AccountCsvRecord>()
        .enumerate()
        .map(|(index, row)| {
            // +2: one for the header, one for 1-based numbering
            let line = index + 2;
            let record = row.map_err(|e| format!("Line {}: CSV parse error: {}", line, e))?;
            let account =
                convert_account_record(record).map_err(|e| format!("Line {}: {}", line, e))?;
            if !seen.insert(account.id) {
                return Err(format!("Line {}: Duplicate account {}", line, account.id));
            }
            Ok(account)
        })
        .collect()
}
