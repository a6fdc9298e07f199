//! Synchronous processing strategy
//!
//! Dispatches operations one at a time, in file order, on the calling thread.
//! Because nothing runs concurrently, the outcome of every operation is fully
//! determined by the input order.

use crate::core::{Dispatcher, ProcessingReport};
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use tracing::warn;

/// Sequential processing strategy
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use wallet_engine::core::{BalanceEngine, DispatchConfig, Dispatcher, InMemoryStore};
/// use wallet_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
///
/// let engine = Arc::new(BalanceEngine::new(Arc::new(InMemoryStore::new())));
/// let dispatcher = Dispatcher::new(engine, DispatchConfig::default());
/// let report = SyncProcessingStrategy
///     .process(&dispatcher, Path::new("operations.csv"))
///     .expect("Processing failed");
/// println!("{} operations applied", report.applied);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        dispatcher: &Dispatcher,
        input_path: &Path,
    ) -> Result<ProcessingReport, String> {
        let reader = SyncReader::new(input_path)?;
        let mut report = ProcessingReport::default();

        for row in reader {
            match row {
                Ok(request) => report.record(dispatcher.dispatch(request).status()),
                Err(e) => {
                    warn!("skipping operation: {}", e);
                    report.record_skipped();
                }
            }
        }

        Ok(report)
    }
}
