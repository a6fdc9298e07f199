//! Asynchronous batch processing strategy
//!
//! Reads operations in batches and dispatches every operation of a batch
//! concurrently. Operations on the same account race each other for real;
//! the engine's optimistic concurrency control decides the winners.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── Dispatcher (one blocking task per operation)
//!         └── BalanceEngine (OCC + bounded retry)
//! ```
//!
//! Batches run one after another, so an operation never races one from a
//! later batch. Within a batch no ordering is guaranteed.

use crate::core::{Dispatcher, ProcessingReport};
use crate::io::async_reader::AsyncReader;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Maximum number of operations executing at the same time
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults.
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                max_concurrent,
                default = default.max_concurrent,
                "invalid max_concurrent, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Concurrent batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process operations in concurrent batches
    ///
    /// Builds a multi-threaded tokio runtime whose blocking pool is capped at
    /// `max_concurrent`, which bounds how many engine calls run at once.
    fn process(
        &self,
        dispatcher: &Dispatcher,
        input_path: &Path,
    ) -> Result<ProcessingReport, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .max_blocking_threads(self.config.max_concurrent)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut report = ProcessingReport::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "dispatching batch");
                for result in dispatcher.dispatch_batch(batch).await {
                    report.record(result.status());
                }
            }

            for _ in 0..reader.skipped() {
                report.record_skipped();
            }

            Ok::<_, String>(report)
        })
    }
}
