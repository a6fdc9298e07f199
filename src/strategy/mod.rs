//! Processing strategy module
//!
//! This module defines the Strategy pattern for complete processing pipelines:
//! reading operation requests from CSV and dispatching them to the balance
//! engine. Different pipelines (sequential, concurrent batches) can be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::{Dispatcher, ProcessingReport};
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete processing pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Read operations from `input_path` and dispatch each of them
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessingReport)` once every row has been handled
    /// * `Err(String)` if a fatal error occurred (file not found, runtime failure)
    ///
    /// Invalid rows and failed operations are logged and counted in the
    /// report; they never abort processing.
    fn process(&self, dispatcher: &Dispatcher, input_path: &Path)
        -> Result<ProcessingReport, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
