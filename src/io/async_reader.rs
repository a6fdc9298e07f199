//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of operation requests from a CSV source for the
//! concurrent processing strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of OperationRequests
//!                  ↓
//!           csv_format module
//!           (OperationCsvRecord, convert_operation_record)
//! ```

use crate::io::csv_format::{convert_operation_record, OperationCsvRecord};
use crate::types::OperationRequest;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Invalid rows are logged, counted and skipped.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    skipped: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            skipped: 0,
        }
    }

    /// Read a batch of operation requests
    ///
    /// Reads until `batch_size` valid requests are collected or the input
    /// ends. Returns an empty vector only at the end of the input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut skipped = 0;
        let mut records = self.csv_reader.deserialize::<OperationCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_operation_record(csv_record) {
                    Ok(request) => batch.push(request),
                    Err(e) => {
                        skipped += 1;
                        warn!("skipping operation: {}", e);
                    }
                },
                Some(Err(e)) => {
                    skipped += 1;
                    warn!("skipping operation: CSV parse error: {}", e);
                }
                None => break,
            }
        }

        self.skipped += skipped;
        batch
    }

    /// Number of rows skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
