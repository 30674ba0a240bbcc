//! Destinations for enriched records.

use std::error::Error as StdError;

use geoenrich_core::EnrichedRecord;
use thiserror::Error;

/// Failure reported by a [`RecordSink`].
#[derive(Debug, Error)]
#[error("failed to write enriched record")]
pub struct SinkError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl SinkError {
    /// Wrap an arbitrary error raised by a sink implementation.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Receives every record the enrichment stage produces, in scan order.
pub trait RecordSink {
    /// Accept one record.
    fn write(&mut self, record: EnrichedRecord) -> Result<(), SinkError>;

    /// Called once after the final record.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl RecordSink for Vec<EnrichedRecord> {
    fn write(&mut self, record: EnrichedRecord) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}
