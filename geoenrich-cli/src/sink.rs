//! JSON Lines output for enriched records.

use std::io::Write;

use geoenrich_core::EnrichedRecord;
use geoenrich_data::{RecordSink, SinkError};

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap `writer`; buffer it yourself if it is unbuffered.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: EnrichedRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &record).map_err(SinkError::new)?;
        self.writer.write_all(b"\n").map_err(SinkError::new)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(SinkError::new)
    }
}
