//! CSV output sink and its single-writer task.

use crate::catalog::OutputRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Column names, in record field order.
pub const HEADER: [&str; 5] = ["id", "title", "price", "promo_price", "url"];

/// Append-only CSV writer for output records.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    /// Creates (or truncates) the file at `path` and writes the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps a writer and writes the header row.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(HEADER).context("Failed to write CSV header")?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer.serialize(record).context("Failed to write CSV row")?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush output")
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush output: {}", e.error()))
    }
}

/// Moves the sink onto a blocking thread that owns all writes.
///
/// Producers send one batch per page; a batch is written contiguously.
/// The task ends when every sender is dropped and returns the row count.
pub fn spawn_writer<W>(
    mut sink: CsvSink<W>,
    capacity: usize,
) -> (mpsc::Sender<Vec<OutputRecord>>, JoinHandle<Result<usize>>)
where
    W: Write + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<OutputRecord>>(capacity.max(1));

    let handle = tokio::task::spawn_blocking(move || {
        while let Some(batch) = rx.blocking_recv() {
            debug!("Writing {} rows", batch.len());
            for record in &batch {
                sink.write(record)?;
            }
        }
        sink.flush()?;
        Ok(sink.rows())
    });

    (tx, handle)
}
