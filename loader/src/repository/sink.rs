use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use model::dto::record::ExecutionRecord;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

/// Single writer over the durable record stream: every invocation attempt
/// hands its record to the channel, exactly one consumer appends rows.
/// Exactly-once is by construction, one record per attempt in, one row per
/// record out.
#[derive(Debug)]
pub struct MetricsSink {
    records: UnboundedSender<ExecutionRecord>,
    writer:  JoinHandle<Result<u64>>,
}

impl MetricsSink {
    /// Opens the output file and starts the consumer on the blocking pool.
    /// `expected` is the precomputed trace-wide invocation count the
    /// completion barrier waits for.
    pub fn start(path: &Path, expected: u64) -> Result<Self> {
        let file = File::create(path).with_context(|| {
            format!("Failed to create the output file {}", path.display())
        })?;
        let mut writer = csv::Writer::from_writer(file);
        let (records, mut inbound) =
            mpsc::unbounded_channel::<ExecutionRecord>();

        let handle = tokio::task::spawn_blocking(move || {
            let mut written = 0u64;
            while written < expected {
                let Some(record) = inbound.blocking_recv() else {
                    warn!(
                        "The record stream closed after {} of {} records",
                        written, expected
                    );
                    break;
                };
                writer
                    .serialize(&record)
                    .context("Failed to append an execution record")?;
                writer
                    .flush()
                    .context("Failed to flush the output stream")?;
                written += 1;
            }
            Ok(written)
        });

        Ok(Self { records, writer: handle })
    }

    /// A producer handle for invocation attempts.
    pub fn records(&self) -> UnboundedSender<ExecutionRecord> {
        self.records.clone()
    }

    /// Completion barrier: resolves once every expected record has been
    /// durably written, returning how many rows were appended.
    pub async fn wait_all_written(self) -> Result<u64> {
        drop(self.records);
        self.writer.await.context("The metrics sink panicked")?
    }
}
