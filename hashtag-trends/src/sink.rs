use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::SinkError;
use crate::reporter::Report;

/// Destination of the periodic reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, report: &Report) -> Result<(), SinkError>;
}

/// Prints each report's value on its own line on stdout. Logs go to stderr, so stdout
/// only ever carries report values.
pub struct StdoutSink {}

#[async_trait]
impl ReportSink for StdoutSink {
    async fn emit(&self, report: &Report) -> Result<(), SinkError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n", report.value).as_bytes())
            .await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Keeps every report in memory, for embedding the pipeline and for tests.
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn values(&self) -> Vec<usize> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|report| report.value)
            .collect()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn emit(&self, report: &Report) -> Result<(), SinkError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}
