//! Unified report writer
//!
//! Routes writes to either JSONL or SQLite backend based on configuration.

use super::jsonl_writer::JsonlReportWriter;
use super::sqlite_writer::SqliteReportWriter;
use super::writer_backend::{ReportWriterBackend, ReportWriterError};
use crate::config::BackendType;
use crate::engine::AnalysisOutput;
use crate::reconstruct::AnalysisWindow;
use std::path::PathBuf;

/// Row counts written by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub state_rows: usize,
    pub distribution_rows: usize,
    pub flow_rows: usize,
}

/// Unified writer that routes to either JSONL or SQLite backend
pub enum ReportWriter {
    Jsonl(JsonlReportWriter),
    Sqlite(SqliteReportWriter),
}

impl ReportWriter {
    /// `base_path` is a directory for JSONL and a database file for SQLite
    pub fn new(
        backend: BackendType,
        base_path: PathBuf,
        window: AnalysisWindow,
    ) -> Result<Self, ReportWriterError> {
        match backend {
            BackendType::Jsonl => Ok(ReportWriter::Jsonl(JsonlReportWriter::new(base_path)?)),
            BackendType::Sqlite => Ok(ReportWriter::Sqlite(SqliteReportWriter::new(
                base_path, window,
            )?)),
        }
    }

    fn backend(&mut self) -> &mut dyn ReportWriterBackend {
        match self {
            ReportWriter::Jsonl(w) => w,
            ReportWriter::Sqlite(w) => w,
        }
    }

    /// Write all three tables of a run and flush
    pub async fn write_output(
        &mut self,
        output: &AnalysisOutput,
    ) -> Result<WriteSummary, ReportWriterError> {
        let backend = self.backend();
        backend.write_state(&output.state).await?;
        backend.write_distribution(&output.distribution).await?;
        backend.write_flows(&output.flows).await?;
        backend.flush().await?;

        Ok(WriteSummary {
            state_rows: output.state.len(),
            distribution_rows: output.distribution.len(),
            flow_rows: output.flows.len(),
        })
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            ReportWriter::Jsonl(w) => w.backend_type(),
            ReportWriter::Sqlite(w) => w.backend_type(),
        }
    }
}
