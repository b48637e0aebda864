//! JSONL writer - one file per report table under the output directory

use super::writer_backend::{ReportWriterBackend, ReportWriterError};
use crate::classify::ClassifiedState;
use crate::cohort::DistributionRow;
use crate::flows::HolderFlowRow;
use async_trait::async_trait;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "daily_state.jsonl";
pub const DISTRIBUTION_FILE: &str = "supply_distribution.jsonl";
pub const FLOWS_FILE: &str = "holder_flows.jsonl";

pub struct JsonlReportWriter {
    state: BufWriter<File>,
    distribution: BufWriter<File>,
    flows: BufWriter<File>,
}

impl JsonlReportWriter {
    /// Files are truncated: each run produces the full tables for its window
    pub fn new(base_path: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&base_path)?;

        Ok(Self {
            state: open_table(&base_path, STATE_FILE)?,
            distribution: open_table(&base_path, DISTRIBUTION_FILE)?,
            flows: open_table(&base_path, FLOWS_FILE)?,
        })
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.state.flush()?;
        self.distribution.flush()?;
        self.flows.flush()
    }
}

fn open_table(base_path: &Path, filename: &str) -> std::io::Result<BufWriter<File>> {
    let file_path = base_path.join(filename);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&file_path)?;

    log::info!("📝 Writing report table to: {}", file_path.display());
    Ok(BufWriter::new(file))
}

fn write_lines<T: Serialize>(
    writer: &mut BufWriter<File>,
    rows: &[T],
) -> Result<(), ReportWriterError> {
    for row in rows {
        let json = serde_json::to_string(row)?;
        writeln!(writer, "{}", json)?;
    }
    Ok(())
}

impl Drop for JsonlReportWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[async_trait]
impl ReportWriterBackend for JsonlReportWriter {
    async fn write_state(&mut self, rows: &[ClassifiedState]) -> Result<(), ReportWriterError> {
        write_lines(&mut self.state, rows)
    }

    async fn write_distribution(
        &mut self,
        rows: &[DistributionRow],
    ) -> Result<(), ReportWriterError> {
        write_lines(&mut self.distribution, rows)
    }

    async fn write_flows(&mut self, rows: &[HolderFlowRow]) -> Result<(), ReportWriterError> {
        write_lines(&mut self.flows, rows)
    }

    async fn flush(&mut self) -> Result<(), ReportWriterError> {
        JsonlReportWriter::flush(self)?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
