//! SQLite writer for report tables
//!
//! Derived state is write-once per run: every `write_*` call deletes the rows
//! inside the run window and inserts the new table in one transaction, so a
//! rerun over the same window replaces rather than duplicates.

use super::writer_backend::{ReportWriterBackend, ReportWriterError};
use crate::classify::ClassifiedState;
use crate::cohort::DistributionRow;
use crate::flows::HolderFlowRow;
use crate::reconstruct::AnalysisWindow;
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS daily_state (
    entity TEXT NOT NULL,
    period TEXT NOT NULL,
    episode_id INTEGER NOT NULL,
    episode_start TEXT NOT NULL,
    episode_end TEXT,
    raw_balance REAL,
    filled_balance REAL NOT NULL,
    normalized_balance REAL,
    role TEXT NOT NULL,
    significance TEXT NOT NULL,
    PRIMARY KEY (entity, period)
);
CREATE INDEX IF NOT EXISTS idx_daily_state_period ON daily_state(period);

CREATE TABLE IF NOT EXISTS supply_distribution (
    period TEXT NOT NULL,
    dimension TEXT NOT NULL,
    bucket TEXT NOT NULL,
    bucket_order INTEGER NOT NULL,
    holders INTEGER NOT NULL,
    balance REAL NOT NULL,
    share_of_total REAL NOT NULL,
    PRIMARY KEY (period, dimension, bucket)
);

CREATE TABLE IF NOT EXISTS holder_flows (
    period TEXT NOT NULL,
    partition TEXT NOT NULL,
    holders INTEGER NOT NULL,
    significant_holders INTEGER NOT NULL,
    acquired INTEGER NOT NULL,
    churned INTEGER NOT NULL,
    net_change INTEGER NOT NULL,
    gross_turnover INTEGER NOT NULL,
    net_velocity REAL,
    gross_velocity REAL,
    net_velocity_baseline REAL,
    net_velocity_relative REAL,
    gross_velocity_baseline REAL,
    gross_velocity_relative REAL,
    low_confidence INTEGER NOT NULL,
    PRIMARY KEY (period, partition)
);
";

pub struct SqliteReportWriter {
    conn: Connection,
    window: AnalysisWindow,
}

impl SqliteReportWriter {
    pub fn new(
        db_path: impl AsRef<Path>,
        window: AnalysisWindow,
    ) -> Result<Self, ReportWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;
        conn.execute_batch(SCHEMA)?;

        log::info!("✅ SQLite report database initialized with WAL mode");

        Ok(Self { conn, window })
    }

    fn bounds(&self) -> (String, String) {
        (self.window.start.to_string(), self.window.end.to_string())
    }
}

#[async_trait]
impl ReportWriterBackend for SqliteReportWriter {
    async fn write_state(&mut self, rows: &[ClassifiedState]) -> Result<(), ReportWriterError> {
        let (start, end) = self.bounds();
        let tx = self.conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM daily_state WHERE period BETWEEN ?1 AND ?2",
            params![start, end],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO daily_state
                 (entity, period, episode_id, episode_start, episode_end, raw_balance,
                  filled_balance, normalized_balance, role, significance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for row in rows {
                let s = &row.state;
                stmt.execute(params![
                    s.entity,
                    s.period.to_string(),
                    s.episode_id,
                    s.episode_start.to_string(),
                    s.episode_end.map(|d| d.to_string()),
                    s.raw_balance,
                    s.filled_balance,
                    s.normalized_balance,
                    row.role.as_str(),
                    row.significance.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("✅ daily_state: replaced {} rows with {}", removed, rows.len());
        Ok(())
    }

    async fn write_distribution(
        &mut self,
        rows: &[DistributionRow],
    ) -> Result<(), ReportWriterError> {
        let (start, end) = self.bounds();
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM supply_distribution WHERE period BETWEEN ?1 AND ?2",
            params![start, end],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO supply_distribution
                 (period, dimension, bucket, bucket_order, holders, balance, share_of_total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.period.to_string(),
                    row.dimension.as_str(),
                    row.bucket,
                    row.bucket_order as i64,
                    row.holders as i64,
                    row.balance,
                    row.share_of_total,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("✅ supply_distribution: wrote {} rows", rows.len());
        Ok(())
    }

    async fn write_flows(&mut self, rows: &[HolderFlowRow]) -> Result<(), ReportWriterError> {
        let (start, end) = self.bounds();
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM holder_flows WHERE period BETWEEN ?1 AND ?2",
            params![start, end],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO holder_flows
                 (period, partition, holders, significant_holders, acquired, churned,
                  net_change, gross_turnover, net_velocity, gross_velocity,
                  net_velocity_baseline, net_velocity_relative,
                  gross_velocity_baseline, gross_velocity_relative, low_confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.period.to_string(),
                    row.partition.as_str(),
                    row.holders as i64,
                    row.significant_holders as i64,
                    row.acquired,
                    row.churned,
                    row.net_change,
                    row.gross_turnover,
                    row.net_velocity,
                    row.gross_velocity,
                    row.net_velocity_baseline,
                    row.net_velocity_relative,
                    row.gross_velocity_baseline,
                    row.gross_velocity_relative,
                    row.low_confidence,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("✅ holder_flows: wrote {} rows", rows.len());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ReportWriterError> {
        // Every write commits its own transaction
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
