//! Report output: daily state, supply distribution and holder flows
//!
//! Backends:
//! - JSONL: `daily_state.jsonl`, `supply_distribution.jsonl`, `holder_flows.jsonl`
//! - SQLite: tables of the same names, rows in the run window replaced per run

pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;
pub mod writer_backend;

pub use jsonl_writer::JsonlReportWriter;
pub use sqlite_writer::SqliteReportWriter;
pub use writer::{ReportWriter, WriteSummary};
pub use writer_backend::{ReportWriterBackend, ReportWriterError};
