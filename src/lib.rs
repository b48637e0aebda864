//! HoldFlow - daily holder state reconstruction and supply analytics
//!
//! Rebuilds a dense per-holder daily balance table from a sparse balance log,
//! then derives cohort/age distributions, holder counts, flows and velocity.
//!
//! # Architecture
//!
//! ```text
//! SqliteSourceReader → TransitionLog ─┬→ StateReconstructor → Classifier → CohortAgeEngine
//!                                     │
//!                                     └→ HolderFlowAggregator → VelocityNormalizer
//!                                                   ↓
//!                                   ReportWriter → JSONL or SQLite backend
//! ```

pub mod classify;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod flows;
pub mod reconstruct;
pub mod sink;
pub mod source;
pub mod sqlite_pragma;
pub mod velocity;

pub use config::{AnalysisConfig, BackendType, ConfigError};
pub use engine::{AnalysisEngine, AnalysisOutput, RunReport};
