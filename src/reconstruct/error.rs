//! Reconstruction errors and per-entity diagnostics

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconstructError {
    /// Observation at or before the previous one for the same entity
    OutOfOrder {
        entity: String,
        period: NaiveDate,
        previous: NaiveDate,
    },
    NegativeBalance {
        entity: String,
        period: NaiveDate,
        balance: f64,
    },
    /// A shard task panicked or was cancelled
    WorkerFailed(String),
}

impl std::fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconstructError::OutOfOrder { entity, period, previous } => write!(
                f,
                "Out-of-order observation for {}: {} follows {}",
                entity, period, previous
            ),
            ReconstructError::NegativeBalance { entity, period, balance } => write!(
                f,
                "Negative balance {} for {} on {}",
                balance, entity, period
            ),
            ReconstructError::WorkerFailed(e) => write!(f, "Reconstruction worker failed: {}", e),
        }
    }
}

impl std::error::Error for ReconstructError {}

/// Structured report of an entity excluded from a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDiagnostic {
    pub entity: String,
    pub period: NaiveDate,
    pub message: String,
}

impl EntityDiagnostic {
    /// Build from an entity-scoped error; `None` for run-level failures
    pub fn from_error(err: &ReconstructError) -> Option<Self> {
        match err {
            ReconstructError::OutOfOrder { entity, period, .. }
            | ReconstructError::NegativeBalance { entity, period, .. } => Some(Self {
                entity: entity.clone(),
                period: *period,
                message: err.to_string(),
            }),
            ReconstructError::WorkerFailed(_) => None,
        }
    }
}
