//! Observation log records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Holder address (base58 wallet owner)
pub type EntityId = String;

/// One recorded balance for one holder on one day
///
/// At most one per `(entity, period)`. Balances are never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity: EntityId,
    pub period: NaiveDate,
    pub balance: f64,
}

impl Observation {
    pub fn new(entity: impl Into<EntityId>, period: NaiveDate, balance: f64) -> Self {
        Self {
            entity: entity.into(),
            period,
            balance,
        }
    }
}

/// Parse a `YYYY-MM-DD` period string
pub fn parse_period(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
