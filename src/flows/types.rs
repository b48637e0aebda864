//! Holder count and flow row types

use crate::classify::Role;
use chrono::NaiveDate;
use serde::Serialize;

/// Population slice a flow row is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    All,
    Infrastructure,
    ActiveParticipant,
    PassiveHolder,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::All => "all",
            Partition::Infrastructure => "infrastructure",
            Partition::ActiveParticipant => "active_participant",
            Partition::PassiveHolder => "passive_holder",
        }
    }

    pub fn all() -> [Partition; 4] {
        [
            Partition::All,
            Partition::Infrastructure,
            Partition::ActiveParticipant,
            Partition::PassiveHolder,
        ]
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Partition::All => 0,
            Partition::Infrastructure => 1,
            Partition::ActiveParticipant => 2,
            Partition::PassiveHolder => 3,
        }
    }
}

impl From<Role> for Partition {
    fn from(role: Role) -> Self {
        match role {
            Role::Infrastructure => Partition::Infrastructure,
            Role::ActiveParticipant => Partition::ActiveParticipant,
            Role::PassiveHolder => Partition::PassiveHolder,
        }
    }
}

/// Holder counts, floor crossings and velocity for one (period, partition)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolderFlowRow {
    pub period: NaiveDate,
    pub partition: Partition,
    /// Entities whose as-of balance is positive
    pub holders: u64,
    /// Entities whose as-of balance is at or above the floor
    pub significant_holders: u64,
    /// Upward floor crossings on this day (≥ 0)
    pub acquired: i64,
    /// Downward floor crossings on this day, signed (≤ 0)
    pub churned: i64,
    pub net_change: i64,
    pub gross_turnover: i64,
    /// `net_change / significant_holders`, None with zero holders
    pub net_velocity: Option<f64>,
    /// `gross_turnover / significant_holders`, None with zero holders
    pub gross_velocity: Option<f64>,
    pub net_velocity_baseline: Option<f64>,
    pub net_velocity_relative: Option<f64>,
    pub gross_velocity_baseline: Option<f64>,
    pub gross_velocity_relative: Option<f64>,
    /// Fewer than the configured number of prior days behind the baseline
    pub low_confidence: bool,
}

impl HolderFlowRow {
    pub fn new(period: NaiveDate, partition: Partition) -> Self {
        Self {
            period,
            partition,
            holders: 0,
            significant_holders: 0,
            acquired: 0,
            churned: 0,
            net_change: 0,
            gross_turnover: 0,
            net_velocity: None,
            gross_velocity: None,
            net_velocity_baseline: None,
            net_velocity_relative: None,
            gross_velocity_baseline: None,
            gross_velocity_relative: None,
            low_confidence: true,
        }
    }
}

/// `numerator / holders`, undefined when there is nobody to divide by
pub fn per_holder(numerator: i64, holders: u64) -> Option<f64> {
    (holders > 0).then(|| numerator as f64 / holders as f64)
}
