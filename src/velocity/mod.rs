//! Velocity Normalizer - daily flow ratios relative to a trailing baseline
//!
//! The baseline for day `t` is the median of the defined values over days
//! `t-N .. t-1` (the current day is never part of its own baseline). The first
//! `N` days of a series cannot have a full window and are flagged
//! `low_confidence` instead of being defaulted.

use crate::flows::{HolderFlowRow, Partition};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityPoint {
    pub period: NaiveDate,
    pub value: Option<f64>,
    pub baseline: Option<f64>,
    /// `value / baseline`, None when either is undefined or the baseline is zero
    pub relative: Option<f64>,
    pub low_confidence: bool,
}

pub struct VelocityNormalizer {
    window_days: usize,
}

impl VelocityNormalizer {
    pub fn new(window_days: usize) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    /// Normalize a daily series (ascending, one value per day)
    pub fn normalize_series(&self, series: &[(NaiveDate, Option<f64>)]) -> Vec<VelocityPoint> {
        let mut trailing: VecDeque<Option<f64>> = VecDeque::with_capacity(self.window_days);
        let mut out = Vec::with_capacity(series.len());

        for &(period, value) in series {
            let low_confidence = trailing.len() < self.window_days;
            let baseline = median(trailing.iter().flatten().copied());
            let relative = match (value, baseline) {
                (Some(v), Some(b)) if b != 0.0 => Some(v / b),
                _ => None,
            };

            out.push(VelocityPoint {
                period,
                value,
                baseline,
                relative,
                low_confidence,
            });

            trailing.push_back(value);
            if trailing.len() > self.window_days {
                trailing.pop_front();
            }
        }

        out
    }

    /// Fill baseline fields on flow rows, per partition, for net and gross velocity
    ///
    /// Returns the number of low-confidence rows.
    pub fn annotate(&self, rows: &mut [HolderFlowRow]) -> usize {
        let mut by_partition: BTreeMap<Partition, Vec<usize>> = BTreeMap::new();
        for (idx, row) in rows.iter().enumerate() {
            by_partition.entry(row.partition).or_default().push(idx);
        }

        let mut low_confidence = 0;
        for indices in by_partition.values() {
            let net: Vec<(NaiveDate, Option<f64>)> = indices
                .iter()
                .map(|&i| (rows[i].period, rows[i].net_velocity))
                .collect();
            let gross: Vec<(NaiveDate, Option<f64>)> = indices
                .iter()
                .map(|&i| (rows[i].period, rows[i].gross_velocity))
                .collect();

            let net_points = self.normalize_series(&net);
            let gross_points = self.normalize_series(&gross);

            for ((&i, n), g) in indices.iter().zip(net_points).zip(gross_points) {
                let row = &mut rows[i];
                row.net_velocity_baseline = n.baseline;
                row.net_velocity_relative = n.relative;
                row.gross_velocity_baseline = g.baseline;
                row.gross_velocity_relative = g.relative;
                row.low_confidence = n.low_confidence;
                if row.low_confidence {
                    low_confidence += 1;
                }
            }
        }

        low_confidence
    }
}

/// Median of the values, `None` when empty
fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
