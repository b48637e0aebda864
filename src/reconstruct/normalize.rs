//! Deduplication and known-total normalization (the per-period reduce)
//!
//! Both run after every entity has been expanded. Normalization is two-pass:
//! pass 1 sums filled balances per period into an immutable map, pass 2 scales
//! each row by its own period's factor.

use super::daily::DailyState;
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Keep one row per (entity, period), preferring the most recent episode start
///
/// Leaves rows sorted by (entity, period). Returns the number of rows removed.
pub fn dedup_overlapping(rows: &mut Vec<DailyState>) -> usize {
    let before = rows.len();

    rows.sort_by(|a, b| {
        (a.entity.as_str(), a.period, Reverse(a.episode_start))
            .cmp(&(b.entity.as_str(), b.period, Reverse(b.episode_start)))
    });
    rows.dedup_by(|later, kept| later.entity == kept.entity && later.period == kept.period);

    before - rows.len()
}

/// Pass 1: sum of filled balances per period
pub fn period_totals(rows: &[DailyState]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for row in rows {
        *totals.entry(row.period).or_insert(0.0) += row.filled_balance;
    }
    totals
}

/// Scale factor that maps a period's observed sum onto the known total
///
/// `None` when nothing is held that period.
pub fn scale_factor(known_total: f64, period_total: f64) -> Option<f64> {
    (period_total > 0.0).then(|| known_total / period_total)
}

/// Pass 2: write `normalized_balance` on every row
pub fn apply_normalization(rows: &mut [DailyState], known_total: f64) {
    let totals = period_totals(rows);

    for row in rows.iter_mut() {
        let factor = totals
            .get(&row.period)
            .and_then(|total| scale_factor(known_total, *total));
        row.normalized_balance = factor.map(|f| row.filled_balance * f);
    }
}
