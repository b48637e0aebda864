//! Cohort/Age Engine - supply distribution by holder size and holding age
//!
//! Consumes normalized supply-view state. Each (entity, day) lands in:
//! - one cohort bucket by `normalized_balance / known_total`
//! - one age bucket by days since the start of the *current* episode
//!
//! Both dimensions are summed per day and bucket. Every bucket is emitted for
//! every window day, zero when empty, so consumers get a dense table.

pub mod buckets;

pub use buckets::{AgeBucket, AgeBuckets, CohortBucket, CohortThresholds};

use crate::classify::ClassifiedState;
use crate::reconstruct::AnalysisWindow;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionDimension {
    Cohort,
    Age,
}

impl DistributionDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionDimension::Cohort => "cohort",
            DistributionDimension::Age => "age",
        }
    }
}

/// Supply held by one bucket on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub period: NaiveDate,
    pub dimension: DistributionDimension,
    pub bucket: String,
    /// Position of the bucket in its ladder, for stable ordering
    pub bucket_order: usize,
    pub holders: u64,
    pub balance: f64,
    pub share_of_total: f64,
}

pub struct CohortAgeEngine {
    window: AnalysisWindow,
    known_total_quantity: f64,
    cohorts: CohortThresholds,
    ages: AgeBuckets,
}

impl CohortAgeEngine {
    pub fn new(
        window: AnalysisWindow,
        known_total_quantity: f64,
        cohorts: CohortThresholds,
        ages: AgeBuckets,
    ) -> Self {
        Self {
            window,
            known_total_quantity,
            cohorts,
            ages,
        }
    }

    pub fn share_of_total(&self, normalized_balance: f64) -> f64 {
        normalized_balance / self.known_total_quantity
    }

    /// Holding age in days within the current episode
    pub fn age_days(period: NaiveDate, episode_start: NaiveDate) -> i64 {
        (period - episode_start).num_days()
    }

    /// Rows ordered by day, then cohort ladder, then age ladder
    ///
    /// States without a normalized balance (holder view, or a day with nothing
    /// held) are skipped.
    pub fn distribute(&self, states: &[ClassifiedState]) -> Vec<DistributionRow> {
        let days = self.window.len_days();
        let n_cohorts = self.cohorts.buckets().len();
        let n_ages = self.ages.buckets().len();

        // (holders, balance) per day per bucket
        let mut cohort_totals = vec![vec![(0u64, 0.0f64); n_cohorts]; days];
        let mut age_totals = vec![vec![(0u64, 0.0f64); n_ages]; days];
        let mut skipped = 0usize;

        for labeled in states {
            let state = &labeled.state;
            let (Some(idx), Some(normalized)) =
                (self.window.index_of(state.period), state.normalized_balance)
            else {
                skipped += 1;
                continue;
            };

            let cohort = self.cohorts.assign(self.share_of_total(normalized));
            let age = self
                .ages
                .assign(Self::age_days(state.period, state.episode_start));

            cohort_totals[idx][cohort].0 += 1;
            cohort_totals[idx][cohort].1 += normalized;
            age_totals[idx][age].0 += 1;
            age_totals[idx][age].1 += normalized;
        }

        if skipped > 0 {
            log::debug!("Cohort/age: skipped {} states without normalized balance", skipped);
        }

        let mut rows = Vec::with_capacity(days * (n_cohorts + n_ages));
        for (idx, period) in self.window.days().enumerate() {
            for (order, bucket) in self.cohorts.buckets().iter().enumerate() {
                let (holders, balance) = cohort_totals[idx][order];
                rows.push(self.row(
                    period,
                    DistributionDimension::Cohort,
                    &bucket.label,
                    order,
                    holders,
                    balance,
                ));
            }
            for (order, bucket) in self.ages.buckets().iter().enumerate() {
                let (holders, balance) = age_totals[idx][order];
                rows.push(self.row(
                    period,
                    DistributionDimension::Age,
                    &bucket.label,
                    order,
                    holders,
                    balance,
                ));
            }
        }

        rows
    }

    fn row(
        &self,
        period: NaiveDate,
        dimension: DistributionDimension,
        label: &str,
        bucket_order: usize,
        holders: u64,
        balance: f64,
    ) -> DistributionRow {
        DistributionRow {
            period,
            dimension,
            bucket: label.to_string(),
            bucket_order,
            holders,
            balance,
            share_of_total: self.share_of_total(balance),
        }
    }
}
