//! Ordered bucket definitions for share-of-supply cohorts and holding age

use serde::Serialize;

/// Share-of-total cohort: holders with `share < upper_bound` (first match wins)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortBucket {
    pub upper_bound: f64,
    pub label: String,
}

/// Age bucket: holding days `<= max_days` (first match wins)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBucket {
    pub max_days: i64,
    pub label: String,
}

/// Ascending cohort thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct CohortThresholds {
    buckets: Vec<CohortBucket>,
}

impl CohortThresholds {
    /// Returns None for an empty list or bounds that are not strictly ascending
    pub fn new(buckets: Vec<CohortBucket>) -> Option<Self> {
        let ascending = buckets
            .windows(2)
            .all(|pair| pair[0].upper_bound < pair[1].upper_bound);
        (!buckets.is_empty() && ascending).then_some(Self { buckets })
    }

    /// Default ladder, fractions of total supply
    pub fn standard() -> Self {
        Self {
            buckets: [
                (0.00001, "shrimp"),
                (0.0001, "crab"),
                (0.001, "fish"),
                (0.005, "dolphin"),
                (0.01, "shark"),
                (1.0, "whale"),
            ]
            .into_iter()
            .map(|(upper_bound, label)| CohortBucket {
                upper_bound,
                label: label.to_string(),
            })
            .collect(),
        }
    }

    pub fn buckets(&self) -> &[CohortBucket] {
        &self.buckets
    }

    /// Index of the smallest bucket whose bound exceeds `share`
    ///
    /// A share at or beyond the last bound (a single holder owning the whole
    /// known total) lands in the last bucket.
    pub fn assign(&self, share: f64) -> usize {
        self.buckets
            .iter()
            .position(|b| share < b.upper_bound)
            .unwrap_or(self.buckets.len() - 1)
    }
}

/// Ascending age boundaries in days
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBuckets {
    buckets: Vec<AgeBucket>,
}

impl AgeBuckets {
    pub fn new(buckets: Vec<AgeBucket>) -> Option<Self> {
        let ascending = buckets
            .windows(2)
            .all(|pair| pair[0].max_days < pair[1].max_days);
        (!buckets.is_empty() && ascending).then_some(Self { buckets })
    }

    pub fn standard() -> Self {
        Self {
            buckets: [
                (0, "fresh"),
                (7, "week"),
                (30, "month"),
                (90, "quarter"),
                (180, "half_year"),
                (365, "year"),
                (i64::MAX, "veteran"),
            ]
            .into_iter()
            .map(|(max_days, label)| AgeBucket {
                max_days,
                label: label.to_string(),
            })
            .collect(),
        }
    }

    pub fn buckets(&self) -> &[AgeBucket] {
        &self.buckets
    }

    /// Index of the first bucket covering `age_days`, last bucket for anything older
    pub fn assign(&self, age_days: i64) -> usize {
        self.buckets
            .iter()
            .position(|b| age_days <= b.max_days)
            .unwrap_or(self.buckets.len() - 1)
    }
}
