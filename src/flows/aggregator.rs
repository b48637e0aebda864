//! Holder/Flow Aggregator - daily holder counts and floor-crossing flows
//!
//! Works straight off the transition log, independent of episodes:
//! - holder counts use the as-of balance (latest observation at or before the day)
//! - flows are detected on observation days only, since a crossing can only
//!   happen when a new balance is recorded
//!
//! Rather than probing every entity on every day, each transition contributes a
//! status delta to its own day and the calendar is swept once with running
//! totals. Status held before the window start is folded into the opening count.

use super::as_of::as_of_balance;
use super::types::{per_holder, HolderFlowRow, Partition};
use crate::classify::Classifier;
use crate::reconstruct::{AnalysisWindow, TransitionLog};
use crate::source::oracle::RoleOracle;

#[derive(Debug, Clone, Copy, Default)]
struct DayDeltas {
    holders: i64,
    significant: i64,
    acquired: i64,
    churned: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Opening {
    holders: i64,
    significant: i64,
}

pub struct HolderFlowAggregator {
    window: AnalysisWindow,
    classifier: Classifier,
}

impl HolderFlowAggregator {
    pub fn new(window: AnalysisWindow, classifier: Classifier) -> Self {
        Self { window, classifier }
    }

    /// One row per (day, partition), ordered by day then partition
    ///
    /// Velocity baseline fields are left for the velocity normalizer.
    pub fn aggregate(
        &self,
        transitions: &TransitionLog,
        oracle: &dyn RoleOracle,
    ) -> Vec<HolderFlowRow> {
        let days = self.window.len_days();
        let mut opening = [Opening::default(); 4];
        let mut deltas = vec![[DayDeltas::default(); 4]; days];
        let day_before_start = self.window.start.pred_opt();

        for history in transitions.histories() {
            let role = self.classifier.role(oracle, &history.entity);
            let targets = [Partition::All.index(), Partition::from(role).index()];

            if let Some(balance) = day_before_start.and_then(|d| as_of_balance(history, d)) {
                let held = (balance > 0.0) as i64;
                let significant = self.classifier.is_significant(balance) as i64;
                for &p in &targets {
                    opening[p].holders += held;
                    opening[p].significant += significant;
                }
            }

            let first_in_window = history
                .transitions
                .partition_point(|t| t.period < self.window.start);

            for t in &history.transitions[first_in_window..] {
                let Some(idx) = self.window.index_of(t.period) else {
                    break;
                };

                let prior = t.prior_balance.unwrap_or(0.0);
                let held = (t.balance > 0.0) as i64 - (prior > 0.0) as i64;
                let significant = self.classifier.is_significant(t.balance) as i64
                    - self.classifier.is_significant(prior) as i64;

                for &p in &targets {
                    let day = &mut deltas[idx][p];
                    day.holders += held;
                    day.significant += significant;
                    if significant > 0 {
                        day.acquired += 1;
                    } else if significant < 0 {
                        day.churned -= 1;
                    }
                }
            }
        }

        let mut running = opening;
        let mut rows = Vec::with_capacity(days * 4);

        for (period, day) in self.window.days().zip(deltas.iter()) {
            for partition in Partition::all() {
                let p = partition.index();
                running[p].holders += day[p].holders;
                running[p].significant += day[p].significant;

                let mut row = HolderFlowRow::new(period, partition);
                row.holders = running[p].holders.max(0) as u64;
                row.significant_holders = running[p].significant.max(0) as u64;
                row.acquired = day[p].acquired;
                row.churned = day[p].churned;
                row.net_change = row.acquired + row.churned;
                row.gross_turnover = row.acquired + row.churned.abs();
                row.net_velocity = per_holder(row.net_change, row.significant_holders);
                row.gross_velocity = per_holder(row.gross_turnover, row.significant_holders);
                rows.push(row);
            }
        }

        log::info!(
            "👥 Holder flows: {} days × {} partitions from {} entities",
            days,
            Partition::all().len(),
            transitions.len()
        );

        rows
    }
}
