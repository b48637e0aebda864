//! As-of lookup: most recent observed balance at or before a day

use crate::reconstruct::EntityHistory;
use chrono::NaiveDate;

/// Balance at the latest observation `<= period`, `None` before the first one
pub fn as_of_balance(history: &EntityHistory, period: NaiveDate) -> Option<f64> {
    let idx = history
        .transitions
        .partition_point(|t| t.period <= period);
    idx.checked_sub(1).map(|i| history.transitions[i].balance)
}
