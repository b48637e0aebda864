//! Daily analysis window

use chrono::NaiveDate;
use serde::Serialize;

/// Inclusive `[start, end]` range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    /// Returns None when `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, period: NaiveDate) -> bool {
        period >= self.start && period <= self.end
    }

    /// Every day in the window, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Zero-based day offset within the window
    pub fn index_of(&self, period: NaiveDate) -> Option<usize> {
        self.contains(period)
            .then(|| (period - self.start).num_days() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    #[test]
    fn test_days_inclusive() {
        let window = AnalysisWindow::new(day(27), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
            .unwrap();
        let days: Vec<NaiveDate> = window.days().collect();

        // 2024 is a leap year: 27, 28, 29, Mar 1, Mar 2
        assert_eq!(days.len(), 5);
        assert_eq!(window.len_days(), 5);
        assert_eq!(days[2], day(29));
        assert_eq!(window.index_of(day(29)), Some(2));
        assert_eq!(window.index_of(day(26)), None);
    }

    #[test]
    fn test_inverted_window_rejected() {
        assert!(AnalysisWindow::new(day(5), day(4)).is_none());
        assert!(AnalysisWindow::new(day(5), day(5)).is_some());
    }
}
