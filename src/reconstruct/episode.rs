//! Episode segmentation - ownership episodes as an explicit state machine
//!
//! ```text
//! NotHolding --entry--> Holding(1) --exit--> NotHolding --entry--> Holding(2) ...
//! ```
//!
//! Episode ids are the running count of entries for the entity, so they start
//! at 1 and never decrease. Noise transitions (zero with no positive prior)
//! never reach the state machine.

use super::calendar::AnalysisWindow;
use super::transition::{EntityHistory, Transition};
use crate::source::types::EntityId;
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// How the exit day of an episode is treated when rendering daily rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryConvention {
    /// Exit day included: the holder held supply at the start of that day
    HolderCount,
    /// Exit day excluded: the supply has already left
    SupplyDistribution,
}

impl BoundaryConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryConvention::HolderCount => "holder_count",
            BoundaryConvention::SupplyDistribution => "supply_distribution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "period")]
pub enum EpisodeEnd {
    /// First day the balance returned to zero
    Exited(NaiveDate),
    /// Still holding; bounded by the window end at render time only
    Open,
}

/// One continuous holding span for one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub entity: EntityId,
    pub episode_id: u32,
    pub start: NaiveDate,
    pub end: EpisodeEnd,
    /// Actual observations inside the episode, ascending, exit observation included
    #[serde(skip)]
    pub observations: Vec<(NaiveDate, f64)>,
}

impl Episode {
    /// Observed balances summed to something positive
    pub fn is_valid(&self) -> bool {
        self.observations.iter().map(|(_, b)| b).sum::<f64>() > 0.0
    }

    pub fn exit_period(&self) -> Option<NaiveDate> {
        match self.end {
            EpisodeEnd::Exited(p) => Some(p),
            EpisodeEnd::Open => None,
        }
    }

    /// Last day the episode counts as active under `convention`, before clipping
    ///
    /// `None` means the episode is open.
    pub fn last_active_day(&self, convention: BoundaryConvention) -> Option<NaiveDate> {
        self.exit_period().map(|exit| match convention {
            BoundaryConvention::HolderCount => exit,
            BoundaryConvention::SupplyDistribution => exit
                .checked_sub_days(Days::new(1))
                .unwrap_or(exit),
        })
    }

    /// Inclusive active range clipped to the window, `None` if nothing remains
    pub fn active_range(
        &self,
        convention: BoundaryConvention,
        window: &AnalysisWindow,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.start.max(window.start);
        let last = self
            .last_active_day(convention)
            .map_or(window.end, |d| d.min(window.end));

        (first <= last).then_some((first, last))
    }

    /// Whether `period` lies inside the episode under `convention`, ignoring any window
    pub fn covers(&self, period: NaiveDate, convention: BoundaryConvention) -> bool {
        period >= self.start
            && self
                .last_active_day(convention)
                .map_or(true, |last| period <= last)
    }
}

/// Holding state of one entity while walking its transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingState {
    NotHolding { episodes_seen: u32 },
    Holding { episode_id: u32 },
}

impl Default for HoldingState {
    fn default() -> Self {
        HoldingState::NotHolding { episodes_seen: 0 }
    }
}

/// Outcome of feeding one transition to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Entered(u32),
    Held(u32),
    Exited(u32),
    Idle,
}

impl HoldingState {
    pub fn current_episode(&self) -> Option<u32> {
        match self {
            HoldingState::Holding { episode_id } => Some(*episode_id),
            HoldingState::NotHolding { .. } => None,
        }
    }

    pub fn advance(&mut self, t: &Transition) -> Step {
        match *self {
            HoldingState::NotHolding { episodes_seen } => {
                if t.is_entry() {
                    let episode_id = episodes_seen + 1;
                    *self = HoldingState::Holding { episode_id };
                    Step::Entered(episode_id)
                } else {
                    Step::Idle
                }
            }
            HoldingState::Holding { episode_id } => {
                if t.is_exit() {
                    *self = HoldingState::NotHolding {
                        episodes_seen: episode_id,
                    };
                    Step::Exited(episode_id)
                } else {
                    Step::Held(episode_id)
                }
            }
        }
    }
}

/// Split an entity's history into episodes (validity not yet checked)
pub fn segment_episodes(history: &EntityHistory) -> Vec<Episode> {
    let mut state = HoldingState::default();
    let mut episodes: Vec<Episode> = Vec::new();

    for t in history.transitions.iter().filter(|t| !t.is_noise()) {
        match state.advance(t) {
            Step::Entered(episode_id) => episodes.push(Episode {
                entity: history.entity.clone(),
                episode_id,
                start: t.period,
                end: EpisodeEnd::Open,
                observations: vec![(t.period, t.balance)],
            }),
            Step::Held(_) => {
                if let Some(current) = episodes.last_mut() {
                    current.observations.push((t.period, t.balance));
                }
            }
            Step::Exited(_) => {
                if let Some(current) = episodes.last_mut() {
                    current.observations.push((t.period, t.balance));
                    current.end = EpisodeEnd::Exited(t.period);
                }
            }
            Step::Idle => {}
        }
    }

    episodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn history(obs: &[(u32, f64)]) -> EntityHistory {
        let obs: Vec<(NaiveDate, f64)> = obs.iter().map(|&(d, b)| (day(d), b)).collect();
        EntityHistory::from_observations("w1".to_string(), &obs).unwrap()
    }

    #[test]
    fn test_exit_and_reentry_creates_two_episodes() {
        let episodes = segment_episodes(&history(&[(1, 500.0), (15, 0.0), (20, 250.0)]));

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].episode_id, 1);
        assert_eq!(episodes[0].start, day(1));
        assert_eq!(episodes[0].end, EpisodeEnd::Exited(day(15)));
        assert_eq!(episodes[1].episode_id, 2);
        assert_eq!(episodes[1].start, day(20));
        assert_eq!(episodes[1].end, EpisodeEnd::Open);
    }

    #[test]
    fn test_leading_zero_is_noise() {
        let episodes = segment_episodes(&history(&[(1, 0.0)]));
        assert!(episodes.is_empty());

        let episodes = segment_episodes(&history(&[(1, 0.0), (2, 0.0), (3, 10.0)]));
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].start, day(3));
        assert_eq!(episodes[0].episode_id, 1);
    }

    #[test]
    fn test_balance_changes_stay_in_episode() {
        let episodes = segment_episodes(&history(&[(1, 10.0), (2, 30.0), (5, 5.0)]));

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].observations.len(), 3);
        assert_eq!(episodes[0].end, EpisodeEnd::Open);
    }

    #[test]
    fn test_state_machine_monotonic() {
        let mut state = HoldingState::default();
        let h = history(&[(1, 1.0), (2, 0.0), (3, 2.0), (4, 0.0), (5, 3.0)]);
        let mut last_seen = 0;

        for t in &h.transitions {
            state.advance(t);
            if let Some(id) = state.current_episode() {
                assert!(id >= last_seen);
                last_seen = id;
            }
        }
        assert_eq!(state, HoldingState::Holding { episode_id: 3 });
    }

    #[test]
    fn test_boundary_conventions() {
        let episodes = segment_episodes(&history(&[(1, 500.0), (15, 0.0)]));
        let window = AnalysisWindow::new(day(1), day(31)).unwrap();
        let ep = &episodes[0];

        assert_eq!(
            ep.active_range(BoundaryConvention::HolderCount, &window),
            Some((day(1), day(15)))
        );
        assert_eq!(
            ep.active_range(BoundaryConvention::SupplyDistribution, &window),
            Some((day(1), day(14)))
        );
        assert!(ep.covers(day(15), BoundaryConvention::HolderCount));
        assert!(!ep.covers(day(15), BoundaryConvention::SupplyDistribution));
    }

    #[test]
    fn test_open_episode_clipped_to_window() {
        let episodes = segment_episodes(&history(&[(3, 5.0)]));
        let window = AnalysisWindow::new(day(10), day(20)).unwrap();

        assert_eq!(
            episodes[0].active_range(BoundaryConvention::SupplyDistribution, &window),
            Some((day(10), day(20)))
        );

        let late = AnalysisWindow::new(day(1), day(2)).unwrap();
        assert_eq!(
            episodes[0].active_range(BoundaryConvention::HolderCount, &late),
            None
        );
    }

    #[test]
    fn test_validity() {
        let mut ep = segment_episodes(&history(&[(1, 5.0)])).remove(0);
        assert!(ep.is_valid());

        ep.observations = vec![(day(1), 0.0)];
        assert!(!ep.is_valid());
    }
}
