//! Calendar expansion and episode-scoped forward-fill

use super::calendar::AnalysisWindow;
use super::episode::{BoundaryConvention, Episode};
use crate::source::types::EntityId;
use chrono::NaiveDate;
use serde::Serialize;

/// Reconstructed balance of one entity on one day within one episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyState {
    pub entity: EntityId,
    pub period: NaiveDate,
    pub episode_id: u32,
    pub episode_start: NaiveDate,
    /// Exit day, `None` while the episode is open
    pub episode_end: Option<NaiveDate>,
    /// Present only on days with an actual observation
    pub raw_balance: Option<f64>,
    /// Latest in-episode observation at or before `period`
    pub filled_balance: f64,
    /// Filled balance scaled to the known total (supply view only)
    pub normalized_balance: Option<f64>,
}

/// Expand one episode across its active days inside the window
///
/// Only the episode's own observations are consulted, so a balance can never
/// leak across an exit into a later episode. Observations before the window
/// start seed the fill for the first rendered day.
pub fn expand_episode(
    episode: &Episode,
    convention: BoundaryConvention,
    window: &AnalysisWindow,
) -> Vec<DailyState> {
    let Some((first, last)) = episode.active_range(convention, window) else {
        return Vec::new();
    };

    let observations = &episode.observations;
    let mut cursor = 0;
    let mut filled: Option<f64> = None;

    // Seed from history before the first rendered day
    while cursor < observations.len() && observations[cursor].0 < first {
        filled = Some(observations[cursor].1);
        cursor += 1;
    }

    let episode_end = episode.exit_period();
    let mut rows = Vec::with_capacity((last - first).num_days() as usize + 1);

    for period in first.iter_days().take_while(|d| *d <= last) {
        let raw_balance = match observations.get(cursor) {
            Some(&(obs_period, balance)) if obs_period == period => {
                cursor += 1;
                Some(balance)
            }
            _ => None,
        };

        if raw_balance.is_some() {
            filled = raw_balance;
        }

        // Every episode opens with an observation on its start day, so the
        // fill is always defined once we are inside the active range.
        let Some(filled_balance) = filled else {
            continue;
        };

        rows.push(DailyState {
            entity: episode.entity.clone(),
            period,
            episode_id: episode.episode_id,
            episode_start: episode.start,
            episode_end,
            raw_balance,
            filled_balance,
            normalized_balance: None,
        });
    }

    rows
}
