//! State Reconstructor - observation log to dense daily holder state
//!
//! Two phases separated by a barrier:
//! 1. Per entity (no cross-entity state, sharded across blocking tasks):
//!    noise filter → episode segmentation → validity filter → calendar
//!    expansion with episode-scoped forward-fill
//! 2. Per period (needs every entity's rows): overlap dedup → normalization

use super::calendar::AnalysisWindow;
use super::daily::{expand_episode, DailyState};
use super::episode::{segment_episodes, BoundaryConvention, Episode};
use super::error::ReconstructError;
use super::normalize::{apply_normalization, dedup_overlapping};
use super::transition::{EntityHistory, TransitionLog};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Parameters for one reconstruction pass
#[derive(Debug, Clone)]
pub struct ReconstructorSettings {
    pub window: AnalysisWindow,
    pub convention: BoundaryConvention,
    /// Entities whose balance never reaches this are not reconstructed
    pub significance_floor: f64,
    pub known_total_quantity: f64,
}

/// Output of the per-entity phase for one entity
#[derive(Debug, Clone, Default)]
pub struct EntityReconstruction {
    pub episodes: Vec<Episode>,
    pub rows: Vec<DailyState>,
    pub invalid_episodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconstructionStats {
    pub entities_tracked: usize,
    pub entities_below_floor: usize,
    pub episodes: usize,
    pub invalid_episodes: usize,
    pub duplicate_rows_removed: usize,
    pub rows: usize,
}

/// Validated, deduplicated, forward-filled daily state for one convention
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub window: AnalysisWindow,
    pub convention: BoundaryConvention,
    /// Valid episodes ordered by (entity, episode_id)
    pub episodes: Vec<Episode>,
    /// Ordered by (entity, period), one row per pair
    pub rows: Vec<DailyState>,
    pub stats: ReconstructionStats,
}

impl Reconstruction {
    /// Filled balance for an entity on a day, `None` when no episode covers it
    pub fn filled_balance(&self, entity: &str, period: NaiveDate) -> Option<f64> {
        self.row(entity, period).map(|r| r.filled_balance)
    }

    pub fn row(&self, entity: &str, period: NaiveDate) -> Option<&DailyState> {
        self.rows
            .binary_search_by(|r| (r.entity.as_str(), r.period).cmp(&(entity, period)))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn episodes_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Episode> + 'a {
        self.episodes.iter().filter(move |e| e.entity == entity)
    }
}

#[derive(Debug, Clone)]
pub struct StateReconstructor {
    settings: ReconstructorSettings,
}

impl StateReconstructor {
    pub fn new(settings: ReconstructorSettings) -> Self {
        Self { settings }
    }

    /// Whether the entity ever reached the significance floor
    pub fn is_tracked(&self, history: &EntityHistory) -> bool {
        let peak = history.peak_balance();
        peak > 0.0 && peak >= self.settings.significance_floor
    }

    /// Per-entity phase: segmentation, validity filter, expansion
    pub fn reconstruct_entity(&self, history: &EntityHistory) -> EntityReconstruction {
        let mut out = EntityReconstruction::default();

        for episode in segment_episodes(history) {
            if !episode.is_valid() {
                log::debug!(
                    "Dropping episode {} of {}: no positive observations",
                    episode.episode_id,
                    episode.entity
                );
                out.invalid_episodes += 1;
                continue;
            }

            out.rows.extend(expand_episode(
                &episode,
                self.settings.convention,
                &self.settings.window,
            ));
            out.episodes.push(episode);
        }

        out
    }

    /// Reconstruct every tracked entity on the current thread
    pub fn reconstruct(&self, transitions: &TransitionLog) -> Reconstruction {
        let part = self.reconstruct_range(transitions, 0, transitions.len());
        self.finish(vec![part])
    }

    /// Reconstruct with the per-entity phase split across `shards` blocking tasks
    ///
    /// Output is identical to `reconstruct` regardless of shard count.
    pub async fn reconstruct_sharded(
        &self,
        transitions: Arc<TransitionLog>,
        shards: usize,
    ) -> Result<Reconstruction, ReconstructError> {
        let shards = shards.max(1);
        let total = transitions.len();
        let chunk = total.div_ceil(shards).max(1);

        let mut handles = Vec::with_capacity(shards);
        let mut begin = 0;
        while begin < total {
            let end = (begin + chunk).min(total);
            let shared = Arc::clone(&transitions);
            let reconstructor = self.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let part = reconstructor.reconstruct_range(&shared, begin, end);
                log::debug!(
                    "Shard [{}, {}) done: {} episodes, {} rows",
                    begin,
                    end,
                    part.episodes.len(),
                    part.rows.len()
                );
                part
            }));
            begin = end;
        }

        // Barrier: every entity must be expanded before the per-period reduce
        let mut parts = Vec::with_capacity(handles.len());
        for handle in handles {
            let part = handle
                .await
                .map_err(|e| ReconstructError::WorkerFailed(e.to_string()))?;
            parts.push(part);
        }

        Ok(self.finish(parts))
    }

    fn reconstruct_range(
        &self,
        transitions: &TransitionLog,
        begin: usize,
        end: usize,
    ) -> ShardOutput {
        let mut shard = ShardOutput::default();

        for history in &transitions.histories()[begin..end] {
            if !self.is_tracked(history) {
                shard.below_floor += 1;
                continue;
            }

            let entity = self.reconstruct_entity(history);
            shard.tracked += 1;
            shard.invalid_episodes += entity.invalid_episodes;
            shard.episodes.extend(entity.episodes);
            shard.rows.extend(entity.rows);
        }

        shard
    }

    /// Per-period phase over all shard outputs, in entity order
    fn finish(&self, parts: Vec<ShardOutput>) -> Reconstruction {
        let mut stats = ReconstructionStats::default();
        let mut episodes = Vec::new();
        let mut rows = Vec::new();

        for part in parts {
            stats.entities_tracked += part.tracked;
            stats.entities_below_floor += part.below_floor;
            stats.invalid_episodes += part.invalid_episodes;
            episodes.extend(part.episodes);
            rows.extend(part.rows);
        }

        stats.duplicate_rows_removed = dedup_overlapping(&mut rows);

        if self.settings.convention == BoundaryConvention::SupplyDistribution {
            apply_normalization(&mut rows, self.settings.known_total_quantity);
        }

        stats.episodes = episodes.len();
        stats.rows = rows.len();

        log::info!(
            "🧩 Reconstructed {} view: {} entities, {} episodes ({} invalid), {} rows",
            self.settings.convention.as_str(),
            stats.entities_tracked,
            stats.episodes,
            stats.invalid_episodes,
            stats.rows
        );

        Reconstruction {
            window: self.settings.window,
            convention: self.settings.convention,
            episodes,
            rows,
            stats,
        }
    }
}

#[derive(Debug, Default)]
struct ShardOutput {
    tracked: usize,
    below_floor: usize,
    invalid_episodes: usize,
    episodes: Vec<Episode>,
    rows: Vec<DailyState>,
}
