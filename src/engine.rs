//! Run orchestration
//!
//! One run rebuilds everything from the observation set:
//! 1. transition log (shared by both paths)
//! 2. supply-view reconstruction → classification → cohort/age distribution
//! 3. holder/flow aggregation → velocity baselines
//!
//! Nothing is carried between runs.

use crate::classify::{ClassifiedState, Classifier};
use crate::cohort::{CohortAgeEngine, DistributionRow};
use crate::config::{AnalysisConfig, ConfigError};
use crate::flows::{HolderFlowAggregator, HolderFlowRow};
use crate::reconstruct::{
    AnalysisWindow, BoundaryConvention, EntityDiagnostic, Episode, ReconstructError,
    Reconstruction, ReconstructionStats, ReconstructorSettings, StateReconstructor, TransitionLog,
};
use crate::source::{Observation, RoleOracle};
use crate::velocity::VelocityNormalizer;
use serde::Serialize;
use std::sync::Arc;

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub entities_seen: usize,
    /// Entities excluded for input-order or value violations
    pub diagnostics: Vec<EntityDiagnostic>,
    pub reconstruction: ReconstructionStats,
    pub state_rows: usize,
    pub distribution_rows: usize,
    pub flow_rows: usize,
    pub low_confidence_rows: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub window: AnalysisWindow,
    /// Supply-view daily state with role and significance labels
    pub state: Vec<ClassifiedState>,
    pub episodes: Vec<Episode>,
    pub distribution: Vec<DistributionRow>,
    pub flows: Vec<HolderFlowRow>,
    pub report: RunReport,
}

pub struct AnalysisEngine {
    config: AnalysisConfig,
    window: AnalysisWindow,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = config.window()?;
        Ok(Self { config, window })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn window(&self) -> AnalysisWindow {
        self.window
    }

    fn reconstructor(&self, convention: BoundaryConvention) -> StateReconstructor {
        StateReconstructor::new(ReconstructorSettings {
            window: self.window,
            convention,
            significance_floor: self.config.significance_floor,
            known_total_quantity: self.config.known_total_quantity,
        })
    }

    /// Reconstruct daily state under either boundary convention
    pub async fn reconstruct_view(
        &self,
        transitions: Arc<TransitionLog>,
        convention: BoundaryConvention,
    ) -> Result<Reconstruction, ReconstructError> {
        self.reconstructor(convention)
            .reconstruct_sharded(transitions, self.config.shard_count)
            .await
    }

    pub async fn run(
        &self,
        observations: &[Observation],
        oracle: &dyn RoleOracle,
    ) -> Result<AnalysisOutput, ReconstructError> {
        log::info!(
            "🚀 Analysis run {}..{} ({} days) over {} observations",
            self.window.start,
            self.window.end,
            self.window.len_days(),
            observations.len()
        );

        let (transitions, diagnostics) = TransitionLog::build(observations);
        let entities_seen = transitions.len() + diagnostics.len();
        let transitions = Arc::new(transitions);

        let supply = self
            .reconstruct_view(Arc::clone(&transitions), BoundaryConvention::SupplyDistribution)
            .await?;
        let Reconstruction {
            episodes,
            rows,
            stats,
            ..
        } = supply;

        let classifier = Classifier::new(self.config.significance_floor);
        let state = classifier.classify_states(oracle, rows);

        let distribution = CohortAgeEngine::new(
            self.window,
            self.config.known_total_quantity,
            self.config.cohort_thresholds.clone(),
            self.config.age_buckets.clone(),
        )
        .distribute(&state);

        let mut flows =
            HolderFlowAggregator::new(self.window, classifier).aggregate(&transitions, oracle);
        let low_confidence_rows =
            VelocityNormalizer::new(self.config.rolling_baseline_window_days).annotate(&mut flows);

        let report = RunReport {
            entities_seen,
            diagnostics,
            reconstruction: stats,
            state_rows: state.len(),
            distribution_rows: distribution.len(),
            flow_rows: flows.len(),
            low_confidence_rows,
        };

        log::info!(
            "✅ Run complete: {} entities ({} excluded), {} episodes, {} state rows, {} flow rows ({} low confidence)",
            report.entities_seen,
            report.diagnostics.len(),
            report.reconstruction.episodes,
            report.state_rows,
            report.flow_rows,
            report.low_confidence_rows
        );

        Ok(AnalysisOutput {
            window: self.window,
            state,
            episodes,
            distribution,
            flows,
            report,
        })
    }
}
