//! Transition detection - pairs each observation with the prior observed balance
//!
//! This is the primitive shared by both analysis paths: episode reconstruction
//! (dense, episode-bounded) and holder/flow aggregation (full-calendar as-of).

use super::error::{EntityDiagnostic, ReconstructError};
use crate::source::types::{EntityId, Observation};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// An observation paired with the entity's previous observed balance
///
/// The owning entity is carried by the enclosing `EntityHistory`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub period: NaiveDate,
    pub balance: f64,
    /// Balance at the most recent earlier observation, `None` for the first one
    pub prior_balance: Option<f64>,
}

impl Transition {
    /// Zero balance with no positive prior: no economic signal
    pub fn is_noise(&self) -> bool {
        self.balance <= 0.0 && self.prior_balance.map_or(true, |p| p <= 0.0)
    }

    /// Balance becomes positive having previously been zero or absent
    pub fn is_entry(&self) -> bool {
        self.balance > 0.0 && self.prior_balance.map_or(true, |p| p <= 0.0)
    }

    /// Balance returns to zero from a positive prior
    pub fn is_exit(&self) -> bool {
        self.balance <= 0.0 && self.prior_balance.map_or(false, |p| p > 0.0)
    }
}

/// Ordered transitions for a single entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityHistory {
    pub entity: EntityId,
    /// Strictly increasing by period
    pub transitions: Vec<Transition>,
}

impl EntityHistory {
    /// Build transitions from one entity's observations in supplied order
    ///
    /// Order is a precondition: a period that does not strictly follow the
    /// previous one is an error, never re-sorted.
    pub fn from_observations(
        entity: EntityId,
        observations: &[(NaiveDate, f64)],
    ) -> Result<Self, ReconstructError> {
        let mut transitions = Vec::with_capacity(observations.len());
        let mut prior: Option<(NaiveDate, f64)> = None;

        for &(period, balance) in observations {
            if !(balance >= 0.0) {
                return Err(ReconstructError::NegativeBalance {
                    entity,
                    period,
                    balance,
                });
            }

            if let Some((previous, _)) = prior {
                if period <= previous {
                    return Err(ReconstructError::OutOfOrder {
                        entity,
                        period,
                        previous,
                    });
                }
            }

            transitions.push(Transition {
                period,
                balance,
                prior_balance: prior.map(|(_, b)| b),
            });
            prior = Some((period, balance));
        }

        Ok(Self {
            entity,
            transitions,
        })
    }

    /// Largest observed balance, 0.0 when empty
    pub fn peak_balance(&self) -> f64 {
        self.transitions
            .iter()
            .map(|t| t.balance)
            .fold(0.0, f64::max)
    }
}

/// Per-entity transition histories for a whole run, ordered by entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionLog {
    histories: Vec<EntityHistory>,
}

impl TransitionLog {
    /// Group observations by entity and derive transitions
    ///
    /// Entities that violate ordering or carry negative balances are excluded
    /// and returned as diagnostics; every other entity is unaffected.
    pub fn build(observations: &[Observation]) -> (Self, Vec<EntityDiagnostic>) {
        let mut grouped: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for obs in observations {
            grouped
                .entry(obs.entity.as_str())
                .or_default()
                .push((obs.period, obs.balance));
        }

        let mut histories = Vec::with_capacity(grouped.len());
        let mut diagnostics = Vec::new();

        for (entity, entity_obs) in grouped {
            match EntityHistory::from_observations(entity.to_string(), &entity_obs) {
                Ok(history) => histories.push(history),
                Err(e) => {
                    log::warn!("⚠️  Excluding entity from run: {}", e);
                    if let Some(diag) = EntityDiagnostic::from_error(&e) {
                        diagnostics.push(diag);
                    }
                }
            }
        }

        (Self { histories }, diagnostics)
    }

    pub fn histories(&self) -> &[EntityHistory] {
        &self.histories
    }

    pub fn get(&self, entity: &str) -> Option<&EntityHistory> {
        self.histories
            .binary_search_by(|h| h.entity.as_str().cmp(entity))
            .ok()
            .map(|idx| &self.histories[idx])
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_prior_balance_chain() {
        let history = EntityHistory::from_observations(
            "w1".to_string(),
            &[(day(1), 100.0), (day(3), 40.0), (day(9), 0.0)],
        )
        .unwrap();

        let priors: Vec<Option<f64>> =
            history.transitions.iter().map(|t| t.prior_balance).collect();
        assert_eq!(priors, vec![None, Some(100.0), Some(40.0)]);
        assert!(history.transitions[0].is_entry());
        assert!(!history.transitions[1].is_entry());
        assert!(history.transitions[2].is_exit());
    }

    #[test]
    fn test_noise_classification() {
        let first_zero = Transition {
            period: day(1),
            balance: 0.0,
            prior_balance: None,
        };
        let zero_after_zero = Transition {
            period: day(2),
            balance: 0.0,
            prior_balance: Some(0.0),
        };
        let exit = Transition {
            period: day(3),
            balance: 0.0,
            prior_balance: Some(5.0),
        };

        assert!(first_zero.is_noise());
        assert!(zero_after_zero.is_noise());
        assert!(!exit.is_noise());
        assert!(!first_zero.is_entry());
        assert!(!first_zero.is_exit());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let result = EntityHistory::from_observations(
            "w1".to_string(),
            &[(day(5), 1.0), (day(2), 2.0)],
        );

        assert_eq!(
            result.unwrap_err(),
            ReconstructError::OutOfOrder {
                entity: "w1".to_string(),
                period: day(2),
                previous: day(5),
            }
        );
    }

    #[test]
    fn test_duplicate_period_rejected() {
        let result = EntityHistory::from_observations(
            "w1".to_string(),
            &[(day(5), 1.0), (day(5), 2.0)],
        );

        assert!(matches!(result, Err(ReconstructError::OutOfOrder { .. })));
    }

    #[test]
    fn test_nan_balance_rejected() {
        let result = EntityHistory::from_observations(
            "w1".to_string(),
            &[(day(1), 10.0), (day(2), f64::NAN)],
        );
        assert!(matches!(
            result,
            Err(ReconstructError::NegativeBalance { period, .. }) if period == day(2)
        ));

        let (log, diagnostics) = TransitionLog::build(&[
            Observation::new("ok", day(1), 5.0),
            Observation::new("w1", day(1), 10.0),
            Observation::new("w1", day(2), f64::NAN),
        ]);
        assert_eq!(log.len(), 1);
        assert!(log.get("w1").is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].entity, "w1");
    }

    #[test]
    fn test_log_excludes_bad_entity_only() {
        let observations = vec![
            Observation::new("good", day(1), 10.0),
            Observation::new("bad", day(4), 10.0),
            Observation::new("good", day(2), 12.0),
            Observation::new("bad", day(3), 10.0),
        ];

        let (log, diagnostics) = TransitionLog::build(&observations);

        assert_eq!(log.len(), 1);
        assert!(log.get("good").is_some());
        assert!(log.get("bad").is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].entity, "bad");
        assert_eq!(diagnostics[0].period, day(3));
    }

    #[test]
    fn test_log_ordered_by_entity() {
        let observations = vec![
            Observation::new("zeta", day(1), 1.0),
            Observation::new("alpha", day(1), 1.0),
            Observation::new("mid", day(1), 1.0),
        ];

        let (log, _) = TransitionLog::build(&observations);
        let names: Vec<&str> = log.histories().iter().map(|h| h.entity.as_str()).collect();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(log.get("mid").unwrap().peak_balance(), 1.0);
    }
}
