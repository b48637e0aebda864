//! Role and significance classification
//!
//! # Roles
//! - **infrastructure**: pools, vaults, program-owned accounts
//! - **active_participant**: wallets that traded in the window
//! - **passive_holder**: everything else (also the fallback for unknown addresses)
//!
//! # Priority
//! infrastructure > active_participant > passive_holder. A pool address that
//! also shows up in the trader set is still infrastructure.

use crate::reconstruct::DailyState;
use crate::source::oracle::RoleOracle;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Infrastructure,
    ActiveParticipant,
    PassiveHolder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Infrastructure => "infrastructure",
            Role::ActiveParticipant => "active_participant",
            Role::PassiveHolder => "passive_holder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    AboveFloor,
    BelowFloor,
}

impl Significance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Significance::AboveFloor => "above_floor",
            Significance::BelowFloor => "below_floor",
        }
    }
}

/// Daily state row with role and significance labels attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedState {
    #[serde(flatten)]
    pub state: DailyState,
    pub role: Role,
    pub significance: Significance,
}

pub struct Classifier {
    significance_floor: f64,
}

impl Classifier {
    pub fn new(significance_floor: f64) -> Self {
        Self { significance_floor }
    }

    /// Resolve an entity's role with fixed precedence
    pub fn role(&self, oracle: &dyn RoleOracle, entity: &str) -> Role {
        if oracle.is_infrastructure(entity) {
            return Role::Infrastructure;
        }

        if oracle.is_active_trader(entity) {
            return Role::ActiveParticipant;
        }

        Role::PassiveHolder
    }

    /// Positive and at or above the floor
    pub fn is_significant(&self, balance: f64) -> bool {
        balance > 0.0 && balance >= self.significance_floor
    }

    pub fn significance(&self, balance: f64) -> Significance {
        if self.is_significant(balance) {
            Significance::AboveFloor
        } else {
            Significance::BelowFloor
        }
    }

    /// Label reconstructed rows; role lookups are cached per entity run
    pub fn classify_states(
        &self,
        oracle: &dyn RoleOracle,
        rows: Vec<DailyState>,
    ) -> Vec<ClassifiedState> {
        let mut cached: Option<(String, Role)> = None;
        let mut out = Vec::with_capacity(rows.len());

        for state in rows {
            let role = match &cached {
                Some((entity, role)) if *entity == state.entity => *role,
                _ => {
                    let role = self.role(oracle, &state.entity);
                    cached = Some((state.entity.clone(), role));
                    role
                }
            };

            let significance = self.significance(state.filled_balance);
            out.push(ClassifiedState {
                state,
                role,
                significance,
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::oracle::RoleSets;
    use chrono::NaiveDate;

    fn oracle() -> RoleSets {
        RoleSets::new(
            ["pool".to_string(), "pool_that_trades".to_string()]
                .into_iter()
                .collect(),
            ["trader".to_string(), "pool_that_trades".to_string()]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_role_precedence() {
        let classifier = Classifier::new(1.0);
        let oracle = oracle();

        assert_eq!(classifier.role(&oracle, "pool"), Role::Infrastructure);
        assert_eq!(classifier.role(&oracle, "trader"), Role::ActiveParticipant);
        assert_eq!(classifier.role(&oracle, "pool_that_trades"), Role::Infrastructure);
    }

    #[test]
    fn test_unknown_address_is_passive() {
        let classifier = Classifier::new(1.0);
        assert_eq!(classifier.role(&oracle(), "nobody"), Role::PassiveHolder);
    }

    #[test]
    fn test_significance_floor() {
        let classifier = Classifier::new(100.0);

        assert_eq!(classifier.significance(100.0), Significance::AboveFloor);
        assert_eq!(classifier.significance(99.99), Significance::BelowFloor);
        assert_eq!(classifier.significance(0.0), Significance::BelowFloor);

        // Zero floor still excludes empty balances
        let zero_floor = Classifier::new(0.0);
        assert!(!zero_floor.is_significant(0.0));
        assert!(zero_floor.is_significant(0.001));
    }

    #[test]
    fn test_classify_states() {
        let classifier = Classifier::new(10.0);
        let period = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let make = |entity: &str, filled: f64| DailyState {
            entity: entity.to_string(),
            period,
            episode_id: 1,
            episode_start: period,
            episode_end: None,
            raw_balance: Some(filled),
            filled_balance: filled,
            normalized_balance: None,
        };

        let labeled = classifier.classify_states(
            &oracle(),
            vec![make("pool", 500.0), make("trader", 5.0), make("nobody", 50.0)],
        );

        assert_eq!(labeled[0].role, Role::Infrastructure);
        assert_eq!(labeled[0].significance, Significance::AboveFloor);
        assert_eq!(labeled[1].role, Role::ActiveParticipant);
        assert_eq!(labeled[1].significance, Significance::BelowFloor);
        assert_eq!(labeled[2].role, Role::PassiveHolder);

        let json = serde_json::to_value(&labeled[0]).unwrap();
        assert_eq!(json["role"], "infrastructure");
        assert_eq!(json["significance"], "above_floor");
        assert_eq!(json["entity"], "pool");
    }
}
