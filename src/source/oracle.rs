//! Role oracle - static address classification sources
//!
//! Two set-membership predicates supplied from outside the engine:
//! - liquidity pools / program-owned accounts ("infrastructure")
//! - wallets with recent swap activity ("active traders")
//!
//! Sets are fixed for the duration of an analysis window.

use std::collections::HashSet;

/// Set-membership queries used by the classifier
pub trait RoleOracle: Send + Sync {
    /// Returns true if the address is a pool, vault or program-owned account
    fn is_infrastructure(&self, entity: &str) -> bool;

    /// Returns true if the address traded during the analysis window
    fn is_active_trader(&self, entity: &str) -> bool;
}

/// In-memory oracle backed by two address sets
#[derive(Debug, Clone, Default)]
pub struct RoleSets {
    infrastructure: HashSet<String>,
    active_traders: HashSet<String>,
}

impl RoleSets {
    pub fn new(infrastructure: HashSet<String>, active_traders: HashSet<String>) -> Self {
        Self {
            infrastructure,
            active_traders,
        }
    }

    pub fn infrastructure_addresses(&self) -> &HashSet<String> {
        &self.infrastructure
    }

    pub fn active_participant_addresses(&self) -> &HashSet<String> {
        &self.active_traders
    }
}

impl RoleOracle for RoleSets {
    fn is_infrastructure(&self, entity: &str) -> bool {
        self.infrastructure.contains(entity)
    }

    fn is_active_trader(&self, entity: &str) -> bool {
        self.active_traders.contains(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let sets = RoleSets::new(
            ["pool1".to_string()].into_iter().collect(),
            ["trader1".to_string(), "pool1".to_string()].into_iter().collect(),
        );

        assert!(sets.is_infrastructure("pool1"));
        assert!(sets.is_active_trader("pool1"));
        assert!(sets.is_active_trader("trader1"));
        assert!(!sets.is_infrastructure("trader1"));
        assert!(!sets.is_infrastructure("unknown"));
        assert!(!sets.is_active_trader("unknown"));
    }

    #[test]
    fn test_empty_oracle() {
        let sets = RoleSets::default();
        assert!(sets.infrastructure_addresses().is_empty());
        assert!(sets.active_participant_addresses().is_empty());
        assert!(!sets.is_infrastructure("anything"));
    }
}
