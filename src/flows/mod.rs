//! Holder counts and acquisition/churn flows
//!
//! Independent of episode structure: operates on the full calendar using
//! as-of balances, partitioned by role (`all` plus one slice per role).
//!
//! Sign convention: `churned` is stored negative so that
//! `acquired + churned = net_change` and `acquired + |churned| = gross_turnover`.

pub mod aggregator;
pub mod as_of;
pub mod types;

pub use aggregator::HolderFlowAggregator;
pub use as_of::as_of_balance;
pub use types::{HolderFlowRow, Partition};
