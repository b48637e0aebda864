//! Source adapters - observation log and role oracle
//!
//! Both inputs are external and immutable for the duration of a run:
//! - `balance_observations` - one balance per (entity, day), never negative
//! - `infrastructure_addresses` / `active_trader_addresses` - role sets

pub mod oracle;
pub mod sqlite_reader;
pub mod types;

pub use oracle::{RoleOracle, RoleSets};
pub use sqlite_reader::{ReaderError, SqliteSourceReader};
pub use types::{EntityId, Observation};
