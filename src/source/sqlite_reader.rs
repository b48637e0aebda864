//! SQLite-based observation and oracle reader
//!
//! Reads the append-only balance log and the two role address sets from the
//! source database. The connection is opened read-only; nothing here writes.

use super::oracle::RoleSets;
use super::types::{parse_period, Observation};
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug)]
pub enum ReaderError {
    Database(rusqlite::Error),
    InvalidPeriod { entity: String, value: String },
    NegativeBalance { entity: String, period: NaiveDate, balance: f64 },
}

impl From<rusqlite::Error> for ReaderError {
    fn from(err: rusqlite::Error) -> Self {
        ReaderError::Database(err)
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Database(e) => write!(f, "Database error: {}", e),
            ReaderError::InvalidPeriod { entity, value } => {
                write!(f, "Invalid period '{}' for entity {}", value, entity)
            }
            ReaderError::NegativeBalance { entity, period, balance } => write!(
                f,
                "Negative balance {} for entity {} on {}",
                balance, entity, period
            ),
        }
    }
}

impl std::error::Error for ReaderError {}

/// Read-only reader over the source database
pub struct SqliteSourceReader {
    conn: Connection,
}

impl SqliteSourceReader {
    /// Open the source database in read-only mode
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let conn = Connection::open(db_path)?;

        apply_optimized_pragmas(&conn).map_err(ReaderError::Database)?;

        // Must be after PRAGMAs
        conn.execute("PRAGMA query_only = ON", [])?;

        Ok(Self { conn })
    }

    /// Read every observation at or before `end`, ordered by (entity, period)
    ///
    /// History before the analysis start is included on purpose: it seeds
    /// episode state and as-of balances on the first day of the window.
    /// Periods are compared as dates after parsing, so stored text that is not
    /// zero-padded (`2024-9-30`) still filters and orders correctly.
    pub fn read_observations(&self, end: NaiveDate) -> Result<Vec<Observation>, ReaderError> {
        let mut stmt = self.conn.prepare(
            "SELECT entity, period, balance
             FROM balance_observations",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut observations = Vec::new();
        for result in rows {
            let (entity, period_str, balance) = result?;

            let period = parse_period(&period_str).ok_or_else(|| ReaderError::InvalidPeriod {
                entity: entity.clone(),
                value: period_str.clone(),
            })?;

            if period > end {
                continue;
            }

            if !(balance >= 0.0) {
                return Err(ReaderError::NegativeBalance { entity, period, balance });
            }

            observations.push(Observation { entity, period, balance });
        }

        observations.sort_by(|a, b| {
            (a.entity.as_str(), a.period).cmp(&(b.entity.as_str(), b.period))
        });

        log::info!(
            "📥 Read {} balance observations up to {}",
            observations.len(),
            end
        );

        Ok(observations)
    }

    /// Load both role address sets
    pub fn read_role_sets(&self) -> Result<RoleSets, ReaderError> {
        let infrastructure = self.read_address_set("infrastructure_addresses")?;
        let active_traders = self.read_address_set("active_trader_addresses")?;

        log::info!(
            "📥 Role oracle loaded: {} infrastructure, {} active traders",
            infrastructure.len(),
            active_traders.len()
        );

        Ok(RoleSets::new(infrastructure, active_traders))
    }

    fn read_address_set(&self, table: &'static str) -> Result<HashSet<String>, ReaderError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT address FROM {}", table))?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut set = HashSet::new();
        for address in rows {
            set.insert(address?);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::oracle::RoleOracle;
    use rusqlite::params;
    use tempfile::tempdir;

    fn setup_test_db() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("source.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE balance_observations (
                entity  TEXT NOT NULL,
                period  TEXT NOT NULL,
                balance REAL NOT NULL,
                PRIMARY KEY (entity, period)
            );
            CREATE TABLE infrastructure_addresses (address TEXT PRIMARY KEY);
            CREATE TABLE active_trader_addresses (address TEXT PRIMARY KEY);",
        )
        .unwrap();

        (dir, db_path)
    }

    fn insert_observation(conn: &Connection, entity: &str, period: &str, balance: f64) {
        conn.execute(
            "INSERT INTO balance_observations (entity, period, balance) VALUES (?1, ?2, ?3)",
            params![entity, period, balance],
        )
        .unwrap();
    }

    #[test]
    fn test_read_observations_ordered_and_bounded() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();

        insert_observation(&conn, "walletB", "2024-01-02", 5.0);
        insert_observation(&conn, "walletA", "2024-01-03", 7.0);
        insert_observation(&conn, "walletA", "2024-01-01", 3.0);
        insert_observation(&conn, "walletA", "2024-02-01", 9.0); // after end
        drop(conn);

        let reader = SqliteSourceReader::new(&db_path).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let observations = reader.read_observations(end).unwrap();

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].entity, "walletA");
        assert_eq!(observations[0].balance, 3.0);
        assert_eq!(observations[1].entity, "walletA");
        assert_eq!(observations[1].balance, 7.0);
        assert_eq!(observations[2].entity, "walletB");
    }

    #[test]
    fn test_unpadded_periods_compared_as_dates() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();
        insert_observation(&conn, "w", "2024-9-30", 4.0);
        insert_observation(&conn, "w", "2024-10-01", 6.0);
        insert_observation(&conn, "w", "2024-3-5", 2.0);
        insert_observation(&conn, "w", "2025-1-2", 8.0); // after end
        drop(conn);

        let reader = SqliteSourceReader::new(&db_path).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let observations = reader.read_observations(end).unwrap();

        let periods: Vec<NaiveDate> = observations.iter().map(|o| o.period).collect();
        assert_eq!(
            periods,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
                NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            ]
        );

        // Parsed order passes the transition order check
        let (log, diagnostics) = crate::reconstruct::TransitionLog::build(&observations);
        assert!(diagnostics.is_empty());
        assert_eq!(log.get("w").unwrap().transitions.len(), 3);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();
        insert_observation(&conn, "walletA", "2024-01-01", -1.0);
        drop(conn);

        let reader = SqliteSourceReader::new(&db_path).unwrap();
        let result = reader.read_observations(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        assert!(matches!(result, Err(ReaderError::NegativeBalance { .. })));
    }

    #[test]
    fn test_invalid_period_rejected() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();
        insert_observation(&conn, "walletA", "2024-01-0x", 1.0);
        drop(conn);

        let reader = SqliteSourceReader::new(&db_path).unwrap();
        let result = reader.read_observations(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid period"));
    }

    #[test]
    fn test_read_role_sets() {
        let (_dir, db_path) = setup_test_db();
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("INSERT INTO infrastructure_addresses VALUES ('pool1')", [])
            .unwrap();
        conn.execute("INSERT INTO active_trader_addresses VALUES ('trader1')", [])
            .unwrap();
        drop(conn);

        let reader = SqliteSourceReader::new(&db_path).unwrap();
        let sets = reader.read_role_sets().unwrap();

        assert!(sets.is_infrastructure("pool1"));
        assert!(sets.is_active_trader("trader1"));
        assert!(!sets.is_active_trader("pool1"));
    }

    #[test]
    fn test_read_only_mode() {
        let (_dir, db_path) = setup_test_db();
        let reader = SqliteSourceReader::new(&db_path).unwrap();

        let result = reader.conn.execute(
            "INSERT INTO balance_observations VALUES ('w', '2024-01-01', 1.0)",
            [],
        );

        assert!(result.is_err());
    }
}
