//! Database connection management and schema setup

use rusqlite::{Connection, ErrorCode};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::StoreConfig;

/// Error type for every store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Schema setup failed: {0}")]
    Schema(String),
    #[error("Constraint violation: {0}")]
    Conflict(String),
    #[error("Database is busy: {0}")]
    Busy(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No updatable fields given")]
    NoValidFields,
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(err.to_string()),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StoreError::Busy(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

/// Create the database file (and its directory) if needed and make sure the schema exists
pub fn init_database(config: &StoreConfig) -> Result<(), StoreError> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }
    }

    info!("Opening database at {:?}", config.db_path);
    let conn = open_connection(config)?;
    apply_schema(&conn)
}

/// Open a fresh connection with the configured pragmas applied
pub fn open_connection(config: &StoreConfig) -> Result<Connection, StoreError> {
    let conn = connect(&config.db_path)?;

    conn.pragma_update(None, "foreign_keys", config.enforce_foreign_keys)
        .map_err(|e| StoreError::Connection(format!("Failed to set foreign_keys: {}", e)))?;

    // Lock contention surfaces as Busy right away instead of waiting
    conn.busy_timeout(Duration::ZERO)
        .map_err(|e| StoreError::Connection(format!("Failed to set busy timeout: {}", e)))?;

    Ok(conn)
}

fn connect(path: &Path) -> Result<Connection, StoreError> {
    debug!("Connecting to {:?}", path);
    Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))
}

/// Create tables and indexes. Safe to run on every startup.
fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(include_str!("schema.sql"))
        .map_err(|e| StoreError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'index') ORDER BY name")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_init_new_database() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("papers.db"));

        init_database(&config).unwrap();
        assert!(config.db_path.exists());

        let conn = open_connection(&config).unwrap();
        let names = table_names(&conn);
        for expected in [
            "papers",
            "tags",
            "paper_tags",
            "idx_papers_publication_date",
            "idx_papers_source",
            "idx_papers_topic",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("papers.db"));

        init_database(&config).unwrap();
        let conn = open_connection(&config).unwrap();
        conn.execute(
            "INSERT INTO tags (name) VALUES ('kept')",
            [],
        )
        .unwrap();
        drop(conn);

        init_database(&config).unwrap();
        let conn = open_connection(&config).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("nested").join("store").join("papers.db"));

        init_database(&config).unwrap();
        assert!(config.db_path.exists());
    }

    #[test]
    fn test_foreign_key_pragma_follows_config() {
        let dir = tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path().join("papers.db"));

        let conn = open_connection(&config).unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(!enabled);

        config.enforce_foreign_keys = true;
        let conn = open_connection(&config).unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);
    }

    #[test]
    fn test_error_classification() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute("INSERT INTO tags (name) VALUES ('a')", []).unwrap();

        let err: StoreError = conn
            .execute("INSERT INTO tags (name) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err: StoreError = conn
            .execute("SELECT * FROM no_such_table", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
