//! SQLite database of one optimization run.
//!
//! `PRAGMA user_version` carries [`SCHEMA_VERSION`]. A fresh file has
//! version 0 and is initialised by [`create_tables`]; any other version is
//! refused.

use crate::error::{IoError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Version of the table layout written by this crate.
pub const SCHEMA_VERSION: i32 = 1;

/// Opens (creating if needed) the database file, including parent directories.
pub fn open_database_sqlite<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IoError::FileSystem(e).with_context(format!("creating {}", parent.display()))
            })?;
        }
    }
    let conn = Connection::open(path)?;
    tracing::debug!(path = %path.display(), "Opened database");
    Ok(conn)
}

/// Opens an existing database read-only.
pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::not_found(path.display().to_string()));
    }
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Fails unless the database carries the current schema version.
pub fn check_schema_version(conn: &Connection) -> Result<()> {
    let found = schema_version(conn)?;
    if found != SCHEMA_VERSION {
        return Err(IoError::validation(format!(
            "schema version {found}, expected {SCHEMA_VERSION}"
        )));
    }
    Ok(())
}

/// Creates every table of the run database and stamps the schema version.
pub fn create_tables(conn: &Connection) -> Result<()> {
    let found = schema_version(conn)?;
    if found != 0 && found != SCHEMA_VERSION {
        return Err(IoError::validation(format!(
            "cannot initialise database with schema version {found}"
        )));
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ea_optimizer (
            process_id INTEGER PRIMARY KEY,
            population_size INTEGER NOT NULL,
            offspring_size INTEGER NOT NULL,
            fitness_measure TEXT NOT NULL,
            max_modules INTEGER NOT NULL,
            substrate TEXT NOT NULL,
            generation_index INTEGER NOT NULL,
            next_individual_id INTEGER NOT NULL,
            process_id_gen_state INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS genotype (
            process_id INTEGER NOT NULL,
            genotype_id INTEGER NOT NULL,
            serialized TEXT NOT NULL,
            PRIMARY KEY (process_id, genotype_id)
        );

        CREATE TABLE IF NOT EXISTS env_conditions (
            process_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            conditions TEXT NOT NULL,
            PRIMARY KEY (process_id, id)
        );

        CREATE TABLE IF NOT EXISTS ea_individual (
            process_id INTEGER NOT NULL,
            individual_id INTEGER NOT NULL,
            env_conditions_id INTEGER NOT NULL,
            genotype_id INTEGER NOT NULL,
            birth INTEGER NOT NULL,
            PRIMARY KEY (process_id, individual_id, env_conditions_id)
        );

        CREATE TABLE IF NOT EXISTS measure (
            process_id INTEGER NOT NULL,
            individual_id INTEGER NOT NULL,
            env_conditions_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (process_id, individual_id, env_conditions_id, name)
        );

        CREATE TABLE IF NOT EXISTS ea_states (
            process_id INTEGER NOT NULL,
            individual_id INTEGER NOT NULL,
            env_conditions_id INTEGER NOT NULL,
            states TEXT NOT NULL,
            PRIMARY KEY (process_id, individual_id, env_conditions_id)
        );

        CREATE TABLE IF NOT EXISTS ea_generation (
            process_id INTEGER NOT NULL,
            generation_index INTEGER NOT NULL,
            position INTEGER NOT NULL,
            individual_id INTEGER NOT NULL,
            env_conditions_id INTEGER NOT NULL,
            seasonal_dominated REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (process_id, generation_index, position, env_conditions_id)
        );

        CREATE TABLE IF NOT EXISTS ea_parent (
            process_id INTEGER NOT NULL,
            child_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            parent_id INTEGER NOT NULL,
            PRIMARY KEY (process_id, child_id, position)
        );

        CREATE TABLE IF NOT EXISTS optimizer (
            process_id INTEGER NOT NULL,
            generation_index INTEGER NOT NULL,
            rng BLOB NOT NULL,
            innov_db_body TEXT NOT NULL,
            innov_db_brain TEXT NOT NULL,
            simulation_time INTEGER NOT NULL,
            sampling_frequency REAL NOT NULL,
            control_frequency REAL NOT NULL,
            num_generations INTEGER NOT NULL,
            PRIMARY KEY (process_id, generation_index)
        );

        CREATE INDEX IF NOT EXISTS idx_generation_index ON ea_generation(generation_index);
        CREATE INDEX IF NOT EXISTS idx_measure_name ON measure(name, value);",
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_has_no_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert!(check_schema_version(&conn).is_err());
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        check_schema_version(&conn).unwrap();
    }

    #[test]
    fn test_foreign_version_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        assert!(matches!(create_tables(&conn), Err(IoError::Validation(_))));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study").join("experiment").join("run_1");
        let conn = open_database_sqlite(&path).unwrap();
        create_tables(&conn).unwrap();
        drop(conn);
        assert!(path.exists());
        let reopened = open_existing(&path).unwrap();
        assert_eq!(schema_version(&reopened).unwrap(), SCHEMA_VERSION);
        assert!(reopened.execute("DELETE FROM optimizer", []).is_err());
    }

    #[test]
    fn test_open_existing_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_existing(dir.path().join("nope"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }
}
