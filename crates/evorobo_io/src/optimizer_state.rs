//! Checkpoint rows of the `optimizer` table.
//!
//! One row is appended per generation; the row with the highest
//! `generation_index` of a process is its resume point.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Clone, Debug, PartialEq)]
pub struct DbOptimizerState {
    pub process_id: u64,
    pub generation_index: usize,
    /// Encoded generator state.
    pub rng: Vec<u8>,
    pub innov_db_body: String,
    pub innov_db_brain: String,
    pub simulation_time: u32,
    pub sampling_frequency: f64,
    pub control_frequency: f64,
    pub num_generations: usize,
}

const COLUMNS: &str = "process_id, generation_index, rng, innov_db_body, innov_db_brain,
    simulation_time, sampling_frequency, control_frequency, num_generations";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbOptimizerState> {
    Ok(DbOptimizerState {
        process_id: row.get(0)?,
        generation_index: row.get(1)?,
        rng: row.get(2)?,
        innov_db_body: row.get(3)?,
        innov_db_brain: row.get(4)?,
        simulation_time: row.get(5)?,
        sampling_frequency: row.get(6)?,
        control_frequency: row.get(7)?,
        num_generations: row.get(8)?,
    })
}

impl DbOptimizerState {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO optimizer ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                self.process_id,
                self.generation_index,
                self.rng,
                self.innov_db_body,
                self.innov_db_brain,
                self.simulation_time,
                self.sampling_frequency,
                self.control_frequency,
                self.num_generations
            ],
        )?;
        Ok(())
    }

    /// The checkpoint with the highest generation index of the process.
    pub fn latest(conn: &Connection, process_id: u64) -> Result<Option<Self>> {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM optimizer WHERE process_id = ?1
                      ORDER BY generation_index DESC LIMIT 1"
                ),
                params![process_id],
                from_row,
            )
            .optional()?)
    }

    /// The earliest checkpoint in the file, whatever the process.
    pub fn first(conn: &Connection) -> Result<Option<Self>> {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM optimizer ORDER BY process_id, generation_index LIMIT 1"
                ),
                [],
                from_row,
            )
            .optional()?)
    }

    /// Every checkpoint of the process in generation order.
    pub fn all(conn: &Connection, process_id: u64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM optimizer WHERE process_id = ?1 ORDER BY generation_index"
        ))?;
        let rows = stmt.query_map(params![process_id], from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(conn: &Connection, process_id: u64) -> Result<usize> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM optimizer WHERE process_id = ?1",
            params![process_id],
            |row| row.get(0),
        )?)
    }
}
