//! Rows of the evolutionary-algorithm tables.

use crate::error::{IoError, Result};
use crate::serialization::{from_json, to_json};
use evorobo_data::{EnvConditions, Measures};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Settings and progress of one optimization process.
#[derive(Clone, Debug, PartialEq)]
pub struct DbEaOptimizer {
    pub process_id: u64,
    pub population_size: usize,
    pub offspring_size: usize,
    pub fitness_measure: String,
    pub max_modules: usize,
    pub substrate: String,
    pub generation_index: usize,
    pub next_individual_id: u64,
    pub process_id_gen_state: u64,
}

impl DbEaOptimizer {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO ea_optimizer (process_id, population_size, offspring_size, fitness_measure,
                max_modules, substrate, generation_index, next_individual_id, process_id_gen_state)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.process_id,
                self.population_size,
                self.offspring_size,
                self.fitness_measure,
                self.max_modules,
                self.substrate,
                self.generation_index,
                self.next_individual_id,
                self.process_id_gen_state
            ],
        )?;
        Ok(())
    }

    /// Stores the progress fields after a generation.
    pub fn update_progress(&self, conn: &Connection) -> Result<()> {
        let changed = conn.execute(
            "UPDATE ea_optimizer
                SET generation_index = ?2, next_individual_id = ?3, process_id_gen_state = ?4
              WHERE process_id = ?1",
            params![
                self.process_id,
                self.generation_index,
                self.next_individual_id,
                self.process_id_gen_state
            ],
        )?;
        if changed != 1 {
            return Err(IoError::not_found(format!(
                "ea_optimizer row for process {}",
                self.process_id
            )));
        }
        Ok(())
    }

    pub fn load(conn: &Connection, process_id: u64) -> Result<Option<Self>> {
        Self::query_one(
            conn,
            "SELECT process_id, population_size, offspring_size, fitness_measure, max_modules,
                    substrate, generation_index, next_individual_id, process_id_gen_state
               FROM ea_optimizer WHERE process_id = ?1",
            Some(process_id),
        )
    }

    /// The row with the lowest process id, for tools that inspect a run file.
    pub fn first(conn: &Connection) -> Result<Option<Self>> {
        Self::query_one(
            conn,
            "SELECT process_id, population_size, offspring_size, fitness_measure, max_modules,
                    substrate, generation_index, next_individual_id, process_id_gen_state
               FROM ea_optimizer ORDER BY process_id LIMIT 1",
            None,
        )
    }

    fn query_one(conn: &Connection, sql: &str, process_id: Option<u64>) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(sql)?;
        let map = |row: &rusqlite::Row<'_>| {
            Ok(Self {
                process_id: row.get(0)?,
                population_size: row.get(1)?,
                offspring_size: row.get(2)?,
                fitness_measure: row.get(3)?,
                max_modules: row.get(4)?,
                substrate: row.get(5)?,
                generation_index: row.get(6)?,
                next_individual_id: row.get(7)?,
                process_id_gen_state: row.get(8)?,
            })
        };
        let row = match process_id {
            Some(id) => stmt.query_row(params![id], map).optional()?,
            None => stmt.query_row([], map).optional()?,
        };
        Ok(row)
    }
}

/// Whether the EA tables exist and hold a row for `process_id`.
pub fn ea_row_exists(conn: &Connection, process_id: u64) -> Result<bool> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'ea_optimizer')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(false);
    }
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM ea_optimizer WHERE process_id = ?1)",
        params![process_id],
        |row| row.get(0),
    )?)
}

/// One individual evaluated under one environment condition.
#[derive(Clone, Debug, PartialEq)]
pub struct DbEaIndividual {
    pub process_id: u64,
    pub individual_id: u64,
    pub env_conditions_id: u64,
    pub genotype_id: u64,
    pub birth: usize,
}

impl DbEaIndividual {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO ea_individual (process_id, individual_id, env_conditions_id, genotype_id, birth)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.process_id,
                self.individual_id,
                self.env_conditions_id,
                self.genotype_id,
                self.birth
            ],
        )?;
        Ok(())
    }

    pub fn load(
        conn: &Connection,
        process_id: u64,
        individual_id: u64,
        env_conditions_id: u64,
    ) -> Result<Self> {
        conn.query_row(
            "SELECT genotype_id, birth FROM ea_individual
              WHERE process_id = ?1 AND individual_id = ?2 AND env_conditions_id = ?3",
            params![process_id, individual_id, env_conditions_id],
            |row| {
                Ok(Self {
                    process_id,
                    individual_id,
                    env_conditions_id,
                    genotype_id: row.get(0)?,
                    birth: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| IoError::not_found(format!("individual {individual_id}")))
    }
}

pub fn insert_genotype(
    conn: &Connection,
    process_id: u64,
    genotype_id: u64,
    serialized: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO genotype (process_id, genotype_id, serialized) VALUES (?1, ?2, ?3)",
        params![process_id, genotype_id, serialized],
    )?;
    Ok(())
}

/// Serialized genotype by id, searching every process when `process_id` is `None`.
pub fn load_genotype(conn: &Connection, process_id: Option<u64>, genotype_id: u64) -> Result<String> {
    let serialized: Option<String> = match process_id {
        Some(pid) => conn
            .query_row(
                "SELECT serialized FROM genotype WHERE process_id = ?1 AND genotype_id = ?2",
                params![pid, genotype_id],
                |row| row.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT serialized FROM genotype WHERE genotype_id = ?1 ORDER BY process_id LIMIT 1",
                params![genotype_id],
                |row| row.get(0),
            )
            .optional()?,
    };
    serialized.ok_or_else(|| IoError::not_found(format!("genotype {genotype_id}")))
}

pub fn insert_measures(
    conn: &Connection,
    process_id: u64,
    individual_id: u64,
    env_conditions_id: u64,
    measures: &Measures,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO measure (process_id, individual_id, env_conditions_id, name, value)
          VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (name, value) in measures.iter() {
        stmt.execute(params![process_id, individual_id, env_conditions_id, name, value])?;
    }
    Ok(())
}

pub fn load_measures(
    conn: &Connection,
    process_id: Option<u64>,
    individual_id: u64,
    env_conditions_id: u64,
) -> Result<Measures> {
    let mut stmt = conn.prepare(
        "SELECT name, value FROM measure
          WHERE (?1 IS NULL OR process_id = ?1) AND individual_id = ?2 AND env_conditions_id = ?3",
    )?;
    let rows = stmt.query_map(params![process_id, individual_id, env_conditions_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    let mut measures = Measures::new();
    for row in rows {
        let (name, value) = row?;
        measures.insert(&name, value);
    }
    Ok(measures)
}

pub fn insert_states(
    conn: &Connection,
    process_id: u64,
    individual_id: u64,
    env_conditions_id: u64,
    states: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ea_states (process_id, individual_id, env_conditions_id, states)
          VALUES (?1, ?2, ?3, ?4)",
        params![process_id, individual_id, env_conditions_id, states],
    )?;
    Ok(())
}

pub fn load_states(
    conn: &Connection,
    process_id: u64,
    individual_id: u64,
    env_conditions_id: u64,
) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT states FROM ea_states
              WHERE process_id = ?1 AND individual_id = ?2 AND env_conditions_id = ?3",
            params![process_id, individual_id, env_conditions_id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Membership of one individual in one generation.
#[derive(Clone, Debug, PartialEq)]
pub struct DbEaGeneration {
    pub process_id: u64,
    pub generation_index: usize,
    pub position: usize,
    pub individual_id: u64,
    pub env_conditions_id: u64,
    pub seasonal_dominated: f64,
}

impl DbEaGeneration {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO ea_generation (process_id, generation_index, position, individual_id,
                env_conditions_id, seasonal_dominated)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.process_id,
                self.generation_index,
                self.position,
                self.individual_id,
                self.env_conditions_id,
                self.seasonal_dominated
            ],
        )?;
        Ok(())
    }

    /// Members of a generation in population order.
    pub fn load(
        conn: &Connection,
        process_id: u64,
        generation_index: usize,
        env_conditions_id: u64,
    ) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT position, individual_id, seasonal_dominated FROM ea_generation
              WHERE process_id = ?1 AND generation_index = ?2 AND env_conditions_id = ?3
              ORDER BY position",
        )?;
        let rows = stmt.query_map(params![process_id, generation_index, env_conditions_id], |row| {
            Ok(Self {
                process_id,
                generation_index,
                position: row.get(0)?,
                individual_id: row.get(1)?,
                env_conditions_id,
                seasonal_dominated: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

pub fn insert_parents(conn: &Connection, process_id: u64, child_id: u64, parents: &[u64]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO ea_parent (process_id, child_id, position, parent_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, parent) in parents.iter().enumerate() {
        stmt.execute(params![process_id, child_id, position, parent])?;
    }
    Ok(())
}

pub fn load_parents(conn: &Connection, process_id: u64, child_id: u64) -> Result<Vec<u64>> {
    let mut stmt = conn.prepare(
        "SELECT parent_id FROM ea_parent WHERE process_id = ?1 AND child_id = ?2 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![process_id, child_id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<u64>>>()?)
}

pub fn insert_env_conditions(
    conn: &Connection,
    process_id: u64,
    id: u64,
    conditions: &EnvConditions,
) -> Result<()> {
    conn.execute(
        "INSERT INTO env_conditions (process_id, id, conditions) VALUES (?1, ?2, ?3)",
        params![process_id, id, to_json(conditions)?],
    )?;
    Ok(())
}

/// Environment conditions of every process, keyed by condition id.
pub fn load_env_conditions(conn: &Connection) -> Result<BTreeMap<u64, EnvConditions>> {
    let mut stmt = conn.prepare("SELECT id, conditions FROM env_conditions ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, u64>(0)?, row.get::<_, String>(1)?)))?;
    let mut conditions = BTreeMap::new();
    for row in rows {
        let (id, json) = row?;
        conditions.insert(id, from_json(&json)?);
    }
    Ok(conditions)
}
