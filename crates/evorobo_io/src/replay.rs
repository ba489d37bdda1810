//! Read-only queries for picking individuals to replay.

use crate::error::Result;
use rusqlite::{params, Connection};

/// One individual under one environment condition, with the fields the
/// replay tool prints.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayRow {
    pub individual_id: u64,
    pub genotype_id: u64,
    pub env_conditions_id: u64,
    pub seasonal_dominated: f64,
    pub birth: Option<f64>,
    pub speed_y: Option<f64>,
}

/// Ranking of candidate individuals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayOrder {
    /// Seasonal dominance descending, then individual and condition id.
    SeasonalDominance,
    /// `speed_y` descending.
    SpeedY,
}

impl ReplayOrder {
    /// Dominance only ranks anything when there is more than one condition.
    #[must_use]
    pub fn for_condition_count(conditions: usize) -> Self {
        if conditions > 1 {
            Self::SeasonalDominance
        } else {
            Self::SpeedY
        }
    }

    fn clause(self) -> &'static str {
        match self {
            Self::SeasonalDominance => "dom DESC, individual_id ASC, env_conditions_id ASC",
            Self::SpeedY => "speed_y DESC, individual_id ASC, env_conditions_id ASC",
        }
    }
}

const MEASURE_JOINS: &str = "
    LEFT JOIN measure mb ON mb.process_id = i.process_id AND mb.individual_id = i.individual_id
        AND mb.env_conditions_id = i.env_conditions_id AND mb.name = 'birth'
    LEFT JOIN measure ms ON ms.process_id = i.process_id AND ms.individual_id = i.individual_id
        AND ms.env_conditions_id = i.env_conditions_id AND ms.name = 'speed_y'";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReplayRow> {
    Ok(ReplayRow {
        individual_id: row.get(0)?,
        genotype_id: row.get(1)?,
        env_conditions_id: row.get(2)?,
        seasonal_dominated: row.get(3)?,
        birth: row.get(4)?,
        speed_y: row.get(5)?,
    })
}

/// Best `limit` members of one generation.
pub fn best_in_generation(
    conn: &Connection,
    generation_index: usize,
    order: ReplayOrder,
    limit: usize,
) -> Result<Vec<ReplayRow>> {
    let sql = format!(
        "SELECT g.individual_id AS individual_id, i.genotype_id, g.env_conditions_id AS env_conditions_id,
                g.seasonal_dominated AS dom, mb.value, ms.value AS speed_y
           FROM ea_generation g
           JOIN ea_individual i ON i.process_id = g.process_id AND i.individual_id = g.individual_id
                AND i.env_conditions_id = g.env_conditions_id
           {MEASURE_JOINS}
          WHERE g.generation_index = ?1
          ORDER BY {}
          LIMIT ?2",
        order.clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![generation_index, limit], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Best `limit` distinct individuals over every generation.
pub fn best_overall(conn: &Connection, order: ReplayOrder, limit: usize) -> Result<Vec<ReplayRow>> {
    let sql = format!(
        "SELECT g.individual_id AS individual_id, i.genotype_id, g.env_conditions_id AS env_conditions_id,
                MAX(g.seasonal_dominated) AS dom, mb.value, ms.value AS speed_y
           FROM ea_generation g
           JOIN ea_individual i ON i.process_id = g.process_id AND i.individual_id = g.individual_id
                AND i.env_conditions_id = g.env_conditions_id
           {MEASURE_JOINS}
          GROUP BY g.process_id, g.individual_id, g.env_conditions_id
          ORDER BY {}
          LIMIT ?1",
        order.clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// One individual under each of its environment conditions.
pub fn individual_by_id(conn: &Connection, individual_id: u64) -> Result<Vec<ReplayRow>> {
    let sql = format!(
        "SELECT i.individual_id, i.genotype_id, i.env_conditions_id,
                COALESCE((SELECT MAX(g.seasonal_dominated) FROM ea_generation g
                           WHERE g.process_id = i.process_id AND g.individual_id = i.individual_id
                             AND g.env_conditions_id = i.env_conditions_id), 0.0),
                mb.value, ms.value
           FROM ea_individual i
           {MEASURE_JOINS}
          WHERE i.individual_id = ?1
          ORDER BY i.process_id, i.env_conditions_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![individual_id], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_tables;
    use crate::ea::{insert_measures, DbEaGeneration, DbEaIndividual};
    use evorobo_data::Measures;

    fn add(conn: &Connection, generation: usize, id: u64, speed_y: f64, dom: f64) {
        if DbEaIndividual::load(conn, 0, id, 1).is_err() {
            DbEaIndividual {
                process_id: 0,
                individual_id: id,
                env_conditions_id: 1,
                genotype_id: id,
                birth: generation,
            }
            .insert(conn)
            .unwrap();
            let mut m = Measures::new();
            m.insert("birth", generation as f64);
            m.insert("speed_y", speed_y);
            insert_measures(conn, 0, id, 1, &m).unwrap();
        }
        DbEaGeneration {
            process_id: 0,
            generation_index: generation,
            position: id as usize,
            individual_id: id,
            env_conditions_id: 1,
            seasonal_dominated: dom,
        }
        .insert(conn)
        .unwrap();
    }

    fn populated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        add(&conn, 0, 0, 0.1, 0.0);
        add(&conn, 0, 1, 0.5, 2.0);
        add(&conn, 0, 2, 0.3, 1.0);
        add(&conn, 1, 1, 0.5, 3.0);
        add(&conn, 1, 3, 0.9, 0.0);
        conn
    }

    #[test]
    fn test_best_in_generation_by_speed() {
        let conn = populated();
        let rows = best_in_generation(&conn, 0, ReplayOrder::SpeedY, 2).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.individual_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rows[0].speed_y, Some(0.5));
        assert_eq!(rows[0].birth, Some(0.0));
    }

    #[test]
    fn test_best_in_generation_by_dominance() {
        let conn = populated();
        let rows = best_in_generation(&conn, 1, ReplayOrder::SeasonalDominance, 5).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.individual_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_best_overall_is_distinct() {
        let conn = populated();
        let rows = best_overall(&conn, ReplayOrder::SpeedY, 10).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.individual_id).collect();
        assert_eq!(ids, vec![3, 1, 2, 0]);
        let by_dom = best_overall(&conn, ReplayOrder::SeasonalDominance, 1).unwrap();
        assert_eq!(by_dom[0].individual_id, 1);
        assert_eq!(by_dom[0].seasonal_dominated, 3.0);
    }

    #[test]
    fn test_individual_by_id() {
        let conn = populated();
        let rows = individual_by_id(&conn, 2).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].seasonal_dominated, 1.0);
        assert!(individual_by_id(&conn, 42).unwrap().is_empty());
    }

    #[test]
    fn test_order_for_condition_count() {
        assert_eq!(ReplayOrder::for_condition_count(1), ReplayOrder::SpeedY);
        assert_eq!(
            ReplayOrder::for_condition_count(3),
            ReplayOrder::SeasonalDominance
        );
    }
}
