//! Generic generational evolutionary-algorithm driver.
//!
//! [`EaOptimizer`] owns the loop and the persistence of EA rows; everything
//! specific to an experiment (selection, variation, evaluation and the
//! checkpoint row) is delegated to an [`EaPolicy`].

pub mod optimizer;

pub use optimizer::EaOptimizer;

use crate::error::Result;
use evorobo_core::body::SubstrateDimensions;
use evorobo_data::{Genotype, Measures};
use rusqlite::Connection;

/// Environment condition id every individual is evaluated under.
pub const DEFAULT_ENV_CONDITIONS_ID: u64 = 1;

/// Hands out process ids; its state is stored with the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessIdGen {
    next: u64,
}

impl ProcessIdGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gen(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    #[must_use]
    pub fn state(&self) -> u64 {
        self.next
    }

    pub fn restore(&mut self, state: u64) {
        self.next = state;
    }
}

/// One member of the population.
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub id: u64,
    pub genotype: Genotype,
    pub measures: Measures,
    pub fitness: f64,
}

/// Run settings owned by the EA driver.
#[derive(Clone, Debug, PartialEq)]
pub struct EaSettings {
    pub population_size: usize,
    pub offspring_size: usize,
    pub fitness_measure: String,
    pub max_modules: usize,
    pub substrate: SubstrateDimensions,
}

/// Result of evaluating a list of genotypes, aligned with the input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub measures: Vec<Measures>,
    /// Serialized per-genotype state trace, when simulated.
    pub states: Vec<Option<String>>,
    /// Number of simulation samples taken.
    pub samples: usize,
}

/// Experiment-specific operations of a generational EA.
pub trait EaPolicy {
    /// `num_parent_groups` groups of population indices to recombine.
    fn select_parents(
        &mut self,
        population: &[Genotype],
        fitnesses: &[f64],
        num_parent_groups: usize,
    ) -> Vec<Vec<usize>>;

    /// Survivors as `(old indices, new indices)`, `num_survivors` in total.
    fn select_survivors(
        &mut self,
        old_individuals: &[Genotype],
        old_fitnesses: &[f64],
        new_individuals: &[Genotype],
        new_fitnesses: &[f64],
        num_survivors: usize,
    ) -> (Vec<usize>, Vec<usize>);

    fn crossover(&mut self, parents: &[&Genotype]) -> Genotype;

    fn mutate(&mut self, genotype: &Genotype) -> Genotype;

    /// Measures every genotype; `generation_index` is the generation they belong to.
    fn evaluate_generation(
        &mut self,
        genotypes: &[Genotype],
        settings: &EaSettings,
        generation_index: usize,
    ) -> Result<Evaluation>;

    fn must_do_next_gen(&self, generation_index: usize) -> bool;

    /// Writes the policy's own state for `generation_index`, inside the
    /// transaction of that generation.
    fn on_generation_checkpoint(
        &self,
        conn: &Connection,
        process_id: u64,
        generation_index: usize,
    ) -> Result<()>;
}

/// Whether the database holds an EA run for `process_id`.
pub fn run_exists(conn: &Connection, process_id: u64) -> Result<bool> {
    Ok(evorobo_io::ea::ea_row_exists(conn, process_id)?)
}
