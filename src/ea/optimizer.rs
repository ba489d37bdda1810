use super::{EaPolicy, EaSettings, Individual, ProcessIdGen, DEFAULT_ENV_CONDITIONS_ID};
use crate::error::{EaError, Result};
use evorobo_core::metrics::RunMetrics;
use evorobo_data::{EnvConditions, Genotype, Measures};
use evorobo_io::ea::{self, DbEaGeneration, DbEaIndividual, DbEaOptimizer};
use rusqlite::Connection;

/// Drives generations of an [`EaPolicy`] and persists every one of them.
pub struct EaOptimizer<P: EaPolicy> {
    conn: Connection,
    process_id: u64,
    process_id_gen: ProcessIdGen,
    generation_index: usize,
    population: Vec<Individual>,
    next_individual_id: u64,
    settings: EaSettings,
    metrics: RunMetrics,
    policy: P,
}

fn fitness_of(measures: &Measures, fitness_measure: &str) -> f64 {
    measures.get(fitness_measure).unwrap_or(0.0)
}

fn write_individual(
    conn: &Connection,
    process_id: u64,
    individual: &Individual,
    birth: usize,
    states: Option<&str>,
    parents: &[u64],
) -> Result<()> {
    let serialized = individual
        .genotype
        .to_json()
        .map_err(|e| EaError::serialization(format!("genotype {}: {e}", individual.id)))?;
    ea::insert_genotype(conn, process_id, individual.id, &serialized)?;
    DbEaIndividual {
        process_id,
        individual_id: individual.id,
        env_conditions_id: DEFAULT_ENV_CONDITIONS_ID,
        genotype_id: individual.id,
        birth,
    }
    .insert(conn)?;
    ea::insert_measures(
        conn,
        process_id,
        individual.id,
        DEFAULT_ENV_CONDITIONS_ID,
        &individual.measures,
    )?;
    if let Some(states) = states {
        ea::insert_states(conn, process_id, individual.id, DEFAULT_ENV_CONDITIONS_ID, states)?;
    }
    if !parents.is_empty() {
        ea::insert_parents(conn, process_id, individual.id, parents)?;
    }
    Ok(())
}

fn write_generation(
    conn: &Connection,
    process_id: u64,
    generation_index: usize,
    population: &[Individual],
) -> Result<()> {
    for (position, individual) in population.iter().enumerate() {
        DbEaGeneration {
            process_id,
            generation_index,
            position,
            individual_id: individual.id,
            env_conditions_id: DEFAULT_ENV_CONDITIONS_ID,
            seasonal_dominated: 0.0,
        }
        .insert(conn)?;
    }
    Ok(())
}

impl<P: EaPolicy> EaOptimizer<P> {
    /// Starts a run: creates the schema, evaluates the initial population and
    /// stores it as generation 0, all in one transaction.
    pub fn new(
        mut conn: Connection,
        process_id: u64,
        process_id_gen: ProcessIdGen,
        initial_population: Vec<Genotype>,
        settings: EaSettings,
        mut policy: P,
    ) -> Result<Self> {
        if initial_population.len() != settings.population_size {
            return Err(EaError::incompatible(format!(
                "initial population has {} genotypes, expected {}",
                initial_population.len(),
                settings.population_size
            )));
        }

        let mut metrics = RunMetrics::new();
        metrics.begin_generation();
        let evaluation = policy.evaluate_generation(&initial_population, &settings, 0)?;
        metrics.record_evaluation(initial_population.len(), evaluation.samples);

        let population: Vec<Individual> = initial_population
            .into_iter()
            .zip(evaluation.measures)
            .enumerate()
            .map(|(idx, (genotype, measures))| Individual {
                id: idx as u64,
                fitness: fitness_of(&measures, &settings.fitness_measure),
                genotype,
                measures,
            })
            .collect();
        let next_individual_id = population.len() as u64;

        let tx = conn.transaction()?;
        evorobo_io::create_tables(&tx)?;
        DbEaOptimizer {
            process_id,
            population_size: settings.population_size,
            offspring_size: settings.offspring_size,
            fitness_measure: settings.fitness_measure.clone(),
            max_modules: settings.max_modules,
            substrate: settings.substrate.to_string(),
            generation_index: 0,
            next_individual_id,
            process_id_gen_state: process_id_gen.state(),
        }
        .insert(&tx)?;
        ea::insert_env_conditions(&tx, process_id, DEFAULT_ENV_CONDITIONS_ID, &EnvConditions::default())?;
        for (idx, individual) in population.iter().enumerate() {
            let states = evaluation.states.get(idx).and_then(Option::as_deref);
            write_individual(&tx, process_id, individual, 0, states, &[])?;
        }
        write_generation(&tx, process_id, 0, &population)?;
        policy.on_generation_checkpoint(&tx, process_id, 0)?;
        tx.commit()?;

        let fitnesses: Vec<f64> = population.iter().map(|i| i.fitness).collect();
        metrics.record_generation(0, &fitnesses);

        Ok(Self {
            conn,
            process_id,
            process_id_gen,
            generation_index: 0,
            population,
            next_individual_id,
            settings,
            metrics,
            policy,
        })
    }

    /// Loads the latest stored generation of `process_id`.
    ///
    /// The policy must already be restored from the same database.
    pub fn from_database(
        conn: Connection,
        process_id: u64,
        mut process_id_gen: ProcessIdGen,
        policy: P,
    ) -> Result<Self> {
        evorobo_io::check_schema_version(&conn)
            .map_err(|e| EaError::incompatible(e.to_string()))?;
        let row = DbEaOptimizer::load(&conn, process_id)?.ok_or_else(|| {
            EaError::incompatible(format!("no EA row for process {process_id}"))
        })?;
        let substrate = row
            .substrate
            .parse()
            .map_err(|e: String| EaError::incompatible(e))?;
        let settings = EaSettings {
            population_size: row.population_size,
            offspring_size: row.offspring_size,
            fitness_measure: row.fitness_measure,
            max_modules: row.max_modules,
            substrate,
        };
        process_id_gen.restore(row.process_id_gen_state);

        let members =
            DbEaGeneration::load(&conn, process_id, row.generation_index, DEFAULT_ENV_CONDITIONS_ID)?;
        if members.len() != settings.population_size {
            return Err(EaError::incompatible(format!(
                "generation {} has {} members, expected {}",
                row.generation_index,
                members.len(),
                settings.population_size
            )));
        }

        let mut population = Vec::with_capacity(members.len());
        for member in members {
            let individual = DbEaIndividual::load(
                &conn,
                process_id,
                member.individual_id,
                DEFAULT_ENV_CONDITIONS_ID,
            )?;
            let serialized = ea::load_genotype(&conn, Some(process_id), individual.genotype_id)?;
            let genotype = Genotype::from_json(&serialized)
                .map_err(|e| EaError::serialization(format!("genotype {}: {e}", individual.genotype_id)))?;
            let measures = ea::load_measures(
                &conn,
                Some(process_id),
                member.individual_id,
                DEFAULT_ENV_CONDITIONS_ID,
            )?;
            population.push(Individual {
                id: member.individual_id,
                fitness: fitness_of(&measures, &settings.fitness_measure),
                genotype,
                measures,
            });
        }

        tracing::info!(
            process_id,
            generation = row.generation_index,
            population = population.len(),
            "Resumed optimizer from database"
        );

        Ok(Self {
            conn,
            process_id,
            process_id_gen,
            generation_index: row.generation_index,
            population,
            next_individual_id: row.next_individual_id,
            settings,
            metrics: RunMetrics::new(),
            policy,
        })
    }

    /// Runs generations until the policy stops.
    pub fn run(&mut self) -> Result<()> {
        while self.policy.must_do_next_gen(self.generation_index) {
            self.step()?;
        }
        tracing::info!(
            process_id = self.process_id,
            generations = self.generation_index,
            evaluations = self.metrics.evaluations(),
            elapsed_ms = self.metrics.elapsed().as_millis() as u64,
            "Optimization finished"
        );
        Ok(())
    }

    /// Produces, evaluates and stores one generation.
    pub fn step(&mut self) -> Result<()> {
        self.metrics.begin_generation();
        let next_generation = self.generation_index + 1;

        let genotypes: Vec<Genotype> = self.population.iter().map(|i| i.genotype.clone()).collect();
        let fitnesses: Vec<f64> = self.population.iter().map(|i| i.fitness).collect();

        let parent_groups =
            self.policy
                .select_parents(&genotypes, &fitnesses, self.settings.offspring_size);
        let offspring: Vec<Genotype> = parent_groups
            .iter()
            .map(|group| {
                let parents: Vec<&Genotype> = group.iter().map(|&idx| &genotypes[idx]).collect();
                let child = self.policy.crossover(&parents);
                self.policy.mutate(&child)
            })
            .collect();

        let evaluation =
            self.policy
                .evaluate_generation(&offspring, &self.settings, next_generation)?;
        self.metrics
            .record_evaluation(offspring.len(), evaluation.samples);

        let new_individuals: Vec<Individual> = offspring
            .into_iter()
            .zip(evaluation.measures)
            .enumerate()
            .map(|(idx, (genotype, measures))| Individual {
                id: self.next_individual_id + idx as u64,
                fitness: fitness_of(&measures, &self.settings.fitness_measure),
                genotype,
                measures,
            })
            .collect();
        let next_individual_id = self.next_individual_id + new_individuals.len() as u64;

        let new_genotypes: Vec<Genotype> =
            new_individuals.iter().map(|i| i.genotype.clone()).collect();
        let new_fitnesses: Vec<f64> = new_individuals.iter().map(|i| i.fitness).collect();
        let (old_survivors, new_survivors) = self.policy.select_survivors(
            &genotypes,
            &fitnesses,
            &new_genotypes,
            &new_fitnesses,
            self.population.len(),
        );

        let population: Vec<Individual> = old_survivors
            .iter()
            .map(|&idx| self.population[idx].clone())
            .chain(new_survivors.iter().map(|&idx| new_individuals[idx].clone()))
            .collect();

        let tx = self.conn.transaction()?;
        for (idx, (individual, group)) in new_individuals.iter().zip(&parent_groups).enumerate() {
            let parents: Vec<u64> = group.iter().map(|&p| self.population[p].id).collect();
            let states = evaluation.states.get(idx).and_then(Option::as_deref);
            write_individual(&tx, self.process_id, individual, next_generation, states, &parents)?;
        }
        write_generation(&tx, self.process_id, next_generation, &population)?;
        DbEaOptimizer {
            process_id: self.process_id,
            population_size: self.settings.population_size,
            offspring_size: self.settings.offspring_size,
            fitness_measure: self.settings.fitness_measure.clone(),
            max_modules: self.settings.max_modules,
            substrate: self.settings.substrate.to_string(),
            generation_index: next_generation,
            next_individual_id,
            process_id_gen_state: self.process_id_gen.state(),
        }
        .update_progress(&tx)?;
        self.policy
            .on_generation_checkpoint(&tx, self.process_id, next_generation)?;
        tx.commit()?;

        self.generation_index = next_generation;
        self.next_individual_id = next_individual_id;
        self.population = population;
        let fitnesses: Vec<f64> = self.population.iter().map(|i| i.fitness).collect();
        self.metrics.record_generation(next_generation, &fitnesses);
        Ok(())
    }

    #[must_use]
    pub fn generation_index(&self) -> usize {
        self.generation_index
    }

    #[must_use]
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    #[must_use]
    pub fn process_id(&self) -> u64 {
        self.process_id
    }

    #[must_use]
    pub fn settings(&self) -> &EaSettings {
        &self.settings
    }

    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[must_use]
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Ends the run and hands back the database connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}
