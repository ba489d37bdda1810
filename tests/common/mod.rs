use evorobo_core::body::SubstrateDimensions;
use evorobo_core::config::MutationConfig;
use evorobo_core::{genotype, RunRng};
use evorobo_data::{Genotype, InnovationDatabase};
use evorobo_lib::ea::EaSettings;
use evorobo_lib::{EaOptimizer, Optimizer, ProcessIdGen, SimulationSettings};
use rusqlite::Connection;

#[allow(dead_code)]
pub struct RunBuilder {
    seed: u64,
    population_size: usize,
    offspring_size: usize,
    num_generations: usize,
    run_simulation: bool,
    simulation_time: u32,
    max_modules: usize,
}

#[allow(dead_code)]
impl RunBuilder {
    pub fn new() -> Self {
        Self {
            seed: 42,
            population_size: 10,
            offspring_size: 10,
            num_generations: 3,
            run_simulation: false,
            simulation_time: 1,
            max_modules: 8,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sizes(mut self, population_size: usize, offspring_size: usize) -> Self {
        self.population_size = population_size;
        self.offspring_size = offspring_size;
        self
    }

    pub fn with_generations(mut self, num_generations: usize) -> Self {
        self.num_generations = num_generations;
        self
    }

    pub fn with_simulation(mut self, simulation_time: u32) -> Self {
        self.run_simulation = true;
        self.simulation_time = simulation_time;
        self
    }

    pub fn settings(&self) -> EaSettings {
        EaSettings {
            population_size: self.population_size,
            offspring_size: self.offspring_size,
            fitness_measure: "speed_y".to_string(),
            max_modules: self.max_modules,
            substrate: SubstrateDimensions::Planar,
        }
    }

    /// Creates the initial population and stores generation 0 in `conn`.
    pub fn start_on(self, conn: Connection) -> EaOptimizer<Optimizer> {
        let mut rng = RunRng::seed_from_u64(self.seed);
        let mut innov_db_body = InnovationDatabase::new();
        let mut innov_db_brain = InnovationDatabase::new();
        let mut process_id_gen = ProcessIdGen::new();
        let process_id = process_id_gen.gen();

        let initial_population: Vec<Genotype> = (0..self.population_size)
            .map(|_| genotype::random(&mut innov_db_body, &mut innov_db_brain, &mut rng, 5))
            .collect();
        let settings = self.settings();
        Optimizer::new_run(
            conn,
            process_id,
            process_id_gen,
            initial_population,
            rng,
            innov_db_body,
            innov_db_brain,
            settings,
            SimulationSettings {
                simulation_time: self.simulation_time,
                sampling_frequency: 5.0,
                control_frequency: 5.0,
            },
            MutationConfig::default(),
            self.num_generations,
            self.run_simulation,
        )
        .unwrap()
    }

    pub fn start(self) -> EaOptimizer<Optimizer> {
        self.start_on(Connection::open_in_memory().unwrap())
    }
}

/// Resumes process 0 with fresh, unrelated handles.
#[allow(dead_code)]
pub fn resume(conn: Connection, run_simulation: bool) -> evorobo_lib::Result<EaOptimizer<Optimizer>> {
    let mut process_id_gen = ProcessIdGen::new();
    let process_id = process_id_gen.gen();
    Optimizer::from_database(
        conn,
        process_id,
        process_id_gen,
        RunRng::seed_from_u64(999),
        InnovationDatabase::new(),
        InnovationDatabase::new(),
        MutationConfig::default(),
        run_simulation,
    )
}

/// Ids and genotypes of the current population.
#[allow(dead_code)]
pub fn snapshot(optimizer: &EaOptimizer<Optimizer>) -> Vec<(u64, Genotype)> {
    optimizer
        .population()
        .iter()
        .map(|i| (i.id, i.genotype.clone()))
        .collect()
}
