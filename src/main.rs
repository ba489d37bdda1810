use anyhow::{Context, Result};
use clap::Parser;
use evorobo_core::{genotype, init_logging, RunRng};
use evorobo_data::{Genotype, InnovationDatabase};
use evorobo_lib::config::Cli;
use evorobo_lib::ea::{self, EaSettings};
use evorobo_lib::{ExperimentConfig, Optimizer, ProcessIdGen, SimulationSettings};

fn main() -> Result<()> {
    let config = ExperimentConfig::from_args(Cli::parse())?;
    init_logging();

    let mut rng = match config.seed {
        Some(seed) => RunRng::seed_from_u64(seed),
        None => RunRng::from_entropy(),
    };

    let db_path = config.database_path();
    let conn = evorobo_io::open_database_sqlite(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    tracing::info!(
        path = %db_path.display(),
        fingerprint = %config.fingerprint()?,
        "Opened run database"
    );

    let mut process_id_gen = ProcessIdGen::new();
    let mut innov_db_body = InnovationDatabase::new();
    let mut innov_db_brain = InnovationDatabase::new();

    let process_id = process_id_gen.gen();
    let mut optimizer = if ea::run_exists(&conn, process_id)? {
        tracing::info!(process_id, "Resuming run from database");
        Optimizer::from_database(
            conn,
            process_id,
            process_id_gen,
            rng,
            innov_db_body,
            innov_db_brain,
            config.mutation.clone(),
            config.run_simulation,
        )?
    } else {
        tracing::info!(process_id, "No previous run found, starting a new one");
        let initial_population: Vec<Genotype> = (0..config.population_size)
            .map(|_| {
                genotype::random(
                    &mut innov_db_body,
                    &mut innov_db_brain,
                    &mut rng,
                    config.num_initial_mutations,
                )
            })
            .collect();
        Optimizer::new_run(
            conn,
            process_id,
            process_id_gen,
            initial_population,
            rng,
            innov_db_body,
            innov_db_brain,
            EaSettings {
                population_size: config.population_size,
                offspring_size: config.offspring_size,
                fitness_measure: config.fitness_measure.clone(),
                max_modules: config.max_modules,
                substrate: config.body_substrate_dimensions,
            },
            SimulationSettings {
                simulation_time: config.simulation_time,
                sampling_frequency: config.sampling_frequency,
                control_frequency: config.control_frequency,
            },
            config.mutation.clone(),
            config.num_generations,
            config.run_simulation,
        )?
    };

    tracing::info!("Starting optimization process..");
    optimizer.run()?;
    tracing::info!("Finished optimizing.");
    Ok(())
}
