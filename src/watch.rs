//! Replays the best robots of finished runs.
//!
//! For every experiment and run the database is opened read-only, the chosen
//! individuals are redeveloped, their body is rendered to
//! `{study}/analysis/currentinsim.svg` and they are simulated again with the
//! environment condition they were evaluated under. The resulting measures
//! are printed.

use crate::optimizer::{pose_upright, SimulationSettings};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use evorobo_core::body::SubstrateDimensions;
use evorobo_core::controller::ActorController;
use evorobo_core::genotype;
use evorobo_core::measure::Measure;
use evorobo_core::physics::{ActorControl, Batch, ControlFn, Environment, LocalRunner, Runner};
use evorobo_core::render::render_body_svg;
use evorobo_data::{EnvConditions, Genotype, Measures, Quaternion};
use evorobo_io::ea::{self, DbEaOptimizer};
use evorobo_io::replay::{self, ReplayOrder, ReplayRow};
use evorobo_io::DbOptimizerState;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How individuals are picked for replay.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BestsType {
    /// Best of each listed generation.
    Gens,
    /// Best over every generation.
    All,
    /// One individual by id.
    Specific,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Replay evolved robots", long_about = None)]
pub struct WatchConfig {
    /// Study directory holding `{experiment}/run_{n}` databases.
    #[arg(long, default_value = "./data/default_study")]
    pub path: PathBuf,

    #[arg(long, value_delimiter = ',', default_value = "default_experiment")]
    pub experiments: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "1")]
    pub runs: Vec<u32>,

    #[arg(long, value_delimiter = ',', default_value = "100")]
    pub generations: Vec<usize>,

    /// Individuals shown per environment condition.
    #[arg(long, default_value_t = 1)]
    pub bests: usize,

    #[arg(long, value_enum, default_value = "gens")]
    pub bests_type: BestsType,

    #[arg(long, default_value_t = 2)]
    pub specific_robot: u64,

    /// Simulate without per-sample output.
    #[arg(long)]
    pub headless: bool,
}

/// Settings of a stored run needed to redevelop and resimulate its robots.
#[derive(Clone, Debug, PartialEq)]
pub struct RunInfo {
    pub max_modules: usize,
    pub substrate: SubstrateDimensions,
    pub simulation: SimulationSettings,
    pub env_conditions: BTreeMap<u64, EnvConditions>,
}

pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = evorobo_io::open_existing(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    evorobo_io::check_schema_version(&conn)
        .with_context(|| format!("Unsupported database {}", path.display()))?;
    Ok(conn)
}

pub fn read_run_info(conn: &Connection) -> Result<RunInfo> {
    let ea_row = DbEaOptimizer::first(conn)?.context("Database holds no EA run")?;
    let checkpoint = DbOptimizerState::first(conn)?.context("Database holds no checkpoint")?;
    let substrate = ea_row
        .substrate
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    Ok(RunInfo {
        max_modules: ea_row.max_modules,
        substrate,
        simulation: SimulationSettings {
            simulation_time: checkpoint.simulation_time,
            sampling_frequency: checkpoint.sampling_frequency,
            control_frequency: checkpoint.control_frequency,
        },
        env_conditions: ea::load_env_conditions(conn)?,
    })
}

/// Rows to replay for one generation, or over all generations when
/// `generation` is `None`.
pub fn select_rows(
    conn: &Connection,
    config: &WatchConfig,
    info: &RunInfo,
    generation: Option<usize>,
) -> Result<Vec<ReplayRow>> {
    let conditions = info.env_conditions.len().max(1);
    let order = ReplayOrder::for_condition_count(info.env_conditions.len());
    let limit = config.bests * conditions;
    let rows = match (config.bests_type, generation) {
        (BestsType::Specific, _) => replay::individual_by_id(conn, config.specific_robot)?,
        (BestsType::Gens, Some(generation)) => {
            replay::best_in_generation(conn, generation, order, limit)?
        }
        (BestsType::Gens, None) | (BestsType::All, _) => {
            replay::best_overall(conn, order, limit)?
        }
    };
    Ok(rows)
}

fn print_row(row: &ReplayRow) {
    let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!(
        "\n  id:{}  birth:{}  cond:{}  dom:{}  speed_y:{}\n",
        row.individual_id,
        show(row.birth),
        row.env_conditions_id,
        row.seasonal_dominated,
        show(row.speed_y)
    );
}

/// Simulates one genotype alone under `conditions` and measures it.
pub fn resimulate(
    genotype: &Genotype,
    info: &RunInfo,
    conditions: EnvConditions,
    headless: bool,
) -> Result<Measures> {
    let phenotype = genotype::develop(genotype, info.max_modules, info.substrate);
    let (actor, mut controller) = phenotype.make_actor_and_controller();
    let rotation = conditions.x_rotation_degrees.to_radians();

    let mut env = Environment::new(conditions);
    env.actors
        .push(pose_upright(actor, Quaternion::from_eulers(rotation, 0.0, 0.0)));

    let control: ControlFn<'_> = Box::new(|dt: f64, control: &mut ActorControl| {
        controller.step(dt);
        control.set_dof_targets(0, 0, controller.dof_targets());
    });
    let mut batch = Batch::new(
        info.simulation.simulation_time,
        info.simulation.sampling_frequency,
        info.simulation.control_frequency,
        control,
    );
    batch.environments.push(env);
    let states = LocalRunner::new(headless).run_batch(batch)?;

    Ok(Measure {
        states: Some(states.as_slice()),
        genotype_idx: 0,
        phenotype: &phenotype,
        generation: 0,
        simulation_time: info.simulation.simulation_time,
    }
    .measure_all_non_relative())
}

/// Renders, resimulates and prints one selected individual.
pub fn replay_row(
    conn: &Connection,
    row: &ReplayRow,
    info: &RunInfo,
    study_path: &Path,
    headless: bool,
) -> Result<Measures> {
    print_row(row);
    let serialized = ea::load_genotype(conn, None, row.genotype_id)?;
    let genotype = Genotype::from_json(&serialized)
        .with_context(|| format!("Corrupt genotype {}", row.genotype_id))?;

    let phenotype = genotype::develop(&genotype, info.max_modules, info.substrate);
    let analysis = study_path.join("analysis");
    fs::create_dir_all(&analysis)
        .with_context(|| format!("Failed to create {}", analysis.display()))?;
    let img_path = analysis.join("currentinsim.svg");
    fs::write(&img_path, render_body_svg(&phenotype.body))
        .with_context(|| format!("Failed to write {}", img_path.display()))?;

    let conditions = info
        .env_conditions
        .get(&row.env_conditions_id)
        .copied()
        .unwrap_or_default();
    let measures = resimulate(&genotype, info, conditions, headless)?;
    println!("{}", evorobo_io::to_json_pretty(&measures)?);
    Ok(measures)
}

/// Replays every configured experiment and run.
pub fn run(config: &WatchConfig) -> Result<()> {
    for experiment in &config.experiments {
        println!("\n {experiment}");
        for run in &config.runs {
            println!("\n run: {run}");
            let db_path = config.path.join(experiment).join(format!("run_{run}"));
            let conn = open_read_only(&db_path)?;
            let info = read_run_info(&conn)?;

            let generations: Vec<Option<usize>> = match config.bests_type {
                BestsType::Gens => config.generations.iter().copied().map(Some).collect(),
                BestsType::All | BestsType::Specific => vec![None],
            };
            for generation in generations {
                if let Some(generation) = generation {
                    println!("  in gen: {generation}");
                }
                let rows = select_rows(&conn, config, &info, generation)?;
                if rows.is_empty() {
                    tracing::warn!(
                        experiment = %experiment,
                        run,
                        ?generation,
                        "No individuals to replay"
                    );
                }
                for row in &rows {
                    replay_row(&conn, row, &info, &config.path, config.headless)?;
                }
            }
        }
    }
    Ok(())
}
