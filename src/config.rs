//! Experiment configuration.
//!
//! Every setting is a command-line flag. `--config run.toml` reads the whole
//! configuration from a TOML file instead; keys missing from the file take
//! their defaults.
//!
//! ```toml
//! study_name = "default_study"
//! experiment_name = "speed"
//! run = 3
//! population_size = 50
//! offspring_size = 50
//! num_generations = 200
//! body_substrate_dimensions = "3d"
//! seed = 42
//!
//! [mutation]
//! weight_rate = 0.5
//! add_node_prob = 0.1
//! ```
//!
//! Mutation parameters are only read from a file; the flags use their
//! defaults.

use anyhow::{Context, Result};
use clap::Parser;
use evorobo_core::body::SubstrateDimensions;
use evorobo_core::config::MutationConfig;
use evorobo_core::measure::Measure;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Evolve modular robots", long_about = None)]
pub struct Cli {
    /// Read the experiment from a TOML file instead of the flags below.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub experiment: ExperimentConfig,
}

#[derive(clap::Args, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    #[arg(long, default_value = "default_study")]
    pub study_name: String,

    #[arg(long, default_value = "default_experiment")]
    pub experiment_name: String,

    #[arg(long, default_value_t = 1)]
    pub run: u32,

    #[arg(long, default_value_t = 100)]
    pub population_size: usize,

    /// Mutations applied to each genotype of the initial population.
    #[arg(long, default_value_t = 10)]
    pub num_initial_mutations: usize,

    /// Seconds simulated per evaluation.
    #[arg(long, default_value_t = 30)]
    pub simulation_time: u32,

    #[arg(long, default_value_t = 5.0)]
    pub sampling_frequency: f64,

    #[arg(long, default_value_t = 5.0)]
    pub control_frequency: f64,

    #[arg(long, default_value_t = 100)]
    pub num_generations: usize,

    #[arg(long, default_value = "speed_y")]
    pub fitness_measure: String,

    #[arg(long, default_value_t = 100)]
    pub offspring_size: usize,

    #[arg(long, default_value_t = 10)]
    pub max_modules: usize,

    /// `2d` or `3d`.
    #[arg(long, default_value = "2d")]
    pub body_substrate_dimensions: SubstrateDimensions,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub run_simulation: bool,

    /// Seed for the run's generator; operating-system entropy when absent.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory holding `{study}/{experiment}/run_{n}` databases.
    #[arg(long, default_value = "./data")]
    pub data_root: PathBuf,

    #[arg(skip)]
    pub mutation: MutationConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            study_name: "default_study".to_string(),
            experiment_name: "default_experiment".to_string(),
            run: 1,
            population_size: 100,
            num_initial_mutations: 10,
            simulation_time: 30,
            sampling_frequency: 5.0,
            control_frequency: 5.0,
            num_generations: 100,
            fitness_measure: "speed_y".to_string(),
            offspring_size: 100,
            max_modules: 10,
            body_substrate_dimensions: SubstrateDimensions::Planar,
            run_simulation: true,
            seed: None,
            data_root: PathBuf::from("./data"),
            mutation: MutationConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Resolves the configuration from parsed arguments.
    pub fn from_args(args: Cli) -> Result<Self> {
        let config = match args.config {
            Some(path) => Self::load(&path)?,
            None => args.experiment,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.study_name.is_empty(), "study_name must not be empty");
        anyhow::ensure!(
            !self.experiment_name.is_empty(),
            "experiment_name must not be empty"
        );
        anyhow::ensure!(self.population_size >= 2, "population_size must be at least 2");
        anyhow::ensure!(self.offspring_size >= 1, "offspring_size must be at least 1");
        anyhow::ensure!(self.max_modules >= 1, "max_modules must be at least 1");
        anyhow::ensure!(self.simulation_time > 0, "simulation_time must be positive");
        anyhow::ensure!(
            self.sampling_frequency > 0.0,
            "sampling_frequency must be positive"
        );
        anyhow::ensure!(
            self.control_frequency > 0.0,
            "control_frequency must be positive"
        );
        anyhow::ensure!(
            Measure::is_known(&self.fitness_measure),
            "unknown fitness measure '{}'",
            self.fitness_measure
        );
        self.mutation.validate().context("Invalid [mutation] section")?;
        Ok(())
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_root
            .join(&self.study_name)
            .join(&self.experiment_name)
            .join(format!("run_{}", self.run))
    }

    /// Hex SHA-256 of the canonical JSON form, for telling runs apart in logs.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self).context("Failed to serialize config")?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}
