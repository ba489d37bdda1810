//! # Evorobo Core
//!
//! Genotype encoding, development and evaluation of modular robots.
//!
//! This crate contains the deterministic logic an experiment is built from:
//! - CPPN genomes with innovation-aligned mutation and crossover
//! - Body growth on a grid and CPG brains
//! - A physics runner contract with a kinematic local runner
//! - Morphological and behavioural measures
//! - Tournament and steady-state selection
//! - A seedable RNG with a portable checkpoint encoding
//!
//! ## Example
//!
//! ```
//! use evorobo_core::body::SubstrateDimensions;
//! use evorobo_core::genotype;
//! use evorobo_core::rng::RunRng;
//! use evorobo_data::InnovationDatabase;
//!
//! let mut rng = RunRng::seed_from_u64(42);
//! let mut body_db = InnovationDatabase::new();
//! let mut brain_db = InnovationDatabase::new();
//!
//! let genotype = genotype::random(&mut body_db, &mut brain_db, &mut rng, 10);
//! let robot = genotype::develop(&genotype, 16, SubstrateDimensions::Planar);
//! let (actor, _controller) = robot.make_actor_and_controller();
//! assert_eq!(actor.parts.len(), robot.body.modules.len());
//! ```

/// Body growth from the body CPPN
pub mod body;
/// Mutation parameters
pub mod config;
/// Central pattern generator brains
pub mod controller;
/// CPPN genome logic (creation, mutation, crossover, evaluation)
pub mod cppn;
/// Genotype codec
pub mod genotype;
/// Morphological and behavioural measures
pub mod measure;
/// Run metrics and logging setup
pub mod metrics;
/// Physics runner contract and local runner
pub mod physics;
/// Survivor selection
pub mod population_management;
/// SVG rendering of bodies
pub mod render;
/// Serializable random number generator
pub mod rng;
/// Parent selection helpers
pub mod selection;

pub use cppn::{CompiledCppn, CppnLogic};
pub use genotype::ModularRobot;
pub use measure::Measure;
pub use metrics::{init_logging, RunMetrics};
pub use physics::{LocalRunner, Runner, RunnerError};
pub use rng::RunRng;
