//! Evolutionary robotics experiment harness.
//!
//! Modular robots are evolved with a steady-state EA: [`optimizer::Optimizer`]
//! is the experiment policy plugged into the generic [`ea::EaOptimizer`]
//! driver, every generation is checkpointed to SQLite and a run resumes from
//! its latest checkpoint.

pub mod config;
pub mod ea;
pub mod error;
pub mod optimizer;
pub mod watch;

pub use config::ExperimentConfig;
pub use ea::{EaOptimizer, EaPolicy, ProcessIdGen};
pub use error::{EaError, Result};
pub use optimizer::{Optimizer, SimulationSettings};
