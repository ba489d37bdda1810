//! Run metrics and logging setup.
//!
//! Provides structured logging of generation progress for monitoring
//! long-running experiments.

use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Counters of one optimization process.
#[derive(Debug)]
pub struct RunMetrics {
    generations: u64,
    evaluations: u64,
    simulated_steps: u64,
    best_fitness: f64,
    start_time: Instant,
    generation_start: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            generations: 0,
            evaluations: 0,
            simulated_steps: 0,
            best_fitness: f64::NEG_INFINITY,
            start_time: now,
            generation_start: now,
        }
    }

    /// Marks the start of a generation.
    pub fn begin_generation(&mut self) {
        self.generation_start = Instant::now();
    }

    /// Records one evaluated batch.
    pub fn record_evaluation(&mut self, individuals: usize, samples: usize) {
        self.evaluations += individuals as u64;
        self.simulated_steps += samples as u64;
    }

    /// Records a completed generation and logs its summary.
    pub fn record_generation(&mut self, generation_index: usize, fitnesses: &[f64]) -> Duration {
        self.generations += 1;
        let duration = self.generation_start.elapsed();
        let best = fitnesses
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let mean = if fitnesses.is_empty() {
            0.0
        } else {
            fitnesses.iter().sum::<f64>() / fitnesses.len() as f64
        };
        self.best_fitness = self.best_fitness.max(best);

        tracing::info!(
            generation = generation_index,
            best_fitness = best,
            mean_fitness = mean,
            evaluations = self.evaluations,
            duration_ms = duration.as_millis() as u64,
            "Generation finished"
        );
        duration
    }

    #[must_use]
    pub fn generations(&self) -> u64 {
        self.generations
    }

    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    #[must_use]
    pub fn simulated_samples(&self) -> u64 {
        self.simulated_steps
    }

    /// Best fitness seen by this process, `-inf` before the first generation.
    #[must_use]
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = RunMetrics::new();
        assert_eq!(metrics.generations(), 0);
        assert_eq!(metrics.evaluations(), 0);
        assert_eq!(metrics.best_fitness(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_record_generation() {
        let mut metrics = RunMetrics::new();
        metrics.begin_generation();
        metrics.record_evaluation(3, 33);
        metrics.record_generation(1, &[1.0, 4.0, -2.0]);
        metrics.record_generation(2, &[0.5]);
        assert_eq!(metrics.generations(), 2);
        assert_eq!(metrics.evaluations(), 3);
        assert_eq!(metrics.simulated_samples(), 33);
        assert_eq!(metrics.best_fitness(), 4.0);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging();
        init_logging();
    }
}
