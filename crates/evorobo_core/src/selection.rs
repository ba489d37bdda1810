//! Index-based selection helpers.
//!
//! Selectors return positions into the population and fitness slices, never
//! the individuals themselves.

use rand::Rng;

/// Draws `k` indices with replacement and returns the fittest one.
///
/// Ties go to the earliest draw. `NaN` ranks as negative infinity, so it
/// never beats a finite fitness but ties with `-inf`.
///
/// # Panics
/// Panics when `fitnesses` is empty or `k` is zero.
pub fn tournament<R: Rng>(rng: &mut R, fitnesses: &[f64], k: usize) -> usize {
    assert!(!fitnesses.is_empty(), "tournament over an empty population");
    assert!(k > 0, "tournament size must be at least one");

    let mut best = rng.gen_range(0..fitnesses.len());
    for _ in 1..k {
        let candidate = rng.gen_range(0..fitnesses.len());
        if total_key(fitnesses[candidate]).total_cmp(&total_key(fitnesses[best])).is_gt() {
            best = candidate;
        }
    }
    best
}

fn total_key(f: f64) -> f64 {
    if f.is_nan() {
        f64::NEG_INFINITY
    } else {
        f
    }
}

/// Calls `selector` until `n` distinct indices are collected, in draw order.
///
/// # Panics
/// Panics when `n` exceeds the population size.
pub fn multiple_unique<T, F>(population: &[T], fitnesses: &[f64], n: usize, mut selector: F) -> Vec<usize>
where
    F: FnMut(&[T], &[f64]) -> usize,
{
    assert!(
        n <= population.len(),
        "cannot select {n} unique individuals from {}",
        population.len()
    );
    let mut selected: Vec<usize> = Vec::with_capacity(n);
    while selected.len() < n {
        let idx = selector(population, fitnesses);
        if !selected.contains(&idx) {
            selected.push(idx);
        }
    }
    selected
}
