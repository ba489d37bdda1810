//! Survivor selection strategies.

use crate::selection::multiple_unique;

/// Picks survivors from the union of the old and new populations.
///
/// `selector` is called on the concatenated populations until as many
/// distinct individuals as the old population holds are chosen. The result
/// is split into ascending `(old, new)` index lists whose total length
/// always equals `old_genotypes.len()`.
pub fn steady_state<G, F>(
    old_genotypes: &[G],
    old_fitnesses: &[f64],
    new_genotypes: &[G],
    new_fitnesses: &[f64],
    selector: F,
) -> (Vec<usize>, Vec<usize>)
where
    G: Clone,
    F: FnMut(&[G], &[f64]) -> usize,
{
    assert_eq!(old_genotypes.len(), old_fitnesses.len());
    assert_eq!(new_genotypes.len(), new_fitnesses.len());

    let num_survivors = old_genotypes.len();
    let genotypes: Vec<G> = old_genotypes.iter().chain(new_genotypes).cloned().collect();
    let fitnesses: Vec<f64> = old_fitnesses.iter().chain(new_fitnesses).copied().collect();

    let selected = multiple_unique(&genotypes, &fitnesses, num_survivors, selector);

    let (mut old, mut new): (Vec<usize>, Vec<usize>) =
        selected.into_iter().partition(|&idx| idx < num_survivors);
    for idx in &mut new {
        *idx -= num_survivors;
    }
    old.sort_unstable();
    new.sort_unstable();
    (old, new)
}
