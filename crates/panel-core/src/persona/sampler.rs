//! Uniform participant sampling.
//!
//! Participants are drawn without replacement. The order of the returned
//! indices matters: position `k` in the selection becomes participant id
//! `k + 1`, independent of where the persona sits in the population.

use rand::Rng;

/// Selects `min(count, total)` distinct indices from `[0, total)` using the
/// thread-local RNG.
pub fn select_indices(total: usize, count: usize) -> Vec<usize> {
    select_indices_with(&mut rand::thread_rng(), total, count)
}

/// Selects `min(count, total)` distinct indices from `[0, total)`.
///
/// Runs a full Fisher–Yates shuffle over the population and keeps the first
/// `count` elements, so every ordering of the population is equally likely.
pub fn select_indices_with<R: Rng + ?Sized>(rng: &mut R, total: usize, count: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..total).collect();
    for i in (1..total).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
    indices.truncate(count.min(total));
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn full_selection_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut picked = select_indices_with(&mut rng, 10, 10);
        assert_eq!(picked.len(), 10);
        picked.sort_unstable();
        assert_eq!(picked, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn count_is_capped_at_population() {
        let picked = select_indices(10, 15);
        assert_eq!(picked.len(), 10);
    }

    #[test]
    fn partial_selection_has_no_duplicates() {
        let mut rng = StdRng::seed_from_u64(42);
        let picked = select_indices_with(&mut rng, 50, 12);
        assert_eq!(picked.len(), 12);
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 12);
        assert!(picked.iter().all(|&i| i < 50));
    }

    #[test]
    fn empty_population_selects_nothing() {
        assert!(select_indices(0, 5).is_empty());
        assert!(select_indices(5, 0).is_empty());
    }

    #[test]
    fn same_seed_same_selection() {
        let a = select_indices_with(&mut StdRng::seed_from_u64(99), 20, 5);
        let b = select_indices_with(&mut StdRng::seed_from_u64(99), 20, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn every_position_is_reachable() {
        // Each index should appear first at least once over many draws.
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_first = [false; 4];
        for _ in 0..400 {
            let picked = select_indices_with(&mut rng, 4, 1);
            seen_first[picked[0]] = true;
        }
        assert!(seen_first.iter().all(|seen| *seen));
    }
}
