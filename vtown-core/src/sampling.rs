//! Draw helpers over the model's seeded RNG.
//!
//! Degenerate parameters (empty ranges, zero spread) return the obvious
//! constant instead of panicking, so configs with collapsed ranges still run.

use rand::Rng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, Normal};

/// Gaussian draw; `sd <= 0` yields `mean` exactly.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    if sd <= 0.0 || !sd.is_finite() {
        return mean;
    }
    match Normal::new(mean, sd) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

/// Uniform draw in `[lo, hi)`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    rng.random_range(lo..hi)
}

/// Uniform integer in `[lo, hi)`, matching half-open placement windows.
pub fn uniform_int<R: Rng + ?Sized>(rng: &mut R, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        return lo;
    }
    rng.random_range(lo..hi)
}

/// Bernoulli trial: a fresh unit draw compared against `p`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}

/// Pick one item by weight; falls back to the first item when the weights are unusable.
pub fn choose_weighted<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[(T, f64)]) -> Option<T> {
    match items.choose_weighted(rng, |item| item.1.max(0.0)) {
        Ok(item) => Some(item.0),
        Err(_) => items.first().map(|item| item.0),
    }
}

/// Pick one item uniformly.
pub fn choose<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> Option<T> {
    items.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_degenerate_draws_are_constant() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(gaussian(&mut rng, 1.0, 0.0), 1.0);
        assert_eq!(uniform(&mut rng, 0.4, 0.4), 0.4);
        assert_eq!(uniform_int(&mut rng, 3, 3), 3);
    }

    #[test]
    fn test_uniform_int_half_open() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let v = uniform_int(&mut rng, 20, 25);
            assert!((20..25).contains(&v));
        }
    }

    #[test]
    fn test_choose_weighted_respects_zero_weight() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let picked = choose_weighted(&mut rng, &[("a", 0.0), ("b", 1.0)]);
            assert_eq!(picked, Some("b"));
        }
        assert_eq!(choose_weighted::<_, &str>(&mut rng, &[]), None);
    }
}
