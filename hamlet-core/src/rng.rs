//! Seedable random source shared by terrain generation, character creation,
//! the decision policy and action execution.
//!
//! Every stochastic function in hamlet takes `&mut R where R: Rng` instead of
//! reaching for a thread-local generator, so a fixed seed reproduces a run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The concrete generator the simulation owns.
pub type SimRng = StdRng;

/// Build the simulation generator, from `seed` when given, otherwise from entropy.
#[must_use]
pub fn sim_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// A uniform draw in `[0, 1)`.
pub fn roll<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..1.0)
}

/// `true` with probability `p`. Values of `p` at or above 1 always succeed,
/// values at or below 0 never do.
pub fn chance<R: Rng>(rng: &mut R, p: f64) -> bool {
    roll(rng) < p
}
