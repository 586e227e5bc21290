//! Random draws used by random mode.
//!
//! The allocator only ever asks three questions of its random source, so
//! tests can script them exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::RoundingStep;

/// Probability that random mode redistributes leftover budget.
pub const REDISTRIBUTE_PROBABILITY: f64 = 0.7;

/// Source of the three random-mode draws.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource {
    /// Rounding step, uniform over {0, 10, 50, 100}.
    fn rounding_step(&mut self) -> RoundingStep;

    /// Whether leftover budget is redistributed.
    fn redistribute_leftover(&mut self) -> bool;

    /// Integer jitter in `[0, upper)`; 0 when `upper <= 0`.
    fn jitter(&mut self, upper: f64) -> f64;
}

/// `rand`-backed source: OS entropy by default, or a fixed seed.
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible draws for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn rounding_step(&mut self) -> RoundingStep {
        RoundingStep::ALL[self.rng.gen_range(0..RoundingStep::ALL.len())]
    }

    fn redistribute_leftover(&mut self) -> bool {
        self.rng.gen_bool(REDISTRIBUTE_PROBABILITY)
    }

    fn jitter(&mut self, upper: f64) -> f64 {
        if upper <= 0.0 || !upper.is_finite() {
            return 0.0;
        }
        (self.rng.gen::<f64>() * upper).floor()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_within_bounds() {
        let mut rng = SystemRandom::seeded(7);
        for _ in 0..1_000 {
            let j = rng.jitter(50.0);
            assert!((0.0..50.0).contains(&j));
            assert_eq!(j, j.floor());
        }
    }

    #[test]
    fn test_jitter_zero_upper() {
        let mut rng = SystemRandom::seeded(7);
        assert_eq!(rng.jitter(0.0), 0.0);
        assert_eq!(rng.jitter(-10.0), 0.0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SystemRandom::seeded(42);
        let mut b = SystemRandom::seeded(42);
        for _ in 0..20 {
            assert_eq!(a.rounding_step(), b.rounding_step());
            assert_eq!(a.redistribute_leftover(), b.redistribute_leftover());
            assert_eq!(a.jitter(100.0), b.jitter(100.0));
        }
    }

    #[test]
    fn test_rounding_step_draws_every_option() {
        let mut rng = SystemRandom::seeded(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(rng.rounding_step());
        }
        assert_eq!(seen.len(), RoundingStep::ALL.len());
    }

    #[test]
    fn test_redistribute_frequency() {
        let mut rng = SystemRandom::seeded(3);
        let hits = (0..10_000).filter(|_| rng.redistribute_leftover()).count();
        // 0.7 expected; wide band to stay deterministic-safe.
        assert!((6_500..7_500).contains(&hits), "hits = {hits}");
    }
}
