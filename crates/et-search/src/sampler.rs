//! Seeded parameter sampling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use et_types::{HyperParams, JitterWindow, SearchSpace};

/// Single source of randomness for a campaign. Seeding it makes every
/// sampled and jittered parameter set reproducible.
pub struct ParamSampler {
    rng: ChaCha8Rng,
}

impl ParamSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One parameter set drawn uniformly from the exploration space.
    pub fn sample(&mut self, space: &SearchSpace) -> HyperParams {
        HyperParams::new(
            self.rng.random_range(space.beta1.low..=space.beta1.high),
            self.rng.random_range(space.beta2.low..=space.beta2.high),
            self.rng.random_range(space.eta.low..=space.eta.high),
        )
        .clamped()
    }

    /// A perturbation of `base`, at most one window half-width away per
    /// dimension. The result is clamped to the hard bounds only, so it may
    /// leave the exploration space.
    pub fn jitter(&mut self, base: HyperParams, window: &JitterWindow) -> HyperParams {
        HyperParams::new(
            base.beta1 + self.rng.random_range(-window.beta1..=window.beta1),
            base.beta2 + self.rng.random_range(-window.beta2..=window.beta2),
            base.eta + self.rng.random_range(-window.eta..=window.eta),
        )
        .clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use et_types::{quantize, Interval, BETA1_BOUNDS, BETA2_BOUNDS, ETA_BOUNDS};

    #[test]
    fn same_seed_reproduces_the_sequence() {
        let space = SearchSpace::default();
        let window = JitterWindow::default();
        let mut a = ParamSampler::new(42);
        let mut b = ParamSampler::new(42);

        for _ in 0..5 {
            assert_eq!(a.sample(&space), b.sample(&space));
        }
        let base = HyperParams::default();
        for _ in 0..5 {
            assert_eq!(a.jitter(base, &window), b.jitter(base, &window));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let space = SearchSpace::default();
        let mut a = ParamSampler::new(1);
        let mut b = ParamSampler::new(2);
        let draws_a: Vec<HyperParams> = (0..4).map(|_| a.sample(&space)).collect();
        let draws_b: Vec<HyperParams> = (0..4).map(|_| b.sample(&space)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn samples_stay_inside_the_exploration_space() {
        let space = SearchSpace::default();
        let mut sampler = ParamSampler::new(7);
        for _ in 0..500 {
            let params = sampler.sample(&space);
            assert!(space.beta1.contains(params.beta1));
            assert!(space.beta2.contains(params.beta2));
            assert!(space.eta.contains(params.eta));
        }
    }

    #[test]
    fn samples_are_quantized() {
        let space = SearchSpace::default();
        let mut sampler = ParamSampler::new(11);
        for _ in 0..100 {
            let params = sampler.sample(&space);
            assert_eq!(params.beta1, quantize(params.beta1));
            assert_eq!(params.beta2, quantize(params.beta2));
            assert_eq!(params.eta, quantize(params.eta));
        }
    }

    #[test]
    fn jitter_stays_within_window_and_hard_bounds() {
        let window = JitterWindow::default();
        let base = HyperParams::default();
        let mut sampler = ParamSampler::new(3);
        // Quantization may move a draw by half an ulp of the sixth decimal.
        let slack = 1e-6;
        for _ in 0..500 {
            let params = sampler.jitter(base, &window);
            assert!((params.beta1 - base.beta1).abs() <= window.beta1 + slack);
            assert!((params.beta2 - base.beta2).abs() <= window.beta2 + slack);
            assert!((params.eta - base.eta).abs() <= window.eta + slack);
            assert!(params.in_hard_bounds());
        }
    }

    #[test]
    fn jitter_may_leave_the_exploration_space() {
        let space = SearchSpace::default();
        let window = JitterWindow::default();
        // Anchor on the exploration edge; half the draws land below it.
        let base = HyperParams::new(space.beta1.low, 0.999, 1.0);
        let mut sampler = ParamSampler::new(5);

        let mut escaped = false;
        for _ in 0..200 {
            let params = sampler.jitter(base, &window);
            assert!(params.beta1 >= BETA1_BOUNDS.low);
            if params.beta1 < space.beta1.low {
                escaped = true;
            }
        }
        assert!(escaped);
    }

    #[test]
    fn jitter_clamps_at_the_hard_boundary() {
        let window = JitterWindow::default();
        let base = HyperParams::new(BETA1_BOUNDS.high, BETA2_BOUNDS.high, ETA_BOUNDS.high);
        let mut sampler = ParamSampler::new(9);
        for _ in 0..200 {
            let params = sampler.jitter(base, &window);
            assert!(params.beta1 <= BETA1_BOUNDS.high);
            assert!(params.beta2 <= BETA2_BOUNDS.high);
            assert!(params.eta <= ETA_BOUNDS.high);
        }
    }

    #[test]
    fn narrow_space_still_samples() {
        let space = SearchSpace {
            beta1: Interval::new(0.9, 0.9),
            beta2: Interval::new(0.999, 0.999),
            eta: Interval::new(1.0, 1.0),
        };
        let mut sampler = ParamSampler::new(13);
        assert_eq!(sampler.sample(&space), HyperParams::new(0.9, 0.999, 1.0));
    }
}
