//! Hyperparameter values, bounds, and sampling intervals for the Eve update.

use serde::{Deserialize, Serialize};

/// Inclusive interval on the real line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }

    /// Whether `other` lies entirely inside this interval.
    pub fn encloses(&self, other: &Interval) -> bool {
        other.low >= self.low && other.high <= self.high
    }
}

/// Clamp domain for the momentum-decay parameter. Every value handed to a
/// trainer job lies inside these bounds.
pub const BETA1_BOUNDS: Interval = Interval::new(0.80, 0.98);
/// Clamp domain for the variance-decay parameter.
pub const BETA2_BOUNDS: Interval = Interval::new(0.996, 0.9999);
/// Clamp domain for the step-size multiplier.
pub const ETA_BOUNDS: Interval = Interval::new(0.5, 1.5);

/// Rounds to six decimal places, the precision used for trainer overrides and
/// the persisted trial table. Values quantized here survive a text round-trip
/// bit-for-bit.
pub fn quantize(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// One (beta1, beta2, eta) combination for the Eve update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// Momentum decay.
    pub beta1: f64,
    /// Variance decay.
    pub beta2: f64,
    /// Step-size multiplier.
    pub eta: f64,
}

impl HyperParams {
    pub fn new(beta1: f64, beta2: f64, eta: f64) -> Self {
        Self { beta1, beta2, eta }
    }

    /// Clamps each value into its hard bounds and rounds to table precision.
    pub fn clamped(self) -> Self {
        Self {
            beta1: quantize(BETA1_BOUNDS.clamp(self.beta1)),
            beta2: quantize(BETA2_BOUNDS.clamp(self.beta2)),
            eta: quantize(ETA_BOUNDS.clamp(self.eta)),
        }
    }

    pub fn in_hard_bounds(&self) -> bool {
        BETA1_BOUNDS.contains(self.beta1)
            && BETA2_BOUNDS.contains(self.beta2)
            && ETA_BOUNDS.contains(self.eta)
    }
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            beta1: 0.90,   // trainer default momentum decay
            beta2: 0.9990, // trainer default variance decay
            eta: 1.00,     // neutral step-size multiplier
        }
    }
}

/// Per-dimension sampling intervals for broad exploration. A strict subset of
/// the hard bounds; refinement jitter may step outside these intervals but
/// never outside the hard bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub beta1: Interval,
    pub beta2: Interval,
    pub eta: Interval,
}

impl SearchSpace {
    pub fn is_within_hard_bounds(&self) -> bool {
        BETA1_BOUNDS.encloses(&self.beta1)
            && BETA2_BOUNDS.encloses(&self.beta2)
            && ETA_BOUNDS.encloses(&self.eta)
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            beta1: Interval::new(0.85, 0.95),
            beta2: Interval::new(0.9985, 0.9995),
            eta: Interval::new(0.8, 1.2),
        }
    }
}

/// Half-widths of the uniform perturbation applied to each dimension when a
/// refinement trial jitters its seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterWindow {
    pub beta1: f64,
    pub beta2: f64,
    pub eta: f64,
}

impl JitterWindow {
    pub fn is_valid(&self) -> bool {
        [self.beta1, self.beta2, self.eta]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

impl Default for JitterWindow {
    fn default() -> Self {
        Self {
            beta1: 0.01,
            beta2: 2.5e-4,
            eta: 0.08,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_contains_and_clamp() {
        let iv = Interval::new(0.5, 1.5);
        assert!(iv.contains(0.5));
        assert!(iv.contains(1.5));
        assert!(!iv.contains(0.49));
        assert_eq!(iv.clamp(2.0), 1.5);
        assert_eq!(iv.clamp(0.0), 0.5);
        assert_eq!(iv.clamp(1.0), 1.0);
    }

    #[test]
    fn interval_encloses() {
        let outer = Interval::new(0.0, 1.0);
        assert!(outer.encloses(&Interval::new(0.2, 0.8)));
        assert!(outer.encloses(&Interval::new(0.0, 1.0)));
        assert!(!outer.encloses(&Interval::new(0.2, 1.1)));
    }

    #[test]
    fn exploration_space_inside_hard_bounds() {
        assert!(SearchSpace::default().is_within_hard_bounds());
    }

    #[test]
    fn quantize_survives_text_round_trip() {
        let raw = 0.853_188_721_3_f64;
        let q = quantize(raw);
        let text = format!("{q:.6}");
        assert_eq!(text, "0.853189");
        assert_eq!(text.parse::<f64>().unwrap(), q);
    }

    #[test]
    fn clamped_pulls_values_into_hard_bounds() {
        let hp = HyperParams::new(0.70, 1.5, 3.0).clamped();
        assert_eq!(hp.beta1, BETA1_BOUNDS.low);
        assert_eq!(hp.beta2, BETA2_BOUNDS.high);
        assert_eq!(hp.eta, ETA_BOUNDS.high);
        assert!(hp.in_hard_bounds());
    }

    #[test]
    fn clamped_quantizes_in_range_values() {
        let hp = HyperParams::new(0.912_345_678, 0.998_765_432_1, 1.049_999_99).clamped();
        assert_eq!(hp.beta1, 0.912346);
        assert_eq!(hp.beta2, 0.998765);
        assert_eq!(hp.eta, 1.05);
    }

    #[test]
    fn default_params_are_the_trainer_defaults() {
        let hp = HyperParams::default();
        assert_eq!(hp.beta1, 0.90);
        assert_eq!(hp.beta2, 0.9990);
        assert_eq!(hp.eta, 1.00);
        assert!(hp.in_hard_bounds());
    }

    #[test]
    fn default_jitter_window_is_valid() {
        assert!(JitterWindow::default().is_valid());
        let bad = JitterWindow {
            beta1: -0.01,
            ..JitterWindow::default()
        };
        assert!(!bad.is_valid());
    }
}
