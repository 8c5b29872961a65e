//! Normalized Gaussian overlay parameterized by spectrum moments.
//!
//! The overlay is built by the caller from a mean and a variance; nothing here
//! fits anything.

use serde::{Deserialize, Serialize};

use crate::domain::MomentResult;
use crate::math::linear_grid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianOverlay {
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianOverlay {
    /// `sigma = sqrt(variance)`. Returns `None` for a non-positive or
    /// non-finite variance.
    pub fn from_moments(mean: &MomentResult, variance: &MomentResult) -> Option<Self> {
        let var = variance.value;
        if !(var.is_finite() && var > 0.0 && mean.value.is_finite()) {
            return None;
        }
        Some(Self {
            mean: mean.value,
            sigma: var.sqrt(),
        })
    }

    /// Unit-area density `exp(-(x-μ)²/2σ²) / (σ√(2π))`.
    pub fn density(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.sigma;
        (-0.5 * z * z).exp() / (self.sigma * std::f64::consts::TAU.sqrt())
    }

    pub fn sample(&self, lo: f64, hi: f64, n: usize) -> Vec<(f64, f64)> {
        linear_grid(lo, hi, n)
            .into_iter()
            .map(|x| (x, self.density(x)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(value: f64) -> MomentResult {
        MomentResult {
            value,
            uncertainty: 0.0,
        }
    }

    #[test]
    fn sigma_is_root_of_variance() {
        let g = GaussianOverlay::from_moments(&m(1.2), &m(0.25)).unwrap();
        assert_eq!(g.mean, 1.2);
        assert_eq!(g.sigma, 0.5);
        assert!(GaussianOverlay::from_moments(&m(1.0), &m(0.0)).is_none());
        assert!(GaussianOverlay::from_moments(&m(1.0), &m(-1.0)).is_none());
    }

    #[test]
    fn density_integrates_to_one() {
        let g = GaussianOverlay { mean: 0.7, sigma: 0.3 };
        let pts = g.sample(-3.0, 5.0, 4001);
        let dx = pts[1].0 - pts[0].0;
        let area: f64 = pts.iter().map(|&(_, y)| y * dx).sum();
        assert!((area - 1.0).abs() < 1e-6);

        let peak = 1.0 / (0.3 * std::f64::consts::TAU.sqrt());
        assert!((g.density(0.7) - peak).abs() < 1e-12);
    }
}
