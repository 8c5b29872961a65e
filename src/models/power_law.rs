//! Power-law tail model `y(x) = a · x^(-b)`.
//!
//! The fitter relies on two primitive operations:
//! - evaluate the model at a center (for residuals and overlay curves)
//! - fill a Jacobian row `[∂y/∂a, ∂y/∂b]` (for the Levenberg–Marquardt step)

use crate::domain::PowerLawParams;
use crate::math::log_grid;

/// Evaluate `a · x^(-b)`. Non-positive `x` yields NaN.
pub fn power_law(x: f64, params: &PowerLawParams) -> f64 {
    if x <= 0.0 {
        return f64::NAN;
    }
    params.amplitude * x.powf(-params.exponent)
}

/// Fill the Jacobian row for center `x` and return the model value.
///
/// - `∂y/∂a = x^(-b)`
/// - `∂y/∂b = -a · ln(x) · x^(-b)`
pub fn fill_jacobian_row(x: f64, params: &PowerLawParams, out: &mut [f64; 2]) -> f64 {
    let base = x.powf(-params.exponent);
    out[0] = base;
    out[1] = -params.amplitude * x.ln() * base;
    params.amplitude * base
}

/// Sample the model on a log-spaced grid over `[lo, hi]`.
pub fn sample_power_law(params: &PowerLawParams, lo: f64, hi: f64, n: usize) -> Vec<(f64, f64)> {
    log_grid(lo, hi, n)
        .into_iter()
        .map(|x| (x, power_law(x, params)))
        .collect()
}
