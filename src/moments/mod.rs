//! Content-weighted moments of a binned spectrum.
//!
//! Both entry points share one range policy: a bin takes part iff its center
//! lies in the closed interval `[low, high]`. Sums are accumulated in ascending
//! center order so results are bit-reproducible for a given input.
//!
//! The engine is stateless. `central_moment` recomputes the mean on every call;
//! callers that need both mean and variance call both.

use crate::domain::MomentResult;
use crate::error::{EngineError, EngineResult};
use crate::histogram::{Bin, HistogramView};

/// Order-`k` raw moment: `Σ c·x^k / Σ c` over the included bins.
pub fn raw_moment<H: HistogramView>(view: &H, order: u32, low: f64, high: f64) -> EngineResult<MomentResult> {
    let k = validate(order, low, high)?;

    let mut numer = 0.0;
    let mut denom = 0.0;
    for b in view.bins_in(low, high) {
        numer += b.content * b.center.powi(k);
        denom += b.content;
    }
    if denom == 0.0 {
        return Err(EngineError::DivisionByZero { low, high });
    }

    let value = numer / denom;
    let uncertainty = propagate(view, low, high, denom, |b| b.center.powi(k) - value);
    Ok(MomentResult { value, uncertainty })
}

/// Order-`k` central moment: `Σ c·(x - mean)^k / Σ c` over the included bins.
///
/// The mean is the first raw moment over the same range.
pub fn central_moment<H: HistogramView>(view: &H, order: u32, low: f64, high: f64) -> EngineResult<MomentResult> {
    let k = validate(order, low, high)?;
    let mean = raw_moment(view, 1, low, high)?.value;

    let mut numer = 0.0;
    let mut lower = 0.0;
    let mut denom = 0.0;
    for b in view.bins_in(low, high) {
        let d = b.center - mean;
        numer += b.content * d.powi(k);
        lower += b.content * d.powi(k - 1);
        denom += b.content;
    }
    if denom == 0.0 {
        return Err(EngineError::DivisionByZero { low, high });
    }

    let value = numer / denom;
    // Order k-1 central moment enters through the mean's own dependence on the
    // contents; it is exactly 1 for k = 1 and ~0 for k = 2.
    let lower = lower / denom;
    let kf = f64::from(order);
    let uncertainty = propagate(view, low, high, denom, |b| {
        let d = b.center - mean;
        d.powi(k) - value - kf * lower * d
    });
    Ok(MomentResult { value, uncertainty })
}

/// First raw moment.
pub fn mean<H: HistogramView>(view: &H, low: f64, high: f64) -> EngineResult<MomentResult> {
    raw_moment(view, 1, low, high)
}

/// Second central moment.
pub fn variance<H: HistogramView>(view: &H, low: f64, high: f64) -> EngineResult<MomentResult> {
    central_moment(view, 2, low, high)
}

fn validate(order: u32, low: f64, high: f64) -> EngineResult<i32> {
    if order < 1 {
        return Err(EngineError::InvalidRange("moment order must be >= 1".into()));
    }
    // Also rejects NaN bounds.
    if !(low < high) {
        return Err(EngineError::InvalidRange(format!(
            "require low < high, got [{low}, {high}]"
        )));
    }
    i32::try_from(order).map_err(|_| EngineError::InvalidRange(format!("moment order {order} too large")))
}

/// Linear error propagation: `sqrt(Σ (σ_i · g_i)^2) / |D|`, where `g_i / D` is
/// the derivative of the moment with respect to bin content `i`.
///
/// Returns `0.0` unless every included bin carries an error.
fn propagate<H, G>(view: &H, low: f64, high: f64, denom: f64, grad: G) -> f64
where
    H: HistogramView,
    G: Fn(&Bin) -> f64,
{
    let mut sum = 0.0;
    for b in view.bins_in(low, high) {
        let Some(sigma) = b.error else {
            return 0.0;
        };
        let g = sigma * grad(&b);
        sum += g * g;
    }
    sum.sqrt() / denom.abs()
}
