//! Evaluation grids for overlay curves.

/// `n` points from `lo` to `hi` inclusive, evenly spaced.
pub fn linear_grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            lo + u * (hi - lo)
        })
        .collect()
}

/// `n` points from `lo` to `hi` inclusive, evenly spaced in `ln x`.
///
/// Falls back to a linear grid when either bound is not strictly positive.
pub fn log_grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if !(lo > 0.0 && hi > 0.0) {
        return linear_grid(lo, hi, n);
    }
    let (l0, l1) = (lo.ln(), hi.ln());
    linear_grid(l0, l1, n).into_iter().map(f64::exp).collect()
}
