//! Small dense least-squares helpers.
//!
//! The tail fitter solves one damped linear problem per Levenberg–Marquardt
//! iteration:
//!
//! ```text
//! minimize ‖ √W J δ − √W r ‖² + λ ‖ √D δ ‖²
//! ```
//!
//! which we express as a single tall system by stacking the damping rows under
//! the weighted Jacobian and hand to an SVD solve. Working on the stacked system
//! instead of forming `JᵀWJ + λD` keeps the condition number at that of `J`
//! rather than its square.

use nalgebra::{DMatrix, DVector, Matrix2};

/// Solve a least squares problem using SVD.
///
/// Singular values below a tolerance relative to the largest one are treated as
/// zero (pseudo-inverse). Returns `None` for an all-zero or non-finite system.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }

    let tol = s_max * 1e-12 * x.nrows().max(x.ncols()) as f64;
    let beta = svd.solve(y, tol).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Solve the damped step `(JᵀWJ + λ diag) δ = JᵀW r` via the stacked system.
///
/// `jw` and `rw` are the Jacobian and residuals already scaled by `√w_i`;
/// `damping[j]` is the per-parameter damping `λ · D_jj`.
///
/// Columns are equilibrated to unit norm before the SVD, so the rank cut-off
/// does not depend on the units of the parameters.
pub fn solve_damped(jw: &DMatrix<f64>, rw: &DVector<f64>, damping: &[f64]) -> Option<DVector<f64>> {
    let n = jw.nrows();
    let p = jw.ncols();
    debug_assert_eq!(damping.len(), p);

    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);
    a.view_mut((0, 0), (n, p)).copy_from(jw);
    b.rows_mut(0, n).copy_from(rw);
    for (j, &d) in damping.iter().enumerate() {
        a[(n + j, j)] = d.max(0.0).sqrt();
    }

    let norms: Vec<f64> = (0..p)
        .map(|j| {
            let c = a.column(j).norm();
            if c.is_finite() && c > 0.0 { c } else { 1.0 }
        })
        .collect();
    for (j, &c) in norms.iter().enumerate() {
        a.column_mut(j).unscale_mut(c);
    }

    let mut delta = solve_least_squares(&a, &b)?;
    for (j, &c) in norms.iter().enumerate() {
        delta[j] /= c;
    }
    delta.iter().all(|v| v.is_finite()).then_some(delta)
}

/// Smallest `1 − ρ²` of a normal matrix still treated as full rank.
const MIN_DECORRELATION: f64 = 1e-12;

/// Invert a symmetric 2×2 normal matrix, rejecting singular or non-finite results.
///
/// Rank is judged on the correlation form `1 − ρ²`, with
/// `ρ = m01 / √(m00 m11)`, so rescaling either parameter never changes the
/// verdict.
pub fn invert_normal_2x2(m: &Matrix2<f64>) -> Option<Matrix2<f64>> {
    let (m00, m11) = (m[(0, 0)], m[(1, 1)]);
    if !(m00.is_finite() && m11.is_finite() && m00 > 0.0 && m11 > 0.0) {
        return None;
    }
    let (s0, s1) = (m00.sqrt(), m11.sqrt());
    let rho = 0.5 * (m[(0, 1)] + m[(1, 0)]) / (s0 * s1);
    let decorrelation = 1.0 - rho * rho;
    if !(decorrelation.is_finite() && decorrelation > MIN_DECORRELATION) {
        return None;
    }

    let off = -rho / (s0 * s1 * decorrelation);
    let inv = Matrix2::new(1.0 / (m00 * decorrelation), off, off, 1.0 / (m11 * decorrelation));
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}
