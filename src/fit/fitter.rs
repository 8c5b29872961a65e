//! Levenberg–Marquardt fit of `y = a · x^(-b)` to a tail window.
//!
//! Given:
//! - centers `x_i` and contents `y_i` of the bins with `low ≤ x_i ≤ high`
//! - weights `w_i` (`1/σ_i²` or all ones)
//! - a starting point `(a₀, b₀)`
//!
//! we iterate damped Gauss–Newton steps
//!
//! ```text
//! (JᵀWJ + λ·diag(JᵀWJ)) δ = JᵀW r
//! ```
//!
//! shrinking `λ` after an accepted step and growing it after a rejected one.
//! Each damped system is solved as a stacked least-squares problem (see
//! `math::ols`), never by forming an explicit inverse.

use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector, Matrix2};

use crate::domain::{Convergence, PowerLawParams, TailFitResult, Weighting};
use crate::error::{EngineError, EngineResult, FitFailure};
use crate::histogram::HistogramView;
use crate::math::{invert_normal_2x2, solve_damped};
use crate::models::fill_jacobian_row;

const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;
/// Floor for Marquardt scaling so a vanishing Jacobian column still gets damped.
const DIAG_FLOOR: f64 = 1e-300;

/// Minimizer settings.
#[derive(Debug, Clone)]
pub struct TailFitOptions {
    /// Starting point; echoed back in `TailFitResult::initial`.
    pub initial: PowerLawParams,
    pub weighting: Weighting,
    /// Maximum number of damped steps (accepted or rejected).
    pub max_iterations: usize,
    /// Optional wall-clock budget for the whole fit.
    pub time_budget: Option<Duration>,
    /// Relative step tolerance, applied to each parameter separately.
    pub xtol: f64,
    /// Relative cost-reduction tolerance.
    pub ftol: f64,
    /// Cosine tolerance between residual vector and Jacobian columns.
    pub gtol: f64,
    /// Starting damping factor `λ`.
    pub initial_damping: f64,
}

impl Default for TailFitOptions {
    fn default() -> Self {
        Self {
            initial: PowerLawParams::default(),
            weighting: Weighting::Auto,
            max_iterations: 500,
            time_budget: None,
            xtol: 1e-10,
            ftol: 1e-12,
            gtol: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

/// Fit with default options and the given starting point.
pub fn fit_power_law<H: HistogramView>(
    view: &H,
    low: f64,
    high: f64,
    initial_amplitude: f64,
    initial_exponent: f64,
) -> EngineResult<TailFitResult> {
    let opts = TailFitOptions {
        initial: PowerLawParams {
            amplitude: initial_amplitude,
            exponent: initial_exponent,
        },
        ..TailFitOptions::default()
    };
    fit_power_law_with(view, low, high, &opts)
}

/// Fit with explicit options.
pub fn fit_power_law_with<H: HistogramView>(
    view: &H,
    low: f64,
    high: f64,
    opts: &TailFitOptions,
) -> EngineResult<TailFitResult> {
    if !(low < high) {
        return Err(EngineError::InvalidRange(format!(
            "require low < high, got [{low}, {high}]"
        )));
    }
    if !(opts.initial.amplitude.is_finite() && opts.initial.exponent.is_finite()) {
        return Err(EngineError::InvalidRange("initial parameters must be finite".into()));
    }

    let bins: Vec<_> = view.bins_in(low, high).collect();
    if let Some(b) = bins.iter().find(|b| b.center <= 0.0) {
        return Err(EngineError::InvalidRange(format!(
            "power-law tail needs positive centers, found {} in [{low}, {high}]",
            b.center
        )));
    }
    if bins.len() < 2 {
        return Err(not_converged(FitFailure::SingularJacobian, 0));
    }

    let weighted = opts.weighting == Weighting::Auto
        && bins.iter().all(|b| matches!(b.error, Some(e) if e > 0.0));

    let xs: Vec<f64> = bins.iter().map(|b| b.center).collect();
    let ys: Vec<f64> = bins.iter().map(|b| b.content).collect();
    let sqrt_w: Vec<f64> = bins
        .iter()
        .map(|b| match (weighted, b.error) {
            (true, Some(e)) => 1.0 / e,
            _ => 1.0,
        })
        .collect();

    let started = Instant::now();
    let mut params = opts.initial;
    let mut current = evaluate(&xs, &ys, &sqrt_w, &params).ok_or_else(|| not_converged(FitFailure::NonFinite, 0))?;
    let mut lambda = opts.initial_damping.max(LAMBDA_MIN);
    let mut iterations = 0usize;

    let convergence = loop {
        if current.chi2 == 0.0 {
            break Convergence::ExactFit;
        }

        let jtj = normal_matrix(&current.jw);
        if invert_normal_2x2(&jtj).is_none() {
            return Err(not_converged(FitFailure::SingularJacobian, iterations));
        }
        if gradient_cosine(&current) <= opts.gtol {
            break Convergence::GradientTolerance;
        }

        if iterations >= opts.max_iterations {
            return Err(not_converged(FitFailure::IterationBudget, iterations));
        }
        if let Some(budget) = opts.time_budget {
            if started.elapsed() >= budget {
                return Err(not_converged(FitFailure::TimeBudget, iterations));
            }
        }
        iterations += 1;

        let damping = [
            lambda * jtj[(0, 0)].max(DIAG_FLOOR),
            lambda * jtj[(1, 1)].max(DIAG_FLOOR),
        ];
        let Some(delta) = solve_damped(&current.jw, &current.rw, &damping) else {
            return Err(not_converged(FitFailure::SingularJacobian, iterations));
        };

        let step_small = |d: f64, p: f64| d.abs() <= opts.xtol * (p.abs() + opts.xtol);
        if step_small(delta[0], params.amplitude) && step_small(delta[1], params.exponent) {
            break Convergence::StepTolerance;
        }

        let trial = PowerLawParams {
            amplitude: params.amplitude + delta[0],
            exponent: params.exponent + delta[1],
        };
        match evaluate(&xs, &ys, &sqrt_w, &trial) {
            Some(next) if next.chi2 < current.chi2 => {
                let linear = &current.rw - &current.jw * &delta;
                let predicted = current.chi2 - linear.norm_squared();
                let actual = current.chi2 - next.chi2;
                let small = actual <= opts.ftol * current.chi2 && predicted <= opts.ftol * current.chi2;

                params = trial;
                current = next;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                if small {
                    break Convergence::CostTolerance;
                }
            }
            _ => {
                lambda = (lambda * 10.0).min(LAMBDA_MAX);
            }
        }
    };

    let n = xs.len();
    let ndf = n - 2;
    let inv = invert_normal_2x2(&normal_matrix(&current.jw))
        .ok_or_else(|| not_converged(FitFailure::SingularJacobian, iterations))?;
    let scale = if !weighted && ndf > 0 {
        current.sse / ndf as f64
    } else {
        1.0
    };
    let cov = inv * scale;

    Ok(TailFitResult {
        amplitude: params.amplitude,
        exponent: params.exponent,
        covariance: [[cov[(0, 0)], cov[(0, 1)]], [cov[(1, 0)], cov[(1, 1)]]],
        sse: current.sse,
        chi2: current.chi2,
        ndf,
        n_points: n,
        iterations,
        weighted,
        convergence,
        initial: opts.initial,
    })
}

fn not_converged(reason: FitFailure, iterations: usize) -> EngineError {
    EngineError::FitDidNotConverge { reason, iterations }
}

/// Weighted residuals, Jacobian and costs at one parameter point.
struct Evaluation {
    /// `√w_i · ∂f/∂p` rows.
    jw: DMatrix<f64>,
    /// `√w_i · (y_i − f_i)`.
    rw: DVector<f64>,
    /// `Σ w_i r_i²`.
    chi2: f64,
    /// `Σ r_i²`.
    sse: f64,
}

fn evaluate(xs: &[f64], ys: &[f64], sqrt_w: &[f64], params: &PowerLawParams) -> Option<Evaluation> {
    let n = xs.len();
    let mut jw = DMatrix::<f64>::zeros(n, 2);
    let mut rw = DVector::<f64>::zeros(n);
    let mut row = [0.0; 2];
    let mut sse = 0.0;

    for i in 0..n {
        let f = fill_jacobian_row(xs[i], params, &mut row);
        let r = ys[i] - f;
        let sw = sqrt_w[i];
        jw[(i, 0)] = row[0] * sw;
        jw[(i, 1)] = row[1] * sw;
        rw[i] = r * sw;
        sse += r * r;
    }

    let chi2 = rw.norm_squared();
    let finite = chi2.is_finite() && sse.is_finite() && jw.iter().all(|v| v.is_finite());
    finite.then_some(Evaluation { jw, rw, chi2, sse })
}

fn normal_matrix(jw: &DMatrix<f64>) -> Matrix2<f64> {
    let m = jw.transpose() * jw;
    Matrix2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)])
}

/// Largest `|J_jᵀ r| / (‖J_j‖ ‖r‖)` over the columns.
fn gradient_cosine(eval: &Evaluation) -> f64 {
    let r_norm = eval.rw.norm();
    if r_norm == 0.0 {
        return 0.0;
    }
    let mut worst: f64 = 0.0;
    for j in 0..eval.jw.ncols() {
        let col = eval.jw.column(j);
        let c_norm = col.norm();
        if c_norm == 0.0 {
            continue;
        }
        worst = worst.max((col.dot(&eval.rw) / (c_norm * r_norm)).abs());
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{Bin, Spectrum};
    use crate::models::power_law;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn noiseless(centers: &[f64], params: &PowerLawParams) -> Spectrum {
        Spectrum::new(
            centers
                .iter()
                .map(|&x| Bin::new(x, power_law(x, params), 1.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn recovers_noiseless_power_law() {
        let truth = PowerLawParams {
            amplitude: 2.0,
            exponent: 3.5,
        };
        let s = noiseless(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0], &truth);

        let fit = fit_power_law(&s, 4.0, 10.0, 1.0, 4.0).unwrap();
        assert!((fit.amplitude - 2.0).abs() < 1e-3, "amplitude {}", fit.amplitude);
        assert!((fit.exponent - 3.5).abs() < 1e-3, "exponent {}", fit.exponent);
        assert_eq!(fit.n_points, 7);
        assert_eq!(fit.ndf, 5);
        assert!(!fit.weighted);
        assert!(fit.sse < 1e-12);
        assert_eq!(
            fit.initial,
            PowerLawParams {
                amplitude: 1.0,
                exponent: 4.0
            }
        );
    }

    #[test]
    fn window_excludes_outside_bins() {
        // Garbage outside [4, 10] must not influence the fit.
        let truth = PowerLawParams {
            amplitude: 2.0,
            exponent: 3.5,
        };
        let mut bins: Vec<Bin> = [4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
            .iter()
            .map(|&x| Bin::new(x, power_law(x, &truth), 1.0))
            .collect();
        bins.insert(0, Bin::new(1.0, 50.0, 1.0));
        bins.push(Bin::new(12.0, 3.0, 1.0));
        let s = Spectrum::new(bins).unwrap();

        let fit = fit_power_law(&s, 4.0, 10.0, 1.0, 4.0).unwrap();
        assert_eq!(fit.n_points, 7);
        assert!((fit.exponent - 3.5).abs() < 1e-3);
    }

    #[test]
    fn weighted_fit_on_noisy_data_is_consistent() {
        let truth = PowerLawParams {
            amplitude: 5.0,
            exponent: 5.2,
        };
        let rel = 0.02;
        let mut rng = StdRng::seed_from_u64(11);
        let normal = Normal::new(0.0, 1.0).unwrap();

        let bins: Vec<Bin> = (0..29)
            .map(|i| {
                let x = 3.0 + 0.25 * i as f64;
                let y = power_law(x, &truth);
                let sigma = rel * y;
                Bin::new(x, y + sigma * normal.sample(&mut rng), 0.25).with_error(sigma)
            })
            .collect();
        let s = Spectrum::new(bins).unwrap();

        let fit = fit_power_law(&s, 3.0, 10.0, 1.0, 4.0).unwrap();
        assert!(fit.weighted);
        let pull_a = (fit.amplitude - truth.amplitude) / fit.amplitude_error();
        let pull_b = (fit.exponent - truth.exponent) / fit.exponent_error();
        assert!(pull_a.abs() < 5.0, "amplitude pull {pull_a}");
        assert!(pull_b.abs() < 5.0, "exponent pull {pull_b}");
        let red = fit.reduced_chi2().unwrap();
        assert!(red > 0.2 && red < 3.0, "reduced chi2 {red}");
    }

    #[test]
    fn weighting_none_ignores_errors() {
        let truth = PowerLawParams {
            amplitude: 2.0,
            exponent: 3.5,
        };
        let bins: Vec<Bin> = [4.0, 5.0, 6.0, 7.0]
            .iter()
            .map(|&x| Bin::new(x, power_law(x, &truth), 1.0).with_error(0.1))
            .collect();
        let s = Spectrum::new(bins).unwrap();
        let opts = TailFitOptions {
            weighting: Weighting::None,
            ..TailFitOptions::default()
        };
        let fit = fit_power_law_with(&s, 4.0, 7.0, &opts).unwrap();
        assert!(!fit.weighted);
    }

    #[test]
    fn iteration_budget_is_reported() {
        let s = noiseless(
            &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            &PowerLawParams {
                amplitude: 2.0,
                exponent: 3.5,
            },
        );
        let opts = TailFitOptions {
            max_iterations: 1,
            ..TailFitOptions::default()
        };
        let err = fit_power_law_with(&s, 4.0, 10.0, &opts).unwrap_err();
        assert_eq!(
            err,
            EngineError::FitDidNotConverge {
                reason: FitFailure::IterationBudget,
                iterations: 1
            }
        );
    }

    #[test]
    fn zero_time_budget_is_reported() {
        let s = noiseless(
            &[4.0, 5.0, 6.0],
            &PowerLawParams {
                amplitude: 2.0,
                exponent: 3.5,
            },
        );
        let opts = TailFitOptions {
            time_budget: Some(Duration::ZERO),
            ..TailFitOptions::default()
        };
        let err = fit_power_law_with(&s, 4.0, 6.0, &opts).unwrap_err();
        assert!(matches!(
            err,
            EngineError::FitDidNotConverge {
                reason: FitFailure::TimeBudget,
                ..
            }
        ));
    }

    #[test]
    fn too_few_bins_is_singular() {
        let s = noiseless(&[4.0, 5.0, 6.0], &PowerLawParams::default());
        let err = fit_power_law(&s, 4.5, 5.5, 1.0, 4.0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::FitDidNotConverge {
                reason: FitFailure::SingularJacobian,
                iterations: 0
            }
        ));

        let err = fit_power_law(&s, 20.0, 30.0, 1.0, 4.0).unwrap_err();
        assert!(matches!(err, EngineError::FitDidNotConverge { .. }));
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let s = Spectrum::new(vec![
            Bin::new(-1.0, 1.0, 1.0),
            Bin::new(1.0, 1.0, 1.0),
            Bin::new(2.0, 0.5, 1.0),
        ])
        .unwrap();
        assert!(matches!(fit_power_law(&s, 3.0, 3.0, 1.0, 4.0), Err(EngineError::InvalidRange(_))));
        assert!(matches!(fit_power_law(&s, -2.0, 3.0, 1.0, 4.0), Err(EngineError::InvalidRange(_))));
        assert!(matches!(fit_power_law(&s, 0.5, 3.0, f64::NAN, 4.0), Err(EngineError::InvalidRange(_))));
    }

    #[test]
    fn recovery_does_not_depend_on_amplitude_units() {
        let centers = [4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        for a in [1e-8, 1e-6, 1e-3, 1e3, 1e6, 1e8] {
            let truth = PowerLawParams {
                amplitude: a,
                exponent: 3.5,
            };
            let s = noiseless(&centers, &truth);
            for (a0, b0) in [(1.0, 4.0), (1.1 * a, 3.6)] {
                let fit = fit_power_law(&s, 4.0, 10.0, a0, b0)
                    .unwrap_or_else(|e| panic!("a = {a:e} from ({a0:e}, {b0}): {e}"));
                assert!(
                    (fit.amplitude / a - 1.0).abs() < 1e-6,
                    "a = {a:e}: amplitude {}",
                    fit.amplitude
                );
                assert!((fit.exponent - 3.5).abs() < 1e-6, "a = {a:e}: exponent {}", fit.exponent);
                assert!(fit.amplitude_error().is_finite() && fit.exponent_error().is_finite());
            }
        }
    }

    #[test]
    fn tiny_errors_still_give_a_weighted_fit() {
        let truth = PowerLawParams {
            amplitude: 2.0,
            exponent: 3.5,
        };
        for sigma in [1e-6, 1e-10, 1e-14] {
            let bins: Vec<Bin> = [4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
                .iter()
                .map(|&x| {
                    let y = power_law(x, &truth);
                    Bin::new(x, y, 1.0).with_error(sigma * y)
                })
                .collect();
            let s = Spectrum::new(bins).unwrap();

            let fit = fit_power_law(&s, 4.0, 10.0, 1.0, 4.0).unwrap_or_else(|e| panic!("sigma = {sigma:e}: {e}"));
            assert!(fit.weighted);
            assert!((fit.amplitude - 2.0).abs() < 1e-6, "sigma = {sigma:e}: amplitude {}", fit.amplitude);
            assert!((fit.exponent - 3.5).abs() < 1e-6, "sigma = {sigma:e}: exponent {}", fit.exponent);

            // Parameter errors follow the bin errors.
            let rel = fit.amplitude_error() / fit.amplitude;
            assert!(rel > 0.0 && rel < 1e3 * sigma, "sigma = {sigma:e}: relative error {rel:e}");
        }
    }

    #[test]
    fn exact_start_converges_immediately() {
        let truth = PowerLawParams {
            amplitude: 1.0,
            exponent: 2.0,
        };
        let s = noiseless(&[1.0, 2.0, 4.0], &truth);
        let fit = fit_power_law(&s, 1.0, 4.0, 1.0, 2.0).unwrap();
        assert_eq!(fit.convergence, Convergence::ExactFit);
        assert_eq!(fit.iterations, 0);
    }
}
