//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - returned by the engines as plain values
//! - exported to JSON
//! - reloaded later for plotting

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::histogram::Spectrum;
use crate::models::GaussianOverlay;

/// A moment value with its propagated statistical uncertainty.
///
/// `uncertainty` is `0.0` when the input carried no per-bin errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentResult {
    pub value: f64,
    pub uncertainty: f64,
}

/// Parameters of `y(x) = amplitude * x^(-exponent)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawParams {
    pub amplitude: f64,
    pub exponent: f64,
}

impl Default for PowerLawParams {
    /// The customary starting point for high-pT tails.
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            exponent: 4.0,
        }
    }
}

/// Which convergence test stopped the minimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// Every parameter's relative step fell below `xtol`.
    StepTolerance,
    /// Actual and predicted relative cost reduction fell below `ftol`.
    CostTolerance,
    /// Residuals are orthogonal to every Jacobian column to within `gtol`
    /// (largest `|J_jᵀ r| / (‖J_j‖ ‖r‖)`).
    GradientTolerance,
    /// The model reproduces the data exactly.
    ExactFit,
}

/// How bins are weighted in the tail-fit objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Inverse-variance weights when every included bin has a positive error,
    /// otherwise unweighted.
    Auto,
    /// Plain unweighted least squares.
    None,
}

/// Output of one power-law tail fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailFitResult {
    pub amplitude: f64,
    pub exponent: f64,
    /// Parameter covariance, order `[amplitude, exponent]`.
    pub covariance: [[f64; 2]; 2],
    /// Unweighted residual sum of squares.
    pub sse: f64,
    /// Value of the minimized objective (equals `sse` for unweighted fits).
    pub chi2: f64,
    /// `n_points - 2`.
    pub ndf: usize,
    pub n_points: usize,
    pub iterations: usize,
    pub weighted: bool,
    pub convergence: Convergence,
    /// Starting point handed to the minimizer.
    pub initial: PowerLawParams,
}

impl TailFitResult {
    pub fn params(&self) -> PowerLawParams {
        PowerLawParams {
            amplitude: self.amplitude,
            exponent: self.exponent,
        }
    }

    pub fn amplitude_error(&self) -> f64 {
        self.covariance[0][0].max(0.0).sqrt()
    }

    pub fn exponent_error(&self) -> f64 {
        self.covariance[1][1].max(0.0).sqrt()
    }

    /// `chi2 / ndf`, or `None` when there are no degrees of freedom.
    pub fn reduced_chi2(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi2 / self.ndf as f64)
    }
}

/// Which overlays a run requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    /// Spectra with mean-pT markers.
    Raw,
    /// Spectra with mean-pT markers and power-law tail fits.
    Fit,
    /// One view per class with mean-pT marker and a Gaussian overlay.
    Gauss,
}

impl PlotMode {
    pub fn wants_tail_fit(self) -> bool {
        self == PlotMode::Fit
    }

    pub fn wants_gaussian(self) -> bool {
        self == PlotMode::Gauss
    }
}

/// Which step of a per-class analysis produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Weighting,
    Mean,
    TailFit,
    Variance,
    Gaussian,
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisStage::Weighting => "weighting",
            AnalysisStage::Mean => "mean",
            AnalysisStage::TailFit => "tail fit",
            AnalysisStage::Variance => "variance",
            AnalysisStage::Gaussian => "gaussian overlay",
        };
        f.write_str(s)
    }
}

/// A recorded, non-fatal failure of one analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFailure {
    pub stage: AnalysisStage,
    pub message: String,
}

/// Everything computed for one multiplicity class.
///
/// Optional fields are `None` either because the mode did not ask for them or
/// because the step failed; failures are listed in `failures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAnalysis {
    pub multiplicity: u32,
    /// The pT-weighted spectrum all quantities below were computed on.
    pub spectrum: Spectrum,
    pub mean: Option<MomentResult>,
    pub variance: Option<MomentResult>,
    pub tail_fit: Option<TailFitResult>,
    pub gaussian: Option<GaussianOverlay>,
    #[serde(default)]
    pub failures: Vec<ClassFailure>,
}

impl ClassAnalysis {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A closed `[low, high]` window on the pT axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtRange {
    pub low: f64,
    pub high: f64,
}

impl PtRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Collision-system labels used in report headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionInfo {
    /// Centre-of-mass energy in TeV.
    pub energy_tev: f64,
    pub system: String,
    pub eta_max: f64,
}

/// Exported result file: run metadata plus the analyzed classes.
///
/// One file per artifact stem; `plot` re-renders from this alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub mode: PlotMode,
    pub collision: CollisionInfo,
    pub moment_range: PtRange,
    pub fit_range: PtRange,
    pub classes: Vec<ClassAnalysis>,
}

/// A full `analyze` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub csv_path: PathBuf,
    pub multiplicities: Vec<u32>,
    pub mode: PlotMode,

    pub moment_range: PtRange,
    pub fit_range: PtRange,
    pub initial: PowerLawParams,
    pub weighting: Weighting,
    pub max_iterations: usize,
    pub time_budget: Option<Duration>,

    pub collision: CollisionInfo,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub output_dir: Option<PathBuf>,
}

/// Configuration for the synthetic table generator.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub output: PathBuf,
    pub seed: u64,
    pub mult_min: u32,
    pub mult_max: u32,
    pub pt_edges: Vec<f64>,
    /// Relative Gaussian noise applied to each bin content.
    pub noise: f64,
    /// Events per multiplicity class (sets the per-bin statistical error).
    pub events: f64,
}

impl SynthConfig {
    /// Number of classes in `mult_min..=mult_max`; zero for an empty range.
    pub fn class_count(&self) -> u64 {
        if self.mult_min > self.mult_max {
            return 0;
        }
        u64::from(self.mult_max) - u64::from(self.mult_min) + 1
    }
}
