//! Shared analysis pipeline.
//!
//! Per multiplicity class:
//! projection -> pT weighting -> mean -> (tail fit) -> (variance + Gaussian)
//!
//! Classes are independent and run in parallel; results come back in the
//! requested order. Engine failures inside a class are logged and recorded on
//! that class, and only the affected overlay is skipped.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{AnalysisConfig, AnalysisStage, ClassAnalysis, ClassFailure};
use crate::error::AppError;
use crate::fit::{TailFitOptions, fit_power_law_with};
use crate::histogram::{BinnedHistogram, Spectrum};
use crate::io::{IngestedTable, MultiplicityTable, load_multiplicity_table};
use crate::models::GaussianOverlay;
use crate::moments::{mean, variance};
use crate::preprocess::weight_by_center;

/// All computed outputs of a single `analyze` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedTable,
    pub classes: Vec<ClassAnalysis>,
}

impl RunOutput {
    pub fn failure_count(&self) -> usize {
        self.classes.iter().map(|c| c.failures.len()).sum()
    }
}

/// Load the configured CSV and analyze every requested class.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let ingest = load_multiplicity_table(&config.csv_path)?;
    info!(
        rows_used = ingest.rows_used,
        rows_skipped = ingest.row_errors.len(),
        classes = ingest.table.len(),
        "table ingested"
    );
    let classes = analyze_table(&ingest.table, config)?;
    Ok(RunOutput { ingest, classes })
}

/// Analyze the requested classes of an already loaded table.
pub fn analyze_table(table: &MultiplicityTable, config: &AnalysisConfig) -> Result<Vec<ClassAnalysis>, AppError> {
    if config.multiplicities.is_empty() {
        return Err(AppError::new(2, "No multiplicity classes requested."));
    }

    let projections: Vec<(u32, &BinnedHistogram)> = config
        .multiplicities
        .iter()
        .map(|&m| {
            table
                .projection(m)
                .map(|h| (m, h))
                .ok_or_else(|| AppError::new(3, format!("Multiplicity class {m} is not present in the table.")))
        })
        .collect::<Result<_, _>>()?;

    let options = fit_options(config);
    let classes = projections
        .par_iter()
        .map(|&(m, h)| analyze_class(m, h, config, &options))
        .collect();
    Ok(classes)
}

/// Engine knobs derived from the run configuration.
pub fn fit_options(config: &AnalysisConfig) -> TailFitOptions {
    TailFitOptions {
        initial: config.initial,
        weighting: config.weighting,
        max_iterations: config.max_iterations,
        time_budget: config.time_budget,
        ..TailFitOptions::default()
    }
}

fn analyze_class(
    multiplicity: u32,
    histogram: &BinnedHistogram,
    config: &AnalysisConfig,
    options: &TailFitOptions,
) -> ClassAnalysis {
    let mut out = ClassAnalysis {
        multiplicity,
        spectrum: Spectrum::default(),
        mean: None,
        variance: None,
        tail_fit: None,
        gaussian: None,
        failures: Vec::new(),
    };

    match weight_by_center(histogram) {
        Ok(s) => out.spectrum = s,
        Err(e) => {
            record(&mut out, AnalysisStage::Weighting, e.to_string());
            return out;
        }
    }

    let moments = config.moment_range;
    match mean(&out.spectrum, moments.low, moments.high) {
        Ok(m) => out.mean = Some(m),
        Err(e) => record(&mut out, AnalysisStage::Mean, e.to_string()),
    }

    if config.mode.wants_tail_fit() {
        let fit = config.fit_range;
        match fit_power_law_with(&out.spectrum, fit.low, fit.high, options) {
            Ok(r) => {
                debug!(
                    multiplicity,
                    iterations = r.iterations,
                    convergence = ?r.convergence,
                    "tail fit converged"
                );
                out.tail_fit = Some(r);
            }
            Err(e) => record(&mut out, AnalysisStage::TailFit, e.to_string()),
        }
    }

    if config.mode.wants_gaussian() {
        match variance(&out.spectrum, moments.low, moments.high) {
            Ok(v) => out.variance = Some(v),
            Err(e) => record(&mut out, AnalysisStage::Variance, e.to_string()),
        }
        if let (Some(m), Some(v)) = (out.mean, out.variance) {
            match GaussianOverlay::from_moments(&m, &v) {
                Some(g) => out.gaussian = Some(g),
                None => record(
                    &mut out,
                    AnalysisStage::Gaussian,
                    format!("variance {} does not define a Gaussian", v.value),
                ),
            }
        }
    }

    out
}

fn record(out: &mut ClassAnalysis, stage: AnalysisStage, message: String) {
    warn!(multiplicity = out.multiplicity, %stage, "{message}");
    out.failures.push(ClassFailure { stage, message });
}
