//! Result artifacts.
//!
//! Artifacts are named by plot mode:
//!
//! - `raw`   -> `Bins`
//! - `fit`   -> `BinsFit`
//! - `gauss` -> `BinsGauss{N_ch}`, one per class
//!
//! Each artifact is a pretty-printed [`ResultFile`] JSON (`<stem>.json`), plus
//! the rendered terminal plot (`<stem>.txt`) when one is supplied.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::domain::{AnalysisConfig, ClassAnalysis, PlotMode, ResultFile};
use crate::error::AppError;

/// File stem for an artifact. `multiplicity` is only used in `gauss` mode.
pub fn artifact_stem(mode: PlotMode, multiplicity: Option<u32>) -> String {
    match (mode, multiplicity) {
        (PlotMode::Raw, _) => "Bins".to_string(),
        (PlotMode::Fit, _) => "BinsFit".to_string(),
        (PlotMode::Gauss, Some(m)) => format!("BinsGauss{m}"),
        (PlotMode::Gauss, None) => "BinsGauss".to_string(),
    }
}

/// Split classes into artifacts: one shared file in `raw`/`fit` mode, one per
/// class in `gauss` mode.
pub fn export_groups(mode: PlotMode, classes: &[ClassAnalysis]) -> Vec<(String, Vec<ClassAnalysis>)> {
    match mode {
        PlotMode::Raw | PlotMode::Fit => vec![(artifact_stem(mode, None), classes.to_vec())],
        PlotMode::Gauss => classes
            .iter()
            .map(|c| (artifact_stem(mode, Some(c.multiplicity)), vec![c.clone()]))
            .collect(),
    }
}

/// Wrap classes with the run metadata for export.
pub fn result_file(config: &AnalysisConfig, classes: Vec<ClassAnalysis>) -> ResultFile {
    ResultFile {
        tool: "pts".to_string(),
        generated: Utc::now(),
        mode: config.mode,
        collision: config.collision.clone(),
        moment_range: config.moment_range,
        fit_range: config.fit_range,
        classes,
    }
}

/// Write `<dir>/<stem>.json` and, if `plot` is given, `<dir>/<stem>.txt`.
///
/// Returns the paths written.
pub fn write_artifact(dir: &Path, stem: &str, result: &ResultFile, plot: Option<&str>) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output directory '{}': {e}", dir.display())))?;

    let json_path = dir.join(format!("{stem}.json"));
    write_result_json(&json_path, result)?;
    let mut written = vec![json_path];

    if let Some(text) = plot {
        let txt_path = dir.join(format!("{stem}.txt"));
        fs::write(&txt_path, text)
            .map_err(|e| AppError::new(2, format!("Failed to write plot '{}': {e}", txt_path.display())))?;
        written.push(txt_path);
    }

    info!(stem, files = written.len(), "artifact written");
    Ok(written)
}

/// Write a result JSON file.
pub fn write_result_json(path: &Path, result: &ResultFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create result JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, result)
        .map_err(|e| AppError::new(2, format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open result JSON '{}': {e}", path.display())))?;
    let result: ResultFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid result JSON: {e}")))?;
    Ok(result)
}
