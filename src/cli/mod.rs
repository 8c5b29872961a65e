//! Command-line parsing for the pT-spectrum analysis tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! numerical code. Flags are turned into plain config structs in `app`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{PlotMode, Weighting};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pts", version, about = "Mean-pT moments and power-law tail fits of binned pT spectra")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze multiplicity classes of a pT table: moments, tail fits, overlays.
    Analyze(AnalyzeArgs),
    /// Generate a seeded synthetic multiplicity × pT table as CSV.
    Synth(SynthArgs),
    /// Plot a previously exported result JSON.
    Plot(PlotArgs),
}

/// Options for `pts analyze`.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Input CSV (`multiplicity,pt_low,pt_high,content[,error]`).
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Multiplicity classes to analyze (comma separated).
    #[arg(short = 'm', long = "mult", value_delimiter = ',', default_values_t = vec![10, 25, 40])]
    pub multiplicities: Vec<u32>,

    /// Which overlays to produce.
    #[arg(long, value_enum, default_value_t = PlotMode::Raw)]
    pub mode: PlotMode,

    /// Lower pT bound (GeV/c) for moments.
    #[arg(long, default_value_t = 0.15)]
    pub moment_low: f64,

    /// Upper pT bound (GeV/c) for moments.
    #[arg(long, default_value_t = 9.99)]
    pub moment_high: f64,

    /// Lower pT bound (GeV/c) for the power-law tail fit.
    #[arg(long, default_value_t = 3.0)]
    pub fit_low: f64,

    /// Upper pT bound (GeV/c) for the power-law tail fit.
    #[arg(long, default_value_t = 10.0)]
    pub fit_high: f64,

    /// Starting amplitude `a` for the tail fit.
    #[arg(long, default_value_t = 1.0)]
    pub init_a: f64,

    /// Starting exponent `b` for the tail fit.
    #[arg(long, default_value_t = 4.0)]
    pub init_b: f64,

    /// Bin weighting in the tail-fit objective.
    #[arg(long, value_enum, default_value_t = Weighting::Auto)]
    pub weighting: Weighting,

    /// Iteration budget for the tail fit.
    #[arg(long, default_value_t = 500)]
    pub max_iterations: usize,

    /// Wall-clock budget per tail fit, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub time_budget_ms: Option<u64>,

    /// Centre-of-mass energy (TeV) shown in the report header.
    #[arg(long, default_value_t = 5.02)]
    pub energy: f64,

    /// Collision system label.
    #[arg(long, default_value = "pp")]
    pub system: String,

    /// Pseudorapidity acceptance |eta| < ETA.
    #[arg(long, default_value_t = 0.8)]
    pub eta: f64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write `Bins*.json` (and `.txt` plots) into this directory.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Options for `pts synth`.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Lowest multiplicity class.
    #[arg(long, default_value_t = 1)]
    pub mult_min: u32,

    /// Highest multiplicity class.
    #[arg(long, default_value_t = 60)]
    pub mult_max: u32,

    /// pT bin edges in GeV/c (comma separated). Defaults to a 0.15..10 binning.
    #[arg(long, value_delimiter = ',')]
    pub pt_edges: Option<Vec<f64>>,

    /// Relative Gaussian noise on each bin content.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Events per multiplicity class.
    #[arg(long, default_value_t = 1.0e6)]
    pub events: f64,
}

/// Options for plotting a saved result.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Result JSON file produced by `pts analyze --output-dir`.
    #[arg(value_name = "JSON")]
    pub result: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_defaults() {
        let cli = Cli::parse_from(["pts", "analyze", "table.csv"]);
        assert_eq!(cli.log_level, tracing::Level::WARN);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.multiplicities, vec![10, 25, 40]);
        assert_eq!(args.mode, PlotMode::Raw);
        assert!((args.moment_low - 0.15).abs() < 1e-12);
        assert!((args.moment_high - 9.99).abs() < 1e-12);
        assert!((args.fit_low - 3.0).abs() < 1e-12 && (args.fit_high - 10.0).abs() < 1e-12);
        assert!((args.init_a - 1.0).abs() < 1e-12 && (args.init_b - 4.0).abs() < 1e-12);
        assert!((args.energy - 5.02).abs() < 1e-12);
    }

    #[test]
    fn analyze_flags() {
        let cli = Cli::parse_from([
            "pts",
            "analyze",
            "t.csv",
            "--mult",
            "5,7",
            "--mode",
            "gauss",
            "--weighting",
            "none",
            "--log-level",
            "debug",
            "--no-plot",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.multiplicities, vec![5, 7]);
        assert_eq!(args.mode, PlotMode::Gauss);
        assert_eq!(args.weighting, Weighting::None);
        assert!(args.no_plot);
    }

    #[test]
    fn synth_edges_parse() {
        let cli = Cli::parse_from(["pts", "synth", "-o", "out.csv", "--pt-edges", "0.5,1,2"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.pt_edges, Some(vec![0.5, 1.0, 2.0]));
        assert_eq!(args.mult_max, 60);
    }
}
