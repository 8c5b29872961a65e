//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns flags into validated config structs
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional artifacts

use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};

use crate::cli::{AnalyzeArgs, Command, PlotArgs, SynthArgs};
use crate::domain::{AnalysisConfig, CollisionInfo, PowerLawParams, PtRange, SynthConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `pts` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    // Logs go to stderr so stdout stays clean for reports.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args)?;
    debug!(?config, "analysis config");
    let run = pipeline::run_analysis(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, &run.classes, &config)
    );

    if config.plot {
        let plot =
            crate::plot::render_spectrum_plot(&run.classes, config.fit_range, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    if let Some(dir) = &config.output_dir {
        for (stem, classes) in crate::io::export_groups(config.mode, &run.classes) {
            let artifact_plot = config.plot.then(|| {
                crate::plot::render_spectrum_plot(&classes, config.fit_range, config.plot_width, config.plot_height)
            });
            let result = crate::io::result_file(&config, classes);
            crate::io::write_artifact(dir, &stem, &result, artifact_plot.as_deref())?;
        }
    }

    if run.failure_count() > 0 {
        info!(failures = run.failure_count(), "some per-class steps failed; see report");
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = synth_config_from_args(&args);
    let rows = crate::data::write_synthetic_csv(&config)?;
    println!(
        "Wrote {rows} rows ({} classes) to {}",
        config.class_count(),
        config.output.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let result = crate::io::read_result_json(&args.result)?;
    let plot = crate::plot::render_result_file(&result, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Convert `analyze` flags into a validated [`AnalysisConfig`].
pub fn analysis_config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig, AppError> {
    let moment_range = checked_range("moment", args.moment_low, args.moment_high)?;
    let fit_range = checked_range("fit", args.fit_low, args.fit_high)?;
    if fit_range.low <= 0.0 {
        return Err(AppError::new(2, "Fit range must lie at positive pT (power law is undefined at pT <= 0)."));
    }
    if !(args.init_a.is_finite() && args.init_b.is_finite()) {
        return Err(AppError::new(2, "Initial tail-fit parameters must be finite."));
    }
    if args.max_iterations == 0 {
        return Err(AppError::new(2, "`--max-iterations` must be > 0."));
    }
    if args.multiplicities.is_empty() {
        return Err(AppError::new(2, "At least one multiplicity class is required."));
    }
    if !(args.eta.is_finite() && args.eta > 0.0) {
        return Err(AppError::new(2, "`--eta` must be finite and > 0."));
    }

    Ok(AnalysisConfig {
        csv_path: args.csv.clone(),
        multiplicities: args.multiplicities.clone(),
        mode: args.mode,
        moment_range,
        fit_range,
        initial: PowerLawParams {
            amplitude: args.init_a,
            exponent: args.init_b,
        },
        weighting: args.weighting,
        max_iterations: args.max_iterations,
        time_budget: args.time_budget_ms.map(Duration::from_millis),
        collision: CollisionInfo {
            energy_tev: args.energy,
            system: args.system.clone(),
            eta_max: args.eta,
        },
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        output_dir: args.output_dir.clone(),
    })
}

/// Convert `synth` flags into a [`SynthConfig`]; the generator validates it.
pub fn synth_config_from_args(args: &SynthArgs) -> SynthConfig {
    SynthConfig {
        output: args.output.clone(),
        seed: args.seed,
        mult_min: args.mult_min,
        mult_max: args.mult_max,
        pt_edges: args
            .pt_edges
            .clone()
            .unwrap_or_else(crate::data::default_pt_edges),
        noise: args.noise,
        events: args.events,
    }
}

fn checked_range(name: &str, low: f64, high: f64) -> Result<PtRange, AppError> {
    if !(low.is_finite() && high.is_finite() && low < high) {
        return Err(AppError::new(
            2,
            format!("Invalid {name} range [{low}, {high}]: need finite bounds with low < high."),
        ));
    }
    Ok(PtRange::new(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["pts", "analyze", "t.csv"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Analyze(a) => a,
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn defaults_become_config() {
        let config = analysis_config_from_args(&analyze_args(&[])).unwrap();
        assert_eq!(config.multiplicities, vec![10, 25, 40]);
        assert_eq!(config.initial, PowerLawParams::default());
        assert_eq!(config.moment_range, PtRange::new(0.15, 9.99));
        assert_eq!(config.fit_range, PtRange::new(3.0, 10.0));
        assert_eq!(config.time_budget, None);
        assert!(config.plot);
        assert_eq!(config.collision.system, "pp");
    }

    #[test]
    fn no_plot_and_time_budget() {
        let config = analysis_config_from_args(&analyze_args(&["--no-plot", "--time-budget-ms", "250"])).unwrap();
        assert!(!config.plot);
        assert_eq!(config.time_budget, Some(Duration::from_millis(250)));
    }

    #[test]
    fn invalid_ranges_are_usage_errors() {
        let err = analysis_config_from_args(&analyze_args(&["--moment-low", "5", "--moment-high", "5"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = analysis_config_from_args(&analyze_args(&["--fit-low", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = analysis_config_from_args(&analyze_args(&["--max-iterations", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn synth_uses_default_edges() {
        let args = match Cli::parse_from(["pts", "synth", "-o", "x.csv"]).command {
            Command::Synth(a) => a,
            _ => panic!("expected synth"),
        };
        let config = synth_config_from_args(&args);
        assert_eq!(config.pt_edges, crate::data::default_pt_edges());
        assert_eq!(config.seed, 42);
    }
}
