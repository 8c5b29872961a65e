//! Terminal run summary.

use crate::domain::{AnalysisConfig, ClassAnalysis, PlotMode};
use crate::io::IngestedTable;
use crate::report::legend::{
    PARAMETRISATION_LABEL, fit_legend, fit_range_line, gaussian_legend, info_lines, mean_legend,
};

/// Format the full run summary: header, info box, per-class legends, fit
/// diagnostics and recorded failures.
pub fn format_run_summary(ingest: &IngestedTable, classes: &[ClassAnalysis], config: &AnalysisConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== pts - pT spectrum moments (mode: {}) ===\n", mode_name(config.mode)));
    for line in info_lines(&config.collision, config.moment_range) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!(
        "Table: rows={}/{} used | classes={} | skipped={}\n",
        ingest.rows_used,
        ingest.rows_read,
        ingest.table.len(),
        ingest.row_errors.len()
    ));

    out.push('\n');
    for c in classes {
        if let Some(m) = &c.mean {
            out.push_str(&mean_legend(c.multiplicity, m));
            out.push('\n');
        }
    }

    if config.mode.wants_tail_fit() {
        out.push('\n');
        out.push_str(PARAMETRISATION_LABEL);
        out.push('\n');
        out.push_str(&fit_range_line(config.fit_range));
        out.push('\n');
        for c in classes {
            if let Some(fit) = &c.tail_fit {
                out.push_str(&fit_legend(c.multiplicity, fit));
                out.push('\n');
            }
        }
        out.push('\n');
        out.push_str(&format_fit_table(classes));
    }

    if config.mode.wants_gaussian() {
        out.push('\n');
        for c in classes {
            if let Some(g) = &c.gaussian {
                out.push_str(&gaussian_legend(c.multiplicity, g));
                out.push('\n');
            }
        }
    }

    let failures: Vec<String> = classes
        .iter()
        .flat_map(|c| {
            c.failures
                .iter()
                .map(move |f| format!("  N_ch = {} [{}] {}", c.multiplicity, f.stage, f.message))
        })
        .collect();
    if !failures.is_empty() {
        out.push_str("\nFailures:\n");
        for f in failures {
            out.push_str(&f);
            out.push('\n');
        }
    }

    out
}

/// Per-class tail-fit diagnostics.
pub fn format_fit_table(classes: &[ClassAnalysis]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>6} {:>10} {:>10} {:>8} {:>8} {:>10} {:>5} {:<10}\n",
            "N_ch", "a", "b", "err(a)", "err(b)", "chi2/ndf", "iter", "stop"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<10} {:-<10} {:-<8} {:-<8} {:-<10} {:-<5} {:-<10}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for c in classes {
        let Some(fit) = &c.tail_fit else { continue };
        let reduced = fit
            .reduced_chi2()
            .map(|v| format!("{v:.3}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:>6} {:>10.4} {:>10.4} {:>8.4} {:>8.4} {:>10} {:>5} {:<10}\n",
                c.multiplicity,
                fit.amplitude,
                fit.exponent,
                fit.amplitude_error(),
                fit.exponent_error(),
                reduced,
                fit.iterations,
                format!("{:?}", fit.convergence),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn mode_name(mode: PlotMode) -> &'static str {
    match mode {
        PlotMode::Raw => "raw",
        PlotMode::Fit => "fit",
        PlotMode::Gauss => "gauss",
    }
}
