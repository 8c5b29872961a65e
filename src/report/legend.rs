//! Legend and info-box strings.
//!
//! Numeric precision is fixed: mean pT with 2 decimals, amplitude with 3 and
//! exponent with 2.

use crate::domain::{CollisionInfo, MomentResult, PtRange, TailFitResult};
use crate::models::GaussianOverlay;

pub const PARAMETRISATION_LABEL: &str = "Parametrisation: a*x^(-b)";

pub fn mean_legend(multiplicity: u32, mean: &MomentResult) -> String {
    format!("N_ch = {multiplicity}, <pT> = {:.2} GeV/c", mean.value)
}

pub fn fit_legend(multiplicity: u32, fit: &TailFitResult) -> String {
    format!("N_ch = {multiplicity}, a = {:.3}, b = {:.2}", fit.amplitude, fit.exponent)
}

/// The pT window the tail curve was fitted and drawn over.
pub fn fit_range_line(range: PtRange) -> String {
    format!("fit range: [{}, {}] GeV/c", range.low, range.high)
}

pub fn gaussian_legend(multiplicity: u32, g: &GaussianOverlay) -> String {
    format!("N_ch = {multiplicity}, Gauss(mu = {:.2}, sigma = {:.2})", g.mean, g.sigma)
}

/// Info box lines: collision system, particle selection, acceptance, pT window.
pub fn info_lines(collision: &CollisionInfo, pt: PtRange) -> Vec<String> {
    vec![
        format!("{} collisions at sqrt(s) = {:.2} TeV", collision.system, collision.energy_tev),
        "charged particles".to_string(),
        format!("{} < eta < {}", -collision.eta_max, collision.eta_max),
        format!("{} GeV/c < pT < {} GeV/c", pt.low, pt.high),
    ]
}
