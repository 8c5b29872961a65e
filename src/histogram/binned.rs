//! Edge-based 1D histogram.
//!
//! This is the shape a histogram source hands over: `n + 1` edges, `n` contents
//! and optionally `n` errors. Centers and widths are derived from the edges.
//! Bins may leave gaps between them but must not overlap.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::histogram::view::{Bin, HistogramView};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedHistogram {
    /// `(low, high)` edge pair per bin, ascending.
    edges: Vec<(f64, f64)>,
    contents: Vec<f64>,
    errors: Option<Vec<f64>>,
}

impl BinnedHistogram {
    /// Build from contiguous edges (`edges.len() == contents.len() + 1`).
    pub fn from_edges(edges: &[f64], contents: Vec<f64>, errors: Option<Vec<f64>>) -> EngineResult<Self> {
        if edges.len() != contents.len() + 1 {
            return Err(EngineError::InvalidSpectrum(format!(
                "expected {} edges for {} bins, got {}",
                contents.len() + 1,
                contents.len(),
                edges.len()
            )));
        }
        let pairs = edges.windows(2).map(|w| (w[0], w[1])).collect();
        Self::from_bin_edges(pairs, contents, errors)
    }

    /// Build from explicit `(low, high)` pairs, which may be non-contiguous.
    pub fn from_bin_edges(
        edges: Vec<(f64, f64)>,
        contents: Vec<f64>,
        errors: Option<Vec<f64>>,
    ) -> EngineResult<Self> {
        if edges.len() != contents.len() {
            return Err(EngineError::InvalidSpectrum(format!(
                "{} edge pairs for {} contents",
                edges.len(),
                contents.len()
            )));
        }
        if let Some(errs) = &errors {
            if errs.len() != contents.len() {
                return Err(EngineError::InvalidSpectrum(format!(
                    "{} errors for {} contents",
                    errs.len(),
                    contents.len()
                )));
            }
            if errs.iter().any(|e| !(e.is_finite() && *e >= 0.0)) {
                return Err(EngineError::InvalidSpectrum("bin errors must be finite and >= 0".into()));
            }
        }
        for (i, &(lo, hi)) in edges.iter().enumerate() {
            if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                return Err(EngineError::InvalidSpectrum(format!(
                    "bin {i} has invalid edges [{lo}, {hi}]"
                )));
            }
        }
        for (i, w) in edges.windows(2).enumerate() {
            if w[1].0 < w[0].1 {
                return Err(EngineError::InvalidSpectrum(format!(
                    "bins {i} and {} overlap",
                    i + 1
                )));
            }
        }
        if contents.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::InvalidSpectrum("bin contents must be finite".into()));
        }

        Ok(Self {
            edges,
            contents,
            errors,
        })
    }

    pub fn edges(&self) -> &[(f64, f64)] {
        &self.edges
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    /// Sum of contents (the histogram integral without width factors).
    pub fn total(&self) -> f64 {
        self.contents.iter().sum()
    }
}

impl HistogramView for BinnedHistogram {
    fn len(&self) -> usize {
        self.contents.len()
    }

    fn bin(&self, index: usize) -> Bin {
        let (lo, hi) = self.edges[index];
        Bin {
            center: 0.5 * (lo + hi),
            content: self.contents[index],
            width: hi - lo,
            error: self.errors.as_ref().map(|e| e[index]),
        }
    }
}
