//! The narrow read-only interface the engines depend on.
//!
//! Anything that can enumerate `(center, content, width)` triples in strictly
//! increasing center order qualifies. Engines never see a concrete storage type.

use serde::{Deserialize, Serialize};

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub center: f64,
    pub content: f64,
    pub width: f64,
    /// Statistical error on `content`, if the source carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

impl Bin {
    pub fn new(center: f64, content: f64, width: f64) -> Self {
        Self {
            center,
            content,
            width,
            error: None,
        }
    }

    pub fn with_error(mut self, error: f64) -> Self {
        self.error = Some(error);
        self
    }

    /// Closed-interval membership by center.
    pub fn in_range(&self, low: f64, high: f64) -> bool {
        low <= self.center && self.center <= high
    }
}

/// Read-only view over an ordered sequence of bins.
///
/// Implementors guarantee strictly increasing centers and positive widths.
pub trait HistogramView {
    /// Number of bins (no under/overflow).
    fn len(&self) -> usize;

    /// Bin at `index` (`0..len()`).
    ///
    /// # Panics
    /// May panic if `index >= len()`.
    fn bin(&self, index: usize) -> Bin;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate bins in ascending center order.
    fn bins(&self) -> impl Iterator<Item = Bin> + '_ {
        (0..self.len()).map(move |i| self.bin(i))
    }

    /// Bins whose center lies in the closed interval `[low, high]`.
    fn bins_in(&self, low: f64, high: f64) -> impl Iterator<Item = Bin> + '_ {
        self.bins().filter(move |b| b.in_range(low, high))
    }
}

impl<H: HistogramView> HistogramView for &H {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn bin(&self, index: usize) -> Bin {
        (**self).bin(index)
    }
}
