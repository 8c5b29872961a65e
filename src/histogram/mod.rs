//! Histogram views consumed by the numerical core.
//!
//! - the [`HistogramView`] contract (`view`)
//! - the owned, validated [`Spectrum`] (`spectrum`)
//! - an edge-based [`BinnedHistogram`] as produced by the histogram source (`binned`)

pub mod binned;
pub mod spectrum;
pub mod view;

pub use binned::*;
pub use spectrum::*;
pub use view::*;
