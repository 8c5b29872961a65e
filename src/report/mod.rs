//! Reporting: legend text for overlays and the terminal run summary.
//!
//! Formatting lives here so the engine and pipeline stay free of presentation
//! concerns and output changes are localized (golden tests pin the strings).

pub mod format;
pub mod legend;

pub use format::*;
pub use legend::*;
