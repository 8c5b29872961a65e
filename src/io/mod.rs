//! Input/output helpers.
//!
//! - CSV ingest of multiplicity × pT tables (`ingest`)
//! - result artifacts: JSON + rendered plots (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
