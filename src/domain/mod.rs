//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - engine outputs (`MomentResult`, `TailFitResult`)
//! - fit configuration enums (`Weighting`, `Convergence`)
//! - per-class pipeline results (`ClassAnalysis`) and the exported `ResultFile`
//! - run configuration (`PlotMode`, `AnalysisConfig`, `SynthConfig`)

pub mod types;

pub use types::*;
