//! `pt-spectra` library crate.
//!
//! The binary (`pts`) is a thin wrapper around this library so that:
//!
//! - the numerical core is testable without spawning processes
//! - the core (`histogram`, `preprocess`, `moments`, `fit`) has no dependency
//!   on the CLI, file formats or logging
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod histogram;
pub mod io;
pub mod math;
pub mod models;
pub mod moments;
pub mod plot;
pub mod preprocess;
pub mod report;
