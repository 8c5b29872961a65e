//! Power-law tail fitting.
//!
//! Responsibilities:
//!
//! - select the bins of the caller's tail window
//! - run a Levenberg–Marquardt minimization of the (optionally weighted) SSE
//! - report parameters, covariance and fit quality, or a structured failure

pub mod fitter;

pub use fitter::*;
