//! Data sources that do not come from a user-supplied file.

pub mod synth;

pub use synth::*;
