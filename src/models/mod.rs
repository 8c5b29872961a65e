//! Overlay model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and plotting
//! code can stay generic.

pub mod gaussian;
pub mod power_law;

pub use gaussian::*;
pub use power_law::*;
