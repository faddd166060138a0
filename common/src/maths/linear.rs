//! Mathematical utilities for linear algebra.

pub use glam::*;
pub use scalars::*;
pub use vectors::*;

mod scalars;
mod vectors;

/// Represents a numerical space with identity constants.
pub trait Identity {
  const ZERO: Self;
  const ONE: Self;
  const MIN: Self;
  const MAX: Self;
}
