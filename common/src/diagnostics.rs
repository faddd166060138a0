//! Diagnostic utilities for the shading subsystem.

pub use logging::*;

mod logging;
