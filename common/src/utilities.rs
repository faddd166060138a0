//! General utilities.

pub use bytemuck;
pub use errors::*;
pub use variant::*;

mod errors;
mod variant;
