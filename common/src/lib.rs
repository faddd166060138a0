//! Shared foundations for the shading subsystem: maths, collections,
//! diagnostics and other general purpose code used by the compiler and
//! virtual machine.

#[macro_use]
extern crate serde;

pub use anyhow::{anyhow, bail, Error, Result};
pub use collections::*;
pub use diagnostics::*;
pub use maths::*;
pub use utilities::*;

mod collections;
mod diagnostics;
mod maths;
mod utilities;
