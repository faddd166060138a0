//! Light category and the per-light Grid a light shader writes its outputs into.

use std::sync::Arc;

use crate::grid::Grid;
use crate::shader::Shader;

/// The category a compiled light shader falls into, determined by which
/// illumination statement its body uses. Surface-side shading kernels filter
/// lights by this category (§4.6's "Shading helpers").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightCategory {
  /// No illumination statement: contributes uniformly regardless of direction.
  Ambient,
  /// `solar()`: a directional light at infinity.
  SolarUnbounded,
  /// `solar(axis, angle)`: a directional light restricted to a cone.
  SolarCone,
  /// `illuminate(position)`: a point light, unrestricted direction.
  IlluminatePoint,
  /// `illuminate(position, axis, angle)`: a point light restricted to a cone.
  IlluminateCone,
}

/// A light: its compiled shader plus the per-light Grid its outputs (`Cl`,
/// `Ol`, `Ps`) are written into. Owned by the renderer; Grids borrow it
/// read-only for the duration of a `shade` call, per §5's resource model.
pub struct Light {
  pub category: LightCategory,
  pub shader: Arc<Shader>,
  pub grid: Grid,
}

impl Light {
  pub fn new(category: LightCategory, shader: Arc<Shader>, grid: Grid) -> Self {
    Self { category, shader, grid }
  }
}
