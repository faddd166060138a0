//! The data-parallel Grid: a rectangular lattice of shading points and their
//! named attributes.

use shading_common::FastHashMap;

use crate::light::Light;
use crate::types::{Storage, Type};
use crate::value::Value;

/// A shading-rate hint, carried through from the renderer but not interpreted
/// by the core (dicing/sampling own its meaning).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadingRate(pub f32);

impl Default for ShadingRate {
  fn default() -> Self {
    Self(1.0)
  }
}

/// A rectangular lattice of width x height shading points sharing a schema of
/// named attributes. Owns its Values; lights are referenced weakly (borrowed,
/// never owned) for the duration of a `shade` call.
pub struct Grid {
  width: usize,
  height: usize,
  attributes: FastHashMap<String, Value>,
  /// Insertion order, so iteration (and thus bytecode referencing attributes
  /// by a stable slot) is deterministic.
  attribute_order: Vec<String>,
  lights: Vec<Light>,
  surface_shader: Option<String>,
  displacement_shader: Option<String>,
  light_shader: Option<String>,
  shading_rate: ShadingRate,
  /// The two generated normals for the two-sided case: `(front, back)`.
  generated_normals: Option<(Value, Value)>,
}

impl Grid {
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      attributes: FastHashMap::default(),
      attribute_order: Vec::new(),
      lights: Vec::new(),
      surface_shader: None,
      displacement_shader: None,
      light_shader: None,
      shading_rate: ShadingRate::default(),
      generated_normals: None,
    }
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn point_count(&self) -> usize {
    self.width * self.height
  }

  /// Resizes the grid. Existing varying attributes are reallocated (and thus
  /// re-zeroed); uniform attributes are untouched.
  pub fn resize(&mut self, width: usize, height: usize) {
    self.width = width;
    self.height = height;
    for name in &self.attribute_order {
      let value = self.attributes.get_mut(name).unwrap();
      if value.storage() == Storage::Varying {
        *value = Value::new(value.ty(), Storage::Varying, width, height);
      }
    }
  }

  /// Adds a named attribute with the given type and storage class, defaulting
  /// to varying. Per §3's invariant, a repeated `add` of an existing name
  /// returns the existing Value rather than overwriting it.
  pub fn add_value(&mut self, name: &str, ty: Type, storage: Storage) -> &mut Value {
    if !self.attributes.contains_key(name) {
      let value = Value::new(ty, storage, self.width, self.height);
      self.attributes.insert(name.to_string(), value);
      self.attribute_order.push(name.to_string());
    }
    self.attributes.get_mut(name).unwrap()
  }

  pub fn value(&self, name: &str) -> Option<&Value> {
    self.attributes.get(name)
  }

  pub fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
    self.attributes.get_mut(name)
  }

  pub fn has_value(&self, name: &str) -> bool {
    self.attributes.contains_key(name)
  }

  /// Removes and returns the named attribute's `Value`, for the VM to alias
  /// directly into a shader's register file for the duration of a `shade`
  /// call rather than copying it. Callers must [`Grid::put_value`] it back
  /// (under the same name) before any other Grid access; `attribute_order`
  /// still lists the name so [`Grid::attribute_names`] is unaffected.
  pub fn take_value(&mut self, name: &str) -> Option<Value> {
    self.attributes.remove(name)
  }

  /// Reinserts a `Value` previously removed by [`Grid::take_value`].
  pub fn put_value(&mut self, name: &str, value: Value) {
    self.attributes.insert(name.to_string(), value);
  }

  pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
    self.attribute_order.iter().map(String::as_str)
  }

  pub fn lights(&self) -> &[Light] {
    &self.lights
  }

  pub fn lights_mut(&mut self) -> &mut Vec<Light> {
    &mut self.lights
  }

  pub fn set_surface_shader(&mut self, name: impl Into<String>) {
    self.surface_shader = Some(name.into());
  }

  pub fn surface_shader(&self) -> Option<&str> {
    self.surface_shader.as_deref()
  }

  pub fn set_displacement_shader(&mut self, name: impl Into<String>) {
    self.displacement_shader = Some(name.into());
  }

  pub fn displacement_shader(&self) -> Option<&str> {
    self.displacement_shader.as_deref()
  }

  pub fn set_light_shader(&mut self, name: impl Into<String>) {
    self.light_shader = Some(name.into());
  }

  pub fn light_shader(&self) -> Option<&str> {
    self.light_shader.as_deref()
  }

  pub fn shading_rate(&self) -> ShadingRate {
    self.shading_rate
  }

  pub fn set_shading_rate(&mut self, rate: ShadingRate) {
    self.shading_rate = rate;
  }

  /// Installs the two generated normals for the two-sided case (front-facing
  /// and its negation), computed by the renderer from `P`'s derivatives.
  pub fn set_generated_normals(&mut self, front: Value, back: Value) {
    self.generated_normals = Some((front, back));
  }

  pub fn generated_normals(&self) -> Option<(&Value, &Value)> {
    self.generated_normals.as_ref().map(|(f, b)| (f, b))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn varying_values_match_grid_dimensions() {
    let mut grid = Grid::new(2, 2);
    let value = grid.add_value("x", Type::Float, Storage::Varying);
    assert_eq!(value.len(), grid.point_count());
  }

  #[test]
  fn uniform_values_have_length_one_regardless_of_grid_size() {
    let mut grid = Grid::new(4, 4);
    let value = grid.add_value("ka", Type::Float, Storage::Uniform);
    assert_eq!(value.len(), 1);
  }

  #[test]
  fn repeated_add_returns_the_existing_value() {
    let mut grid = Grid::new(2, 2);
    grid.add_value("x", Type::Float, Storage::Varying).as_scalars_mut()[0] = 7.0;
    let value = grid.add_value("x", Type::Float, Storage::Varying);
    assert_eq!(value.as_scalars()[0], 7.0);
  }

  #[test]
  fn take_value_then_put_value_round_trips_the_same_data() {
    let mut grid = Grid::new(2, 2);
    grid.add_value("x", Type::Float, Storage::Varying).as_scalars_mut()[0] = 3.0;
    let mut taken = grid.take_value("x").expect("x was added");
    assert!(grid.value("x").is_none());
    taken.as_scalars_mut()[1] = 5.0;
    grid.put_value("x", taken);
    assert_eq!(grid.value("x").unwrap().as_scalars(), &[3.0, 5.0, 0.0, 0.0]);
  }

  #[test]
  fn resize_reallocates_varying_but_not_uniform_attributes() {
    let mut grid = Grid::new(2, 2);
    grid.add_value("x", Type::Float, Storage::Varying);
    grid.add_value("ka", Type::Float, Storage::Uniform);
    grid.resize(4, 4);
    assert_eq!(grid.value("x").unwrap().len(), 16);
    assert_eq!(grid.value("ka").unwrap().len(), 1);
  }
}
