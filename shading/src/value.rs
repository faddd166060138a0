//! Typed, storage-classed value buffers: the grid's fundamental unit of storage.

use glam::{Mat4, Vec3};
use shading_common::Grid as RawGrid;

use crate::types::{Storage, Type};

/// The scalar-component backing store for a [`Value`], shaped by its `Type`'s
/// component count (1, 3, or 16). Reuses the shared columnar [`RawGrid`]
/// buffer, addressed the same way whether the value is uniform (a 1x1 grid)
/// or varying (the owning shading grid's actual width x height).
#[derive(Clone, Debug)]
pub enum Buffer {
  /// `float` / `integer`.
  Scalar(RawGrid<f32>),
  /// `point` / `vector` / `normal` / `color`.
  Triple(RawGrid<Vec3>),
  /// `matrix`.
  Matrix(RawGrid<Mat4>),
  /// `string`, stored as a handle into the compile's [`crate::strings::StringPool`].
  StringHandle(RawGrid<u32>),
}

/// A single named attribute's storage: a `(T, S, n)` triple over a flat
/// buffer, per §3's data model.
#[derive(Clone, Debug)]
pub struct Value {
  ty: Type,
  storage: Storage,
  buffer: Buffer,
}

impl Value {
  /// Allocates a zero-initialized value. `width`/`height` describe the
  /// backing buffer's shape: `(1, 1)` for uniform/constant, the owning grid's
  /// dimensions for varying.
  pub fn new(ty: Type, storage: Storage, width: usize, height: usize) -> Self {
    let (width, height) = if storage == Storage::Varying { (width, height) } else { (1, 1) };
    let buffer = match ty {
      Type::Float | Type::Integer => Buffer::Scalar(RawGrid::new(width, height)),
      Type::Point | Type::Vector | Type::Normal | Type::Color => Buffer::Triple(RawGrid::new(width, height)),
      Type::Matrix => Buffer::Matrix(RawGrid::new(width, height)),
      Type::String => Buffer::StringHandle(RawGrid::new(width, height)),
      Type::Void => Buffer::Scalar(RawGrid::new(width, height)),
    };
    Self { ty, storage, buffer }
  }

  pub fn ty(&self) -> Type {
    self.ty
  }

  pub fn storage(&self) -> Storage {
    self.storage
  }

  pub fn len(&self) -> usize {
    match &self.buffer {
      Buffer::Scalar(g) => g.len(),
      Buffer::Triple(g) => g.len(),
      Buffer::Matrix(g) => g.len(),
      Buffer::StringHandle(g) => g.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn buffer(&self) -> &Buffer {
    &self.buffer
  }

  pub fn buffer_mut(&mut self) -> &mut Buffer {
    &mut self.buffer
  }

  pub fn as_scalars(&self) -> &[f32] {
    match &self.buffer {
      Buffer::Scalar(g) => g.as_slice(),
      _ => panic!("value of type {} is not scalar-backed", self.ty),
    }
  }

  pub fn as_scalars_mut(&mut self) -> &mut [f32] {
    match &mut self.buffer {
      Buffer::Scalar(g) => g.as_mut_slice(),
      _ => panic!("value of type {} is not scalar-backed", self.ty),
    }
  }

  pub fn as_triples(&self) -> &[Vec3] {
    match &self.buffer {
      Buffer::Triple(g) => g.as_slice(),
      _ => panic!("value of type {} is not triple-backed", self.ty),
    }
  }

  pub fn as_triples_mut(&mut self) -> &mut [Vec3] {
    match &mut self.buffer {
      Buffer::Triple(g) => g.as_mut_slice(),
      _ => panic!("value of type {} is not triple-backed", self.ty),
    }
  }

  pub fn as_matrices(&self) -> &[Mat4] {
    match &self.buffer {
      Buffer::Matrix(g) => g.as_slice(),
      _ => panic!("value of type {} is not matrix-backed", self.ty),
    }
  }

  pub fn as_matrices_mut(&mut self) -> &mut [Mat4] {
    match &mut self.buffer {
      Buffer::Matrix(g) => g.as_mut_slice(),
      _ => panic!("value of type {} is not matrix-backed", self.ty),
    }
  }

  pub fn as_string_handles(&self) -> &[u32] {
    match &self.buffer {
      Buffer::StringHandle(g) => g.as_slice(),
      _ => panic!("value of type {} is not string-backed", self.ty),
    }
  }

  pub fn as_string_handles_mut(&mut self) -> &mut [u32] {
    match &mut self.buffer {
      Buffer::StringHandle(g) => g.as_mut_slice(),
      _ => panic!("value of type {} is not string-backed", self.ty),
    }
  }

  /// Reads lane `i`, broadcasting index 0 if this value is uniform/constant
  /// (`n == 1`), per §4.6's "`Ui` operands are broadcast to all lanes" rule.
  pub fn lane_index(&self, i: usize) -> usize {
    if self.storage == Storage::Varying {
      i
    } else {
      0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uniform_values_always_have_length_one() {
    let value = Value::new(Type::Float, Storage::Uniform, 4, 4);
    assert_eq!(value.len(), 1);
  }

  #[test]
  fn varying_values_match_the_grid_dimensions() {
    let value = Value::new(Type::Color, Storage::Varying, 2, 2);
    assert_eq!(value.len(), 4);
  }

  #[test]
  fn new_values_are_zero_initialized() {
    let value = Value::new(Type::Color, Storage::Varying, 2, 2);
    assert!(value.as_triples().iter().all(|v| *v == Vec3::ZERO));
  }

  #[test]
  fn lane_index_broadcasts_uniform_values() {
    let value = Value::new(Type::Float, Storage::Uniform, 2, 2);
    assert_eq!(value.lane_index(0), 0);
    assert_eq!(value.lane_index(3), 0);
  }
}
