//! `ctransform` and `mtransform`, grounded on `reyes_test/ColorFunctions.cpp`
//! and `reyes_test/MatrixFunctions.cpp`.
//!
//! The original's `ctransform` (`ctransform.cpp`) is one-directional —
//! `rgb_from_hsv`/`rgb_from_hsl` only, no inverse — so there is no
//! `hsv_from_rgb` to round-trip through here either; the fixed point below
//! (hsv value-only white) is the same one `kernels::ctransform`'s own unit
//! test already relies on. `mtransform` has no emitting syntax (no matrix
//! arithmetic or `mtransform()` builtin exists in the grammar), so its
//! associativity is exercised at the kernel level directly, on the `Mat4`
//! operands it premultiplies.

mod common;

use glam::{Mat4, Vec3};
use shading::grid::Grid;
use shading::kernels;
use shading::types::{Storage, Type};

#[test]
fn ctransform_hsv_through_a_compiled_shader_matches_the_kernels_own_conversion() {
  let mut grid = Grid::new(1, 1);
  grid.add_value("Cs", Type::Color, Storage::Varying).as_triples_mut().fill(Vec3::new(0.0, 0.0, 1.0));

  common::compile_and_shade(r#"surface s() { Ci = color"hsv"(Cs); }"#, &mut grid);

  let mut expected = [Vec3::ZERO];
  kernels::ctransform(&mut expected, "hsv", &[Vec3::new(0.0, 0.0, 1.0)], 1).unwrap();
  assert_eq!(grid.value("Ci").unwrap().as_triples()[0], expected[0]);
}

#[test]
fn mtransform_is_associative_on_the_uniform_path() {
  let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
  let a = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
  let b = Mat4::from_rotation_y(1.0);

  let mut a_times_b = [Mat4::IDENTITY];
  kernels::mtransform(&mut a_times_b, &[a], &[b], 1);
  let mut left = [Mat4::IDENTITY];
  kernels::mtransform(&mut left, &[m], &a_times_b, 1);

  let mut m_times_a = [Mat4::IDENTITY];
  kernels::mtransform(&mut m_times_a, &[m], &[a], 1);
  let mut right = [Mat4::IDENTITY];
  kernels::mtransform(&mut right, &m_times_a, &[b], 1);

  for row in 0..4 {
    assert!((left[0].row(row) - right[0].row(row)).length() < 1e-4);
  }
}
