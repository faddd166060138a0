//! Comparison and logical operators, grounded on `reyes_test/LogicalExpressions.cpp`.

mod common;

use shading::grid::Grid;
use shading::types::{Storage, Type};

#[test]
fn greater_than_produces_a_zero_or_one_float_per_lane() {
  let mut grid = Grid::new(4, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[-1.0, 0.0, 0.0, 1.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade("surface s() { v = u > 0; }", &mut grid);

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn greater_than_or_equal_includes_the_boundary() {
  let mut grid = Grid::new(4, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[-1.0, 0.0, 0.0, 1.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade("surface s() { v = u >= 0; }", &mut grid);

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[0.0, 1.0, 1.0, 1.0]);
}

#[test]
fn uniform_equality_comparison_is_an_integer_typed_result() {
  let mut grid = Grid::new(1, 1);
  common::compile_and_shade("surface s() { uniform float eq; eq = (1 == 1); Ci = eq; }", &mut grid);
  assert_eq!(grid.value("Ci").unwrap().as_triples()[0], glam::Vec3::ONE);
}

#[test]
fn logical_and_is_false_unless_both_operands_are_nonzero() {
  let mut grid = Grid::new(1, 1);
  common::compile_and_shade("surface s() { uniform float r; r = (1 == 1) && (0 == 1); Ci = r; }", &mut grid);
  assert_eq!(grid.value("Ci").unwrap().as_triples()[0], glam::Vec3::ZERO);
}

#[test]
fn logical_or_is_true_if_either_operand_is_nonzero() {
  let mut grid = Grid::new(1, 1);
  common::compile_and_shade("surface s() { uniform float r; r = (1 == 1) || (0 == 1); Ci = r; }", &mut grid);
  assert_eq!(grid.value("Ci").unwrap().as_triples()[0], glam::Vec3::ONE);
}
