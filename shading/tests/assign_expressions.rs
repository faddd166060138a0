//! Storage-class and idempotence invariants for `=`, grounded on the
//! original `reyes_test/AssignExpressions.cpp` suite.

mod common;

use glam::Vec3;
use shading::error::ErrorCode;
use shading::grid::Grid;
use shading::types::{Storage, Type};

#[test]
fn a_varying_values_length_is_the_grid_point_count() {
  let mut grid = Grid::new(3, 2);
  common::compile_and_shade("surface s() { Ci = u; }", &mut grid);
  assert_eq!(grid.value("Ci").unwrap().len(), 6);
}

#[test]
fn a_uniform_values_length_is_one_regardless_of_grid_size() {
  let mut grid = Grid::new(3, 2);
  common::compile_and_shade("surface s() { uniform float total; total = 1; Ci = total; }", &mut grid);
  let ci = grid.value("Ci").unwrap().as_triples();
  assert_eq!(ci.len(), 6);
  assert!(ci.iter().all(|c| *c == Vec3::ONE));
}

#[test]
fn assigning_a_varying_value_to_a_uniform_destination_fails_to_compile() {
  assert!(!common::compiles("surface s() { uniform float total; total = u; }"));
}

#[test]
fn assigning_a_uniform_value_to_a_varying_destination_compiles() {
  assert!(common::compiles("surface s() { uniform float total; total = 1; u = total; }"));
}

#[test]
fn repeating_the_same_assignment_is_idempotent() {
  let mut once = Grid::new(2, 2);
  common::compile_and_shade("surface s() { Ci = 1; }", &mut once);

  let mut twice = Grid::new(2, 2);
  common::compile_and_shade("surface s() { Ci = 1; Ci = 1; }", &mut twice);

  assert_eq!(once.value("Ci").unwrap().as_triples(), twice.value("Ci").unwrap().as_triples());
}

#[test]
fn assigning_a_float_literal_to_every_point_of_a_2x2_grid() {
  let mut grid = Grid::new(2, 2);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);
  common::compile_and_shade("surface s() { u = 1; }", &mut grid);
  assert_eq!(grid.value("u").unwrap().as_scalars(), &[1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn a_break_level_deeper_than_the_enclosing_loop_nest_is_a_code_generation_error() {
  let diagnostics =
    common::compile_diagnostics("surface s() { uniform float i; for (i = 0; i < 4; i += 1) { break 2; } }");
  assert!(diagnostics
    .iter()
    .any(|d| d.code == ErrorCode::CodeGenerationError && d.message == "Break to a level outside of a loop"));
}

#[test]
fn a_continue_level_deeper_than_the_enclosing_loop_nest_is_a_code_generation_error() {
  let diagnostics =
    common::compile_diagnostics("surface s() { uniform float i; for (i = 0; i < 4; i += 1) { continue 2; } }");
  assert!(diagnostics
    .iter()
    .any(|d| d.code == ErrorCode::CodeGenerationError && d.message == "Continue to a level outside of a loop"));
}
