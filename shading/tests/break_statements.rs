//! `break` inside a `for` loop, grounded on `reyes_test/BreakStatements.cpp`.

mod common;

use shading::grid::Grid;
use shading::types::{Storage, Type};

#[test]
fn an_unconditional_break_stops_the_loop_after_its_first_iteration() {
  let mut grid = Grid::new(4, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, 0.0, 1.0, 0.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade(
    "surface s() { uniform float i; for (i = 0; i < 4; i += 1) { v += u; break; } }",
    &mut grid,
  );

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[1.0, 0.0, 1.0, 0.0]);
}

#[test]
fn a_break_guarded_by_a_per_lane_condition_only_retires_the_lanes_that_took_it() {
  let mut grid = Grid::new(2, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[2.0, 4.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade(
    "surface s() { uniform float i; for (i = 0; i < 4; i += 1) { if (i >= u) { break; } v += 1; } }",
    &mut grid,
  );

  // Lane 0 breaks once i reaches 2, having accumulated twice; lane 1 never
  // sees its own threshold within the loop bound and runs all 4 iterations.
  assert_eq!(grid.value("v").unwrap().as_scalars(), &[2.0, 4.0]);
}
