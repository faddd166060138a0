//! `continue` inside a `for` loop, grounded on `reyes_test/ContinueStatements.cpp`.

mod common;

use shading::grid::Grid;
use shading::types::{Storage, Type};

#[test]
fn an_unconditional_continue_skips_the_statements_that_follow_it_every_iteration() {
  let mut grid = Grid::new(4, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, 0.0, 1.0, 0.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade(
    "surface s() { uniform float i; for (i = 0; i < 4; i += 1) { v += u; continue; v += u; } }",
    &mut grid,
  );

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[4.0, 0.0, 4.0, 0.0]);
}

#[test]
fn continue_guarded_by_a_per_lane_condition_skips_only_for_the_lanes_that_took_it() {
  let mut grid = Grid::new(2, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, 1.0]);
  grid.add_value("t", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[0.0, 2.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade(
    "surface s() { uniform float i; for (i = 0; i < 3; i += 1) { \
       if (i < t) { continue; } v += u; } }",
    &mut grid,
  );

  // Lane 0's threshold never holds, so it accumulates all 3 iterations; lane
  // 1 continues through i == 0 and i == 1, accumulating only on i == 2.
  assert_eq!(grid.value("v").unwrap().as_scalars(), &[3.0, 1.0]);
}
