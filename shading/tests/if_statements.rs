//! `if`/`else` lane masking, grounded on `reyes_test/IfStatements.cpp`.

mod common;

use glam::Vec3;
use shading::grid::Grid;
use shading::types::{Storage, Type};

#[test]
fn only_the_lanes_that_pass_the_condition_execute_the_then_branch() {
  let mut grid = Grid::new(4, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, 0.0, 1.0, 0.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().fill(0.0);

  common::compile_and_shade("surface s() { if (u > 0) v = 1 - 2 * u; }", &mut grid);

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[-1.0, 0.0, -1.0, 0.0]);
}

#[test]
fn lanes_that_fail_the_condition_keep_their_prior_value() {
  let mut grid = Grid::new(2, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, -1.0]);
  grid.add_value("v", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[9.0, 9.0]);

  common::compile_and_shade("surface s() { if (u > 0) v = 1; }", &mut grid);

  assert_eq!(grid.value("v").unwrap().as_scalars(), &[1.0, 9.0]);
}

#[test]
fn else_runs_exactly_the_complementary_lanes() {
  let mut grid = Grid::new(2, 1);
  grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut().copy_from_slice(&[1.0, -1.0]);

  common::compile_and_shade("surface s() { if (u > 0) { Ci = 1; } else { Ci = 0; } }", &mut grid);

  let ci = grid.value("Ci").unwrap().as_triples();
  assert_eq!(ci, &[Vec3::ONE, Vec3::ZERO]);
}
