//! A surface's `illuminance` loop against a light's output Grid, grounded on
//! `reyes_test/IlluminanceStatements.cpp`.
//!
//! The language has no multi-component triple constructor (`point(x,y,z)`
//! doesn't exist; typecasts take a single expression and splat it across
//! components), so these lights are built directly the way the `vm.rs` unit
//! tests build Grids, rather than through a compiled `illuminate()` body.

mod common;

use std::sync::Arc;

use glam::Vec3;
use shading::error::CollectingErrorPolicy;
use shading::grid::Grid;
use shading::light::{Light, LightCategory};
use shading::shader::{compile, CompileOptions};
use shading::types::{Storage, Type};
use shading::vm::shade;

/// A point light with an unrestricted cone (`__angle` past the kernels'
/// `>= TAU` short-circuit, as an unqualified `illuminate(position)` compiles to).
fn point_light(position: Vec3, color: Vec3) -> Light {
  let mut grid = Grid::new(1, 1);
  grid.add_value("Ps", Type::Point, Storage::Uniform).as_triples_mut().fill(position);
  grid.add_value("Cl", Type::Color, Storage::Uniform).as_triples_mut().fill(color);
  grid.add_value("Ol", Type::Color, Storage::Uniform).as_triples_mut().fill(Vec3::ONE);
  grid.add_value("__axis", Type::Vector, Storage::Uniform).as_triples_mut().fill(Vec3::ZERO);
  grid.add_value("__angle", Type::Float, Storage::Uniform).as_scalars_mut().fill(f32::MAX);

  let mut policy = CollectingErrorPolicy::new();
  let shader =
    compile("light l() { Cl = 1; }", &CompileOptions::default(), &mut policy).expect("dummy light shader should compile");
  Light::new(LightCategory::IlluminatePoint, Arc::new(shader), grid)
}

#[test]
fn a_point_light_above_the_hemisphere_contributes_only_to_normals_facing_it() {
  let mut grid = Grid::new(2, 1);
  grid.add_value("N", Type::Normal, Storage::Varying).as_triples_mut().copy_from_slice(&[Vec3::Y, Vec3::NEG_Y]);
  grid.add_value("P", Type::Point, Storage::Varying).as_triples_mut().fill(Vec3::ZERO);
  grid.add_value("Ci", Type::Color, Storage::Varying).as_triples_mut().fill(Vec3::ZERO);
  grid.lights_mut().push(point_light(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)));

  let mut policy = CollectingErrorPolicy::new();
  let shader = compile(
    "surface s() { illuminance(P, N, 1.5707963) { Ci += Ol * Cl; } }",
    &CompileOptions::default(),
    &mut policy,
  )
  .expect("surface shader should compile");
  shade(&shader, &mut grid, &mut policy).expect("surface shader should shade without error");

  let ci = grid.value("Ci").unwrap().as_triples();
  assert!(ci[0].y > 0.0, "the lane facing the light should pick up its green contribution");
  assert_eq!(ci[1], Vec3::ZERO, "the lane facing away from the light should see none of it");
}

#[test]
fn an_ambient_light_is_never_visited_by_an_illuminance_loop() {
  let mut grid = Grid::new(1, 1);
  grid.add_value("Ci", Type::Color, Storage::Varying).as_triples_mut().fill(Vec3::ZERO);

  let mut light_grid = Grid::new(1, 1);
  light_grid.add_value("Cl", Type::Color, Storage::Uniform).as_triples_mut().fill(Vec3::ONE);
  let mut policy = CollectingErrorPolicy::new();
  let dummy = compile("light l() { Cl = 1; }", &CompileOptions::default(), &mut policy).unwrap();
  grid.lights_mut().push(Light::new(LightCategory::Ambient, Arc::new(dummy), light_grid));

  let shader = compile(
    "surface s() { uniform float visits; visits = 0; \
     illuminance(P, N, 3.1415926) { visits = visits + 1; } Ci = visits; }",
    &CompileOptions::default(),
    &mut policy,
  )
  .expect("surface shader should compile");
  shade(&shader, &mut grid, &mut policy).unwrap();

  assert_eq!(grid.value("Ci").unwrap().as_triples()[0], Vec3::ZERO);
}
