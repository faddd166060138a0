//! Dispatch kernels: the scalar/vector math the VM's opcodes bottom out into.
//!
//! Each function takes already-resolved component slices (the VM has already
//! applied [`crate::value::Value::lane_index`] broadcasting) and writes
//! `length` lanes of `dst`. Grounded on the original's per-dispatch kernel
//! family (`add.cpp`, `ctransform.cpp`, `illuminance_illuminate.cpp`,
//! `illuminance_solar.cpp`, `shading_and_lighting_functions.cpp`), collapsed
//! from the original's one-function-per-`(U,V)`-combination style into a
//! single broadcasting loop per operation.

use glam::{Mat4, Vec3};

use crate::bytecode::{ArithmeticOp, CompareOp, LogicalOp};
use crate::error::ErrorCode;
use crate::library::Builtin;

/// Reads lane `i` out of `values`, broadcasting index 0 when `values` holds a
/// single (uniform/constant) element.
fn lane<T: Copy>(values: &[T], i: usize) -> T {
  if values.len() == 1 {
    values[0]
  } else {
    values[i]
  }
}

pub fn arithmetic_scalar(op: ArithmeticOp, dst: &mut [f32], a: &[f32], b: &[f32], length: usize) {
  for i in 0..length {
    let (x, y) = (lane(a, i), lane(b, i));
    dst[i] = match op {
      ArithmeticOp::Add => x + y,
      ArithmeticOp::Subtract => x - y,
      ArithmeticOp::Multiply => x * y,
      ArithmeticOp::Divide => x / y,
    };
  }
}

pub fn arithmetic_triple(op: ArithmeticOp, dst: &mut [Vec3], a: &[Vec3], b: &[Vec3], length: usize) {
  for i in 0..length {
    let (x, y) = (lane(a, i), lane(b, i));
    dst[i] = match op {
      ArithmeticOp::Add => x + y,
      ArithmeticOp::Subtract => x - y,
      ArithmeticOp::Multiply => x * y,
      ArithmeticOp::Divide => x / y,
    };
  }
}

/// `triple OP scalar`, used for e.g. `color * float`.
pub fn arithmetic_triple_scalar(op: ArithmeticOp, dst: &mut [Vec3], a: &[Vec3], b: &[f32], length: usize) {
  for i in 0..length {
    let (x, y) = (lane(a, i), lane(b, i));
    dst[i] = match op {
      ArithmeticOp::Add => x + Vec3::splat(y),
      ArithmeticOp::Subtract => x - Vec3::splat(y),
      ArithmeticOp::Multiply => x * y,
      ArithmeticOp::Divide => x / y,
    };
  }
}

pub fn compare_scalar(op: CompareOp, dst: &mut [f32], a: &[f32], b: &[f32], length: usize) {
  for i in 0..length {
    let (x, y) = (lane(a, i), lane(b, i));
    dst[i] = compare(op, x, y) as u8 as f32;
  }
}

fn compare(op: CompareOp, x: f32, y: f32) -> bool {
  match op {
    CompareOp::Equal => x == y,
    CompareOp::NotEqual => x != y,
    CompareOp::Less => x < y,
    CompareOp::LessEqual => x <= y,
    CompareOp::Greater => x > y,
    CompareOp::GreaterEqual => x >= y,
  }
}

pub fn logical(op: LogicalOp, dst: &mut [f32], a: &[f32], b: &[f32], length: usize) {
  for i in 0..length {
    let (x, y) = (lane(a, i) != 0.0, lane(b, i) != 0.0);
    dst[i] = (match op {
      LogicalOp::And => x && y,
      LogicalOp::Or => x || y,
    }) as u8 as f32;
  }
}

pub fn logical_not(dst: &mut [f32], a: &[f32], length: usize) {
  for i in 0..length {
    dst[i] = (lane(a, i) == 0.0) as u8 as f32;
  }
}

pub fn negate_scalar(dst: &mut [f32], a: &[f32], length: usize) {
  for i in 0..length {
    dst[i] = -lane(a, i);
  }
}

pub fn negate_triple(dst: &mut [Vec3], a: &[Vec3], length: usize) {
  for i in 0..length {
    dst[i] = -lane(a, i);
  }
}

pub fn broadcast_scalar_to_triple(dst: &mut [Vec3], a: &[f32], length: usize) {
  for i in 0..length {
    dst[i] = Vec3::splat(lane(a, i));
  }
}

/// Premultiplies `matrix` onto each input matrix, grounded on
/// `mtransform.cpp`'s `results[i] = m * matrices[i];`.
pub fn mtransform(dst: &mut [Mat4], matrix: &[Mat4], a: &[Mat4], length: usize) {
  for i in 0..length {
    dst[i] = lane(matrix, i) * lane(a, i);
  }
}

/// Colour-space conversion, grounded on `ctransform.cpp`'s `rgb_from_hsv`/
/// `rgb_from_hsl`. Reports [`ErrorCode::UnknownColorSpace`] and leaves `dst`
/// zeroed for an unrecognised `space`.
pub fn ctransform(dst: &mut [Vec3], space: &str, a: &[Vec3], length: usize) -> Result<(), ErrorCode> {
  let convert: fn(Vec3) -> Vec3 = match space {
    "hsv" => rgb_from_hsv,
    "hsl" => rgb_from_hsl,
    "rgb" => |v| v,
    _ => return Err(ErrorCode::UnknownColorSpace),
  };
  for i in 0..length {
    dst[i] = convert(lane(a, i));
  }
  Ok(())
}

fn rgb_from_hsv(hsv: Vec3) -> Vec3 {
  let (h, s, v) = (hsv.x, hsv.y, hsv.z);
  let c = v * s;
  let h_prime = (h - h.floor()) * 6.0;
  let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());
  let (r1, g1, b1) = match h_prime as i32 {
    0 => (c, x, 0.0),
    1 => (x, c, 0.0),
    2 => (0.0, c, x),
    3 => (0.0, x, c),
    4 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };
  let m = v - c;
  Vec3::new(r1 + m, g1 + m, b1 + m)
}

fn rgb_from_hsl(hsl: Vec3) -> Vec3 {
  let (h, s, l) = (hsl.x, hsl.y, hsl.z);
  let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
  let h_prime = (h - h.floor()) * 6.0;
  let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());
  let (r1, g1, b1) = match h_prime as i32 {
    0 => (c, x, 0.0),
    1 => (x, c, 0.0),
    2 => (0.0, c, x),
    3 => (0.0, x, c),
    4 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };
  let m = l - 0.5 * c;
  Vec3::new(r1 + m, g1 + m, b1 + m)
}

/// The reachability mask for an `illuminate(position[, axis, angle])`
/// statement, grounded on `illuminance_illuminate.cpp`. `angle >= 2*PI` (the
/// unbounded form) always passes.
pub fn illuminance_illuminate(dst: &mut [f32], light_position: &[Vec3], position: &[Vec3], axis: &[Vec3], angle: &[f32], length: usize) {
  for i in 0..length {
    let l = (lane(light_position, i) - lane(position, i)).normalize_or_zero();
    let pass = lane(angle, i) >= std::f32::consts::TAU || lane(axis, i).dot(l) >= lane(angle, i).cos();
    dst[i] = pass as u8 as f32;
  }
}

/// The reachability mask for a `solar([axis, angle])` statement, grounded on
/// `illuminance_solar.cpp`.
pub fn illuminance_solar(dst: &mut [f32], light_direction: &[Vec3], axis: &[Vec3], angle: &[f32], length: usize) {
  for i in 0..length {
    let l = (-lane(light_direction, i)).normalize_or_zero();
    let pass = lane(angle, i) >= std::f32::consts::TAU || lane(axis, i).dot(l) >= lane(angle, i).cos();
    dst[i] = pass as u8 as f32;
  }
}

pub fn call_scalar(builtin: Builtin, dst: &mut [f32], args: &[&[f32]], length: usize) {
  for i in 0..length {
    dst[i] = match builtin {
      Builtin::Abs => lane(args[0], i).abs(),
      Builtin::Sign => lane(args[0], i).signum(),
      Builtin::Sqrt => lane(args[0], i).sqrt(),
      Builtin::Pow => lane(args[0], i).powf(lane(args[1], i)),
      Builtin::Mod => lane(args[0], i).rem_euclid(lane(args[1], i)),
      Builtin::Min => lane(args[0], i).min(lane(args[1], i)),
      Builtin::Max => lane(args[0], i).max(lane(args[1], i)),
      Builtin::Clamp => lane(args[0], i).clamp(lane(args[1], i), lane(args[2], i)),
      Builtin::Mix => {
        let t = lane(args[2], i);
        lane(args[0], i) * (1.0 - t) + lane(args[1], i) * t
      }
      Builtin::Floor => lane(args[0], i).floor(),
      Builtin::Ceil => lane(args[0], i).ceil(),
      Builtin::Sin => lane(args[0], i).sin(),
      Builtin::Cos => lane(args[0], i).cos(),
      Builtin::Radians => lane(args[0], i).to_radians(),
      Builtin::Degrees => lane(args[0], i).to_degrees(),
      Builtin::Length | Builtin::Distance | Builtin::Dot => unreachable!("geometric builtin dispatched through call_scalar"),
      other => panic!("{other:?} does not return a scalar"),
    };
  }
}

pub fn call_triple(builtin: Builtin, dst: &mut [Vec3], args: &[&[Vec3]], length: usize) {
  for i in 0..length {
    dst[i] = match builtin {
      Builtin::Abs => lane(args[0], i).abs(),
      Builtin::Min => lane(args[0], i).min(lane(args[1], i)),
      Builtin::Max => lane(args[0], i).max(lane(args[1], i)),
      Builtin::Clamp => lane(args[0], i).clamp(lane(args[1], i), lane(args[2], i)),
      Builtin::Mix => {
        let t = lane(args[2], i);
        lane(args[0], i) * (1.0 - t) + lane(args[1], i) * t
      }
      Builtin::Normalize => lane(args[0], i).normalize_or_zero(),
      Builtin::Cross => lane(args[0], i).cross(lane(args[1], i)),
      Builtin::Faceforward => {
        let (n, i_vec) = (lane(args[0], i), lane(args[1], i));
        if i_vec.dot(n) < 0.0 {
          n
        } else {
          -n
        }
      }
      Builtin::Reflect => {
        let (i_vec, n) = (lane(args[0], i), lane(args[1], i));
        i_vec - 2.0 * n.dot(i_vec) * n
      }
      other => panic!("{other:?} does not return a vector"),
    };
  }
}

pub fn length(dst: &mut [f32], a: &[Vec3], length_: usize) {
  for i in 0..length_ {
    dst[i] = lane(a, i).length();
  }
}

pub fn distance(dst: &mut [f32], a: &[Vec3], b: &[Vec3], length_: usize) {
  for i in 0..length_ {
    dst[i] = lane(a, i).distance(lane(b, i));
  }
}

pub fn dot(dst: &mut [f32], a: &[Vec3], b: &[Vec3], length_: usize) {
  for i in 0..length_ {
    dst[i] = lane(a, i).dot(lane(b, i));
  }
}

/// `ambient()`: sums every ambient light's colour, unconditionally. Grounded
/// on `shading_and_lighting_functions.cpp`'s `ambient`.
pub fn ambient(dst: &mut [Vec3], light_colors: &[&[Vec3]], length: usize) {
  dst[..length].fill(Vec3::ZERO);
  for colors in light_colors {
    for i in 0..length {
      dst[i] += lane(colors, i);
    }
  }
}

/// `diffuse(N)`: Lambertian sum over non-ambient lights already masked by
/// `illuminance`-style reachability; `contributions` is `(Cl, cos_theta)` per
/// light, zeroed outside each light's reach by the caller.
pub fn diffuse(dst: &mut [Vec3], contributions: &[(&[Vec3], &[f32])], length: usize) {
  dst[..length].fill(Vec3::ZERO);
  for (color, cos_theta) in contributions {
    for i in 0..length {
      dst[i] += lane(color, i) * lane(cos_theta, i).max(0.0);
    }
  }
}

/// `specular(N, V, roughness)`: Blinn-Phong-style specular sum, grounded on
/// the original's `specular`/`specularbrdf`/`phong` family.
pub fn specular(dst: &mut [Vec3], normal: &[Vec3], view: &[Vec3], roughness: &[f32], contributions: &[(&[Vec3], &[Vec3])], length: usize) {
  dst[..length].fill(Vec3::ZERO);
  for (color, light_dir) in contributions {
    for i in 0..length {
      let n = lane(normal, i);
      let v = lane(view, i).normalize_or_zero();
      let l = lane(light_dir, i).normalize_or_zero();
      let h = (v + l).normalize_or_zero();
      let specular_power = 1.0 / lane(roughness, i).max(1e-4);
      let weight = n.dot(h).max(0.0).powf(specular_power);
      dst[i] += lane(color, i) * weight;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arithmetic_broadcasts_a_uniform_operand_to_every_lane() {
    let mut dst = [0.0f32; 3];
    arithmetic_scalar(ArithmeticOp::Add, &mut dst, &[1.0, 2.0, 3.0], &[10.0], 3);
    assert_eq!(dst, [11.0, 12.0, 13.0]);
  }

  #[test]
  fn mtransform_premultiplies_the_matrix_onto_each_input() {
    let m = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let a = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
    let mut dst = [Mat4::IDENTITY];
    mtransform(&mut dst, &[m], &[a], 1);
    assert_eq!(dst[0], m * a);
  }

  #[test]
  fn ctransform_hsv_white_round_trips_to_white() {
    let mut dst = [Vec3::ZERO];
    ctransform(&mut dst, "hsv", &[Vec3::new(0.0, 0.0, 1.0)], 1).unwrap();
    assert!((dst[0] - Vec3::ONE).length() < 1e-5);
  }

  #[test]
  fn ctransform_rejects_an_unknown_color_space() {
    let mut dst = [Vec3::ZERO];
    assert_eq!(ctransform(&mut dst, "xyz", &[Vec3::ZERO], 1), Err(ErrorCode::UnknownColorSpace));
  }

  #[test]
  fn illuminate_mask_passes_when_within_the_cone() {
    let mut mask = [0.0f32];
    illuminance_illuminate(&mut mask, &[Vec3::new(0.0, 1.0, 0.0)], &[Vec3::ZERO], &[Vec3::Y], &[std::f32::consts::FRAC_PI_4], 1);
    assert_eq!(mask[0], 1.0);
  }

  #[test]
  fn illuminate_mask_fails_outside_the_cone() {
    let mut mask = [0.0f32];
    illuminance_illuminate(&mut mask, &[Vec3::new(1.0, 0.0, 0.0)], &[Vec3::ZERO], &[Vec3::Y], &[0.1], 1);
    assert_eq!(mask[0], 0.0);
  }
}
