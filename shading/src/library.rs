//! Builtin function table: maps SL call names to dispatch kernels and result types.

use crate::types::Type;

/// A builtin function's calling convention tag, consumed by the code
/// generator to pick the right kernel family.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Builtin {
  Abs,
  Sign,
  Sqrt,
  Pow,
  Mod,
  Min,
  Max,
  Clamp,
  Mix,
  Floor,
  Ceil,
  Sin,
  Cos,
  Radians,
  Degrees,
  Normalize,
  Length,
  Distance,
  Dot,
  Cross,
  Faceforward,
  Reflect,
  Ambient,
  Diffuse,
  Specular,
  Specularbrdf,
  Phong,
  Trace,
}

/// Resolves a call name to its [`Builtin`] tag, or `None` for an unknown
/// function (the semantic analyzer reports `SemanticError("unknown function")`
/// in that case).
pub fn resolve(name: &str) -> Option<Builtin> {
  use Builtin::*;
  Some(match name {
    "abs" => Abs,
    "sign" => Sign,
    "sqrt" => Sqrt,
    "pow" => Pow,
    "mod" => Mod,
    "min" => Min,
    "max" => Max,
    "clamp" => Clamp,
    "mix" => Mix,
    "floor" => Floor,
    "ceil" => Ceil,
    "sin" => Sin,
    "cos" => Cos,
    "radians" => Radians,
    "degrees" => Degrees,
    "normalize" => Normalize,
    "length" => Length,
    "distance" => Distance,
    "dot" => Dot,
    "cross" => Cross,
    "faceforward" => Faceforward,
    "reflect" => Reflect,
    "ambient" => Ambient,
    "diffuse" => Diffuse,
    "specular" => Specular,
    "specularbrdf" => Specularbrdf,
    "phong" => Phong,
    "trace" => Trace,
    _ => return None,
  })
}

/// The result type of calling `name` with arguments of `arg_types`, per the
/// original's `mathematical_functions.hpp` / `geometric_functions.hpp` /
/// `shading_and_lighting_functions.hpp` signatures. Unknown names return
/// `Type::Float` as a neutral placeholder; the analyzer has already reported
/// the "unknown function" diagnostic by the time this is consulted.
pub fn return_type(name: &str, arg_types: &[Type]) -> Type {
  use Builtin::*;
  match resolve(name) {
    // Component-wise or scalar functions: result follows the widest argument type.
    Some(Abs | Sign | Sqrt | Pow | Mod | Min | Max | Clamp | Mix | Floor | Ceil) => {
      arg_types.iter().copied().max_by_key(|t| t.component_count()).unwrap_or(Type::Float)
    }
    Some(Sin | Cos | Radians | Degrees | Length | Distance | Dot) => Type::Float,
    Some(Normalize | Cross | Faceforward | Reflect) => Type::Vector,
    Some(Ambient | Diffuse | Specular | Specularbrdf | Phong | Trace) => Type::Color,
    None => Type::Float,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolves_known_builtins() {
    assert_eq!(resolve("normalize"), Some(Builtin::Normalize));
    assert_eq!(resolve("not_a_builtin"), None);
  }

  #[test]
  fn mix_returns_the_widest_argument_type() {
    assert_eq!(return_type("mix", &[Type::Color, Type::Color, Type::Float]), Type::Color);
  }

  #[test]
  fn shading_helpers_return_color() {
    assert_eq!(return_type("diffuse", &[Type::Normal]), Type::Color);
  }
}
