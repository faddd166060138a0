//! Compiled shaders and the `compile` host entry point.

use crate::ast::ShaderKind;
use crate::bytecode::{Program, Slot};
use crate::error::{ErrorCode, ErrorPolicy, RenderError};
use crate::light::LightCategory;
use crate::strings::StringPool;
use crate::symbols::SymbolTable;
use crate::types::{Storage, Type};

/// Where a register's value comes from at the start of a `shade` call, and
/// where it goes (for `Attribute`) once the call finishes.
#[derive(Clone, Debug)]
pub enum Binding {
  /// A predefined global (`P`, `N`, `Ci`, ...): aliases the owning Grid's
  /// attribute of the same name for the duration of execution.
  Attribute(String),
  /// A shader parameter or local variable: private per invocation.
  Local,
  /// `Ps`/`Cl`/`Ol` read inside an `illuminance` body: populated per-iteration
  /// from the currently-matched light's Grid, never written back.
  CurrentLight(String),
}

#[derive(Clone, Debug)]
pub enum LiteralValue {
  Number(f32),
  String(crate::strings::StringHandle),
}

/// Compile-time metadata for one register/constant-pool slot. [`crate::vm`]
/// uses this to materialize an actual [`crate::value::Value`] buffer sized to
/// the Grid being shaded.
#[derive(Clone, Debug)]
pub struct RegisterDescriptor {
  pub ty: Type,
  pub storage: Storage,
  pub binding: Binding,
  pub literal: Option<LiteralValue>,
}

/// A compiled shader: its bytecode plus everything the VM needs to stand up a
/// register file against a particular Grid.
pub struct Shader {
  pub kind: ShaderKind,
  pub name: String,
  pub program: Program,
  pub registers: Vec<RegisterDescriptor>,
  pub string_pool: StringPool,
  /// `(parameter name, its register slot)`, in declaration order.
  pub params: Vec<(String, Slot)>,
  /// Set for `ShaderKind::Light` shaders, from the illumination statement
  /// (`illuminate`/`solar`) found at the top of the body; `None` for
  /// non-light shaders.
  pub light_category: Option<LightCategory>,
}

/// Tunables for a single [`compile`] call, per §2.1's ambient-stack note.
#[derive(Clone, Debug)]
pub struct CompileOptions {
  /// Maximum diagnostics collected per phase before parsing/analysis gives up
  /// early. Mirrors the original's bounded recovery behaviour.
  pub error_budget: usize,
  /// Promotes [`ErrorCode::UnknownColorSpace`]/[`ErrorCode::InvalidDisplayMode`]
  /// (ordinarily warnings) to hard failures.
  pub warnings_as_errors: bool,
  /// Upper bound on `for`-loop unrolling the code generator will attempt for
  /// uniform-bounded loops before falling back to the masked loop form.
  pub max_loop_unroll_depth: u32,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self { error_budget: 32, warnings_as_errors: false, max_loop_unroll_depth: 0 }
  }
}

/// Compiles `source` into an executable [`Shader`], running the lexer,
/// parser, semantic analyzer, and code generator in sequence and gating each
/// phase boundary on the previous phase's success, per §7's error taxonomy.
///
/// `symbols` starts from (or is replaced with) the predefined-globals table;
/// callers that need to pre-declare renderer-side symbols should seed it
/// before calling.
pub fn compile(source: &str, options: &CompileOptions, policy: &mut dyn ErrorPolicy) -> Option<Shader> {
  let kind = sniff_shader_kind(source);

  let tokens = match crate::lexer::tokenize(source) {
    Ok(tokens) => tokens,
    Err(error) => {
      policy.render_error(RenderError::at(ErrorCode::SyntaxError, error.position, error.message));
      return None;
    }
  };

  let mut symbols = SymbolTable::with_predefined_globals();
  let Some(mut module) = crate::parser::parse_with_budget(tokens, &mut symbols, policy, options.error_budget) else {
    policy.render_error(RenderError::new(ErrorCode::ParsingFailed, "parsing failed"));
    return None;
  };

  if !crate::semantic::analyze(&mut module, &symbols, policy) {
    policy.render_error(RenderError::new(ErrorCode::SemanticAnalysisFailed, "semantic analysis failed"));
    return None;
  }

  let shader_node = module.children.first()?;
  let name = match &shader_node.kind {
    crate::ast::NodeKind::Shader { name, .. } => name.clone(),
    _ => return None,
  };

  match crate::codegen::generate(shader_node, &symbols, policy) {
    Some(mut shader) => {
      shader.kind = kind;
      shader.name = name;
      Some(shader)
    }
    None => {
      policy.render_error(RenderError::new(ErrorCode::CodeGenerationFailed, "code generation failed"));
      None
    }
  }
}

fn sniff_shader_kind(source: &str) -> ShaderKind {
  let first_word = source.split_whitespace().next().unwrap_or_default();
  match first_word {
    "displacement" => ShaderKind::Displacement,
    "light" => ShaderKind::Light,
    "volume" => ShaderKind::Volume,
    _ => ShaderKind::Surface,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CollectingErrorPolicy;

  #[test]
  fn compiles_a_minimal_surface_shader() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = compile("surface s() { Ci = 1; }", &CompileOptions::default(), &mut policy);
    assert!(shader.is_some());
    assert_eq!(policy.total_errors(), 0);
  }

  #[test]
  fn a_syntax_error_stops_before_code_generation() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = compile("surface s( { Ci = 1; }", &CompileOptions::default(), &mut policy);
    assert!(shader.is_none());
    assert!(policy.total_errors() > 0);
  }

  #[test]
  fn a_semantic_error_stops_before_code_generation() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = compile("surface s() { uniform float u; u = P; }", &CompileOptions::default(), &mut policy);
    assert!(shader.is_none());
  }
}
