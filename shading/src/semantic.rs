//! Bottom-up type and storage-class inference over a parsed syntax tree.

use crate::ast::*;
use crate::error::{ErrorCode, ErrorPolicy, RenderError};
use crate::symbols::SymbolTable;
use crate::types::{Storage, Type, TypeAndStorage};

/// Walks `node` bottom-up, filling in `type_and_storage` on every node per
/// §4.4's inference rules. Returns `false` if any [`ErrorCode::SemanticError`]
/// was reported, in which case the caller should not proceed to code
/// generation (`SEMANTIC_ANALYSIS_FAILED`).
pub fn analyze(node: &mut Node, symbols: &SymbolTable, policy: &mut dyn ErrorPolicy) -> bool {
  let mut analyzer = Analyzer { symbols, policy, ok: true };
  analyzer.visit(node);
  analyzer.ok
}

struct Analyzer<'a> {
  symbols: &'a SymbolTable,
  policy: &'a mut dyn ErrorPolicy,
  ok: bool,
}

impl<'a> Analyzer<'a> {
  fn error(&mut self, node: &Node, message: impl Into<String>) {
    self.ok = false;
    self.policy.render_error(RenderError::at(ErrorCode::SemanticError, node.position, message.into()));
  }

  fn visit(&mut self, node: &mut Node) {
    for child in &mut node.children {
      self.visit(child);
    }
    node.type_and_storage = self.infer(node);
  }

  fn child_ts(node: &Node, index: usize) -> TypeAndStorage {
    Self::child_ts_of(&node.children[index])
  }

  fn child_ts_of(node: &Node) -> TypeAndStorage {
    node.type_and_storage.unwrap_or(TypeAndStorage::constant(Type::Void))
  }

  fn infer(&mut self, node: &Node) -> Option<TypeAndStorage> {
    match &node.kind {
      NodeKind::Literal(Literal::Number(_)) => Some(TypeAndStorage::constant(Type::Float)),
      NodeKind::Literal(Literal::String(_)) => Some(TypeAndStorage::constant(Type::String)),

      NodeKind::Identifier { name } => match node.symbol {
        Some(id) => Some(self.symbols.symbol(id).type_and_storage),
        None => {
          // Already reported by the parser as UndefinedSymbol; keep analysis
          // moving with a neutral placeholder type.
          let _ = name;
          Some(TypeAndStorage::constant(Type::Float))
        }
      },

      NodeKind::Binary { .. } => {
        let lhs = Self::child_ts(node, 0);
        let rhs = Self::child_ts(node, 1);
        if !lhs.ty.accepts_implicit_conversion_from(rhs.ty) && !rhs.ty.accepts_implicit_conversion_from(lhs.ty) {
          self.error(node, format!("cannot combine `{}` with `{}`", lhs.ty, rhs.ty));
          return Some(TypeAndStorage::constant(Type::Float));
        }
        let ty = if lhs.ty.component_count() >= rhs.ty.component_count() { lhs.ty } else { rhs.ty };
        Some(TypeAndStorage::new(ty, lhs.lub(rhs)))
      }

      NodeKind::Unary { .. } => Some(Self::child_ts(node, 0)),

      NodeKind::Compare { .. } => {
        let lhs = Self::child_ts(node, 0);
        let rhs = Self::child_ts(node, 1);
        Some(TypeAndStorage::new(Type::Integer, lhs.lub(rhs)))
      }

      NodeKind::Logical { op } => {
        let lhs = Self::child_ts(node, 0);
        let storage = if *op == LogicalOperator::Not {
          lhs.storage
        } else {
          lhs.lub(Self::child_ts(node, 1))
        };
        Some(TypeAndStorage::new(Type::Integer, storage))
      }

      NodeKind::Assign { .. } => {
        let target = Self::child_ts(node, 0);
        let value = Self::child_ts(node, 1);
        let target_node = &node.children[0];
        if !matches!(target_node.kind, NodeKind::Identifier { .. }) {
          self.error(node, "assignment target must be an identifier");
        } else if target.storage == Storage::Constant {
          self.error(node, "cannot assign to a constant");
        } else if !target.storage.covers(value.storage) {
          self.error(
            node,
            format!("cannot assign {} value to {} target `{}`", value.storage, target.storage, identifier_name(target_node)),
          );
        } else if !target.ty.accepts_implicit_conversion_from(value.ty) {
          self.error(node, format!("cannot assign `{}` to `{}`", value.ty, target.ty));
        }
        Some(target)
      }

      NodeKind::Typecast { target_type, space } => {
        let operand = Self::child_ts(node, 0);
        if *target_type == Type::Color && space.is_some() && !operand.ty.is_geometric() && operand.ty != Type::Color {
          self.error(node, format!("cannot typecast `{}` to color", operand.ty));
        }
        Some(TypeAndStorage::new(*target_type, operand.storage))
      }

      NodeKind::Call { name } => {
        let arg_ts: Vec<TypeAndStorage> = node.children.iter().map(|c| Self::child_ts_of(c)).collect();
        if crate::library::resolve(name).is_none() {
          self.error(node, format!("unknown function `{name}`"));
        }
        let storage = arg_ts.iter().fold(Storage::Constant, |acc, ts| acc.lub(ts.storage));
        let arg_types: Vec<Type> = arg_ts.iter().map(|ts| ts.ty).collect();
        Some(TypeAndStorage::new(crate::library::return_type(name, &arg_types), storage))
      }

      NodeKind::Declaration { declared_type, .. } | NodeKind::Param { declared_type, .. } => {
        let storage = node.symbol.map(|id| self.symbols.symbol(id).storage()).unwrap_or(Storage::Uniform);
        if let Some(initializer) = node.children.first() {
          let init_ts = initializer.type_and_storage.unwrap_or(TypeAndStorage::constant(*declared_type));
          if !storage.covers(init_ts.storage) {
            self.error(node, "initializer storage class is wider than the declaration");
          } else if !declared_type.accepts_implicit_conversion_from(init_ts.ty) {
            self.error(node, format!("cannot initialize `{declared_type}` from `{}`", init_ts.ty));
          }
        }
        Some(TypeAndStorage::new(*declared_type, storage))
      }

      _ => None,
    }
  }
}

fn identifier_name(node: &Node) -> &str {
  match &node.kind {
    NodeKind::Identifier { name } => name,
    _ => "?",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CollectingErrorPolicy;
  use crate::lexer::tokenize;
  use crate::parser::parse;
  use crate::symbols::SymbolTable;

  fn analyze_source(source: &str) -> (bool, usize) {
    let tokens = tokenize(source).unwrap();
    let mut symbols = SymbolTable::with_predefined_globals();
    let mut policy = CollectingErrorPolicy::new();
    let mut module = parse(tokens, &mut symbols, &mut policy).expect("should parse");
    let ok = analyze(&mut module, &symbols, &mut policy);
    (ok, policy.total_errors())
  }

  #[test]
  fn simple_assignment_of_a_literal_is_well_typed() {
    let (ok, errors) = analyze_source("surface s() { x = 1; }");
    assert!(ok);
    assert_eq!(errors, 0);
  }

  #[test]
  fn assigning_varying_to_uniform_is_rejected() {
    let (ok, errors) = analyze_source("surface s() { uniform float u; u = P; }");
    assert!(!ok);
    assert!(errors > 0);
  }

  #[test]
  fn color_and_vector_require_an_explicit_typecast() {
    let (ok, _) = analyze_source("surface s() { Ci = N; }");
    assert!(!ok, "assigning a normal directly to a color should fail without a cast");
  }

  #[test]
  fn float_broadcasts_into_a_color_declaration() {
    let (ok, errors) = analyze_source("surface s() { color c = 1; }");
    assert!(ok);
    assert_eq!(errors, 0);
  }

  #[test]
  fn comparison_result_is_integer() {
    let tokens = tokenize("surface s() { a = P; }").unwrap();
    let mut symbols = SymbolTable::with_predefined_globals();
    let mut policy = CollectingErrorPolicy::new();
    let mut module = parse(tokens, &mut symbols, &mut policy).unwrap();
    analyze(&mut module, &symbols, &mut policy);
    let shader = &module.children[0];
    let block = shader.children.last().unwrap();
    let assign = &block.children[0].children[0];
    assert_eq!(assign.type_and_storage.unwrap().ty, Type::Point);
  }
}
