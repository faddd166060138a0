//! The shading language's syntax tree.
//!
//! Parsing produces this tree with `type_and_storage` left empty; the
//! semantic analyzer walks it bottom-up and fills every node in, per the
//! (T, S) inference rules.

use crate::error::SourcePosition;
use crate::symbols::SymbolId;
use crate::types::{Storage, TypeAndStorage};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShaderKind {
  Surface,
  Displacement,
  Light,
  Volume,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryOperator {
  Add,
  Subtract,
  Multiply,
  Divide,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssignOperator {
  Assign,
  AddAssign,
  SubtractAssign,
  MultiplyAssign,
  DivideAssign,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompareOperator {
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogicalOperator {
  And,
  Or,
  Not,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryOperator {
  Negate,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
  Number(f64),
  String(std::string::String),
}

/// The tag identifying what a [`Node`] represents; its `children` and
/// `literal`/`symbol` annotations are interpreted according to this tag.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
  /// children: one [`NodeKind::Shader`] per declared shader in the file.
  Module,
  /// children: params..., body (a [`NodeKind::Block`]).
  Shader { kind: ShaderKind, name: String },
  /// children: optional initializer expression.
  Param { name: String, declared_storage: Option<Storage>, declared_type: crate::types::Type },
  /// children: the statements of the block, in order.
  Block,
  /// children: optional initializer expression.
  Declaration { name: String, declared_storage: Option<Storage>, declared_type: crate::types::Type },
  /// children: the wrapped expression.
  ExprStatement,
  /// children: condition, then-block, optional else-block.
  If,
  /// children: condition, body.
  While,
  /// children: init (or [`NodeKind::Block`] with no statements), condition, step, body.
  For,
  Break { level: u32 },
  Continue { level: u32 },
  /// children: optional return-value expression.
  Return,
  /// children: position, optional axis, optional angle, body.
  Illuminate { has_axis_angle: bool },
  /// children: optional axis, optional angle, body.
  Solar { has_axis_angle: bool },
  /// children: position, axis, angle, body.
  Illuminance,
  /// Resolved by the parser via the symbol table.
  Identifier { name: String },
  Literal(Literal),
  /// children: target (an identifier), value.
  Assign { op: AssignOperator },
  /// children: lhs, rhs.
  Binary { op: BinaryOperator },
  /// children: operand.
  Unary { op: UnaryOperator },
  /// children: lhs, rhs.
  Compare { op: CompareOperator },
  /// children: lhs, optional rhs (absent for `Not`).
  Logical { op: LogicalOperator },
  /// children: the call arguments, in order.
  Call { name: String },
  /// A `type"space" expr` cast, e.g. `color"hsv"(1,0,0)`. children: the wrapped expression.
  Typecast { target_type: crate::types::Type, space: Option<std::string::String> },
}

/// A syntax-tree node, annotated with its resolved `(T, S)` pair once
/// semantic analysis has run.
#[derive(Clone, Debug)]
pub struct Node {
  pub kind: NodeKind,
  pub position: SourcePosition,
  pub type_and_storage: Option<TypeAndStorage>,
  pub symbol: Option<SymbolId>,
  pub children: Vec<Node>,
}

impl Node {
  pub fn new(kind: NodeKind, position: SourcePosition, children: Vec<Node>) -> Self {
    Self { kind, position, type_and_storage: None, symbol: None, children }
  }

  pub fn leaf(kind: NodeKind, position: SourcePosition) -> Self {
    Self::new(kind, position, Vec::new())
  }

  pub fn accept(&self, visitor: &mut dyn Visitor) {
    visitor.visit_node(self);
  }
}

/// Walks a [`Node`] tree. The default method bodies simply recurse into
/// children in source order; override individual hooks to intercept a kind.
#[allow(unused_variables)]
pub trait Visitor {
  fn visit_node(&mut self, node: &Node) {
    match &node.kind {
      NodeKind::Module => self.visit_module(node),
      NodeKind::Shader { .. } => self.visit_shader(node),
      NodeKind::Identifier { .. } => self.visit_identifier(node),
      NodeKind::Literal(literal) => self.visit_literal(node, literal),
      NodeKind::Call { .. } => self.visit_call(node),
      _ => self.walk_children(node),
    }
  }

  fn walk_children(&mut self, node: &Node) {
    for child in &node.children {
      self.visit_node(child);
    }
  }

  fn visit_module(&mut self, node: &Node) {
    self.walk_children(node);
  }

  fn visit_shader(&mut self, node: &Node) {
    self.walk_children(node);
  }

  fn visit_identifier(&mut self, node: &Node) {}

  fn visit_literal(&mut self, node: &Node, literal: &Literal) {}

  fn visit_call(&mut self, node: &Node) {
    self.walk_children(node);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct IdentifierCollector {
    names: Vec<String>,
  }

  impl Visitor for IdentifierCollector {
    fn visit_identifier(&mut self, node: &Node) {
      if let NodeKind::Identifier { name } = &node.kind {
        self.names.push(name.clone());
      }
    }
  }

  #[test]
  fn visitor_collects_identifiers_across_a_binary_expression() {
    let pos = SourcePosition::new(1, 1);
    let lhs = Node::leaf(NodeKind::Identifier { name: "x".into() }, pos);
    let rhs = Node::leaf(NodeKind::Identifier { name: "y".into() }, pos);
    let tree = Node::new(NodeKind::Binary { op: BinaryOperator::Add }, pos, vec![lhs, rhs]);

    let mut collector = IdentifierCollector { names: Vec::new() };
    tree.accept(&mut collector);

    assert_eq!(collector.names, vec!["x".to_string(), "y".to_string()]);
  }
}
