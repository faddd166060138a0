//! Recursive-descent parser for the shading language.

use std::collections::VecDeque;

use crate::ast::*;
use crate::error::{ErrorCode, ErrorPolicy, RenderError, SourcePosition};
use crate::lexer::{Keyword, Operator, Token, TokenKind};
use crate::symbols::{Symbol, SymbolTable};
use crate::types::{Storage, Type};

#[derive(Debug)]
pub struct SyntaxError {
  pub position: SourcePosition,
  pub message: String,
}

/// A budget on how many [`SyntaxError`]s a single parse will collect before
/// giving up, per §4.2's "policy-defined budget".
const DEFAULT_ERROR_BUDGET: usize = 32;

struct TokenStream {
  tokens: VecDeque<Token>,
}

impl TokenStream {
  fn peek(&self) -> &Token {
    self.tokens.front().expect("token stream always ends in Eof")
  }

  fn take(&mut self) -> Token {
    if self.tokens.len() == 1 {
      // never consume past Eof; keep returning it.
      return self.tokens.front().cloned().unwrap();
    }
    self.tokens.pop_front().expect("token stream always ends in Eof")
  }

  fn at_eof(&self) -> bool {
    matches!(self.peek().kind, TokenKind::Eof)
  }

  fn check_keyword(&self, keyword: Keyword) -> bool {
    matches!(&self.peek().kind, TokenKind::Keyword(k) if *k == keyword)
  }

  fn check_operator(&self, operator: Operator) -> bool {
    matches!(&self.peek().kind, TokenKind::Operator(op) if *op == operator)
  }

  fn take_keyword(&mut self, keyword: Keyword) -> Option<Token> {
    if self.check_keyword(keyword) {
      Some(self.take())
    } else {
      None
    }
  }

  fn take_operator(&mut self, operator: Operator) -> Option<Token> {
    if self.check_operator(operator) {
      Some(self.take())
    } else {
      None
    }
  }
}

type ParseResult<T> = Result<T, ()>;

/// Parses `tokens` into a single-shader [`Node`] tree (`NodeKind::Module`
/// wrapping one `NodeKind::Shader`), resolving identifiers against
/// `symbols` as they are encountered.
///
/// Returns `None` if the error budget was exhausted or the file-level shape
/// (`<kind> <name> ( ... ) { ... }`) could not be recovered at all; every
/// [`SyntaxError`] along the way is reported to `policy` as
/// [`ErrorCode::SyntaxError`].
pub fn parse(tokens: Vec<Token>, symbols: &mut SymbolTable, policy: &mut dyn ErrorPolicy) -> Option<Node> {
  parse_with_budget(tokens, symbols, policy, DEFAULT_ERROR_BUDGET)
}

/// As [`parse`], but with an explicit error budget (see
/// [`crate::shader::CompileOptions::error_budget`]) instead of the default.
pub fn parse_with_budget(tokens: Vec<Token>, symbols: &mut SymbolTable, policy: &mut dyn ErrorPolicy, budget: usize) -> Option<Node> {
  let mut parser = Parser {
    stream: TokenStream { tokens: tokens.into() },
    symbols,
    policy,
    errors_reported: 0,
    budget,
  };
  let module = parser.parse_module();
  if parser.errors_reported > 0 {
    None
  } else {
    module.ok()
  }
}

struct Parser<'a> {
  stream: TokenStream,
  symbols: &'a mut SymbolTable,
  policy: &'a mut dyn ErrorPolicy,
  errors_reported: usize,
  budget: usize,
}

impl<'a> Parser<'a> {
  fn error(&mut self, position: SourcePosition, message: impl Into<String>) {
    self.errors_reported += 1;
    self
      .policy
      .render_error(RenderError::at(ErrorCode::SyntaxError, position, message.into()));
  }

  fn budget_exhausted(&self) -> bool {
    self.errors_reported >= self.budget
  }

  /// Skips tokens until the next statement boundary (`;` or `}`), so that one
  /// malformed statement does not prevent collecting further diagnostics.
  fn recover_to_statement_boundary(&mut self) {
    loop {
      if self.stream.at_eof() {
        return;
      }
      if self.stream.check_operator(Operator::Semicolon) {
        self.stream.take();
        return;
      }
      if self.stream.check_operator(Operator::RightBrace) {
        return;
      }
      self.stream.take();
    }
  }

  fn expect_operator(&mut self, operator: Operator, what: &str) -> ParseResult<Token> {
    match self.stream.take_operator(operator) {
      Some(token) => Ok(token),
      None => {
        let position = self.stream.peek().position;
        self.error(position, format!("expected {what}"));
        Err(())
      }
    }
  }

  fn expect_identifier(&mut self) -> ParseResult<(String, SourcePosition)> {
    let token = self.stream.peek().clone();
    if let TokenKind::Identifier(name) = token.kind {
      self.stream.take();
      Ok((name, token.position))
    } else {
      self.error(token.position, "expected an identifier");
      Err(())
    }
  }

  fn parse_type(&mut self) -> ParseResult<Type> {
    let token = self.stream.peek().clone();
    let ty = match token.kind {
      TokenKind::Keyword(Keyword::Float) => Type::Float,
      TokenKind::Keyword(Keyword::Integer) => Type::Integer,
      TokenKind::Keyword(Keyword::Point) => Type::Point,
      TokenKind::Keyword(Keyword::Vector) => Type::Vector,
      TokenKind::Keyword(Keyword::Normal) => Type::Normal,
      TokenKind::Keyword(Keyword::Color) => Type::Color,
      TokenKind::Keyword(Keyword::Matrix) => Type::Matrix,
      TokenKind::Keyword(Keyword::String) => Type::String,
      TokenKind::Keyword(Keyword::Void) => Type::Void,
      _ => {
        self.error(token.position, "expected a type");
        return Err(());
      }
    };
    self.stream.take();
    Ok(ty)
  }

  fn parse_shader_kind(&mut self) -> ParseResult<ShaderKind> {
    let token = self.stream.peek().clone();
    let kind = match token.kind {
      TokenKind::Keyword(Keyword::Surface) => ShaderKind::Surface,
      TokenKind::Keyword(Keyword::Displacement) => ShaderKind::Displacement,
      TokenKind::Keyword(Keyword::Light) => ShaderKind::Light,
      TokenKind::Keyword(Keyword::Volume) => ShaderKind::Volume,
      _ => {
        self.error(token.position, "expected `surface`, `displacement`, `light` or `volume`");
        return Err(());
      }
    };
    self.stream.take();
    Ok(kind)
  }

  fn parse_module(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    let shader = self.parse_shader()?;
    Ok(Node::new(NodeKind::Module, position, vec![shader]))
  }

  fn parse_shader(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    let kind = self.parse_shader_kind()?;
    let (name, _) = self.expect_identifier()?;

    self.expect_operator(Operator::LeftParen, "`(`")?;
    self.symbols.push_scope();
    let mut children = Vec::new();
    if !self.stream.check_operator(Operator::RightParen) {
      loop {
        children.push(self.parse_param()?);
        if self.stream.take_operator(Operator::Comma).is_none() {
          break;
        }
      }
    }
    self.expect_operator(Operator::RightParen, "`)`")?;

    let body = self.parse_block()?;
    self.symbols.pop_scope();
    children.push(body);

    Ok(Node::new(NodeKind::Shader { kind, name }, position, children))
  }

  fn parse_param(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    let declared_storage = if self.stream.take_keyword(Keyword::Uniform).is_some() {
      Some(Storage::Uniform)
    } else if self.stream.take_keyword(Keyword::Varying).is_some() {
      Some(Storage::Varying)
    } else {
      None
    };
    let declared_type = self.parse_type()?;
    let (name, _) = self.expect_identifier()?;

    let mut children = Vec::new();
    if self.stream.take_operator(Operator::Assign).is_some() {
      children.push(self.parse_expression()?);
    }

    // Parameters default to uniform when no explicit qualifier and no
    // varying-forcing default is present; the default's own storage, if
    // varying, promotes the parameter (its value still flows from a varying
    // default expression).
    let storage = declared_storage.unwrap_or(Storage::Uniform);
    let symbol = self.symbols.declare(Symbol {
      name: name.clone(),
      type_and_storage: crate::types::TypeAndStorage::new(declared_type, storage),
      is_parameter: true,
    });

    let mut node = Node::new(NodeKind::Param { name, declared_storage, declared_type }, position, children);
    node.symbol = Some(symbol);
    Ok(node)
  }

  fn parse_block(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.expect_operator(Operator::LeftBrace, "`{`")?;
    self.symbols.push_scope();
    let mut statements = Vec::new();
    while !self.stream.check_operator(Operator::RightBrace) && !self.stream.at_eof() {
      if self.budget_exhausted() {
        break;
      }
      match self.parse_statement() {
        Ok(statement) => statements.push(statement),
        Err(()) => self.recover_to_statement_boundary(),
      }
    }
    self.symbols.pop_scope();
    self.expect_operator(Operator::RightBrace, "`}`")?;
    Ok(Node::new(NodeKind::Block, position, statements))
  }

  fn parse_statement(&mut self) -> ParseResult<Node> {
    let token = self.stream.peek().clone();
    match &token.kind {
      TokenKind::Operator(Operator::LeftBrace) => self.parse_block(),
      TokenKind::Keyword(Keyword::If) => self.parse_if(),
      TokenKind::Keyword(Keyword::While) => self.parse_while(),
      TokenKind::Keyword(Keyword::For) => self.parse_for(),
      TokenKind::Keyword(Keyword::Break) => self.parse_break_or_continue(true),
      TokenKind::Keyword(Keyword::Continue) => self.parse_break_or_continue(false),
      TokenKind::Keyword(Keyword::Return) => self.parse_return(),
      TokenKind::Keyword(Keyword::Illuminate) => self.parse_illuminate(),
      TokenKind::Keyword(Keyword::Solar) => self.parse_solar(),
      TokenKind::Keyword(Keyword::Illuminance) => self.parse_illuminance(),
      TokenKind::Keyword(
        Keyword::Uniform | Keyword::Varying | Keyword::Float | Keyword::Integer | Keyword::Point | Keyword::Vector
        | Keyword::Normal | Keyword::Color | Keyword::Matrix | Keyword::String,
      ) => self.parse_declaration(),
      _ => self.parse_expression_statement(),
    }
  }

  fn parse_declaration(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    let declared_storage = if self.stream.take_keyword(Keyword::Uniform).is_some() {
      Some(Storage::Uniform)
    } else if self.stream.take_keyword(Keyword::Varying).is_some() {
      Some(Storage::Varying)
    } else {
      None
    };
    let declared_type = self.parse_type()?;
    let (name, _) = self.expect_identifier()?;

    let mut children = Vec::new();
    if self.stream.take_operator(Operator::Assign).is_some() {
      children.push(self.parse_expression()?);
    }
    self.expect_operator(Operator::Semicolon, "`;`")?;

    // Local declarations default to varying when no explicit qualifier is given.
    let storage = declared_storage.unwrap_or(Storage::Varying);
    let symbol = self.symbols.declare(Symbol {
      name: name.clone(),
      type_and_storage: crate::types::TypeAndStorage::new(declared_type, storage),
      is_parameter: false,
    });

    let mut node = Node::new(NodeKind::Declaration { name, declared_storage, declared_type }, position, children);
    node.symbol = Some(symbol);
    Ok(node)
  }

  fn parse_if(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let condition = self.parse_expression()?;
    self.expect_operator(Operator::RightParen, "`)`")?;
    let then_branch = self.parse_statement_as_block()?;
    let mut children = vec![condition, then_branch];
    if self.stream.take_keyword(Keyword::Else).is_some() {
      children.push(self.parse_statement_as_block()?);
    }
    Ok(Node::new(NodeKind::If, position, children))
  }

  /// Parses a single statement, wrapping it in a [`NodeKind::Block`] if it is
  /// not already one, so `if`/`while`/`for` bodies are uniform for codegen.
  fn parse_statement_as_block(&mut self) -> ParseResult<Node> {
    if self.stream.check_operator(Operator::LeftBrace) {
      self.parse_block()
    } else {
      let position = self.stream.peek().position;
      let statement = self.parse_statement()?;
      Ok(Node::new(NodeKind::Block, position, vec![statement]))
    }
  }

  fn parse_while(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let condition = self.parse_expression()?;
    self.expect_operator(Operator::RightParen, "`)`")?;
    let body = self.parse_statement_as_block();
    Ok(Node::new(NodeKind::While, position, vec![condition, body?]))
  }

  fn parse_for(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let init = self.parse_expression_statement()?;
    let condition = self.parse_expression()?;
    self.expect_operator(Operator::Semicolon, "`;`")?;
    let step = self.parse_expression()?;
    self.expect_operator(Operator::RightParen, "`)`")?;
    let body = self.parse_statement_as_block();
    Ok(Node::new(NodeKind::For, position, vec![init, condition, step, body?]))
  }

  /// Parses the node only; whether `level` is reachable from here depends on
  /// the enclosing loop nesting, which this parser does not track — see
  /// `codegen`'s loop-descriptor stack.
  fn parse_break_or_continue(&mut self, is_break: bool) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    let level = if let TokenKind::Number(n) = self.stream.peek().kind {
      self.stream.take();
      n as u32
    } else {
      1
    };
    self.expect_operator(Operator::Semicolon, "`;`")?;

    let kind = if is_break { NodeKind::Break { level } } else { NodeKind::Continue { level } };
    Ok(Node::leaf(kind, position))
  }

  fn parse_return(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    let mut children = Vec::new();
    if !self.stream.check_operator(Operator::Semicolon) {
      children.push(self.parse_expression()?);
    }
    self.expect_operator(Operator::Semicolon, "`;`")?;
    Ok(Node::new(NodeKind::Return, position, children))
  }

  fn parse_illuminate(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let mut children = vec![self.parse_expression()?];
    let has_axis_angle = self.stream.take_operator(Operator::Comma).is_some();
    if has_axis_angle {
      children.push(self.parse_expression()?);
      self.expect_operator(Operator::Comma, "`,`")?;
      children.push(self.parse_expression()?);
    }
    self.expect_operator(Operator::RightParen, "`)`")?;
    self.symbols.push_illuminance_scope();
    children.push(self.parse_block()?);
    self.symbols.pop_scope();
    Ok(Node::new(NodeKind::Illuminate { has_axis_angle }, position, children))
  }

  fn parse_solar(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let mut children = Vec::new();
    let has_axis_angle = !self.stream.check_operator(Operator::RightParen);
    if has_axis_angle {
      children.push(self.parse_expression()?);
      self.expect_operator(Operator::Comma, "`,`")?;
      children.push(self.parse_expression()?);
    }
    self.expect_operator(Operator::RightParen, "`)`")?;
    self.symbols.push_illuminance_scope();
    children.push(self.parse_block()?);
    self.symbols.pop_scope();
    Ok(Node::new(NodeKind::Solar { has_axis_angle }, position, children))
  }

  fn parse_illuminance(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    self.stream.take();
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let point = self.parse_expression()?;
    self.expect_operator(Operator::Comma, "`,`")?;
    let axis = self.parse_expression()?;
    self.expect_operator(Operator::Comma, "`,`")?;
    let angle = self.parse_expression()?;
    self.expect_operator(Operator::RightParen, "`)`")?;
    self.symbols.push_illuminance_scope();
    let body = self.parse_block()?;
    self.symbols.pop_scope();
    Ok(Node::new(NodeKind::Illuminance, position, vec![point, axis, angle, body]))
  }

  fn parse_expression_statement(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    if self.stream.take_operator(Operator::Semicolon).is_some() {
      // empty statement, e.g. the trailing `;` after a for-loop init with no assignment
      return Ok(Node::new(NodeKind::Block, position, Vec::new()));
    }
    let expr = self.parse_assignment()?;
    self.expect_operator(Operator::Semicolon, "`;`")?;
    Ok(Node::new(NodeKind::ExprStatement, position, vec![expr]))
  }

  fn parse_assignment(&mut self) -> ParseResult<Node> {
    let target = self.parse_logical_or()?;
    let position = self.stream.peek().position;
    let op = if self.stream.take_operator(Operator::Assign).is_some() {
      AssignOperator::Assign
    } else if self.stream.take_operator(Operator::PlusAssign).is_some() {
      AssignOperator::AddAssign
    } else if self.stream.take_operator(Operator::MinusAssign).is_some() {
      AssignOperator::SubtractAssign
    } else if self.stream.take_operator(Operator::StarAssign).is_some() {
      AssignOperator::MultiplyAssign
    } else if self.stream.take_operator(Operator::SlashAssign).is_some() {
      AssignOperator::DivideAssign
    } else {
      return Ok(target);
    };
    let value = self.parse_assignment()?;
    Ok(Node::new(NodeKind::Assign { op }, position, vec![target, value]))
  }

  fn parse_expression(&mut self) -> ParseResult<Node> {
    self.parse_assignment()
  }

  fn parse_logical_or(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_logical_and()?;
    while self.stream.check_operator(Operator::OrOr) {
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_logical_and()?;
      node = Node::new(NodeKind::Logical { op: LogicalOperator::Or }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_logical_and(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_equality()?;
    while self.stream.check_operator(Operator::AndAnd) {
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_equality()?;
      node = Node::new(NodeKind::Logical { op: LogicalOperator::And }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_equality(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_comparison()?;
    loop {
      let op = if self.stream.check_operator(Operator::Equal) {
        CompareOperator::Equal
      } else if self.stream.check_operator(Operator::NotEqual) {
        CompareOperator::NotEqual
      } else {
        break;
      };
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_comparison()?;
      node = Node::new(NodeKind::Compare { op }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_comparison(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_additive()?;
    loop {
      let op = if self.stream.check_operator(Operator::Less) {
        CompareOperator::Less
      } else if self.stream.check_operator(Operator::LessEqual) {
        CompareOperator::LessEqual
      } else if self.stream.check_operator(Operator::Greater) {
        CompareOperator::Greater
      } else if self.stream.check_operator(Operator::GreaterEqual) {
        CompareOperator::GreaterEqual
      } else {
        break;
      };
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_additive()?;
      node = Node::new(NodeKind::Compare { op }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_additive(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_multiplicative()?;
    loop {
      let op = if self.stream.check_operator(Operator::Plus) {
        BinaryOperator::Add
      } else if self.stream.check_operator(Operator::Minus) {
        BinaryOperator::Subtract
      } else {
        break;
      };
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_multiplicative()?;
      node = Node::new(NodeKind::Binary { op }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_multiplicative(&mut self) -> ParseResult<Node> {
    let mut node = self.parse_unary()?;
    loop {
      let op = if self.stream.check_operator(Operator::Star) {
        BinaryOperator::Multiply
      } else if self.stream.check_operator(Operator::Slash) {
        BinaryOperator::Divide
      } else {
        break;
      };
      let position = self.stream.peek().position;
      self.stream.take();
      let rhs = self.parse_unary()?;
      node = Node::new(NodeKind::Binary { op }, position, vec![node, rhs]);
    }
    Ok(node)
  }

  fn parse_unary(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    if self.stream.take_operator(Operator::Minus).is_some() {
      let operand = self.parse_unary()?;
      return Ok(Node::new(NodeKind::Unary { op: UnaryOperator::Negate }, position, vec![operand]));
    }
    if self.stream.take_operator(Operator::Not).is_some() {
      let operand = self.parse_unary()?;
      return Ok(Node::new(NodeKind::Logical { op: LogicalOperator::Not }, position, vec![operand]));
    }
    self.parse_primary_or_cast()
  }

  /// Disambiguates `type"space" expr` typecasts (e.g. `color"hsv"(1,0,0)`)
  /// from an ordinary primary expression starting with a type keyword used
  /// as a bare conversion (`float(x)`).
  fn parse_primary_or_cast(&mut self) -> ParseResult<Node> {
    let position = self.stream.peek().position;
    let target_type = match &self.stream.peek().kind {
      TokenKind::Keyword(Keyword::Float) => Some(Type::Float),
      TokenKind::Keyword(Keyword::Integer) => Some(Type::Integer),
      TokenKind::Keyword(Keyword::Point) => Some(Type::Point),
      TokenKind::Keyword(Keyword::Vector) => Some(Type::Vector),
      TokenKind::Keyword(Keyword::Normal) => Some(Type::Normal),
      TokenKind::Keyword(Keyword::Color) => Some(Type::Color),
      TokenKind::Keyword(Keyword::Matrix) => Some(Type::Matrix),
      TokenKind::Keyword(Keyword::String) => Some(Type::String),
      _ => None,
    };
    let Some(target_type) = target_type else {
      return self.parse_primary();
    };
    self.stream.take();
    let space = if let TokenKind::StringLiteral(s) = &self.stream.peek().kind {
      let s = s.clone();
      self.stream.take();
      Some(s)
    } else {
      None
    };
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let expr = self.parse_expression()?;
    self.expect_operator(Operator::RightParen, "`)`")?;
    Ok(Node::new(NodeKind::Typecast { target_type, space }, position, vec![expr]))
  }

  fn parse_primary(&mut self) -> ParseResult<Node> {
    let token = self.stream.peek().clone();
    match token.kind {
      TokenKind::Number(n) => {
        self.stream.take();
        Ok(Node::leaf(NodeKind::Literal(Literal::Number(n)), token.position))
      }
      TokenKind::StringLiteral(s) => {
        self.stream.take();
        Ok(Node::leaf(NodeKind::Literal(Literal::String(s)), token.position))
      }
      TokenKind::Operator(Operator::LeftParen) => {
        self.stream.take();
        let expr = self.parse_expression()?;
        self.expect_operator(Operator::RightParen, "`)`")?;
        Ok(expr)
      }
      TokenKind::Identifier(name) => {
        self.stream.take();
        if self.stream.check_operator(Operator::LeftParen) {
          self.parse_call(name, token.position)
        } else {
          let symbol = self.symbols.resolve(&name);
          if symbol.is_none() {
            self.error(token.position, format!("`{name}` is undefined"));
          }
          let mut node = Node::leaf(NodeKind::Identifier { name }, token.position);
          node.symbol = symbol;
          Ok(node)
        }
      }
      _ => {
        self.error(token.position, "expected an expression");
        Err(())
      }
    }
  }

  fn parse_call(&mut self, name: String, position: SourcePosition) -> ParseResult<Node> {
    self.expect_operator(Operator::LeftParen, "`(`")?;
    let mut args = Vec::new();
    if !self.stream.check_operator(Operator::RightParen) {
      loop {
        args.push(self.parse_expression()?);
        if self.stream.take_operator(Operator::Comma).is_none() {
          break;
        }
      }
    }
    self.expect_operator(Operator::RightParen, "`)`")?;
    Ok(Node::new(NodeKind::Call { name }, position, args))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CollectingErrorPolicy;
  use crate::lexer::tokenize;

  fn parse_source(source: &str) -> (Option<Node>, usize) {
    let tokens = tokenize(source).unwrap();
    let mut symbols = SymbolTable::with_predefined_globals();
    let mut policy = CollectingErrorPolicy::new();
    let module = parse(tokens, &mut symbols, &mut policy);
    (module, policy.total_errors())
  }

  #[test]
  fn parses_a_minimal_surface_shader() {
    let (module, errors) = parse_source("surface s() { x = 1; }");
    assert_eq!(errors, 0);
    let module = module.expect("should parse");
    let NodeKind::Shader { kind, name } = &module.children[0].kind else { panic!() };
    assert_eq!(*kind, ShaderKind::Surface);
    assert_eq!(name, "s");
  }

  #[test]
  fn parses_params_with_defaults_and_qualifiers() {
    let (module, errors) = parse_source("surface s(uniform float ka = 1; varying color Cq = color(0,0,0)) {}");
    assert_eq!(errors, 0);
    let shader = &module.unwrap().children[0];
    assert!(matches!(shader.children[0].kind, NodeKind::Param { .. }));
  }

  #[test]
  fn undefined_identifiers_are_reported() {
    let (_, errors) = parse_source("surface s() { x = undefined_name; }");
    assert!(errors > 0);
  }

  #[test]
  fn parses_illuminance_loop() {
    let (module, errors) = parse_source("surface s() { illuminance(P, N, PI) { Ci += Ol*Cl; } }");
    assert_eq!(errors, 0);
    let shader = &module.unwrap().children[0];
    let body = shader.children.last().unwrap();
    assert!(matches!(body.children[0].kind, NodeKind::Illuminance));
  }
}
