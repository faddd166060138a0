//! Lowers an analyzed syntax tree into a [`crate::bytecode::Program`].
//!
//! Every node's result lives in its own freshly allocated register; there is
//! no common-subexpression elimination. Predefined identifiers (`P`, `Ci`,
//! ...) alias the owning Grid's attribute of the same name; `Ps`/`Cl`/`Ol`
//! resolve differently depending on whether they're read inside a light
//! shader's `illuminate`/`solar` (where they're the attribute being written)
//! or a surface's `illuminance` (where they're the current light's output).

use shading_common::FastHashMap;

use crate::ast::{AssignOperator, BinaryOperator, CompareOperator, LogicalOperator, Node, NodeKind, ShaderKind, UnaryOperator};
use crate::bytecode::{ArithmeticOp, CompareOp, DispatchCode, Instruction, Opcode, Program, Slot};
use crate::error::{ErrorCode, ErrorPolicy, RenderError};
use crate::light::LightCategory;
use crate::shader::{Binding, LiteralValue, RegisterDescriptor, Shader};
use crate::strings::StringPool;
use crate::symbols::{SymbolId, SymbolTable};
use crate::types::{Storage, Type, TypeAndStorage};

/// True grid attributes, bound regardless of context.
const GRID_ATTRIBUTE_NAMES: &[&str] = &["P", "N", "I", "Cs", "Os", "Ci", "Oi", "s", "t", "u", "v"];
/// Names whose binding depends on whether they're being written by a light
/// (`illuminate`/`solar`) or read by a surface (`illuminance`).
const LIGHT_OUTPUT_NAMES: &[&str] = &["Ps", "Cl", "Ol"];

#[derive(Copy, Clone, Eq, PartialEq)]
enum LightingMode {
  /// Inside a light shader's `illuminate`/`solar` body: `Ps`/`Cl`/`Ol` are
  /// attributes this shader writes.
  Emit,
  /// Inside a surface/volume shader's `illuminance` body: `Ps`/`Cl`/`Ol` are
  /// the current light's already-computed output.
  Receive,
}

pub fn generate(shader_node: &Node, symbols: &SymbolTable, policy: &mut dyn ErrorPolicy) -> Option<Shader> {
  let NodeKind::Shader { kind, name } = &shader_node.kind else {
    policy.render_error(RenderError::new(ErrorCode::CodeGenerationError, "expected a shader node at code generation"));
    return None;
  };
  let Some((body, params)) = shader_node.children.split_last() else {
    policy.render_error(RenderError::new(ErrorCode::CodeGenerationError, "shader has no body"));
    return None;
  };

  let mut codegen = Codegen::new(symbols, policy);
  for param in params {
    codegen.emit_stmt(param);
  }
  codegen.emit_stmt(body);
  codegen.program.push(halt());

  if !codegen.ok {
    return None;
  }

  let light_category = (*kind == ShaderKind::Light).then(|| detect_light_category(body));

  Some(Shader {
    kind: *kind,
    name: name.clone(),
    program: codegen.program,
    registers: codegen.registers,
    string_pool: codegen.strings,
    params: codegen.params,
    light_category,
  })
}

fn detect_light_category(body: &Node) -> LightCategory {
  for statement in &body.children {
    match &statement.kind {
      NodeKind::Illuminate { has_axis_angle } => {
        return if *has_axis_angle { LightCategory::IlluminateCone } else { LightCategory::IlluminatePoint };
      }
      NodeKind::Solar { has_axis_angle } => {
        return if *has_axis_angle { LightCategory::SolarCone } else { LightCategory::SolarUnbounded };
      }
      _ => {}
    }
  }
  LightCategory::Ambient
}

fn halt() -> Instruction {
  Instruction { opcode: Opcode::Halt, dispatch: DispatchCode::new(&[]), slots: [0; 4] }
}

fn plain(opcode: Opcode) -> Instruction {
  Instruction { opcode, dispatch: DispatchCode::new(&[]), slots: [0; 4] }
}

fn ts(node: &Node) -> TypeAndStorage {
  node.type_and_storage.unwrap_or(TypeAndStorage::constant(Type::Void))
}

/// One currently-open `while`/`for` loop during code generation, pushed and
/// popped around `emit_while`/`emit_for`'s body so `break`/`continue` levels
/// can be checked against the real nesting depth rather than trusting the
/// parser. `Opcode::Break`/`Opcode::Continue` carry `level` straight through
/// to the VM, which resolves it against its own runtime loop stack, so this
/// descriptor only needs to track depth at generation time.
struct LoopDescriptor {
  level: u32,
}

struct Codegen<'a> {
  symbols: &'a SymbolTable,
  policy: &'a mut dyn ErrorPolicy,
  program: Program,
  registers: Vec<RegisterDescriptor>,
  params: Vec<(String, Slot)>,
  strings: StringPool,
  symbol_slots: FastHashMap<SymbolId, Slot>,
  /// `Ps`/`Cl`/`Ol`/`__axis`/`__angle` slots, cached by name rather than
  /// symbol id since the same physical attribute is reached through a fresh
  /// symbol id in every nested `illuminate`/`illuminance` scope.
  named_slots: FastHashMap<String, Slot>,
  lighting_mode: Option<LightingMode>,
  loop_stack: Vec<LoopDescriptor>,
  ok: bool,
}

impl<'a> Codegen<'a> {
  fn new(symbols: &'a SymbolTable, policy: &'a mut dyn ErrorPolicy) -> Self {
    Self {
      symbols,
      policy,
      program: Program::new(),
      registers: Vec::new(),
      params: Vec::new(),
      strings: StringPool::new(),
      symbol_slots: FastHashMap::default(),
      named_slots: FastHashMap::default(),
      lighting_mode: None,
      loop_stack: Vec::new(),
      ok: true,
    }
  }

  fn alloc_register(&mut self, ty: Type, storage: Storage, binding: Binding, literal: Option<LiteralValue>) -> Slot {
    self.registers.push(RegisterDescriptor { ty, storage, binding, literal });
    (self.registers.len() - 1) as Slot
  }

  fn alloc_local(&mut self, ty: Type, storage: Storage) -> Slot {
    self.alloc_register(ty, storage, Binding::Local, None)
  }

  fn emit(&mut self, opcode: Opcode, operands: &[TypeAndStorage], slots: [Slot; 4]) -> Slot {
    let classes: Vec<_> = operands.iter().map(|ts| crate::bytecode::OperandClass::of(ts.ty, ts.storage)).collect();
    self.program.push(Instruction { opcode, dispatch: DispatchCode::new(&classes), slots });
    slots[0]
  }

  fn named_attribute_slot(&mut self, name: &str, ty: Type, storage: Storage) -> Slot {
    if let Some(&slot) = self.named_slots.get(name) {
      return slot;
    }
    // Outside an `illuminate`/`solar`/`illuminance` body these are ordinary
    // grid attributes, same as `P` or `N`.
    let binding = match self.lighting_mode {
      Some(LightingMode::Emit) | None => Binding::Attribute(name.to_string()),
      Some(LightingMode::Receive) => Binding::CurrentLight(name.to_string()),
    };
    let slot = self.alloc_register(ty, storage, binding, None);
    self.named_slots.insert(name.to_string(), slot);
    slot
  }

  fn slot_for_symbol(&mut self, id: SymbolId) -> Slot {
    if let Some(&slot) = self.symbol_slots.get(&id) {
      return slot;
    }
    let symbol = self.symbols.symbol(id);
    let name = symbol.name.clone();
    let (ty, storage) = (symbol.ty(), symbol.storage());
    let slot = if LIGHT_OUTPUT_NAMES.contains(&name.as_str()) {
      self.named_attribute_slot(&name, ty, storage)
    } else if GRID_ATTRIBUTE_NAMES.contains(&name.as_str()) {
      self.alloc_register(ty, storage, Binding::Attribute(name), None)
    } else if name == "PI" {
      self.alloc_register(ty, storage, Binding::Local, Some(LiteralValue::Number(std::f32::consts::PI)))
    } else {
      self.alloc_register(ty, storage, Binding::Local, None)
    };
    self.symbol_slots.insert(id, slot);
    slot
  }

  fn emit_conversion(&mut self, src: Slot, src_ts: TypeAndStorage, target_ty: Type) -> Slot {
    if src_ts.ty == target_ty {
      return src;
    }
    let dst = self.alloc_local(target_ty, src_ts.storage);
    let dst_ts = TypeAndStorage::new(target_ty, src_ts.storage);
    if src_ts.ty == Type::Float && target_ty.component_count() > 1 {
      self.emit(Opcode::Broadcast, &[dst_ts, src_ts], [dst, src, 0, 0]);
    } else {
      self.emit(Opcode::Convert, &[dst_ts, src_ts], [dst, src, 0, 0]);
    }
    dst
  }

  fn emit_store(&mut self, dst: Slot, dst_ts: TypeAndStorage, src: Slot, src_ts: TypeAndStorage) {
    let converted = self.emit_conversion(src, src_ts, dst_ts.ty);
    let converted_ts = TypeAndStorage::new(dst_ts.ty, src_ts.storage);
    self.emit(Opcode::Assign, &[dst_ts, converted_ts], [dst, converted, 0, 0]);
  }

  fn emit_expr(&mut self, node: &Node) -> Slot {
    match &node.kind {
      NodeKind::Literal(crate::ast::Literal::Number(n)) => {
        let node_ts = ts(node);
        self.alloc_register(node_ts.ty, node_ts.storage, Binding::Local, Some(LiteralValue::Number(*n as f32)))
      }

      NodeKind::Literal(crate::ast::Literal::String(s)) => {
        let node_ts = ts(node);
        let handle = self.strings.intern(s);
        self.alloc_register(node_ts.ty, node_ts.storage, Binding::Local, Some(LiteralValue::String(handle)))
      }

      NodeKind::Identifier { .. } => self.slot_for_symbol(node.symbol.expect("identifier resolved by the parser")),

      NodeKind::Binary { op } => {
        let (a, b) = (self.emit_expr(&node.children[0]), self.emit_expr(&node.children[1]));
        let (a_ts, b_ts) = (ts(&node.children[0]), ts(&node.children[1]));
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        let arith = match op {
          BinaryOperator::Add => ArithmeticOp::Add,
          BinaryOperator::Subtract => ArithmeticOp::Subtract,
          BinaryOperator::Multiply => ArithmeticOp::Multiply,
          BinaryOperator::Divide => ArithmeticOp::Divide,
        };
        self.emit(Opcode::Arithmetic(arith), &[node_ts, a_ts, b_ts], [dst, a, b, 0]);
        dst
      }

      NodeKind::Unary { op: UnaryOperator::Negate } => {
        let a = self.emit_expr(&node.children[0]);
        let a_ts = ts(&node.children[0]);
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        self.emit(Opcode::Negate, &[node_ts, a_ts], [dst, a, 0, 0]);
        dst
      }

      NodeKind::Compare { op } => {
        let (a, b) = (self.emit_expr(&node.children[0]), self.emit_expr(&node.children[1]));
        let (a_ts, b_ts) = (ts(&node.children[0]), ts(&node.children[1]));
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        self.emit(Opcode::Compare(compare_opcode(*op)), &[node_ts, a_ts, b_ts], [dst, a, b, 0]);
        dst
      }

      NodeKind::Logical { op: LogicalOperator::Not } => {
        let a = self.emit_expr(&node.children[0]);
        let a_ts = ts(&node.children[0]);
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        self.emit(Opcode::LogicalNot, &[node_ts, a_ts], [dst, a, 0, 0]);
        dst
      }

      NodeKind::Logical { op } => {
        let (a, b) = (self.emit_expr(&node.children[0]), self.emit_expr(&node.children[1]));
        let (a_ts, b_ts) = (ts(&node.children[0]), ts(&node.children[1]));
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        let logical = match op {
          LogicalOperator::And => crate::bytecode::LogicalOp::And,
          LogicalOperator::Or => crate::bytecode::LogicalOp::Or,
          LogicalOperator::Not => unreachable!("handled above"),
        };
        self.emit(Opcode::Logical(logical), &[node_ts, a_ts, b_ts], [dst, a, b, 0]);
        dst
      }

      NodeKind::Assign { .. } => self.emit_assign(node),

      NodeKind::Typecast { target_type, space } => {
        let operand = &node.children[0];
        let src = self.emit_expr(operand);
        let src_ts = ts(operand);
        match space {
          Some(space_name) => {
            let handle = self.strings.intern(space_name);
            let dst = self.alloc_local(Type::Color, src_ts.storage);
            let dst_ts = TypeAndStorage::new(Type::Color, src_ts.storage);
            self.emit(Opcode::Ctransform { space: handle }, &[dst_ts, src_ts], [dst, src, 0, 0]);
            dst
          }
          None => self.emit_conversion(src, src_ts, *target_type),
        }
      }

      NodeKind::Call { name } => {
        let arg_slots: Vec<Slot> = node.children.iter().map(|c| self.emit_expr(c)).collect();
        let arg_ts: Vec<TypeAndStorage> = node.children.iter().map(ts).collect();
        let node_ts = ts(node);
        let dst = self.alloc_local(node_ts.ty, node_ts.storage);
        let builtin = crate::library::resolve(name).expect("unresolvable calls are rejected by semantic analysis");
        let mut operands = vec![node_ts];
        operands.extend(arg_ts);
        let mut slots = [dst, 0, 0, 0];
        for (slot, arg) in slots.iter_mut().skip(1).zip(arg_slots) {
          *slot = arg;
        }
        self.emit(Opcode::Call(builtin), &operands, slots);
        dst
      }

      other => unreachable!("not an expression: {other:?}"),
    }
  }

  fn emit_assign(&mut self, node: &Node) -> Slot {
    let NodeKind::Assign { op } = &node.kind else { unreachable!() };
    let target_node = &node.children[0];
    let value_node = &node.children[1];
    let target_symbol = target_node.symbol.expect("assignment target resolved by semantic analysis");
    let target_ts = ts(node);
    let target_slot = self.slot_for_symbol(target_symbol);

    let value_slot = self.emit_expr(value_node);
    let value_ts = ts(value_node);

    let (source_slot, source_ts) = if *op == AssignOperator::Assign {
      (value_slot, value_ts)
    } else {
      let arith = match op {
        AssignOperator::AddAssign => ArithmeticOp::Add,
        AssignOperator::SubtractAssign => ArithmeticOp::Subtract,
        AssignOperator::MultiplyAssign => ArithmeticOp::Multiply,
        AssignOperator::DivideAssign => ArithmeticOp::Divide,
        AssignOperator::Assign => unreachable!(),
      };
      let storage = target_ts.storage.lub(value_ts.storage);
      let temp = self.alloc_local(target_ts.ty, storage);
      let temp_ts = TypeAndStorage::new(target_ts.ty, storage);
      self.emit(Opcode::Arithmetic(arith), &[temp_ts, target_ts, value_ts], [temp, target_slot, value_slot, 0]);
      (temp, temp_ts)
    };
    self.emit_store(target_slot, target_ts, source_slot, source_ts);
    target_slot
  }

  fn emit_block(&mut self, node: &Node) {
    for statement in &node.children {
      self.emit_stmt(statement);
    }
  }

  fn emit_stmt(&mut self, node: &Node) {
    match &node.kind {
      NodeKind::Block => self.emit_block(node),

      NodeKind::ExprStatement => {
        self.emit_expr(&node.children[0]);
      }

      NodeKind::Declaration { .. } => {
        let slot = self.slot_for_symbol(node.symbol.expect("declaration always declares a symbol"));
        if let Some(initializer) = node.children.first() {
          let value = self.emit_expr(initializer);
          self.emit_store(slot, ts(node), value, ts(initializer));
        }
      }

      NodeKind::Param { name, .. } => {
        let slot = self.slot_for_symbol(node.symbol.expect("param always declares a symbol"));
        self.params.push((name.clone(), slot));
        if let Some(initializer) = node.children.first() {
          let value = self.emit_expr(initializer);
          self.emit_store(slot, ts(node), value, ts(initializer));
        }
      }

      NodeKind::If => self.emit_if(node),
      NodeKind::While => self.emit_while(node),
      NodeKind::For => self.emit_for(node),

      NodeKind::Break { level } => self.emit_break_or_continue(node, *level, true),
      NodeKind::Continue { level } => self.emit_break_or_continue(node, *level, false),

      NodeKind::Return => {
        if let Some(value) = node.children.first() {
          self.emit_expr(value);
        }
        self.program.push(plain(Opcode::Return));
      }

      NodeKind::Illuminate { .. } | NodeKind::Solar { .. } => self.emit_illuminate_or_solar(node),
      NodeKind::Illuminance => self.emit_illuminance(node),

      other => unreachable!("not a statement: {other:?}"),
    }
  }

  fn emit_if(&mut self, node: &Node) {
    let condition = &node.children[0];
    let then_branch = &node.children[1];
    let else_branch = node.children.get(2);

    let cond_slot = self.emit_expr(condition);
    let cond_ts = ts(condition);

    if cond_ts.storage == Storage::Varying {
      self.emit(Opcode::PushMask, &[cond_ts], [cond_slot, 0, 0, 0]);
      self.emit_stmt(then_branch);
      if let Some(else_branch) = else_branch {
        self.program.push(plain(Opcode::InvertMask));
        self.emit_stmt(else_branch);
      }
      self.program.push(plain(Opcode::PopMask));
    } else {
      let skip_then = self.program.push(Instruction {
        opcode: Opcode::JumpIfZero(0),
        dispatch: DispatchCode::new(&[crate::bytecode::OperandClass::of(cond_ts.ty, cond_ts.storage)]),
        slots: [cond_slot, 0, 0, 0],
      });
      self.emit_stmt(then_branch);
      if let Some(else_branch) = else_branch {
        let skip_else = self.program.push(plain(Opcode::Jump(0)));
        self.program.patch_jump_to_here(skip_then);
        self.emit_stmt(else_branch);
        self.program.patch_jump_to_here(skip_else);
      } else {
        self.program.patch_jump_to_here(skip_then);
      }
    }
  }

  fn emit_while(&mut self, node: &Node) {
    let condition = &node.children[0];
    let body = &node.children[1];
    let loop_start = self.program.here();
    let cond_slot = self.emit_expr(condition);
    let cond_ts = ts(condition);
    let edge = self.program.push(Instruction {
      opcode: Opcode::LoopEdge { exit: 0 },
      dispatch: DispatchCode::new(&[crate::bytecode::OperandClass::of(cond_ts.ty, cond_ts.storage)]),
      slots: [cond_slot, 0, 0, 0],
    });
    self.loop_stack.push(LoopDescriptor { level: self.loop_stack.len() as u32 + 1 });
    self.emit_stmt(body);
    self.loop_stack.pop();
    self.program.push(plain(Opcode::Jump(loop_start)));
    self.program.patch_jump_to_here(edge);
  }

  fn emit_for(&mut self, node: &Node) {
    let init = &node.children[0];
    let condition = &node.children[1];
    let step = &node.children[2];
    let body = &node.children[3];

    self.emit_stmt(init);
    let loop_start = self.program.here();
    let cond_slot = self.emit_expr(condition);
    let cond_ts = ts(condition);
    let edge = self.program.push(Instruction {
      opcode: Opcode::LoopEdge { exit: 0 },
      dispatch: DispatchCode::new(&[crate::bytecode::OperandClass::of(cond_ts.ty, cond_ts.storage)]),
      slots: [cond_slot, 0, 0, 0],
    });
    self.loop_stack.push(LoopDescriptor { level: self.loop_stack.len() as u32 + 1 });
    self.emit_stmt(body);
    self.loop_stack.pop();
    self.emit_expr(step);
    self.program.push(plain(Opcode::Jump(loop_start)));
    self.program.patch_jump_to_here(edge);
  }

  /// Checks `level` against the current loop-nesting depth before emitting
  /// `Opcode::Break`/`Opcode::Continue`, per the code generator's
  /// loop-descriptor stack: an out-of-range level (or no enclosing loop at
  /// all) is a [`ErrorCode::CodeGenerationError`], not a bytecode emission.
  fn emit_break_or_continue(&mut self, node: &Node, level: u32, is_break: bool) {
    let depth = self.loop_stack.len() as u32;
    if level == 0 || level > depth {
      let what = if is_break { "Break" } else { "Continue" };
      let message = if depth == 0 { format!("{what} outside of a loop") } else { format!("{what} to a level outside of a loop") };
      self.ok = false;
      self.policy.render_error(RenderError::at(ErrorCode::CodeGenerationError, node.position, message));
      return;
    }
    let opcode = if is_break { Opcode::Break { depth: level } } else { Opcode::Continue { depth: level } };
    self.program.push(plain(opcode));
  }

  fn emit_illuminate_or_solar(&mut self, node: &Node) {
    let previous_mode = self.lighting_mode.replace(LightingMode::Emit);

    let (position, axis_angle, body) = match &node.kind {
      NodeKind::Illuminate { has_axis_angle } => {
        let axis_angle = has_axis_angle.then(|| (&node.children[1], &node.children[2]));
        (Some(&node.children[0]), axis_angle, node.children.last().unwrap())
      }
      NodeKind::Solar { has_axis_angle } => {
        let axis_angle = has_axis_angle.then(|| (&node.children[0], &node.children[1]));
        (None, axis_angle, node.children.last().unwrap())
      }
      _ => unreachable!(),
    };

    if let Some(position) = position {
      let value = self.emit_expr(position);
      let ps = self.named_attribute_slot("Ps", Type::Point, Storage::Varying);
      self.emit_store(ps, TypeAndStorage::new(Type::Point, Storage::Varying), value, ts(position));
    }

    let axis_slot = self.named_attribute_slot("__axis", Type::Vector, Storage::Uniform);
    let angle_slot = self.named_attribute_slot("__angle", Type::Float, Storage::Uniform);
    match axis_angle {
      Some((axis, angle)) => {
        let axis_value = self.emit_expr(axis);
        self.emit_store(axis_slot, TypeAndStorage::new(Type::Vector, Storage::Uniform), axis_value, ts(axis));
        let angle_value = self.emit_expr(angle);
        self.emit_store(angle_slot, TypeAndStorage::new(Type::Float, Storage::Uniform), angle_value, ts(angle));
      }
      None => {
        // Unbounded: any direction passes, encoded as an angle past the
        // illuminance kernels' `>= TAU` short-circuit.
        self.registers[angle_slot as usize].literal = Some(LiteralValue::Number(f32::MAX));
      }
    }

    self.emit_stmt(body);
    self.lighting_mode = previous_mode;
  }

  fn emit_illuminance(&mut self, node: &Node) {
    let previous_mode = self.lighting_mode.replace(LightingMode::Receive);

    let point = &node.children[0];
    let axis = &node.children[1];
    let angle = &node.children[2];
    let body = &node.children[3];

    let loop_start = self.program.here();
    let point_slot = self.emit_expr(point);
    let axis_slot = self.emit_expr(axis);
    let angle_slot = self.emit_expr(angle);
    let operands = [ts(point), ts(axis), ts(angle)];
    let edge = self.program.push(Instruction {
      opcode: Opcode::IlluminanceEdge { exit: 0 },
      dispatch: DispatchCode::new(&operands.map(|ts| crate::bytecode::OperandClass::of(ts.ty, ts.storage))),
      slots: [point_slot, axis_slot, angle_slot, 0],
    });
    self.emit_stmt(body);
    self.program.push(plain(Opcode::Jump(loop_start)));
    self.program.patch_jump_to_here(edge);

    self.lighting_mode = previous_mode;
  }
}

fn compare_opcode(op: CompareOperator) -> CompareOp {
  match op {
    CompareOperator::Equal => CompareOp::Equal,
    CompareOperator::NotEqual => CompareOp::NotEqual,
    CompareOperator::Less => CompareOp::Less,
    CompareOperator::LessEqual => CompareOp::LessEqual,
    CompareOperator::Greater => CompareOp::Greater,
    CompareOperator::GreaterEqual => CompareOp::GreaterEqual,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CollectingErrorPolicy;
  use crate::lexer::tokenize;
  use crate::parser::parse;

  fn compile_body(source: &str) -> Shader {
    let tokens = tokenize(source).unwrap();
    let mut symbols = SymbolTable::with_predefined_globals();
    let mut policy = CollectingErrorPolicy::new();
    let mut module = parse(tokens, &mut symbols, &mut policy).expect("should parse");
    assert!(crate::semantic::analyze(&mut module, &symbols, &mut policy), "should analyze");
    generate(&module.children[0], &symbols, &mut policy).expect("should generate")
  }

  #[test]
  fn a_simple_assignment_emits_an_assign_instruction() {
    let shader = compile_body("surface s() { Ci = 1; }");
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::Assign)));
  }

  #[test]
  fn float_to_color_assignment_emits_a_broadcast() {
    let shader = compile_body("surface s() { Ci = 1; }");
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::Broadcast)));
  }

  #[test]
  fn a_varying_if_emits_mask_instructions() {
    let shader = compile_body("surface s() { float f; if (f > 0) { Ci = 1; } else { Ci = 0; } }");
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::PushMask)));
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::InvertMask)));
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::PopMask)));
  }

  #[test]
  fn a_for_loop_emits_a_loop_edge() {
    let shader = compile_body("surface s() { uniform float i; for (i = 0; i < 4; i += 1) { Ci = 1; } }");
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::LoopEdge { .. })));
  }

  #[test]
  fn ends_with_halt() {
    let shader = compile_body("surface s() { Ci = 1; }");
    assert!(matches!(shader.program.instructions.last().unwrap().opcode, Opcode::Halt));
  }

  fn generate_diagnostics(source: &str) -> Vec<RenderError> {
    let tokens = tokenize(source).unwrap();
    let mut symbols = SymbolTable::with_predefined_globals();
    let mut policy = CollectingErrorPolicy::new();
    let mut module = parse(tokens, &mut symbols, &mut policy).expect("should parse");
    assert!(crate::semantic::analyze(&mut module, &symbols, &mut policy), "should analyze");
    assert!(generate(&module.children[0], &symbols, &mut policy).is_none(), "should fail to generate");
    policy.diagnostics().to_vec()
  }

  #[test]
  fn break_outside_a_loop_reports_code_generation_error() {
    let diagnostics = generate_diagnostics("surface s() { break; }");
    assert!(diagnostics.iter().any(|d| d.code == ErrorCode::CodeGenerationError && d.message == "Break outside of a loop"));
  }

  #[test]
  fn break_at_a_level_outside_the_loop_nest_reports_code_generation_error() {
    let diagnostics = generate_diagnostics("surface s() { while (1) { break 2; } }");
    assert!(diagnostics
      .iter()
      .any(|d| d.code == ErrorCode::CodeGenerationError && d.message == "Break to a level outside of a loop"));
  }

  #[test]
  fn a_break_within_the_loop_nest_generates_cleanly() {
    let shader = compile_body("surface s() { while (1) { break; } }");
    assert!(shader.program.instructions.iter().any(|i| matches!(i.opcode, Opcode::Break { depth: 1 })));
  }
}
