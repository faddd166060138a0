//! Opcodes, dispatch codes, and the linear instruction stream they compose into.

use std::fmt;

use crate::types::{Storage, Type};

/// A slot index into a [`crate::vm::VirtualMachine`]'s register/constant pool.
pub type Slot = u32;

/// A jump target: an instruction index within the owning [`Program`].
pub type Label = u32;

/// The opcode half of an instruction. Operand count and meaning are fixed per
/// opcode; see each variant's doc comment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
  /// `dst = lhs OP rhs`, `OP` given by [`ArithmeticOp`] in the immediate.
  Arithmetic(ArithmeticOp),
  /// `dst = lhs CMP rhs` producing an integer 0/1.
  Compare(CompareOp),
  /// `dst = lhs AND/OR rhs`, integer 0/1 operands and result.
  Logical(LogicalOp),
  /// `dst = !src`.
  LogicalNot,
  /// `dst = -src`.
  Negate,
  /// `dst = src`, honouring the active mask.
  Assign,
  /// `dst = src` widening a uniform scalar to every component of a varying aggregate.
  Broadcast,
  /// `dst = Typecast(src)`, same-width reinterpretation (point/vector/normal).
  Convert,
  /// `dst = ctransform(space, src)`.
  Ctransform { space: crate::strings::StringHandle },
  /// `dst = mtransform(matrix, src)`.
  Mtransform,
  /// Calls a builtin function; argument slots and arity are carried by the
  /// instruction's `operands`.
  Call(crate::library::Builtin),
  /// Pushes `condition`, conjoined with the active mask, onto the mask stack.
  /// The frame remembers its parent and the raw condition so `InvertMask` can
  /// recompute the `else` branch instead of flipping already-conjoined bits.
  PushMask,
  /// Replaces the mask on top of the stack with `parent AND NOT(cond)` (the
  /// `else` branch of the `if` that pushed it).
  InvertMask,
  /// Pops the mask stack.
  PopMask,
  /// One iteration of a `while`/`for` loop. Operand 0 is the freshly
  /// re-evaluated condition. Identified by its own instruction address: the
  /// first time the VM reaches a given `LoopEdge` it snapshots the enclosing
  /// mask and pushes a loop frame; every subsequent time it pops the previous
  /// iteration's mask, re-conjoins with the condition (and excludes any lanes
  /// a nested `break`/`continue` retired), and either falls through into the
  /// body or jumps to `exit` once no lane remains active.
  LoopEdge { exit: Label },
  /// One iteration of an `illuminance` loop over the grid's active lights.
  /// Operands are the re-evaluated `(position, axis, angle)` trio. Like
  /// `LoopEdge`, identified by its own address: scans forward from the
  /// current light index for the next light whose reachability mask (by
  /// category) is non-empty, pushes that mask, and falls into the body; jumps
  /// to `exit` once every light has been tried.
  IlluminanceEdge { exit: Label },
  /// Unconditional jump (used for uniform, non-divergent branches).
  Jump(Label),
  /// Jump if the uniform condition slot is zero.
  JumpIfZero(Label),
  /// Retires lanes active under the current mask from the loop `depth` levels
  /// out (1 = innermost) and every loop nested inside it, permanently for the
  /// remainder of that loop's execution; see §4.5.
  Break { depth: u32 },
  /// Retires lanes active under the current mask from the loop `depth` levels
  /// out (1 = innermost) and every loop nested inside it, for the remainder of
  /// the current iteration only.
  Continue { depth: u32 },
  /// Assigns the return slot and jumps to the shader epilogue.
  Return,
  /// Marks the end of the shader body.
  Halt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArithmeticOp {
  Add,
  Subtract,
  Multiply,
  Divide,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompareOp {
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogicalOp {
  And,
  Or,
}

/// Per-operand storage-class-and-width tag, the "`U`/`V` × component count"
/// half of a dispatch code (§4.6). Encodes into 4 bits: bit 3 is the storage
/// class, bits 0-2 the width class.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OperandClass {
  pub storage: Storage,
  pub width: u8,
}

impl OperandClass {
  pub fn of(ty: Type, storage: Storage) -> Self {
    // `constant` operands are materialized as uniform slots by codegen; the
    // dispatch code only ever distinguishes uniform from varying.
    let storage = if storage == Storage::Constant { Storage::Uniform } else { storage };
    Self { storage, width: ty.component_count() as u8 }
  }

  fn code(self) -> u8 {
    let width_bits = match self.width {
      1 => 0,
      2 => 1,
      3 => 2,
      4 => 3,
      16 => 4,
      other => panic!("unsupported component width {other}"),
    };
    let storage_bit = if self.storage == Storage::Varying { 1 } else { 0 };
    (storage_bit << 3) | width_bits
  }
}

impl fmt::Display for OperandClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tag = if self.storage == Storage::Varying { 'V' } else { 'U' };
    write!(f, "{tag}{}", self.width)
  }
}

/// A dispatch code: the operand classes for up to four operands, in order
/// `(result, a, b, c)`. Packs into a `u16` (4 bits per operand) for the bytecode stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DispatchCode {
  pub operands: [Option<OperandClass>; 4],
}

impl DispatchCode {
  pub fn new(operands: &[OperandClass]) -> Self {
    let mut slots = [None; 4];
    for (slot, operand) in slots.iter_mut().zip(operands.iter()) {
      *slot = Some(*operand);
    }
    Self { operands: slots }
  }

  pub fn pack(self) -> u16 {
    let mut packed = 0u16;
    for (i, operand) in self.operands.iter().enumerate() {
      if let Some(operand) = operand {
        packed |= (operand.code() as u16) << (i * 4);
      }
    }
    packed
  }
}

impl fmt::Display for DispatchCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for operand in self.operands.iter().flatten() {
      write!(f, "{operand}")?;
    }
    Ok(())
  }
}

/// A single bytecode instruction.
#[derive(Clone, Debug)]
pub struct Instruction {
  pub opcode: Opcode,
  pub dispatch: DispatchCode,
  /// `[result, operand_a, operand_b, operand_c]`, not all necessarily in use.
  pub slots: [Slot; 4],
}

/// A compiled, linear bytecode program. Immutable once code generation
/// completes; may be shared read-only across many Grid executions.
#[derive(Clone, Debug, Default)]
pub struct Program {
  pub instructions: Vec<Instruction>,
}

impl Program {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, instruction: Instruction) -> Label {
    let label = self.instructions.len() as Label;
    self.instructions.push(instruction);
    label
  }

  pub fn here(&self) -> Label {
    self.instructions.len() as Label
  }

  /// Back-patches a previously emitted jump-shaped instruction at `at` to
  /// target the current end of the program.
  pub fn patch_jump_to_here(&mut self, at: Label) {
    let target = self.here();
    let instruction = &mut self.instructions[at as usize];
    instruction.opcode = match instruction.opcode {
      Opcode::Jump(_) => Opcode::Jump(target),
      Opcode::JumpIfZero(_) => Opcode::JumpIfZero(target),
      Opcode::LoopEdge { .. } => Opcode::LoopEdge { exit: target },
      Opcode::IlluminanceEdge { .. } => Opcode::IlluminanceEdge { exit: target },
      other => panic!("cannot patch a non-jump instruction {other:?}"),
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dispatch_code_packs_u3u3_distinctly_from_v3v3() {
    let uniform = DispatchCode::new(&[OperandClass::of(Type::Color, Storage::Uniform), OperandClass::of(Type::Color, Storage::Uniform)]);
    let varying = DispatchCode::new(&[OperandClass::of(Type::Color, Storage::Varying), OperandClass::of(Type::Color, Storage::Varying)]);
    assert_ne!(uniform.pack(), varying.pack());
  }

  #[test]
  fn dispatch_code_display_matches_spec_notation() {
    let mixed = DispatchCode::new(&[OperandClass::of(Type::Color, Storage::Uniform), OperandClass::of(Type::Color, Storage::Varying)]);
    assert_eq!(mixed.to_string(), "U3V3");
  }

  #[test]
  fn jump_patching_rewrites_the_target_label() {
    let mut program = Program::new();
    let jump = program.push(Instruction {
      opcode: Opcode::Jump(0),
      dispatch: DispatchCode::new(&[]),
      slots: [0; 4],
    });
    program.push(Instruction { opcode: Opcode::Halt, dispatch: DispatchCode::new(&[]), slots: [0; 4] });
    program.patch_jump_to_here(jump);
    assert!(matches!(program.instructions[jump as usize].opcode, Opcode::Jump(2)));
  }
}
