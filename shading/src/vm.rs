//! The bytecode interpreter: walks a compiled [`Shader`]'s [`crate::bytecode::Program`]
//! over a [`Grid`], lane-parallel, honouring the mask stack that divergent
//! `if`/loop/`illuminance` control flow pushes.
//!
//! Every register holds a full [`Value`] (so a "lane" is just an index into
//! its backing buffer); arithmetic kernels read broadcast-or-indexed copies
//! out of operand registers and write back into the destination register,
//! masked by the active [`MaskFrame`] when the destination is varying.

use glam::{Mat4, Vec3};

use crate::bytecode::{ArithmeticOp, CompareOp, Instruction, LogicalOp, Opcode};
use crate::error::{ErrorPolicy, RenderError};
use crate::grid::Grid;
use crate::kernels;
use crate::library::Builtin;
use crate::light::{Light, LightCategory};
use crate::shader::{Binding, LiteralValue, Shader};
use crate::strings::StringHandle;
use crate::types::Storage;
use crate::value::{Buffer, Value};

type Mask = Vec<bool>;

/// A pushed `if`/`illuminance`-body mask: `active = parent AND cond`, kept
/// alongside its inputs so `InvertMask` can recompute the `else` branch as
/// `parent AND NOT(cond)` instead of flipping already-conjoined bits.
struct MaskFrame {
  parent: Mask,
  cond: Mask,
  active: Mask,
}

/// One currently-open `while`/`for` loop.
struct LoopFrame {
  edge_pc: usize,
  parent_mask: Mask,
  /// Lanes a nested `break`/`continue` has permanently retired from this loop.
  excluded: Mask,
}

/// One currently-open `illuminance` loop.
struct IlluminanceFrame {
  edge_pc: usize,
  parent_mask: Mask,
  excluded: Mask,
  light_index: usize,
}

/// Executes `shader` over `grid`. Temporarily takes `grid`'s lights so the
/// borrow checker doesn't need the VM to hold `&grid` and `&mut grid` at once
/// (a light's Grid is read-only for the duration of the surface's `shade`).
pub fn shade(shader: &Shader, grid: &mut Grid, policy: &mut dyn ErrorPolicy) -> Result<(), RenderError> {
  let lights = std::mem::take(grid.lights_mut());
  let result = run(shader, grid, &lights, policy);
  *grid.lights_mut() = lights;
  result
}

fn run(shader: &Shader, grid: &mut Grid, lights: &[Light], policy: &mut dyn ErrorPolicy) -> Result<(), RenderError> {
  let mut vm = VirtualMachine::new(shader, grid);
  vm.execute(lights, policy)?;
  vm.writeback(grid);
  Ok(())
}

fn fill_literal(value: &mut Value, literal: &LiteralValue) {
  match literal {
    LiteralValue::Number(n) => match value.buffer_mut() {
      Buffer::Scalar(_) => value.as_scalars_mut().fill(*n),
      Buffer::Triple(_) => value.as_triples_mut().fill(Vec3::splat(*n)),
      Buffer::Matrix(_) => value.as_matrices_mut().fill(Mat4::IDENTITY * *n),
      Buffer::StringHandle(_) => {}
    },
    LiteralValue::String(handle) => {
      if let Buffer::StringHandle(_) = value.buffer() {
        value.as_string_handles_mut().fill(handle.index());
      }
    }
  }
}

struct VirtualMachine<'a> {
  shader: &'a Shader,
  registers: Vec<Value>,
  point_count: usize,
  mask_stack: Vec<MaskFrame>,
  loop_stack: Vec<LoopFrame>,
  illuminance_stack: Vec<IlluminanceFrame>,
}

impl<'a> VirtualMachine<'a> {
  fn new(shader: &'a Shader, grid: &mut Grid) -> Self {
    let point_count = grid.point_count();
    let registers = shader
      .registers
      .iter()
      .map(|desc| match &desc.binding {
        Binding::Attribute(name) => {
          grid.add_value(name, desc.ty, desc.storage);
          grid.take_value(name).expect("just ensured the attribute exists")
        }
        Binding::CurrentLight(_) | Binding::Local => {
          let mut value = Value::new(desc.ty, desc.storage, grid.width(), grid.height());
          if let Some(literal) = &desc.literal {
            fill_literal(&mut value, literal);
          }
          value
        }
      })
      .collect();
    Self { shader, registers, point_count, mask_stack: Vec::new(), loop_stack: Vec::new(), illuminance_stack: Vec::new() }
  }

  fn writeback(self, grid: &mut Grid) {
    for (desc, value) in self.shader.registers.iter().zip(self.registers) {
      if let Binding::Attribute(name) = &desc.binding {
        grid.put_value(name, value);
      }
    }
  }

  fn execute(&mut self, lights: &[Light], policy: &mut dyn ErrorPolicy) -> Result<(), RenderError> {
    let mut pc = 0usize;
    while pc < self.shader.program.instructions.len() {
      let instruction = self.shader.program.instructions[pc].clone();
      match self.step(pc, &instruction, lights, policy)? {
        Some(next) => pc = next,
        None => break,
      }
    }
    Ok(())
  }

  fn step(&mut self, pc: usize, instr: &Instruction, lights: &[Light], policy: &mut dyn ErrorPolicy) -> Result<Option<usize>, RenderError> {
    match &instr.opcode {
      Opcode::Halt | Opcode::Return => return Ok(None),
      Opcode::Arithmetic(op) => self.exec_arithmetic(*op, instr),
      Opcode::Compare(op) => self.exec_compare(*op, instr),
      Opcode::Logical(op) => self.exec_logical(*op, instr),
      Opcode::LogicalNot => self.exec_logical_not(instr),
      Opcode::Negate => self.exec_negate(instr),
      Opcode::Assign => self.exec_assign(instr),
      Opcode::Broadcast => self.exec_broadcast(instr),
      Opcode::Convert => self.exec_convert(instr),
      Opcode::Ctransform { space } => self.exec_ctransform(*space, instr, policy),
      Opcode::Mtransform => self.exec_mtransform(instr),
      Opcode::Call(builtin) => self.exec_call(*builtin, instr, lights),
      Opcode::PushMask => self.exec_push_mask(instr),
      Opcode::InvertMask => self.exec_invert_mask(),
      Opcode::PopMask => {
        self.mask_stack.pop();
      }
      Opcode::LoopEdge { exit } => return Ok(Some(self.exec_loop_edge(pc, *exit, instr))),
      Opcode::IlluminanceEdge { exit } => return Ok(Some(self.exec_illuminance_edge(pc, *exit, instr, lights))),
      Opcode::Jump(target) => return Ok(Some(*target as usize)),
      Opcode::JumpIfZero(target) => {
        let cond = self.registers[instr.slots[0] as usize].as_scalars()[0];
        return Ok(Some(if cond == 0.0 { *target as usize } else { pc + 1 }));
      }
      Opcode::Break { depth } => self.exec_break(*depth),
      Opcode::Continue { depth } => self.exec_continue(*depth),
    }
    Ok(Some(pc + 1))
  }

  // -- mask/lane bookkeeping --------------------------------------------

  fn current_active(&self) -> Mask {
    self.mask_stack.last().map(|f| f.active.clone()).unwrap_or_else(|| vec![true; self.point_count])
  }

  fn retire_in_all_frames(&mut self, lanes: &[bool]) {
    for frame in &mut self.mask_stack {
      for (active, &retire) in frame.active.iter_mut().zip(lanes) {
        if retire {
          *active = false;
        }
      }
    }
  }

  fn exclude_from_loops(&mut self, lanes: &[bool], depth: u32, include_target: bool) {
    let depth = depth.max(1) as usize;
    let loop_len = self.loop_stack.len();
    for level in 0..depth {
      if level == depth - 1 && !include_target {
        break;
      }
      if level >= loop_len {
        break;
      }
      let frame = &mut self.loop_stack[loop_len - 1 - level];
      for (excluded, &retire) in frame.excluded.iter_mut().zip(lanes) {
        if retire {
          *excluded = true;
        }
      }
    }
  }

  fn exec_break(&mut self, depth: u32) {
    let active = self.current_active();
    self.retire_in_all_frames(&active);
    self.exclude_from_loops(&active, depth, true);
  }

  fn exec_continue(&mut self, depth: u32) {
    let active = self.current_active();
    self.retire_in_all_frames(&active);
    self.exclude_from_loops(&active, depth, false);
  }

  fn exec_push_mask(&mut self, instr: &Instruction) {
    let parent = self.current_active();
    let cond = self.read_scalars_broadcast(instr.slots[0], self.point_count);
    let cond: Mask = cond.iter().map(|&v| v != 0.0).collect();
    let active: Mask = parent.iter().zip(&cond).map(|(&p, &c)| p && c).collect();
    self.mask_stack.push(MaskFrame { parent, cond, active });
  }

  fn exec_invert_mask(&mut self) {
    let frame = self.mask_stack.last_mut().expect("InvertMask without a pushed mask");
    frame.active = frame.parent.iter().zip(&frame.cond).map(|(&p, &c)| p && !c).collect();
  }

  fn exec_loop_edge(&mut self, pc: usize, exit: u32, instr: &Instruction) -> usize {
    let is_new = self.loop_stack.last().map(|f| f.edge_pc) != Some(pc);
    if is_new {
      let parent_mask = self.current_active();
      self.loop_stack.push(LoopFrame { edge_pc: pc, parent_mask, excluded: vec![false; self.point_count] });
    } else {
      self.mask_stack.pop();
    }
    let frame = self.loop_stack.last().unwrap();
    let cond = self.read_scalars_broadcast(instr.slots[0], self.point_count);
    let active: Mask = (0..self.point_count).map(|i| frame.parent_mask[i] && !frame.excluded[i] && cond[i] != 0.0).collect();
    if active.iter().any(|&a| a) {
      let parent = frame.parent_mask.clone();
      self.mask_stack.push(MaskFrame { parent, cond: active.clone(), active });
      pc + 1
    } else {
      self.loop_stack.pop();
      exit as usize
    }
  }

  fn exec_illuminance_edge(&mut self, pc: usize, exit: u32, instr: &Instruction, lights: &[Light]) -> usize {
    let is_new = self.illuminance_stack.last().map(|f| f.edge_pc) != Some(pc);
    let start_index = if is_new {
      let parent_mask = self.current_active();
      self.illuminance_stack.push(IlluminanceFrame { edge_pc: pc, parent_mask, excluded: vec![false; self.point_count], light_index: 0 });
      0
    } else {
      self.mask_stack.pop();
      let frame = self.illuminance_stack.last_mut().unwrap();
      frame.light_index += 1;
      frame.light_index
    };

    let point = self.read_triples_broadcast(instr.slots[0], self.point_count);
    let surface_axis = self.read_triples_broadcast(instr.slots[1], self.point_count);
    let surface_angle = self.read_scalars_broadcast(instr.slots[2], self.point_count);

    for index in start_index..lights.len() {
      let light = &lights[index];
      if light.category == LightCategory::Ambient {
        continue;
      }
      let Some(shape_mask) = self.light_shape_mask(light) else { continue };
      let surface_mask = self.light_surface_mask(light, &point, &surface_axis, &surface_angle);

      let frame = self.illuminance_stack.last().unwrap();
      let combined: Mask = (0..self.point_count)
        .map(|i| frame.parent_mask[i] && !frame.excluded[i] && shape_mask[i] && surface_mask[i])
        .collect();
      if combined.iter().any(|&c| c) {
        let parent = frame.parent_mask.clone();
        self.illuminance_stack.last_mut().unwrap().light_index = index;
        self.populate_current_light_registers(light);
        self.mask_stack.push(MaskFrame { parent, cond: combined.clone(), active: combined });
        return pc + 1;
      }
    }
    self.illuminance_stack.pop();
    exit as usize
  }

  /// The light's own declared reachability (its `illuminate`/`solar` cone, or
  /// unconditional for `Ambient`/unbounded categories), broadcast from the
  /// light's Grid (which may be a single uniform sample) into the surface's
  /// lane count.
  fn light_shape_mask(&self, light: &Light) -> Option<Mask> {
    let axis = broadcast_attribute_triples(&light.grid, "__axis", self.point_count)?;
    let angle = broadcast_attribute_scalars(&light.grid, "__angle", self.point_count)?;
    let mut mask = vec![0.0f32; self.point_count];
    match light.category {
      LightCategory::IlluminatePoint | LightCategory::IlluminateCone => {
        let light_position = broadcast_attribute_triples(&light.grid, "Ps", self.point_count)?;
        let position = broadcast_attribute_triples(&light.grid, "Ps", self.point_count)?;
        kernels::illuminance_illuminate(&mut mask, &light_position, &position, &axis, &angle, self.point_count);
      }
      LightCategory::SolarUnbounded | LightCategory::SolarCone => {
        kernels::illuminance_solar(&mut mask, &axis, &axis, &angle, self.point_count);
      }
      LightCategory::Ambient => return None,
    }
    Some(mask.iter().map(|&v| v != 0.0).collect())
  }

  /// The surface-chosen `illuminance(P, Axis, Angle)` hemisphere/cone filter,
  /// tested against the direction from each surface point to the light.
  fn light_surface_mask(&self, light: &Light, point: &[Vec3], axis: &[Vec3], angle: &[f32]) -> Mask {
    let mut mask = vec![0.0f32; self.point_count];
    match light.category {
      LightCategory::IlluminatePoint | LightCategory::IlluminateCone => {
        let light_position =
          broadcast_attribute_triples(&light.grid, "Ps", self.point_count).unwrap_or_else(|| vec![Vec3::ZERO; self.point_count]);
        kernels::illuminance_illuminate(&mut mask, &light_position, point, axis, angle, self.point_count);
      }
      LightCategory::SolarUnbounded | LightCategory::SolarCone => {
        let light_direction =
          broadcast_attribute_triples(&light.grid, "__axis", self.point_count).unwrap_or_else(|| vec![Vec3::Z; self.point_count]);
        kernels::illuminance_solar(&mut mask, &light_direction, axis, angle, self.point_count);
      }
      LightCategory::Ambient => return vec![true; self.point_count],
    }
    mask.iter().map(|&v| v != 0.0).collect()
  }

  fn populate_current_light_registers(&mut self, light: &Light) {
    let point_count = self.point_count;
    for index in 0..self.registers.len() {
      let Binding::CurrentLight(name) = &self.shader.registers[index].binding else { continue };
      let name = name.clone();
      match self.registers[index].buffer() {
        Buffer::Scalar(_) => {
          if let Some(data) = broadcast_attribute_scalars(&light.grid, &name, point_count) {
            self.registers[index].as_scalars_mut().copy_from_slice(&data);
          }
        }
        Buffer::Triple(_) => {
          if let Some(data) = broadcast_attribute_triples(&light.grid, &name, point_count) {
            self.registers[index].as_triples_mut().copy_from_slice(&data);
          }
        }
        _ => {}
      }
    }
  }

  fn attribute_slot(&self, name: &str) -> Option<u32> {
    self.shader.registers.iter().position(|desc| matches!(&desc.binding, Binding::Attribute(n) if n == name)).map(|i| i as u32)
  }

  // -- read/write helpers -------------------------------------------------

  fn read_scalars_broadcast(&self, slot: u32, len: usize) -> Vec<f32> {
    let src = self.registers[slot as usize].as_scalars();
    (0..len).map(|i| src[i % src.len().max(1)]).collect()
  }

  fn read_triples_broadcast(&self, slot: u32, len: usize) -> Vec<Vec3> {
    let src = self.registers[slot as usize].as_triples();
    (0..len).map(|i| src[i % src.len().max(1)]).collect()
  }

  fn read_matrices_broadcast(&self, slot: u32, len: usize) -> Vec<Mat4> {
    let src = self.registers[slot as usize].as_matrices();
    (0..len).map(|i| src[i % src.len().max(1)]).collect()
  }

  fn write_scalars(&mut self, dst_slot: u32, computed: &[f32]) {
    let storage = self.registers[dst_slot as usize].storage();
    let dst = self.registers[dst_slot as usize].as_scalars_mut();
    match (storage, self.mask_stack.last()) {
      (Storage::Varying, Some(frame)) => {
        for i in 0..dst.len() {
          if frame.active[i] {
            dst[i] = computed[i];
          }
        }
      }
      // A uniform/constant register has no per-lane identity to mask against;
      // the frame's active set is expected non-divergent here, so a single
      // "is this branch/iteration still live at all" check stands in.
      (_, Some(frame)) if !frame.active.iter().any(|&a| a) => {}
      _ => dst.copy_from_slice(computed),
    }
  }

  fn write_triples(&mut self, dst_slot: u32, computed: &[Vec3]) {
    let storage = self.registers[dst_slot as usize].storage();
    let dst = self.registers[dst_slot as usize].as_triples_mut();
    match (storage, self.mask_stack.last()) {
      (Storage::Varying, Some(frame)) => {
        for i in 0..dst.len() {
          if frame.active[i] {
            dst[i] = computed[i];
          }
        }
      }
      (_, Some(frame)) if !frame.active.iter().any(|&a| a) => {}
      _ => dst.copy_from_slice(computed),
    }
  }

  fn write_matrices(&mut self, dst_slot: u32, computed: &[Mat4]) {
    let storage = self.registers[dst_slot as usize].storage();
    let dst = self.registers[dst_slot as usize].as_matrices_mut();
    match (storage, self.mask_stack.last()) {
      (Storage::Varying, Some(frame)) => {
        for i in 0..dst.len() {
          if frame.active[i] {
            dst[i] = computed[i];
          }
        }
      }
      (_, Some(frame)) if !frame.active.iter().any(|&a| a) => {}
      _ => dst.copy_from_slice(computed),
    }
  }

  // -- opcode bodies -------------------------------------------------------

  fn exec_arithmetic(&mut self, op: ArithmeticOp, instr: &Instruction) {
    let (dst_slot, a_slot, b_slot) = (instr.slots[0], instr.slots[1], instr.slots[2]);
    let len = self.registers[dst_slot as usize].len();
    match self.registers[dst_slot as usize].buffer() {
      Buffer::Scalar(_) => {
        let a = self.read_scalars_broadcast(a_slot, len);
        let b = self.read_scalars_broadcast(b_slot, len);
        let mut dst = vec![0.0; len];
        kernels::arithmetic_scalar(op, &mut dst, &a, &b, len);
        self.write_scalars(dst_slot, &dst);
      }
      Buffer::Triple(_) => {
        let a = self.read_triples_broadcast(a_slot, len);
        let mut dst = vec![Vec3::ZERO; len];
        if matches!(self.registers[b_slot as usize].buffer(), Buffer::Scalar(_)) {
          let b = self.read_scalars_broadcast(b_slot, len);
          kernels::arithmetic_triple_scalar(op, &mut dst, &a, &b, len);
        } else {
          let b = self.read_triples_broadcast(b_slot, len);
          kernels::arithmetic_triple(op, &mut dst, &a, &b, len);
        }
        self.write_triples(dst_slot, &dst);
      }
      _ => unreachable!("arithmetic is only defined for scalar and triple types"),
    }
  }

  fn exec_compare(&mut self, op: CompareOp, instr: &Instruction) {
    let (dst_slot, a_slot, b_slot) = (instr.slots[0], instr.slots[1], instr.slots[2]);
    let len = self.registers[dst_slot as usize].len();
    let (a, b) = match self.registers[a_slot as usize].buffer() {
      Buffer::Triple(_) => {
        let a = self.read_triples_broadcast(a_slot, len);
        let b = self.read_triples_broadcast(b_slot, len);
        (a.iter().map(|v| v.length()).collect::<Vec<_>>(), b.iter().map(|v| v.length()).collect::<Vec<_>>())
      }
      _ => (self.read_scalars_broadcast(a_slot, len), self.read_scalars_broadcast(b_slot, len)),
    };
    let mut dst = vec![0.0; len];
    kernels::compare_scalar(op, &mut dst, &a, &b, len);
    self.write_scalars(dst_slot, &dst);
  }

  fn exec_logical(&mut self, op: LogicalOp, instr: &Instruction) {
    let (dst_slot, a_slot, b_slot) = (instr.slots[0], instr.slots[1], instr.slots[2]);
    let len = self.registers[dst_slot as usize].len();
    let a = self.read_scalars_broadcast(a_slot, len);
    let b = self.read_scalars_broadcast(b_slot, len);
    let mut dst = vec![0.0; len];
    kernels::logical(op, &mut dst, &a, &b, len);
    self.write_scalars(dst_slot, &dst);
  }

  fn exec_logical_not(&mut self, instr: &Instruction) {
    let (dst_slot, a_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    let a = self.read_scalars_broadcast(a_slot, len);
    let mut dst = vec![0.0; len];
    kernels::logical_not(&mut dst, &a, len);
    self.write_scalars(dst_slot, &dst);
  }

  fn exec_negate(&mut self, instr: &Instruction) {
    let (dst_slot, a_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    match self.registers[dst_slot as usize].buffer() {
      Buffer::Scalar(_) => {
        let a = self.read_scalars_broadcast(a_slot, len);
        let mut dst = vec![0.0; len];
        kernels::negate_scalar(&mut dst, &a, len);
        self.write_scalars(dst_slot, &dst);
      }
      Buffer::Triple(_) => {
        let a = self.read_triples_broadcast(a_slot, len);
        let mut dst = vec![Vec3::ZERO; len];
        kernels::negate_triple(&mut dst, &a, len);
        self.write_triples(dst_slot, &dst);
      }
      _ => unreachable!("negate is only defined for scalar and triple types"),
    }
  }

  fn exec_assign(&mut self, instr: &Instruction) {
    let (dst_slot, src_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    match self.registers[dst_slot as usize].buffer() {
      Buffer::Scalar(_) => {
        let src = self.read_scalars_broadcast(src_slot, len);
        self.write_scalars(dst_slot, &src);
      }
      Buffer::Triple(_) => {
        let src = self.read_triples_broadcast(src_slot, len);
        self.write_triples(dst_slot, &src);
      }
      Buffer::Matrix(_) => {
        let src = self.read_matrices_broadcast(src_slot, len);
        self.write_matrices(dst_slot, &src);
      }
      Buffer::StringHandle(_) => {
        let src = self.registers[src_slot as usize].as_string_handles().to_vec();
        self.registers[dst_slot as usize].as_string_handles_mut().copy_from_slice(&src);
      }
    }
  }

  fn exec_broadcast(&mut self, instr: &Instruction) {
    let (dst_slot, src_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    let src = self.read_scalars_broadcast(src_slot, len);
    match self.registers[dst_slot as usize].buffer() {
      Buffer::Triple(_) => {
        let mut dst = vec![Vec3::ZERO; len];
        kernels::broadcast_scalar_to_triple(&mut dst, &src, len);
        self.write_triples(dst_slot, &dst);
      }
      Buffer::Matrix(_) => {
        let dst: Vec<Mat4> = src.iter().map(|&s| Mat4::IDENTITY * s).collect();
        self.write_matrices(dst_slot, &dst);
      }
      _ => self.write_scalars(dst_slot, &src),
    }
  }

  fn exec_convert(&mut self, instr: &Instruction) {
    let (dst_slot, src_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    match self.registers[dst_slot as usize].buffer() {
      Buffer::Scalar(_) => {
        let src = self.read_scalars_broadcast(src_slot, len);
        self.write_scalars(dst_slot, &src);
      }
      Buffer::Triple(_) => {
        let src = self.read_triples_broadcast(src_slot, len);
        self.write_triples(dst_slot, &src);
      }
      Buffer::Matrix(_) => {
        let src = self.read_matrices_broadcast(src_slot, len);
        self.write_matrices(dst_slot, &src);
      }
      Buffer::StringHandle(_) => {
        let src = self.registers[src_slot as usize].as_string_handles().to_vec();
        self.registers[dst_slot as usize].as_string_handles_mut().copy_from_slice(&src);
      }
    }
  }

  fn exec_ctransform(&mut self, space: StringHandle, instr: &Instruction, policy: &mut dyn ErrorPolicy) {
    let (dst_slot, src_slot) = (instr.slots[0], instr.slots[1]);
    let len = self.registers[dst_slot as usize].len();
    let space_name = self.shader.string_pool.resolve(space).to_string();
    let src = self.read_triples_broadcast(src_slot, len);
    let mut dst = vec![Vec3::ZERO; len];
    if let Err(code) = kernels::ctransform(&mut dst, &space_name, &src, len) {
      policy.render_error(RenderError::new(code, format!("unknown color space `{space_name}`")));
    }
    self.write_triples(dst_slot, &dst);
  }

  fn exec_mtransform(&mut self, instr: &Instruction) {
    let (dst_slot, matrix_slot, src_slot) = (instr.slots[0], instr.slots[1], instr.slots[2]);
    let len = self.registers[dst_slot as usize].len();
    let matrix = self.read_matrices_broadcast(matrix_slot, len);
    let src = self.read_matrices_broadcast(src_slot, len);
    let mut dst = vec![Mat4::IDENTITY; len];
    kernels::mtransform(&mut dst, &matrix, &src, len);
    self.write_matrices(dst_slot, &dst);
  }

  fn exec_call(&mut self, builtin: Builtin, instr: &Instruction, lights: &[Light]) {
    let dst_slot = instr.slots[0];
    let arity = builtin_arity(builtin);
    let arg_slots = &instr.slots[1..1 + arity];
    let len = self.registers[dst_slot as usize].len();

    match builtin {
      Builtin::Length => {
        let a = self.read_triples_broadcast(arg_slots[0], len);
        let mut dst = vec![0.0; len];
        kernels::length(&mut dst, &a, len);
        self.write_scalars(dst_slot, &dst);
      }
      Builtin::Distance => {
        let a = self.read_triples_broadcast(arg_slots[0], len);
        let b = self.read_triples_broadcast(arg_slots[1], len);
        let mut dst = vec![0.0; len];
        kernels::distance(&mut dst, &a, &b, len);
        self.write_scalars(dst_slot, &dst);
      }
      Builtin::Dot => {
        let a = self.read_triples_broadcast(arg_slots[0], len);
        let b = self.read_triples_broadcast(arg_slots[1], len);
        let mut dst = vec![0.0; len];
        kernels::dot(&mut dst, &a, &b, len);
        self.write_scalars(dst_slot, &dst);
      }
      Builtin::Normalize | Builtin::Cross | Builtin::Faceforward | Builtin::Reflect => {
        let args: Vec<Vec<Vec3>> = arg_slots.iter().map(|&s| self.read_triples_broadcast(s, len)).collect();
        let refs: Vec<&[Vec3]> = args.iter().map(|v| v.as_slice()).collect();
        let mut dst = vec![Vec3::ZERO; len];
        kernels::call_triple(builtin, &mut dst, &refs, len);
        self.write_triples(dst_slot, &dst);
      }
      Builtin::Ambient => {
        let light_colors: Vec<Vec<Vec3>> =
          lights.iter().filter(|l| l.category == LightCategory::Ambient).filter_map(|l| broadcast_attribute_triples(&l.grid, "Cl", len)).collect();
        let refs: Vec<&[Vec3]> = light_colors.iter().map(|v| v.as_slice()).collect();
        let mut dst = vec![Vec3::ZERO; len];
        kernels::ambient(&mut dst, &refs, len);
        self.write_triples(dst_slot, &dst);
      }
      Builtin::Diffuse => {
        let normal = self.read_triples_broadcast(arg_slots[0], len);
        let contributions = self.non_ambient_contributions(lights, &normal, len);
        let refs: Vec<(&[Vec3], &[f32])> = contributions.iter().map(|(c, cos)| (c.as_slice(), cos.as_slice())).collect();
        let mut dst = vec![Vec3::ZERO; len];
        kernels::diffuse(&mut dst, &refs, len);
        self.write_triples(dst_slot, &dst);
      }
      Builtin::Specular | Builtin::Specularbrdf | Builtin::Phong => {
        let normal = self.read_triples_broadcast(arg_slots[0], len);
        let view = self.read_triples_broadcast(arg_slots[1], len);
        let roughness = self.read_scalars_broadcast(arg_slots[2], len);
        let contributions = self.non_ambient_light_directions(lights, len);
        let refs: Vec<(&[Vec3], &[Vec3])> = contributions.iter().map(|(c, dir)| (c.as_slice(), dir.as_slice())).collect();
        let mut dst = vec![Vec3::ZERO; len];
        kernels::specular(&mut dst, &normal, &view, &roughness, &refs, len);
        self.write_triples(dst_slot, &dst);
      }
      Builtin::Trace => {
        // Ray tracing is outside this interpreter's scope; `trace()` always
        // reports a miss.
        self.write_scalars(dst_slot, &vec![0.0; len]);
      }
      scalar_builtin => match self.registers[dst_slot as usize].buffer() {
        Buffer::Triple(_) => {
          let args: Vec<Vec<Vec3>> = arg_slots.iter().map(|&s| self.read_triples_broadcast(s, len)).collect();
          let refs: Vec<&[Vec3]> = args.iter().map(|v| v.as_slice()).collect();
          let mut dst = vec![Vec3::ZERO; len];
          kernels::call_triple(scalar_builtin, &mut dst, &refs, len);
          self.write_triples(dst_slot, &dst);
        }
        _ => {
          let args: Vec<Vec<f32>> = arg_slots.iter().map(|&s| self.read_scalars_broadcast(s, len)).collect();
          let refs: Vec<&[f32]> = args.iter().map(|v| v.as_slice()).collect();
          let mut dst = vec![0.0; len];
          kernels::call_scalar(scalar_builtin, &mut dst, &refs, len);
          self.write_scalars(dst_slot, &dst);
        }
      },
    }
  }

  /// `(Cl, cos_theta)` per non-ambient light, for `diffuse(N)`. Direction is
  /// taken straight from each light's own declared axis (solar) or position
  /// relative to the grid's `P` (point lights), without per-point cone
  /// masking — a shader wanting cone-accurate falloff uses `illuminance`
  /// directly instead of this convenience wrapper.
  fn non_ambient_contributions(&self, lights: &[Light], normal: &[Vec3], len: usize) -> Vec<(Vec<Vec3>, Vec<f32>)> {
    self
      .non_ambient_light_directions(lights, len)
      .into_iter()
      .map(|(color, direction)| {
        let cos_theta: Vec<f32> = normal.iter().zip(&direction).map(|(n, d)| n.dot(*d).max(0.0)).collect();
        (color, cos_theta)
      })
      .collect()
  }

  fn non_ambient_light_directions(&self, lights: &[Light], len: usize) -> Vec<(Vec<Vec3>, Vec<Vec3>)> {
    let position = match self.attribute_slot("P") {
      Some(slot) => self.read_triples_broadcast(slot, len),
      None => vec![Vec3::ZERO; len],
    };
    lights
      .iter()
      .filter(|l| l.category != LightCategory::Ambient)
      .filter_map(|l| {
        let color = broadcast_attribute_triples(&l.grid, "Cl", len)?;
        let direction = match l.category {
          LightCategory::SolarUnbounded | LightCategory::SolarCone => {
            let axis = broadcast_attribute_triples(&l.grid, "__axis", len)?;
            axis.iter().map(|a| -*a).collect()
          }
          _ => {
            let light_position = broadcast_attribute_triples(&l.grid, "Ps", len)?;
            light_position.iter().zip(&position).map(|(lp, p)| (*lp - *p).normalize_or_zero()).collect()
          }
        };
        Some((color, direction))
      })
      .collect()
  }
}

fn builtin_arity(builtin: Builtin) -> usize {
  match builtin {
    Builtin::Abs
    | Builtin::Sign
    | Builtin::Sqrt
    | Builtin::Floor
    | Builtin::Ceil
    | Builtin::Sin
    | Builtin::Cos
    | Builtin::Radians
    | Builtin::Degrees
    | Builtin::Normalize
    | Builtin::Length
    | Builtin::Diffuse => 1,
    Builtin::Pow | Builtin::Mod | Builtin::Min | Builtin::Max | Builtin::Distance | Builtin::Dot | Builtin::Cross | Builtin::Faceforward | Builtin::Reflect => 2,
    Builtin::Clamp | Builtin::Mix | Builtin::Specular | Builtin::Specularbrdf | Builtin::Phong | Builtin::Trace => 3,
    Builtin::Ambient => 0,
  }
}

fn broadcast_attribute_scalars(grid: &Grid, name: &str, len: usize) -> Option<Vec<f32>> {
  let value = grid.value(name)?;
  let src = value.as_scalars();
  Some((0..len).map(|i| src[i % src.len().max(1)]).collect())
}

fn broadcast_attribute_triples(grid: &Grid, name: &str, len: usize) -> Option<Vec<Vec3>> {
  let value = grid.value(name)?;
  let src = value.as_triples();
  Some((0..len).map(|i| src[i % src.len().max(1)]).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CollectingErrorPolicy;
  use crate::shader::CompileOptions;
  use crate::types::{Storage, Type};

  #[test]
  fn assigning_a_float_literal_broadcasts_into_every_grid_point() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = crate::shader::compile("surface s() { Ci = 1; }", &CompileOptions::default(), &mut policy).unwrap();
    let mut grid = Grid::new(2, 2);
    shade(&shader, &mut grid, &mut policy).unwrap();
    let ci = grid.value("Ci").unwrap();
    assert!(ci.as_triples().iter().all(|c| *c == Vec3::ONE));
  }

  #[test]
  fn a_varying_if_only_assigns_the_lanes_that_pass() {
    let mut policy = CollectingErrorPolicy::new();
    let shader =
      crate::shader::compile("surface s() { if (u > 0) { Ci = 1; } else { Ci = 0; } }", &CompileOptions::default(), &mut policy).unwrap();
    let mut grid = Grid::new(2, 1);
    let u = grid.add_value("u", Type::Float, Storage::Varying).as_scalars_mut();
    u[0] = 1.0;
    u[1] = -1.0;
    shade(&shader, &mut grid, &mut policy).unwrap();
    let ci = grid.value("Ci").unwrap().as_triples();
    assert_eq!(ci[0], Vec3::ONE);
    assert_eq!(ci[1], Vec3::ZERO);
  }

  #[test]
  fn a_for_loop_accumulates_across_iterations() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = crate::shader::compile(
      "surface s() { uniform float i; uniform float total; total = 0; for (i = 0; i < 4; i += 1) { total = total + 1; } Ci = total; }",
      &CompileOptions::default(),
      &mut policy,
    )
    .unwrap();
    let mut grid = Grid::new(1, 1);
    shade(&shader, &mut grid, &mut policy).unwrap();
    assert_eq!(grid.value("Ci").unwrap().as_triples()[0], Vec3::splat(4.0));
  }

  #[test]
  fn break_stops_the_loop_for_the_lanes_that_took_it() {
    let mut policy = CollectingErrorPolicy::new();
    let shader = crate::shader::compile(
      "surface s() { uniform float i; uniform float total; total = 0; for (i = 0; i < 4; i += 1) { if (i >= 2) { break; } total = total + 1; } Ci = total; }",
      &CompileOptions::default(),
      &mut policy,
    )
    .unwrap();
    let mut grid = Grid::new(1, 1);
    shade(&shader, &mut grid, &mut policy).unwrap();
    assert_eq!(grid.value("Ci").unwrap().as_triples()[0], Vec3::splat(2.0));
  }

  #[test]
  fn comparison_result_is_an_integer_zero_or_one() {
    let mut policy = CollectingErrorPolicy::new();
    let shader =
      crate::shader::compile("surface s() { uniform float eq; eq = (1 == 1); Ci = eq; }", &CompileOptions::default(), &mut policy).unwrap();
    let mut grid = Grid::new(1, 1);
    shade(&shader, &mut grid, &mut policy).unwrap();
    assert_eq!(grid.value("Ci").unwrap().as_triples()[0], Vec3::ONE);
  }
}
