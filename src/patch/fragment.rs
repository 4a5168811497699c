//! Construction of instruction fragments.
//!
//! A [`FragmentBuilder`] emits new instructions into the arena of the method they are meant
//! for, without placing them in its order. Jumps name either a [`Label`] of the fragment or
//! its continuation, the instruction the fragment will be inserted in front of. A label is
//! reserved first and bound later, so forward and backward jumps read the same way.
//!
//! While emitting, the builder follows the evaluation stack the way an assembler does: the
//! depth at every label must agree on all incoming paths, and jumps to the continuation
//! must leave the stack empty. The peak depth is reported so the splicer can grow
//! `max_stack`.
//!
//! [`FragmentBuilder::finish`] checks that every label was bound and that no jump leaves the
//! fragment except towards the continuation.

use std::collections::{HashMap, HashSet};

use crate::{
    assembly::{opcodes, FlowType, InstrRef, Instruction, OpCode, Operand},
    metadata::signatures::TypeSignature,
    module::{CilBody, FieldHandle, LocalSlot, MethodHandle},
    Error::{InvalidBranch, InvalidInstruction},
    Result,
};

/// A jump target inside a fragment, or its continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(InstrRef);

impl Label {
    /// The instruction this label names
    #[must_use]
    pub fn instr_ref(&self) -> InstrRef {
        self.0
    }
}

/// A local declared by a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local(u16);

impl Local {
    /// Index in the local table of the method
    #[must_use]
    pub fn index(&self) -> u16 {
        self.0
    }
}

/// A finished fragment, ready to be spliced.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// The instructions in order; allocated in the method arena but not placed yet
    pub instructions: Vec<InstrRef>,
    /// Locals to append to the method
    pub locals: Vec<LocalSlot>,
    /// Index the first local was numbered with
    pub first_local: u32,
    /// The instruction the fragment must be inserted in front of
    pub continuation: InstrRef,
    /// Highest evaluation stack depth reached inside the fragment
    pub max_stack: u16,
}

impl Fragment {
    /// Number of instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` for a fragment without instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The first instruction, which takes over every jump to the continuation
    #[must_use]
    pub fn entry(&self) -> Option<InstrRef> {
        self.instructions.first().copied()
    }
}

/// Builds a [`Fragment`] for one method body.
pub struct FragmentBuilder<'a> {
    body: &'a mut CilBody,
    continuation: InstrRef,
    emitted: Vec<InstrRef>,
    locals: Vec<LocalSlot>,
    first_local: u32,
    reserved: HashSet<InstrRef>,
    pending: Option<InstrRef>,
    depth: i32,
    max_depth: i32,
    unreachable: bool,
    label_depths: HashMap<InstrRef, i32>,
}

impl<'a> FragmentBuilder<'a> {
    /// Start a fragment that will be inserted in front of `continuation`
    pub fn new(body: &'a mut CilBody, continuation: InstrRef) -> Self {
        let first_local = body.local_count();
        FragmentBuilder {
            body,
            continuation,
            emitted: Vec::new(),
            locals: Vec::new(),
            first_local,
            reserved: HashSet::new(),
            pending: None,
            depth: 0,
            max_depth: 0,
            unreachable: false,
            label_depths: HashMap::new(),
        }
    }

    /// The continuation as a jump target
    #[must_use]
    pub fn continuation(&self) -> Label {
        Label(self.continuation)
    }

    /// Number of instructions emitted so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    /// `true` if nothing was emitted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// Current evaluation stack depth
    #[must_use]
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Declare a new local of type `ty`
    ///
    /// # Errors
    /// Returns an error if the local table of the method is full.
    pub fn local(&mut self, ty: TypeSignature, name: &str) -> Result<Local> {
        let index = u64::from(self.first_local) + self.locals.len() as u64;
        let index = u16::try_from(index)
            .ok()
            .filter(|index| *index < u16::MAX)
            .ok_or_else(|| InvalidInstruction(format!("no local slot left for {name}")))?;

        self.locals.push(LocalSlot::named(ty, name));
        Ok(Local(index))
    }

    /// Reserve a label to bind later
    pub fn reserve(&mut self) -> Label {
        let slot = self.body.instructions.alloc(Instruction::simple(opcodes::NOP));
        self.reserved.insert(slot);
        Label(slot)
    }

    /// Bind `label` to the next emitted instruction
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if the label is not a reserved, unbound label
    /// of this fragment, or another label is still waiting for its instruction, or the
    /// stack depth disagrees with earlier jumps to it.
    pub fn bind(&mut self, label: Label) -> Result<()> {
        if !self.reserved.contains(&label.0) || self.emitted.contains(&label.0) {
            return Err(InvalidBranch(format!(
                "{} is not an unbound label of this fragment",
                label.0
            )));
        }
        if let Some(pending) = self.pending {
            return Err(InvalidBranch(format!(
                "{} and {} would name the same instruction",
                pending, label.0
            )));
        }

        match self.label_depths.get(&label.0) {
            Some(expected) if self.unreachable => self.depth = *expected,
            Some(expected) if *expected != self.depth => {
                return Err(InvalidBranch(format!(
                    "stack depth mismatch at {}: {} from jumps, {} falling through",
                    label.0, expected, self.depth
                )));
            }
            Some(_) => {}
            None if self.unreachable => self.depth = 0,
            None => {
                self.label_depths.insert(label.0, self.depth);
            }
        }

        self.unreachable = false;
        self.pending = Some(label.0);
        Ok(())
    }

    /// Emit an instruction whose stack effect is fixed by its opcode
    ///
    /// # Errors
    /// Returns an error for calls, which need [`FragmentBuilder::call`], for jumps, which
    /// need [`FragmentBuilder::branch`], or if the stack would underflow.
    pub fn emit(&mut self, instruction: Instruction) -> Result<InstrRef> {
        match instruction.opcode.flow() {
            FlowType::Call => Err(InvalidInstruction(format!(
                "{} needs the callee signature",
                instruction.opcode
            ))),
            FlowType::ConditionalBranch
            | FlowType::UnconditionalBranch
            | FlowType::Leave
            | FlowType::Switch => Err(InvalidInstruction(format!(
                "{} needs a label",
                instruction.opcode
            ))),
            _ => {
                let effect = instruction.opcode.stack_behavior();
                self.push(instruction, u16::from(effect.pops), effect.pushes)
            }
        }
    }

    /// Emit an instruction without operand
    ///
    /// # Errors
    /// See [`FragmentBuilder::emit`].
    pub fn op(&mut self, opcode: OpCode) -> Result<InstrRef> {
        self.emit(Instruction::simple(opcode))
    }

    /// Emit `ldfld`, `stfld` or `ldsfld` for `field`
    ///
    /// # Errors
    /// Returns an error if the static-ness of the opcode and the field disagree, or the
    /// stack would underflow.
    pub fn field(&mut self, opcode: OpCode, field: FieldHandle) -> Result<InstrRef> {
        let wants_static = matches!(
            opcode,
            opcodes::LDSFLD | opcodes::STSFLD | opcodes::LDSFLDA
        );
        if wants_static != field.is_static() {
            return Err(InvalidInstruction(format!(
                "{} cannot access {}",
                opcode,
                field.token()
            )));
        }
        self.emit(Instruction::new(opcode, Operand::Token(field.token())))
    }

    /// Emit a `call` to `method`, taking its stack effect from the signature
    ///
    /// # Errors
    /// Returns an error if the stack holds fewer values than the call consumes.
    pub fn call(&mut self, method: MethodHandle) -> Result<InstrRef> {
        self.push(
            Instruction::new(opcodes::CALL, Operand::Token(method.token())),
            method.pops(),
            method.pushes(),
        )
    }

    /// Push the 32-bit constant `value` in its shortest encoding
    ///
    /// # Errors
    /// See [`FragmentBuilder::emit`].
    pub fn ldc_i4(&mut self, value: i32) -> Result<InstrRef> {
        let instruction = match value {
            -1..=8 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let code = (value + 0x16) as u8;
                Instruction::simple(OpCode::single(code))
            }
            -128..=127 => Instruction::new(opcodes::LDC_I4_S, Operand::I32(value)),
            _ => Instruction::new(opcodes::LDC_I4, Operand::I32(value)),
        };
        self.emit(instruction)
    }

    /// Load `local` in its shortest encoding
    ///
    /// # Errors
    /// See [`FragmentBuilder::emit`].
    pub fn ldloc(&mut self, local: Local) -> Result<InstrRef> {
        self.ldloc_index(local.0)
    }

    /// Load the local at `index`, which may be a local the method already declares
    ///
    /// # Errors
    /// Returns an error if the method has no local at `index`.
    pub fn ldloc_index(&mut self, index: u16) -> Result<InstrRef> {
        self.check_local(index)?;
        let instruction = match index {
            0 => Instruction::simple(opcodes::LDLOC_0),
            1 => Instruction::simple(opcodes::LDLOC_1),
            2 => Instruction::simple(opcodes::LDLOC_2),
            3 => Instruction::simple(opcodes::LDLOC_3),
            4..=255 => Instruction::new(opcodes::LDLOC_S, Operand::Local(index)),
            _ => Instruction::new(opcodes::LDLOC, Operand::Local(index)),
        };
        self.emit(instruction)
    }

    /// Store into `local` in its shortest encoding
    ///
    /// # Errors
    /// See [`FragmentBuilder::emit`].
    pub fn stloc(&mut self, local: Local) -> Result<InstrRef> {
        let instruction = match local.0 {
            0 => Instruction::simple(opcodes::STLOC_0),
            1 => Instruction::simple(opcodes::STLOC_1),
            2 => Instruction::simple(opcodes::STLOC_2),
            3 => Instruction::simple(opcodes::STLOC_3),
            4..=255 => Instruction::new(opcodes::STLOC_S, Operand::Local(local.0)),
            _ => Instruction::new(opcodes::STLOC, Operand::Local(local.0)),
        };
        self.emit(instruction)
    }

    /// Push the address of `local`
    ///
    /// # Errors
    /// See [`FragmentBuilder::emit`].
    pub fn ldloca(&mut self, local: Local) -> Result<InstrRef> {
        let opcode = if local.0 <= 255 {
            opcodes::LDLOCA_S
        } else {
            opcodes::LDLOCA
        };
        self.emit(Instruction::new(opcode, Operand::Local(local.0)))
    }

    /// Emit the jump `opcode` to `target`
    ///
    /// # Errors
    /// Returns an error if `opcode` is not a branch, the target is neither a label of this
    /// fragment nor its continuation, or the stack depth at the target disagrees.
    pub fn branch(&mut self, opcode: OpCode, target: Label) -> Result<InstrRef> {
        let flow = opcode.flow();
        if !matches!(
            flow,
            FlowType::ConditionalBranch | FlowType::UnconditionalBranch
        ) {
            return Err(InvalidBranch(format!("{opcode} is not a branch")));
        }
        if target.0 != self.continuation && !self.reserved.contains(&target.0) {
            return Err(InvalidBranch(format!(
                "{} leaves the fragment towards {}",
                opcode, target.0
            )));
        }

        let effect = opcode.stack_behavior();
        let unreachable = self.unreachable;
        let instr_ref = self.push(
            Instruction::new(opcode, Operand::Target(target.0)),
            u16::from(effect.pops),
            effect.pushes,
        )?;

        if !unreachable {
            self.record_depth(target.0)?;
        }
        if flow == FlowType::UnconditionalBranch {
            self.unreachable = true;
        }
        Ok(instr_ref)
    }

    /// Emit `ret` from a method without return value
    ///
    /// # Errors
    /// Returns an error if values are left on the stack.
    pub fn ret(&mut self) -> Result<InstrRef> {
        if !self.unreachable && self.depth != 0 {
            return Err(InvalidInstruction(format!(
                "ret with {} values on the stack",
                self.depth
            )));
        }
        self.op(opcodes::RET)
    }

    /// Validate the fragment and hand it out for splicing.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if a label was never bound, a jump leaves the
    /// fragment, or control falls off the end with values on the stack.
    pub fn finish(self) -> Result<Fragment> {
        if let Some(pending) = self.pending {
            return Err(InvalidBranch(format!("{pending} is bound past the last instruction")));
        }
        if let Some(unbound) = self.reserved.iter().find(|slot| !self.emitted.contains(slot)) {
            return Err(InvalidBranch(format!("label {unbound} was never bound")));
        }
        if !self.unreachable && self.depth != 0 {
            return Err(InvalidBranch(format!(
                "falls through to the continuation with {} values on the stack",
                self.depth
            )));
        }

        let members: HashSet<InstrRef> = self.emitted.iter().copied().collect();
        for instr_ref in &self.emitted {
            let instruction = self.body.instructions.get(*instr_ref);
            if let Some(outside) = instruction
                .targets()
                .into_iter()
                .find(|target| *target != self.continuation && !members.contains(target))
            {
                return Err(InvalidBranch(format!(
                    "{} at {} jumps to {}, outside the fragment",
                    instruction.opcode, instr_ref, outside
                )));
            }
        }

        Ok(Fragment {
            instructions: self.emitted,
            locals: self.locals,
            first_local: self.first_local,
            continuation: self.continuation,
            max_stack: u16::try_from(self.max_depth).unwrap_or(u16::MAX),
        })
    }

    fn check_local(&self, index: u16) -> Result<()> {
        let declared = u64::from(self.first_local) + self.locals.len() as u64;
        if u64::from(index) < declared {
            Ok(())
        } else {
            Err(InvalidInstruction(format!(
                "local {index} is not declared ({declared} locals)"
            )))
        }
    }

    fn record_depth(&mut self, target: InstrRef) -> Result<()> {
        if target == self.continuation {
            if self.depth != 0 {
                return Err(InvalidBranch(format!(
                    "jump to the continuation with {} values on the stack",
                    self.depth
                )));
            }
            return Ok(());
        }

        match self.label_depths.get(&target) {
            Some(expected) if *expected != self.depth => Err(InvalidBranch(format!(
                "stack depth mismatch for jump to {}: {} expected, {} here",
                target, expected, self.depth
            ))),
            Some(_) => Ok(()),
            None => {
                self.label_depths.insert(target, self.depth);
                Ok(())
            }
        }
    }

    fn push(&mut self, instruction: Instruction, pops: u16, pushes: u8) -> Result<InstrRef> {
        let depth = self.depth - i32::from(pops);
        if depth < 0 && !self.unreachable {
            return Err(InvalidInstruction(format!(
                "{} underflows the stack ({} values, {} needed)",
                instruction.opcode, self.depth, pops
            )));
        }
        self.depth = depth.max(0) + i32::from(pushes);
        self.max_depth = self.max_depth.max(self.depth);

        if matches!(
            instruction.opcode.flow(),
            FlowType::Return | FlowType::Throw
        ) {
            self.unreachable = true;
        }

        let instr_ref = match self.pending.take() {
            Some(slot) => {
                *self.body.instructions.get_mut(slot) = instruction;
                slot
            }
            None => self.body.instructions.alloc(instruction),
        };
        self.emitted.push(instr_ref);
        Ok(instr_ref)
    }
}
