//! CIL instruction representation: opcodes, operand kinds and stack effects.
//!
//! An [`Instruction`] is an [`OpCode`] plus an [`Operand`]. Jump targets are never byte
//! offsets: a branch operand names the [`InstrRef`] of the instruction it jumps to, so that
//! instructions can be inserted anywhere without recomputing displacements. Offsets only
//! exist transiently inside the decoder and the encoder.
//!
//! # Key Components
//!
//! - [`OpCode`] - A one or two byte opcode with its static table entry
//! - [`CilInstruction`] - Static metadata of an opcode (mnemonic, operand, flow, stack)
//! - [`Operand`] - Typed operand, with identity-based branch targets
//! - [`Instruction`] - Opcode and operand pair stored in an [`crate::assembly::InstructionList`]

use std::fmt;

use crate::{
    assembly::{opcodes, InstrRef, INSTRUCTIONS, INSTRUCTIONS_FE, RESERVED},
    metadata::token::Token,
};

/// Operand encodings of CIL instructions.
///
/// Local and argument indices, as well as branch displacements, get their own variants so
/// that the decoder can map them to [`Operand::Local`], [`Operand::Arg`] and
/// [`Operand::Target`] without a second lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer (`unaligned.`, `no.`)
    UInt8,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token reference
    Token,
    /// 8-bit local variable index
    Local8,
    /// 16-bit local variable index
    Local16,
    /// 8-bit argument index
    Arg8,
    /// 16-bit argument index
    Arg16,
    /// 8-bit relative branch displacement
    Branch8,
    /// 32-bit relative branch displacement
    Branch32,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// Returns `None` for `Switch`, whose size depends on its target count.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8
            | OperandType::UInt8
            | OperandType::Local8
            | OperandType::Arg8
            | OperandType::Branch8 => Some(1),
            OperandType::Local16 | OperandType::Arg16 => Some(2),
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Token
            | OperandType::Branch32 => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Control flow behavior of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Multi-way branch (switch statement)
    Switch,
    /// Exception throwing
    Throw,
    /// End of finally block or filter
    EndFinally,
    /// Leave protected region (try/catch/finally)
    Leave,
}

/// Stack effect of an instruction.
///
/// Calls, `newobj` and `ret` depend on a signature, their table entry only covers the fixed
/// part of the effect. The fragment builder supplies the rest from the callee handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of items popped from stack
    pub pops: u8,
    /// Number of items pushed to stack
    pub pushes: u8,
}

/// Static metadata of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CilInstruction {
    /// The mnemonic, empty for reserved opcodes
    pub instr: &'static str,
    /// How the operand is encoded
    pub op_type: OperandType,
    /// Control flow behavior
    pub flow: FlowType,
    /// Fixed number of stack items popped
    pub stack_pops: u8,
    /// Fixed number of stack items pushed
    pub stack_pushes: u8,
}

/// A CIL opcode, either a single byte or `0xFE` followed by a second byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode {
    prefix: u8,
    code: u8,
}

/// First byte of all two-byte opcodes
pub const FE_PREFIX: u8 = 0xFE;

impl OpCode {
    /// A single-byte opcode
    #[must_use]
    pub const fn single(code: u8) -> OpCode {
        OpCode { prefix: 0, code }
    }

    /// A two-byte opcode, `code` is the byte after the `0xFE` prefix
    #[must_use]
    pub const fn extended(code: u8) -> OpCode {
        OpCode {
            prefix: FE_PREFIX,
            code,
        }
    }

    /// The prefix byte, `0xFE` for two-byte opcodes and 0 otherwise
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The opcode byte (the second byte for two-byte opcodes)
    #[must_use]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// The static table entry of this opcode
    #[must_use]
    pub fn info(&self) -> &'static CilInstruction {
        let table: &'static [CilInstruction] = if self.prefix == FE_PREFIX {
            &INSTRUCTIONS_FE
        } else {
            &INSTRUCTIONS
        };
        table.get(self.code as usize).unwrap_or(&RESERVED)
    }

    /// `false` for reserved or unassigned opcodes
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.info().instr.is_empty()
    }

    /// The mnemonic, for example `ldfld` or `bge.un.s`
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.info().instr
    }

    /// Size of the opcode itself in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        if self.prefix == FE_PREFIX {
            2
        } else {
            1
        }
    }

    /// How the operand of this opcode is encoded
    #[must_use]
    pub fn operand_type(&self) -> OperandType {
        self.info().op_type
    }

    /// Control flow behavior of this opcode
    #[must_use]
    pub fn flow(&self) -> FlowType {
        self.info().flow
    }

    /// Fixed stack effect of this opcode
    #[must_use]
    pub fn stack_behavior(&self) -> StackBehavior {
        let info = self.info();
        StackBehavior {
            pops: info.stack_pops,
            pushes: info.stack_pushes,
        }
    }

    /// `true` for branch and `leave` opcodes, short or long
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.operand_type(),
            OperandType::Branch8 | OperandType::Branch32
        )
    }

    /// `true` for branches with an 8-bit displacement
    #[must_use]
    pub fn is_short_branch(&self) -> bool {
        self.operand_type() == OperandType::Branch8
    }

    /// The 32-bit displacement form of a short branch, or `self`
    #[must_use]
    pub fn long_form(&self) -> OpCode {
        match (self.prefix, self.code) {
            (0, code @ opcodes::BR_S_CODE..=opcodes::BLT_UN_S_CODE) => {
                OpCode::single(code + (opcodes::BR_CODE - opcodes::BR_S_CODE))
            }
            (0, opcodes::LEAVE_S_CODE) => opcodes::LEAVE,
            _ => *self,
        }
    }

    /// The 8-bit displacement form of a long branch
    #[must_use]
    pub fn short_form(&self) -> Option<OpCode> {
        match (self.prefix, self.code) {
            (0, code @ opcodes::BR_CODE..=opcodes::BLT_UN_CODE) => {
                Some(OpCode::single(code - (opcodes::BR_CODE - opcodes::BR_S_CODE)))
            }
            (0, opcodes::LEAVE_CODE) => Some(opcodes::LEAVE_S),
            _ if self.is_short_branch() => Some(*self),
            _ => None,
        }
    }

    /// `true` if both opcodes are the same operation, treating the short and long form of a
    /// branch as equal
    #[must_use]
    pub fn same_family(&self, other: OpCode) -> bool {
        self.long_form() == other.long_form()
    }

    /// Append the opcode bytes to `buffer`
    pub fn write(&self, buffer: &mut Vec<u8>) {
        if self.prefix == FE_PREFIX {
            buffer.push(FE_PREFIX);
        }
        buffer.push(self.code);
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.mnemonic())
        } else if self.prefix == FE_PREFIX {
            write!(f, "<FE {:02X}>", self.code)
        } else {
            write!(f, "<{:02X}>", self.code)
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// 32-bit integer literal, also used for the 8-bit encodings
    I32(i32),
    /// 64-bit integer literal
    I64(i64),
    /// 32-bit float literal
    F32(f32),
    /// 64-bit float literal
    F64(f64),
    /// Metadata token
    Token(Token),
    /// Local variable index
    Local(u16),
    /// Argument index, 0 is `this` for instance methods
    Arg(u16),
    /// Jump target in the same instruction list
    Target(InstrRef),
    /// Switch table
    Switch(Vec<InstrRef>),
}

/// One CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: OpCode,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// Create a new instruction
    #[must_use]
    pub fn new(opcode: OpCode, operand: Operand) -> Instruction {
        Instruction { opcode, operand }
    }

    /// Create an instruction without operand
    #[must_use]
    pub fn simple(opcode: OpCode) -> Instruction {
        Instruction::new(opcode, Operand::None)
    }

    /// The jump targets of this instruction, empty for non-branches
    #[must_use]
    pub fn targets(&self) -> Vec<InstrRef> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }

    /// Replace every jump target `from` with `to`, returning how many were replaced
    pub fn retarget(&mut self, from: InstrRef, to: InstrRef) -> usize {
        match &mut self.operand {
            Operand::Target(target) if *target == from => {
                *target = to;
                1
            }
            Operand::Switch(targets) => {
                let mut count = 0;
                for target in targets.iter_mut().filter(|target| **target == from) {
                    *target = to;
                    count += 1;
                }
                count
            }
            _ => 0,
        }
    }

    /// The token operand, if any
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self.operand {
            Operand::Token(token) => Some(token),
            _ => None,
        }
    }

    /// The local variable index used by this instruction, including the macro forms
    /// `ldloc.0` to `stloc.3`
    #[must_use]
    pub fn local_index(&self) -> Option<u16> {
        if let Operand::Local(index) = self.operand {
            return Some(index);
        }
        match (self.opcode.prefix(), self.opcode.code()) {
            (0, code @ 0x06..=0x09) => Some(u16::from(code - 0x06)),
            (0, code @ 0x0A..=0x0D) => Some(u16::from(code - 0x0A)),
            _ => None,
        }
    }

    /// The argument index used by this instruction, including `ldarg.0` to `ldarg.3`
    #[must_use]
    pub fn arg_index(&self) -> Option<u16> {
        if let Operand::Arg(index) = self.operand {
            return Some(index);
        }
        match (self.opcode.prefix(), self.opcode.code()) {
            (0, code @ 0x02..=0x05) => Some(u16::from(code - 0x02)),
            _ => None,
        }
    }

    /// The 32-bit integer constant pushed by this instruction, including `ldc.i4.m1` to
    /// `ldc.i4.8`
    #[must_use]
    pub fn i4_constant(&self) -> Option<i32> {
        match (self.opcode.prefix(), self.opcode.code(), &self.operand) {
            (0, code @ 0x15..=0x1E, _) => Some(i32::from(code) - 0x16),
            (0, 0x1F | 0x20, Operand::I32(value)) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{}", self.opcode),
            Operand::I32(value) => write!(f, "{} {}", self.opcode, value),
            Operand::I64(value) => write!(f, "{} {}", self.opcode, value),
            Operand::F32(value) => write!(f, "{} {}", self.opcode, value),
            Operand::F64(value) => write!(f, "{} {}", self.opcode, value),
            Operand::Token(token) => write!(f, "{} {}", self.opcode, token),
            Operand::Local(index) => write!(f, "{} V_{}", self.opcode, index),
            Operand::Arg(index) => write!(f, "{} A_{}", self.opcode, index),
            Operand::Target(target) => write!(f, "{} {}", self.opcode, target),
            Operand::Switch(targets) => write!(f, "{} ({} targets)", self.opcode, targets.len()),
        }
    }
}
