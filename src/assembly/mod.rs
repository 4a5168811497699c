//! CIL instruction model, decoding and encoding.
//!
//! This module turns method body bytes into an editable [`InstructionList`] and back. The
//! list addresses instructions by [`InstrRef`] identity, and branch operands hold
//! identities instead of offsets, so the patch layer can insert instructions at any
//! position without touching a single displacement.
//!
//! # Key Components
//!
//! - [`opcodes`] - Opcode constants and the static ECMA-335 opcode tables
//! - [`Instruction`], [`Operand`], [`OpCode`] - The instruction model
//! - [`InstructionList`] - Arena of instructions plus their order
//! - [`decode_stream`] - Bytes to instructions, offsets to identities
//! - [`encode_stream`] - Instructions to bytes, with branch relaxation
//!
//! # Examples
//!
//! ```rust
//! use autofish::assembly::{decode_stream, encode_stream};
//!
//! let code = [0x02, 0x2C, 0x01, 0x00, 0x2A];
//! let decoded = decode_stream(&code)?;
//! let encoded = encode_stream(&decoded.instructions)?;
//! assert_eq!(encoded.code, code);
//! # Ok::<(), autofish::Error>(())
//! ```

mod decoder;
mod encoder;
mod instruction;
mod list;
pub mod opcodes;

pub use decoder::{decode_stream, DecodedStream};
pub use encoder::{encode_stream, EncodedStream};
pub use instruction::{
    CilInstruction, FlowType, Instruction, OpCode, Operand, OperandType, StackBehavior,
    FE_PREFIX,
};
pub use list::{InstrRef, InstructionList};
pub use opcodes::{INSTRUCTIONS, INSTRUCTIONS_FE, RESERVED};
