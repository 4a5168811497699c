//! CIL decoding: bytes to an [`InstructionList`] with identity targets.
//!
//! Decoding runs in two passes. The first pass reads every instruction in sequence and
//! records branch destinations as absolute offsets. The second pass allocates the
//! instructions and replaces each destination with the [`InstrRef`] of the instruction
//! starting there. A destination that does not fall on an instruction boundary makes the
//! body malformed.
//!
//! # Examples
//!
//! ```rust
//! use autofish::assembly::{decode_stream, opcodes, Operand};
//!
//! // ldarg.0; brfalse.s +1; nop; ret
//! let decoded = decode_stream(&[0x02, 0x2C, 0x01, 0x00, 0x2A])?;
//! let list = &decoded.instructions;
//! assert_eq!(list.len(), 4);
//!
//! let branch = list.instruction_at(1).unwrap();
//! assert_eq!(branch.opcode, opcodes::BRFALSE_S);
//! assert_eq!(branch.operand, Operand::Target(list.at(3).unwrap()));
//! # Ok::<(), autofish::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{
        Instruction, InstrRef, InstructionList, OpCode, Operand, OperandType, FE_PREFIX,
    },
    file::parser::Parser,
    metadata::token::Token,
    Error::InvalidInstruction,
    Result,
};

/// Operand as read in the first pass, with branch destinations still as offsets
enum RawOperand {
    Ready(Operand),
    Branch(i64),
    Switch(Vec<i64>),
}

/// A decoded method body together with its offset map.
#[derive(Debug, Clone)]
pub struct DecodedStream {
    /// The decoded instructions
    pub instructions: InstructionList,
    offsets: HashMap<u32, InstrRef>,
    code_size: u32,
}

impl DecodedStream {
    /// Identity of the instruction starting at `offset`.
    ///
    /// Returns `None` for the offset right after the last instruction, which exception
    /// clauses use to say "until the end of the method".
    ///
    /// # Errors
    /// Returns an error if `offset` is not an instruction boundary.
    pub fn ref_at(&self, offset: u32) -> Result<Option<InstrRef>> {
        if offset == self.code_size {
            return Ok(None);
        }

        match self.offsets.get(&offset) {
            Some(instr_ref) => Ok(Some(*instr_ref)),
            None => Err(malformed_error!(
                "Offset 0x{:04X} is not an instruction boundary",
                offset
            )),
        }
    }

    /// Size of the decoded code in bytes
    #[must_use]
    pub fn code_size(&self) -> u32 {
        self.code_size
    }
}

/// Read the opcode at the parser position
fn decode_opcode(parser: &mut Parser) -> Result<OpCode> {
    let first_byte = parser.read_le::<u8>()?;
    let opcode = if first_byte == FE_PREFIX {
        OpCode::extended(parser.read_le::<u8>()?)
    } else {
        OpCode::single(first_byte)
    };

    if !opcode.is_valid() {
        return Err(InvalidInstruction(format!(
            "reserved opcode {:?} at 0x{:04X}",
            opcode,
            parser.pos() - opcode.size()
        )));
    }

    Ok(opcode)
}

/// Decode one instruction, leaving branch destinations as absolute offsets
fn decode_instruction(parser: &mut Parser) -> Result<(OpCode, RawOperand)> {
    let opcode = decode_opcode(parser)?;

    let operand = match opcode.operand_type() {
        OperandType::None => RawOperand::Ready(Operand::None),
        OperandType::Int8 => RawOperand::Ready(Operand::I32(i32::from(parser.read_le::<i8>()?))),
        OperandType::UInt8 => RawOperand::Ready(Operand::I32(i32::from(parser.read_le::<u8>()?))),
        OperandType::Int32 => RawOperand::Ready(Operand::I32(parser.read_le::<i32>()?)),
        OperandType::Int64 => RawOperand::Ready(Operand::I64(parser.read_le::<i64>()?)),
        OperandType::Float32 => RawOperand::Ready(Operand::F32(parser.read_le::<f32>()?)),
        OperandType::Float64 => RawOperand::Ready(Operand::F64(parser.read_le::<f64>()?)),
        OperandType::Token => RawOperand::Ready(Operand::Token(Token::new(parser.read_le::<u32>()?))),
        OperandType::Local8 => {
            RawOperand::Ready(Operand::Local(u16::from(parser.read_le::<u8>()?)))
        }
        OperandType::Local16 => RawOperand::Ready(Operand::Local(parser.read_le::<u16>()?)),
        OperandType::Arg8 => RawOperand::Ready(Operand::Arg(u16::from(parser.read_le::<u8>()?))),
        OperandType::Arg16 => RawOperand::Ready(Operand::Arg(parser.read_le::<u16>()?)),
        OperandType::Branch8 => {
            let displacement = i64::from(parser.read_le::<i8>()?);
            RawOperand::Branch(parser.pos() as i64 + displacement)
        }
        OperandType::Branch32 => {
            let displacement = i64::from(parser.read_le::<i32>()?);
            RawOperand::Branch(parser.pos() as i64 + displacement)
        }
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            if case_count.saturating_mul(4) > parser.len() - parser.pos() {
                return Err(malformed_error!(
                    "Switch with {} targets exceeds the method body",
                    case_count
                ));
            }

            let mut displacements = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                displacements.push(i64::from(parser.read_le::<i32>()?));
            }

            let end = parser.pos() as i64;
            RawOperand::Switch(
                displacements
                    .into_iter()
                    .map(|displacement| end + displacement)
                    .collect(),
            )
        }
    };

    Ok((opcode, operand))
}

/// Decode a complete instruction stream.
///
/// # Errors
/// Returns an error if an opcode is reserved, an operand is truncated, or a branch lands
/// outside an instruction boundary.
pub fn decode_stream(code: &[u8]) -> Result<DecodedStream> {
    let code_size = u32::try_from(code.len())
        .map_err(|_| malformed_error!("Method body of {} bytes is too large", code.len()))?;

    let mut parser = Parser::new(code);
    let mut raw = Vec::new();
    while parser.has_more_data() {
        #[allow(clippy::cast_possible_truncation)]
        let offset = parser.pos() as u32;
        let (opcode, operand) = decode_instruction(&mut parser)?;
        raw.push((offset, opcode, operand));
    }

    let mut instructions = InstructionList::new();
    let mut offsets = HashMap::with_capacity(raw.len());
    for (offset, opcode, _) in &raw {
        let instr_ref = instructions.push(Instruction::simple(*opcode));
        offsets.insert(*offset, instr_ref);
    }

    let resolve = |target: i64| -> Result<InstrRef> {
        u32::try_from(target)
            .ok()
            .and_then(|target| offsets.get(&target).copied())
            .ok_or_else(|| malformed_error!("Branch target 0x{:X} is not an instruction", target))
    };

    let mut resolved = Vec::with_capacity(raw.len());
    for (_, _, operand) in raw {
        resolved.push(match operand {
            RawOperand::Ready(operand) => operand,
            RawOperand::Branch(target) => Operand::Target(resolve(target)?),
            RawOperand::Switch(targets) => Operand::Switch(
                targets
                    .into_iter()
                    .map(&resolve)
                    .collect::<Result<Vec<_>>>()?,
            ),
        });
    }

    for (index, operand) in resolved.into_iter().enumerate() {
        if let Some(instr_ref) = instructions.at(index) {
            instructions.get_mut(instr_ref).operand = operand;
        }
    }

    Ok(DecodedStream {
        instructions,
        offsets,
        code_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes;

    #[test]
    fn operands() {
        #[rustfmt::skip]
        let code = [
            0x11, 0x10,                         // ldloc.s 16
            0xFE, 0x0C, 0x00, 0x01,             // ldloc 256
            0x22, 0x00, 0x00, 0x00, 0x00,       // ldc.r4 0.0
            0x7B, 0x01, 0x00, 0x00, 0x04,       // ldfld 0x04000001
            0x1F, 0xFF,                         // ldc.i4.s -1
            0x2A,                               // ret
        ];

        let decoded = decode_stream(&code).unwrap();
        let list = &decoded.instructions;

        assert_eq!(list.len(), 6);
        assert_eq!(list.instruction_at(0).unwrap().operand, Operand::Local(16));
        assert_eq!(list.instruction_at(1).unwrap().operand, Operand::Local(256));
        assert_eq!(list.instruction_at(2).unwrap().operand, Operand::F32(0.0));
        assert_eq!(
            list.instruction_at(3).unwrap().token(),
            Some(Token::new(0x0400_0001))
        );
        assert_eq!(list.instruction_at(4).unwrap().i4_constant(), Some(-1));
        assert_eq!(list.instruction_at(5).unwrap().opcode, opcodes::RET);
    }

    #[test]
    fn branch_targets_are_identities() {
        #[rustfmt::skip]
        let code = [
            0x16,                               // 0: ldc.i4.0
            0x45, 0x02, 0x00, 0x00, 0x00,       // 1: switch (2)
                  0x00, 0x00, 0x00, 0x00,
                  0x02, 0x00, 0x00, 0x00,
            0x2B, 0xFE,                         // 14: br.s 14
            0x00,                               // 16: nop
            0x2A,                               // 17: ret
        ];

        let decoded = decode_stream(&code).unwrap();
        let list = &decoded.instructions;
        let br = list.at(2).unwrap();
        let nop = list.at(3).unwrap();

        assert_eq!(
            list.instruction_at(1).unwrap().operand,
            Operand::Switch(vec![br, nop])
        );
        assert_eq!(list.get(br).operand, Operand::Target(br));
        assert_eq!(decoded.ref_at(16).unwrap(), Some(nop));
        assert_eq!(decoded.ref_at(18).unwrap(), None);
        assert!(decoded.ref_at(15).is_err());
    }

    #[test]
    fn invalid() {
        // br.s into the middle of ldc.i4
        assert!(decode_stream(&[0x2B, 0x01, 0x20, 0x00, 0x00, 0x00, 0x00]).is_err());
        // reserved opcode
        assert!(decode_stream(&[0x24]).is_err());
        // truncated operand
        assert!(decode_stream(&[0x20, 0x00]).is_err());
        // switch claiming more targets than bytes
        assert!(decode_stream(&[0x45, 0xFF, 0xFF, 0xFF, 0x0F]).is_err());
    }
}
