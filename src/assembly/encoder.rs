//! CIL encoding: an [`InstructionList`] back to bytes.
//!
//! Instructions keep the opcode they were decoded or built with, so an unmodified list
//! encodes to the exact bytes it was decoded from. Branch displacements are recomputed
//! from the layout. When an insertion pushes the target of a short branch out of its 8-bit
//! range, the branch is relaxed to its long form and the layout is recomputed until it is
//! stable. Relaxation only ever grows instructions, so it terminates.

use std::collections::HashMap;

use crate::{
    assembly::{Instruction, InstrRef, InstructionList, OpCode, Operand, OperandType},
    file::io::push_le,
    Error::{InvalidBranch, InvalidInstruction},
    Result,
};

/// An encoded instruction stream with the offset of every instruction.
#[derive(Debug, Clone)]
pub struct EncodedStream {
    /// The encoded bytes
    pub code: Vec<u8>,
    /// Number of short branches that were relaxed to their long form
    pub relaxed: usize,
    offsets: HashMap<InstrRef, u32>,
}

impl EncodedStream {
    /// Offset of `instr_ref`, or the code size for `None` ("end of method")
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidBranch`] if the instruction was not encoded.
    pub fn offset_of(&self, instr_ref: Option<InstrRef>) -> Result<u32> {
        match instr_ref {
            #[allow(clippy::cast_possible_truncation)]
            None => Ok(self.code.len() as u32),
            Some(instr_ref) => self.offsets.get(&instr_ref).copied().ok_or_else(|| {
                InvalidBranch(format!("{instr_ref} is not part of the encoded method"))
            }),
        }
    }
}

/// Encoded size of `instruction` when written with `opcode`
fn instruction_size(opcode: OpCode, instruction: &Instruction) -> usize {
    let operand = match (opcode.operand_type().size(), &instruction.operand) {
        (Some(size), _) => size,
        (None, Operand::Switch(targets)) => 4 + 4 * targets.len(),
        (None, _) => 4,
    };
    opcode.size() + operand
}

/// Compute the start offset of every instruction and the total size
fn layout(list: &InstructionList, forms: &[OpCode]) -> (Vec<i64>, i64) {
    let mut offsets = Vec::with_capacity(forms.len());
    let mut cursor = 0_i64;
    for (form, (_, instruction)) in forms.iter().zip(list.iter()) {
        offsets.push(cursor);
        cursor += instruction_size(*form, instruction) as i64;
    }
    (offsets, cursor)
}

fn mismatch(opcode: OpCode, operand: &Operand) -> crate::Error {
    InvalidInstruction(format!("{opcode} cannot take operand {operand:?}"))
}

/// Write the operand of one instruction
fn write_operand(
    buffer: &mut Vec<u8>,
    opcode: OpCode,
    operand: &Operand,
    end: i64,
    target_offset: &dyn Fn(InstrRef) -> Result<i64>,
) -> Result<()> {
    match (opcode.operand_type(), operand) {
        (OperandType::None, Operand::None) => {}
        (OperandType::Int8, Operand::I32(value)) => {
            let value = i8::try_from(*value).map_err(|_| mismatch(opcode, operand))?;
            push_le(buffer, value);
        }
        (OperandType::UInt8, Operand::I32(value)) => {
            let value = u8::try_from(*value).map_err(|_| mismatch(opcode, operand))?;
            push_le(buffer, value);
        }
        (OperandType::Int32, Operand::I32(value)) => push_le(buffer, *value),
        (OperandType::Int64, Operand::I64(value)) => push_le(buffer, *value),
        (OperandType::Float32, Operand::F32(value)) => push_le(buffer, *value),
        (OperandType::Float64, Operand::F64(value)) => push_le(buffer, *value),
        (OperandType::Token, Operand::Token(token)) => push_le(buffer, token.value()),
        (OperandType::Local8, Operand::Local(index)) | (OperandType::Arg8, Operand::Arg(index)) => {
            let index = u8::try_from(*index).map_err(|_| mismatch(opcode, operand))?;
            push_le(buffer, index);
        }
        (OperandType::Local16, Operand::Local(index))
        | (OperandType::Arg16, Operand::Arg(index)) => push_le(buffer, *index),
        (OperandType::Branch8, Operand::Target(target)) => {
            let displacement = target_offset(*target)? - end;
            let displacement = i8::try_from(displacement).map_err(|_| {
                InvalidBranch(format!("{opcode} to {target} does not reach ({displacement})"))
            })?;
            push_le(buffer, displacement);
        }
        (OperandType::Branch32, Operand::Target(target)) => {
            let displacement = target_offset(*target)? - end;
            let displacement = i32::try_from(displacement).map_err(|_| {
                InvalidBranch(format!("{opcode} to {target} does not reach ({displacement})"))
            })?;
            push_le(buffer, displacement);
        }
        (OperandType::Switch, Operand::Switch(targets)) => {
            let count = u32::try_from(targets.len()).map_err(|_| mismatch(opcode, operand))?;
            push_le(buffer, count);
            for target in targets {
                let displacement = i32::try_from(target_offset(*target)? - end)
                    .map_err(|_| InvalidBranch(format!("switch to {target} does not reach")))?;
                push_le(buffer, displacement);
            }
        }
        _ => return Err(mismatch(opcode, operand)),
    }

    Ok(())
}

/// Encode the placed instructions of `list`.
///
/// # Errors
/// Returns [`crate::Error::InvalidBranch`] if a jump target is not placed in `list`, and
/// [`crate::Error::InvalidInstruction`] if an operand does not fit its opcode.
pub fn encode_stream(list: &InstructionList) -> Result<EncodedStream> {
    let index_of: HashMap<InstrRef, usize> = list
        .refs()
        .iter()
        .enumerate()
        .map(|(index, instr_ref)| (*instr_ref, index))
        .collect();

    for (instr_ref, instruction) in list.iter() {
        if let Some(target) = instruction
            .targets()
            .into_iter()
            .find(|target| !index_of.contains_key(target))
        {
            return Err(InvalidBranch(format!(
                "{} at {} jumps to {}, which is not in the method",
                instruction.opcode, instr_ref, target
            )));
        }
    }

    let mut forms: Vec<OpCode> = list.iter().map(|(_, instruction)| instruction.opcode).collect();
    let mut relaxed = 0;
    let (offsets, total) = loop {
        let (offsets, total) = layout(list, &forms);

        let mut changed = false;
        for (index, (_, instruction)) in list.iter().enumerate() {
            if !forms[index].is_short_branch() {
                continue;
            }
            let Operand::Target(target) = instruction.operand else {
                continue;
            };

            let end = offsets[index] + instruction_size(forms[index], instruction) as i64;
            let displacement = offsets[index_of[&target]] - end;
            if i8::try_from(displacement).is_err() {
                forms[index] = forms[index].long_form();
                relaxed += 1;
                changed = true;
            }
        }

        if !changed {
            break (offsets, total);
        }
    };

    let target_offset = |target: InstrRef| -> Result<i64> {
        index_of
            .get(&target)
            .map(|index| offsets[*index])
            .ok_or_else(|| InvalidBranch(format!("{target} is not in the method")))
    };

    let mut code = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
    let mut offset_map = HashMap::with_capacity(forms.len());
    for (index, (instr_ref, instruction)) in list.iter().enumerate() {
        let opcode = forms[index];
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        offset_map.insert(instr_ref, offsets[index] as u32);

        opcode.write(&mut code);
        let end = offsets[index] + instruction_size(opcode, instruction) as i64;
        write_operand(&mut code, opcode, &instruction.operand, end, &target_offset)?;
    }

    Ok(EncodedStream {
        code,
        relaxed,
        offsets: offset_map,
    })
}
