//! Hand-assembled instruction sequences for matcher and splicer tests.

use crate::{
    assembly::{opcodes, Instruction, InstructionList, OpCode, Operand},
    metadata::{method::MethodBody, token::Token},
    module::CilBody,
};

/// `ldarg.0; ldfld ai; ldc.i4.1; ldelem.r4; ldc.r4 0; <branch>`, the bite check of the
/// bobber AI. The branch has no target yet, see [`padded`].
pub fn nibble_check(ai: Token, branch: OpCode) -> Vec<Instruction> {
    vec![
        Instruction::simple(opcodes::LDARG_0),
        Instruction::new(opcodes::LDFLD, Operand::Token(ai)),
        Instruction::simple(opcodes::LDC_I4_1),
        Instruction::simple(opcodes::LDELEM_R4),
        Instruction::new(opcodes::LDC_R4, Operand::F32(0.0)),
        Instruction::simple(branch),
    ]
}

/// `sequence` with `before` nops in front and `after` nops behind. Branches without target
/// jump to the last instruction.
pub fn padded(before: usize, sequence: &[Instruction], after: usize) -> InstructionList {
    let mut list = InstructionList::new();
    for _ in 0..before {
        list.push(Instruction::simple(opcodes::NOP));
    }
    let placed: Vec<_> = sequence
        .iter()
        .map(|instruction| list.push(instruction.clone()))
        .collect();
    for _ in 0..after {
        list.push(Instruction::simple(opcodes::NOP));
    }

    if let Some(last) = list.at(list.len().saturating_sub(1)) {
        for instr_ref in placed {
            let instruction = list.get_mut(instr_ref);
            if instruction.opcode.is_branch() && instruction.operand == Operand::None {
                instruction.operand = Operand::Target(last);
            }
        }
    }
    list
}

/// A decoded body of `count` nops, without locals
pub fn body_of(count: usize) -> CilBody {
    let header = MethodBody {
        size_code: count,
        size_header: 0,
        local_var_sig_token: 0,
        max_stack: 8,
        is_fat: false,
        is_init_local: false,
        is_exception_data: false,
        exception_handlers: Vec::new(),
    };
    CilBody::decode(&header, &vec![0; count], 0).unwrap()
}
