//! CIL opcode constants and the static opcode tables (ECMA-335 Partition III).
//!
//! Single-byte opcodes are named after their mnemonic (e.g. [`CALL`]). Two-byte opcodes
//! that use the `0xFE` prefix are constructed with [`OpCode::extended`] (e.g. [`CEQ`]).
#![allow(missing_docs)]

use crate::assembly::{CilInstruction, FlowType, OpCode, OperandType};

macro_rules! op {
    ($name:expr, $op:ident, $flow:ident, $pops:expr, $pushes:expr) => {
        CilInstruction {
            instr: $name,
            op_type: OperandType::$op,
            flow: FlowType::$flow,
            stack_pops: $pops,
            stack_pushes: $pushes,
        }
    };
}

/// Table entry of reserved and unassigned opcodes
pub static RESERVED: CilInstruction = CilInstruction {
    instr: "",
    op_type: OperandType::None,
    flow: FlowType::Sequential,
    stack_pops: 0,
    stack_pushes: 0,
};

pub(crate) const BR_S_CODE: u8 = 0x2B;
pub(crate) const BLT_UN_S_CODE: u8 = 0x37;
pub(crate) const BR_CODE: u8 = 0x38;
pub(crate) const BLT_UN_CODE: u8 = 0x44;
pub(crate) const LEAVE_CODE: u8 = 0xDD;
pub(crate) const LEAVE_S_CODE: u8 = 0xDE;

pub const NOP: OpCode = OpCode::single(0x00);
pub const BREAK: OpCode = OpCode::single(0x01);
pub const LDARG_0: OpCode = OpCode::single(0x02);
pub const LDARG_1: OpCode = OpCode::single(0x03);
pub const LDARG_2: OpCode = OpCode::single(0x04);
pub const LDARG_3: OpCode = OpCode::single(0x05);
pub const LDLOC_0: OpCode = OpCode::single(0x06);
pub const LDLOC_1: OpCode = OpCode::single(0x07);
pub const LDLOC_2: OpCode = OpCode::single(0x08);
pub const LDLOC_3: OpCode = OpCode::single(0x09);
pub const STLOC_0: OpCode = OpCode::single(0x0A);
pub const STLOC_1: OpCode = OpCode::single(0x0B);
pub const STLOC_2: OpCode = OpCode::single(0x0C);
pub const STLOC_3: OpCode = OpCode::single(0x0D);
pub const LDARG_S: OpCode = OpCode::single(0x0E);
pub const LDARGA_S: OpCode = OpCode::single(0x0F);
pub const STARG_S: OpCode = OpCode::single(0x10);
pub const LDLOC_S: OpCode = OpCode::single(0x11);
pub const LDLOCA_S: OpCode = OpCode::single(0x12);
pub const STLOC_S: OpCode = OpCode::single(0x13);
pub const LDNULL: OpCode = OpCode::single(0x14);
pub const LDC_I4_M1: OpCode = OpCode::single(0x15);
pub const LDC_I4_0: OpCode = OpCode::single(0x16);
pub const LDC_I4_1: OpCode = OpCode::single(0x17);
pub const LDC_I4_2: OpCode = OpCode::single(0x18);
pub const LDC_I4_3: OpCode = OpCode::single(0x19);
pub const LDC_I4_4: OpCode = OpCode::single(0x1A);
pub const LDC_I4_5: OpCode = OpCode::single(0x1B);
pub const LDC_I4_6: OpCode = OpCode::single(0x1C);
pub const LDC_I4_7: OpCode = OpCode::single(0x1D);
pub const LDC_I4_8: OpCode = OpCode::single(0x1E);
pub const LDC_I4_S: OpCode = OpCode::single(0x1F);
pub const LDC_I4: OpCode = OpCode::single(0x20);
pub const LDC_I8: OpCode = OpCode::single(0x21);
pub const LDC_R4: OpCode = OpCode::single(0x22);
pub const LDC_R8: OpCode = OpCode::single(0x23);
pub const DUP: OpCode = OpCode::single(0x25);
pub const POP: OpCode = OpCode::single(0x26);
pub const JMP: OpCode = OpCode::single(0x27);
pub const CALL: OpCode = OpCode::single(0x28);
pub const CALLI: OpCode = OpCode::single(0x29);
pub const RET: OpCode = OpCode::single(0x2A);
pub const BR_S: OpCode = OpCode::single(0x2B);
pub const BRFALSE_S: OpCode = OpCode::single(0x2C);
pub const BRTRUE_S: OpCode = OpCode::single(0x2D);
pub const BEQ_S: OpCode = OpCode::single(0x2E);
pub const BGE_S: OpCode = OpCode::single(0x2F);
pub const BGT_S: OpCode = OpCode::single(0x30);
pub const BLE_S: OpCode = OpCode::single(0x31);
pub const BLT_S: OpCode = OpCode::single(0x32);
pub const BNE_UN_S: OpCode = OpCode::single(0x33);
pub const BGE_UN_S: OpCode = OpCode::single(0x34);
pub const BGT_UN_S: OpCode = OpCode::single(0x35);
pub const BLE_UN_S: OpCode = OpCode::single(0x36);
pub const BLT_UN_S: OpCode = OpCode::single(0x37);
pub const BR: OpCode = OpCode::single(0x38);
pub const BRFALSE: OpCode = OpCode::single(0x39);
pub const BRTRUE: OpCode = OpCode::single(0x3A);
pub const BEQ: OpCode = OpCode::single(0x3B);
pub const BGE: OpCode = OpCode::single(0x3C);
pub const BGT: OpCode = OpCode::single(0x3D);
pub const BLE: OpCode = OpCode::single(0x3E);
pub const BLT: OpCode = OpCode::single(0x3F);
pub const BNE_UN: OpCode = OpCode::single(0x40);
pub const BGE_UN: OpCode = OpCode::single(0x41);
pub const BGT_UN: OpCode = OpCode::single(0x42);
pub const BLE_UN: OpCode = OpCode::single(0x43);
pub const BLT_UN: OpCode = OpCode::single(0x44);
pub const SWITCH: OpCode = OpCode::single(0x45);
pub const LDIND_I1: OpCode = OpCode::single(0x46);
pub const LDIND_U1: OpCode = OpCode::single(0x47);
pub const LDIND_I2: OpCode = OpCode::single(0x48);
pub const LDIND_U2: OpCode = OpCode::single(0x49);
pub const LDIND_I4: OpCode = OpCode::single(0x4A);
pub const LDIND_U4: OpCode = OpCode::single(0x4B);
pub const LDIND_I8: OpCode = OpCode::single(0x4C);
pub const LDIND_I: OpCode = OpCode::single(0x4D);
pub const LDIND_R4: OpCode = OpCode::single(0x4E);
pub const LDIND_R8: OpCode = OpCode::single(0x4F);
pub const LDIND_REF: OpCode = OpCode::single(0x50);
pub const STIND_REF: OpCode = OpCode::single(0x51);
pub const STIND_I1: OpCode = OpCode::single(0x52);
pub const STIND_I2: OpCode = OpCode::single(0x53);
pub const STIND_I4: OpCode = OpCode::single(0x54);
pub const STIND_I8: OpCode = OpCode::single(0x55);
pub const STIND_R4: OpCode = OpCode::single(0x56);
pub const STIND_R8: OpCode = OpCode::single(0x57);
pub const ADD: OpCode = OpCode::single(0x58);
pub const SUB: OpCode = OpCode::single(0x59);
pub const MUL: OpCode = OpCode::single(0x5A);
pub const DIV: OpCode = OpCode::single(0x5B);
pub const DIV_UN: OpCode = OpCode::single(0x5C);
pub const REM: OpCode = OpCode::single(0x5D);
pub const REM_UN: OpCode = OpCode::single(0x5E);
pub const AND: OpCode = OpCode::single(0x5F);
pub const OR: OpCode = OpCode::single(0x60);
pub const XOR: OpCode = OpCode::single(0x61);
pub const SHL: OpCode = OpCode::single(0x62);
pub const SHR: OpCode = OpCode::single(0x63);
pub const SHR_UN: OpCode = OpCode::single(0x64);
pub const NEG: OpCode = OpCode::single(0x65);
pub const NOT: OpCode = OpCode::single(0x66);
pub const CONV_I1: OpCode = OpCode::single(0x67);
pub const CONV_I2: OpCode = OpCode::single(0x68);
pub const CONV_I4: OpCode = OpCode::single(0x69);
pub const CONV_I8: OpCode = OpCode::single(0x6A);
pub const CONV_R4: OpCode = OpCode::single(0x6B);
pub const CONV_R8: OpCode = OpCode::single(0x6C);
pub const CONV_U4: OpCode = OpCode::single(0x6D);
pub const CONV_U8: OpCode = OpCode::single(0x6E);
pub const CALLVIRT: OpCode = OpCode::single(0x6F);
pub const CPOBJ: OpCode = OpCode::single(0x70);
pub const LDOBJ: OpCode = OpCode::single(0x71);
pub const LDSTR: OpCode = OpCode::single(0x72);
pub const NEWOBJ: OpCode = OpCode::single(0x73);
pub const CASTCLASS: OpCode = OpCode::single(0x74);
pub const ISINST: OpCode = OpCode::single(0x75);
pub const CONV_R_UN: OpCode = OpCode::single(0x76);
pub const UNBOX: OpCode = OpCode::single(0x79);
pub const THROW: OpCode = OpCode::single(0x7A);
pub const LDFLD: OpCode = OpCode::single(0x7B);
pub const LDFLDA: OpCode = OpCode::single(0x7C);
pub const STFLD: OpCode = OpCode::single(0x7D);
pub const LDSFLD: OpCode = OpCode::single(0x7E);
pub const LDSFLDA: OpCode = OpCode::single(0x7F);
pub const STSFLD: OpCode = OpCode::single(0x80);
pub const STOBJ: OpCode = OpCode::single(0x81);
pub const CONV_OVF_I1_UN: OpCode = OpCode::single(0x82);
pub const CONV_OVF_I2_UN: OpCode = OpCode::single(0x83);
pub const CONV_OVF_I4_UN: OpCode = OpCode::single(0x84);
pub const CONV_OVF_I8_UN: OpCode = OpCode::single(0x85);
pub const CONV_OVF_U1_UN: OpCode = OpCode::single(0x86);
pub const CONV_OVF_U2_UN: OpCode = OpCode::single(0x87);
pub const CONV_OVF_U4_UN: OpCode = OpCode::single(0x88);
pub const CONV_OVF_U8_UN: OpCode = OpCode::single(0x89);
pub const CONV_OVF_I_UN: OpCode = OpCode::single(0x8A);
pub const CONV_OVF_U_UN: OpCode = OpCode::single(0x8B);
pub const BOX: OpCode = OpCode::single(0x8C);
pub const NEWARR: OpCode = OpCode::single(0x8D);
pub const LDLEN: OpCode = OpCode::single(0x8E);
pub const LDELEMA: OpCode = OpCode::single(0x8F);
pub const LDELEM_I1: OpCode = OpCode::single(0x90);
pub const LDELEM_U1: OpCode = OpCode::single(0x91);
pub const LDELEM_I2: OpCode = OpCode::single(0x92);
pub const LDELEM_U2: OpCode = OpCode::single(0x93);
pub const LDELEM_I4: OpCode = OpCode::single(0x94);
pub const LDELEM_U4: OpCode = OpCode::single(0x95);
pub const LDELEM_I8: OpCode = OpCode::single(0x96);
pub const LDELEM_I: OpCode = OpCode::single(0x97);
pub const LDELEM_R4: OpCode = OpCode::single(0x98);
pub const LDELEM_R8: OpCode = OpCode::single(0x99);
pub const LDELEM_REF: OpCode = OpCode::single(0x9A);
pub const STELEM_I: OpCode = OpCode::single(0x9B);
pub const STELEM_I1: OpCode = OpCode::single(0x9C);
pub const STELEM_I2: OpCode = OpCode::single(0x9D);
pub const STELEM_I4: OpCode = OpCode::single(0x9E);
pub const STELEM_I8: OpCode = OpCode::single(0x9F);
pub const STELEM_R4: OpCode = OpCode::single(0xA0);
pub const STELEM_R8: OpCode = OpCode::single(0xA1);
pub const STELEM_REF: OpCode = OpCode::single(0xA2);
pub const LDELEM: OpCode = OpCode::single(0xA3);
pub const STELEM: OpCode = OpCode::single(0xA4);
pub const UNBOX_ANY: OpCode = OpCode::single(0xA5);
pub const CONV_OVF_I1: OpCode = OpCode::single(0xB3);
pub const CONV_OVF_U1: OpCode = OpCode::single(0xB4);
pub const CONV_OVF_I2: OpCode = OpCode::single(0xB5);
pub const CONV_OVF_U2: OpCode = OpCode::single(0xB6);
pub const CONV_OVF_I4: OpCode = OpCode::single(0xB7);
pub const CONV_OVF_U4: OpCode = OpCode::single(0xB8);
pub const CONV_OVF_I8: OpCode = OpCode::single(0xB9);
pub const CONV_OVF_U8: OpCode = OpCode::single(0xBA);
pub const REFANYVAL: OpCode = OpCode::single(0xC2);
pub const CKFINITE: OpCode = OpCode::single(0xC3);
pub const MKREFANY: OpCode = OpCode::single(0xC6);
pub const LDTOKEN: OpCode = OpCode::single(0xD0);
pub const CONV_U2: OpCode = OpCode::single(0xD1);
pub const CONV_U1: OpCode = OpCode::single(0xD2);
pub const CONV_I: OpCode = OpCode::single(0xD3);
pub const CONV_OVF_I: OpCode = OpCode::single(0xD4);
pub const CONV_OVF_U: OpCode = OpCode::single(0xD5);
pub const ADD_OVF: OpCode = OpCode::single(0xD6);
pub const ADD_OVF_UN: OpCode = OpCode::single(0xD7);
pub const MUL_OVF: OpCode = OpCode::single(0xD8);
pub const MUL_OVF_UN: OpCode = OpCode::single(0xD9);
pub const SUB_OVF: OpCode = OpCode::single(0xDA);
pub const SUB_OVF_UN: OpCode = OpCode::single(0xDB);
pub const ENDFINALLY: OpCode = OpCode::single(0xDC);
pub const LEAVE: OpCode = OpCode::single(0xDD);
pub const LEAVE_S: OpCode = OpCode::single(0xDE);
pub const STIND_I: OpCode = OpCode::single(0xDF);
pub const CONV_U: OpCode = OpCode::single(0xE0);

// Two-byte opcodes, 0xFE prefix
pub const ARGLIST: OpCode = OpCode::extended(0x00);
pub const CEQ: OpCode = OpCode::extended(0x01);
pub const CGT: OpCode = OpCode::extended(0x02);
pub const CGT_UN: OpCode = OpCode::extended(0x03);
pub const CLT: OpCode = OpCode::extended(0x04);
pub const CLT_UN: OpCode = OpCode::extended(0x05);
pub const LDFTN: OpCode = OpCode::extended(0x06);
pub const LDVIRTFTN: OpCode = OpCode::extended(0x07);
pub const LDARG: OpCode = OpCode::extended(0x09);
pub const LDARGA: OpCode = OpCode::extended(0x0A);
pub const STARG: OpCode = OpCode::extended(0x0B);
pub const LDLOC: OpCode = OpCode::extended(0x0C);
pub const LDLOCA: OpCode = OpCode::extended(0x0D);
pub const STLOC: OpCode = OpCode::extended(0x0E);
pub const LOCALLOC: OpCode = OpCode::extended(0x0F);
pub const ENDFILTER: OpCode = OpCode::extended(0x11);
pub const UNALIGNED: OpCode = OpCode::extended(0x12);
pub const VOLATILE: OpCode = OpCode::extended(0x13);
pub const TAIL: OpCode = OpCode::extended(0x14);
pub const INITOBJ: OpCode = OpCode::extended(0x15);
pub const CONSTRAINED: OpCode = OpCode::extended(0x16);
pub const CPBLK: OpCode = OpCode::extended(0x17);
pub const INITBLK: OpCode = OpCode::extended(0x18);
pub const NO: OpCode = OpCode::extended(0x19);
pub const RETHROW: OpCode = OpCode::extended(0x1A);
pub const SIZEOF: OpCode = OpCode::extended(0x1C);
pub const REFANYTYPE: OpCode = OpCode::extended(0x1D);
pub const READONLY: OpCode = OpCode::extended(0x1E);

pub static INSTRUCTIONS: [CilInstruction; 225] = [
    op!("nop", None, Sequential, 0, 0), // 0x00
    op!("break", None, Sequential, 0, 0), // 0x01
    op!("ldarg.0", None, Sequential, 0, 1), // 0x02
    op!("ldarg.1", None, Sequential, 0, 1), // 0x03
    op!("ldarg.2", None, Sequential, 0, 1), // 0x04
    op!("ldarg.3", None, Sequential, 0, 1), // 0x05
    op!("ldloc.0", None, Sequential, 0, 1), // 0x06
    op!("ldloc.1", None, Sequential, 0, 1), // 0x07
    op!("ldloc.2", None, Sequential, 0, 1), // 0x08
    op!("ldloc.3", None, Sequential, 0, 1), // 0x09
    op!("stloc.0", None, Sequential, 1, 0), // 0x0A
    op!("stloc.1", None, Sequential, 1, 0), // 0x0B
    op!("stloc.2", None, Sequential, 1, 0), // 0x0C
    op!("stloc.3", None, Sequential, 1, 0), // 0x0D
    op!("ldarg.s", Arg8, Sequential, 0, 1), // 0x0E
    op!("ldarga.s", Arg8, Sequential, 0, 1), // 0x0F
    op!("starg.s", Arg8, Sequential, 1, 0), // 0x10
    op!("ldloc.s", Local8, Sequential, 0, 1), // 0x11
    op!("ldloca.s", Local8, Sequential, 0, 1), // 0x12
    op!("stloc.s", Local8, Sequential, 1, 0), // 0x13
    op!("ldnull", None, Sequential, 0, 1), // 0x14
    op!("ldc.i4.m1", None, Sequential, 0, 1), // 0x15
    op!("ldc.i4.0", None, Sequential, 0, 1), // 0x16
    op!("ldc.i4.1", None, Sequential, 0, 1), // 0x17
    op!("ldc.i4.2", None, Sequential, 0, 1), // 0x18
    op!("ldc.i4.3", None, Sequential, 0, 1), // 0x19
    op!("ldc.i4.4", None, Sequential, 0, 1), // 0x1A
    op!("ldc.i4.5", None, Sequential, 0, 1), // 0x1B
    op!("ldc.i4.6", None, Sequential, 0, 1), // 0x1C
    op!("ldc.i4.7", None, Sequential, 0, 1), // 0x1D
    op!("ldc.i4.8", None, Sequential, 0, 1), // 0x1E
    op!("ldc.i4.s", Int8, Sequential, 0, 1), // 0x1F
    op!("ldc.i4", Int32, Sequential, 0, 1), // 0x20
    op!("ldc.i8", Int64, Sequential, 0, 1), // 0x21
    op!("ldc.r4", Float32, Sequential, 0, 1), // 0x22
    op!("ldc.r8", Float64, Sequential, 0, 1), // 0x23
    RESERVED, // 0x24
    op!("dup", None, Sequential, 1, 2), // 0x25
    op!("pop", None, Sequential, 1, 0), // 0x26
    op!("jmp", Token, Call, 0, 0), // 0x27
    op!("call", Token, Call, 0, 0), // 0x28
    op!("calli", Token, Call, 0, 0), // 0x29
    op!("ret", None, Return, 0, 0), // 0x2A
    op!("br.s", Branch8, UnconditionalBranch, 0, 0), // 0x2B
    op!("brfalse.s", Branch8, ConditionalBranch, 1, 0), // 0x2C
    op!("brtrue.s", Branch8, ConditionalBranch, 1, 0), // 0x2D
    op!("beq.s", Branch8, ConditionalBranch, 2, 0), // 0x2E
    op!("bge.s", Branch8, ConditionalBranch, 2, 0), // 0x2F
    op!("bgt.s", Branch8, ConditionalBranch, 2, 0), // 0x30
    op!("ble.s", Branch8, ConditionalBranch, 2, 0), // 0x31
    op!("blt.s", Branch8, ConditionalBranch, 2, 0), // 0x32
    op!("bne.un.s", Branch8, ConditionalBranch, 2, 0), // 0x33
    op!("bge.un.s", Branch8, ConditionalBranch, 2, 0), // 0x34
    op!("bgt.un.s", Branch8, ConditionalBranch, 2, 0), // 0x35
    op!("ble.un.s", Branch8, ConditionalBranch, 2, 0), // 0x36
    op!("blt.un.s", Branch8, ConditionalBranch, 2, 0), // 0x37
    op!("br", Branch32, UnconditionalBranch, 0, 0), // 0x38
    op!("brfalse", Branch32, ConditionalBranch, 1, 0), // 0x39
    op!("brtrue", Branch32, ConditionalBranch, 1, 0), // 0x3A
    op!("beq", Branch32, ConditionalBranch, 2, 0), // 0x3B
    op!("bge", Branch32, ConditionalBranch, 2, 0), // 0x3C
    op!("bgt", Branch32, ConditionalBranch, 2, 0), // 0x3D
    op!("ble", Branch32, ConditionalBranch, 2, 0), // 0x3E
    op!("blt", Branch32, ConditionalBranch, 2, 0), // 0x3F
    op!("bne.un", Branch32, ConditionalBranch, 2, 0), // 0x40
    op!("bge.un", Branch32, ConditionalBranch, 2, 0), // 0x41
    op!("bgt.un", Branch32, ConditionalBranch, 2, 0), // 0x42
    op!("ble.un", Branch32, ConditionalBranch, 2, 0), // 0x43
    op!("blt.un", Branch32, ConditionalBranch, 2, 0), // 0x44
    op!("switch", Switch, Switch, 1, 0), // 0x45
    op!("ldind.i1", None, Sequential, 1, 1), // 0x46
    op!("ldind.u1", None, Sequential, 1, 1), // 0x47
    op!("ldind.i2", None, Sequential, 1, 1), // 0x48
    op!("ldind.u2", None, Sequential, 1, 1), // 0x49
    op!("ldind.i4", None, Sequential, 1, 1), // 0x4A
    op!("ldind.u4", None, Sequential, 1, 1), // 0x4B
    op!("ldind.i8", None, Sequential, 1, 1), // 0x4C
    op!("ldind.i", None, Sequential, 1, 1), // 0x4D
    op!("ldind.r4", None, Sequential, 1, 1), // 0x4E
    op!("ldind.r8", None, Sequential, 1, 1), // 0x4F
    op!("ldind.ref", None, Sequential, 1, 1), // 0x50
    op!("stind.ref", None, Sequential, 2, 0), // 0x51
    op!("stind.i1", None, Sequential, 2, 0), // 0x52
    op!("stind.i2", None, Sequential, 2, 0), // 0x53
    op!("stind.i4", None, Sequential, 2, 0), // 0x54
    op!("stind.i8", None, Sequential, 2, 0), // 0x55
    op!("stind.r4", None, Sequential, 2, 0), // 0x56
    op!("stind.r8", None, Sequential, 2, 0), // 0x57
    op!("add", None, Sequential, 2, 1), // 0x58
    op!("sub", None, Sequential, 2, 1), // 0x59
    op!("mul", None, Sequential, 2, 1), // 0x5A
    op!("div", None, Sequential, 2, 1), // 0x5B
    op!("div.un", None, Sequential, 2, 1), // 0x5C
    op!("rem", None, Sequential, 2, 1), // 0x5D
    op!("rem.un", None, Sequential, 2, 1), // 0x5E
    op!("and", None, Sequential, 2, 1), // 0x5F
    op!("or", None, Sequential, 2, 1), // 0x60
    op!("xor", None, Sequential, 2, 1), // 0x61
    op!("shl", None, Sequential, 2, 1), // 0x62
    op!("shr", None, Sequential, 2, 1), // 0x63
    op!("shr.un", None, Sequential, 2, 1), // 0x64
    op!("neg", None, Sequential, 1, 1), // 0x65
    op!("not", None, Sequential, 1, 1), // 0x66
    op!("conv.i1", None, Sequential, 1, 1), // 0x67
    op!("conv.i2", None, Sequential, 1, 1), // 0x68
    op!("conv.i4", None, Sequential, 1, 1), // 0x69
    op!("conv.i8", None, Sequential, 1, 1), // 0x6A
    op!("conv.r4", None, Sequential, 1, 1), // 0x6B
    op!("conv.r8", None, Sequential, 1, 1), // 0x6C
    op!("conv.u4", None, Sequential, 1, 1), // 0x6D
    op!("conv.u8", None, Sequential, 1, 1), // 0x6E
    op!("callvirt", Token, Call, 0, 0), // 0x6F
    op!("cpobj", Token, Sequential, 2, 0), // 0x70
    op!("ldobj", Token, Sequential, 1, 1), // 0x71
    op!("ldstr", Token, Sequential, 0, 1), // 0x72
    op!("newobj", Token, Call, 0, 1), // 0x73
    op!("castclass", Token, Sequential, 1, 1), // 0x74
    op!("isinst", Token, Sequential, 1, 1), // 0x75
    op!("conv.r.un", None, Sequential, 1, 1), // 0x76
    RESERVED, // 0x77
    RESERVED, // 0x78
    op!("unbox", Token, Sequential, 1, 1), // 0x79
    op!("throw", None, Throw, 1, 0), // 0x7A
    op!("ldfld", Token, Sequential, 1, 1), // 0x7B
    op!("ldflda", Token, Sequential, 1, 1), // 0x7C
    op!("stfld", Token, Sequential, 2, 0), // 0x7D
    op!("ldsfld", Token, Sequential, 0, 1), // 0x7E
    op!("ldsflda", Token, Sequential, 0, 1), // 0x7F
    op!("stsfld", Token, Sequential, 1, 0), // 0x80
    op!("stobj", Token, Sequential, 2, 0), // 0x81
    op!("conv.ovf.i1.un", None, Sequential, 1, 1), // 0x82
    op!("conv.ovf.i2.un", None, Sequential, 1, 1), // 0x83
    op!("conv.ovf.i4.un", None, Sequential, 1, 1), // 0x84
    op!("conv.ovf.i8.un", None, Sequential, 1, 1), // 0x85
    op!("conv.ovf.u1.un", None, Sequential, 1, 1), // 0x86
    op!("conv.ovf.u2.un", None, Sequential, 1, 1), // 0x87
    op!("conv.ovf.u4.un", None, Sequential, 1, 1), // 0x88
    op!("conv.ovf.u8.un", None, Sequential, 1, 1), // 0x89
    op!("conv.ovf.i.un", None, Sequential, 1, 1), // 0x8A
    op!("conv.ovf.u.un", None, Sequential, 1, 1), // 0x8B
    op!("box", Token, Sequential, 1, 1), // 0x8C
    op!("newarr", Token, Sequential, 1, 1), // 0x8D
    op!("ldlen", None, Sequential, 1, 1), // 0x8E
    op!("ldelema", Token, Sequential, 2, 1), // 0x8F
    op!("ldelem.i1", None, Sequential, 2, 1), // 0x90
    op!("ldelem.u1", None, Sequential, 2, 1), // 0x91
    op!("ldelem.i2", None, Sequential, 2, 1), // 0x92
    op!("ldelem.u2", None, Sequential, 2, 1), // 0x93
    op!("ldelem.i4", None, Sequential, 2, 1), // 0x94
    op!("ldelem.u4", None, Sequential, 2, 1), // 0x95
    op!("ldelem.i8", None, Sequential, 2, 1), // 0x96
    op!("ldelem.i", None, Sequential, 2, 1), // 0x97
    op!("ldelem.r4", None, Sequential, 2, 1), // 0x98
    op!("ldelem.r8", None, Sequential, 2, 1), // 0x99
    op!("ldelem.ref", None, Sequential, 2, 1), // 0x9A
    op!("stelem.i", None, Sequential, 3, 0), // 0x9B
    op!("stelem.i1", None, Sequential, 3, 0), // 0x9C
    op!("stelem.i2", None, Sequential, 3, 0), // 0x9D
    op!("stelem.i4", None, Sequential, 3, 0), // 0x9E
    op!("stelem.i8", None, Sequential, 3, 0), // 0x9F
    op!("stelem.r4", None, Sequential, 3, 0), // 0xA0
    op!("stelem.r8", None, Sequential, 3, 0), // 0xA1
    op!("stelem.ref", None, Sequential, 3, 0), // 0xA2
    op!("ldelem", Token, Sequential, 2, 1), // 0xA3
    op!("stelem", Token, Sequential, 3, 0), // 0xA4
    op!("unbox.any", Token, Sequential, 1, 1), // 0xA5
    RESERVED, // 0xA6
    RESERVED, // 0xA7
    RESERVED, // 0xA8
    RESERVED, // 0xA9
    RESERVED, // 0xAA
    RESERVED, // 0xAB
    RESERVED, // 0xAC
    RESERVED, // 0xAD
    RESERVED, // 0xAE
    RESERVED, // 0xAF
    RESERVED, // 0xB0
    RESERVED, // 0xB1
    RESERVED, // 0xB2
    op!("conv.ovf.i1", None, Sequential, 1, 1), // 0xB3
    op!("conv.ovf.u1", None, Sequential, 1, 1), // 0xB4
    op!("conv.ovf.i2", None, Sequential, 1, 1), // 0xB5
    op!("conv.ovf.u2", None, Sequential, 1, 1), // 0xB6
    op!("conv.ovf.i4", None, Sequential, 1, 1), // 0xB7
    op!("conv.ovf.u4", None, Sequential, 1, 1), // 0xB8
    op!("conv.ovf.i8", None, Sequential, 1, 1), // 0xB9
    op!("conv.ovf.u8", None, Sequential, 1, 1), // 0xBA
    RESERVED, // 0xBB
    RESERVED, // 0xBC
    RESERVED, // 0xBD
    RESERVED, // 0xBE
    RESERVED, // 0xBF
    RESERVED, // 0xC0
    RESERVED, // 0xC1
    op!("refanyval", Token, Sequential, 1, 1), // 0xC2
    op!("ckfinite", None, Sequential, 1, 1), // 0xC3
    RESERVED, // 0xC4
    RESERVED, // 0xC5
    op!("mkrefany", Token, Sequential, 1, 1), // 0xC6
    RESERVED, // 0xC7
    RESERVED, // 0xC8
    RESERVED, // 0xC9
    RESERVED, // 0xCA
    RESERVED, // 0xCB
    RESERVED, // 0xCC
    RESERVED, // 0xCD
    RESERVED, // 0xCE
    RESERVED, // 0xCF
    op!("ldtoken", Token, Sequential, 0, 1), // 0xD0
    op!("conv.u2", None, Sequential, 1, 1), // 0xD1
    op!("conv.u1", None, Sequential, 1, 1), // 0xD2
    op!("conv.i", None, Sequential, 1, 1), // 0xD3
    op!("conv.ovf.i", None, Sequential, 1, 1), // 0xD4
    op!("conv.ovf.u", None, Sequential, 1, 1), // 0xD5
    op!("add.ovf", None, Sequential, 2, 1), // 0xD6
    op!("add.ovf.un", None, Sequential, 2, 1), // 0xD7
    op!("mul.ovf", None, Sequential, 2, 1), // 0xD8
    op!("mul.ovf.un", None, Sequential, 2, 1), // 0xD9
    op!("sub.ovf", None, Sequential, 2, 1), // 0xDA
    op!("sub.ovf.un", None, Sequential, 2, 1), // 0xDB
    op!("endfinally", None, EndFinally, 0, 0), // 0xDC
    op!("leave", Branch32, Leave, 0, 0), // 0xDD
    op!("leave.s", Branch8, Leave, 0, 0), // 0xDE
    op!("stind.i", None, Sequential, 2, 0), // 0xDF
    op!("conv.u", None, Sequential, 1, 1), // 0xE0
];

pub static INSTRUCTIONS_FE: [CilInstruction; 31] = [
    op!("arglist", None, Sequential, 0, 1), // 0x00
    op!("ceq", None, Sequential, 2, 1), // 0x01
    op!("cgt", None, Sequential, 2, 1), // 0x02
    op!("cgt.un", None, Sequential, 2, 1), // 0x03
    op!("clt", None, Sequential, 2, 1), // 0x04
    op!("clt.un", None, Sequential, 2, 1), // 0x05
    op!("ldftn", Token, Sequential, 0, 1), // 0x06
    op!("ldvirtftn", Token, Sequential, 1, 1), // 0x07
    RESERVED, // 0x08
    op!("ldarg", Arg16, Sequential, 0, 1), // 0x09
    op!("ldarga", Arg16, Sequential, 0, 1), // 0x0A
    op!("starg", Arg16, Sequential, 1, 0), // 0x0B
    op!("ldloc", Local16, Sequential, 0, 1), // 0x0C
    op!("ldloca", Local16, Sequential, 0, 1), // 0x0D
    op!("stloc", Local16, Sequential, 1, 0), // 0x0E
    op!("localloc", None, Sequential, 1, 1), // 0x0F
    RESERVED, // 0x10
    op!("endfilter", None, EndFinally, 1, 0), // 0x11
    op!("unaligned.", UInt8, Sequential, 0, 0), // 0x12
    op!("volatile.", None, Sequential, 0, 0), // 0x13
    op!("tail.", None, Sequential, 0, 0), // 0x14
    op!("initobj", Token, Sequential, 1, 0), // 0x15
    op!("constrained.", Token, Sequential, 0, 0), // 0x16
    op!("cpblk", None, Sequential, 3, 0), // 0x17
    op!("initblk", None, Sequential, 3, 0), // 0x18
    op!("no.", UInt8, Sequential, 0, 0), // 0x19
    op!("rethrow", None, Throw, 0, 0), // 0x1A
    RESERVED, // 0x1B
    op!("sizeof", Token, Sequential, 0, 1), // 0x1C
    op!("refanytype", None, Sequential, 1, 1), // 0x1D
    op!("readonly.", None, Sequential, 0, 0), // 0x1E
];
