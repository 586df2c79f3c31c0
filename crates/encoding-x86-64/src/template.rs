// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! The static encoding table: one row per (mnemonic, operand shape) this
//! assembler knows how to produce machine code for. Adding a new supported
//! form is adding a row here, never touching the encoder's control flow.

use asm_types::register::Width;

/// What kind of operand a template slot accepts, destination-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRole {
    None,
    /// Must be exactly the register at this index (0 = rax/eax/ax/al, 1 = rcx/cl).
    Fixed(u8),
    Reg,
    RegIndirect,
    RegOrMem,
    Imm8,
    Imm16,
    Imm32Signed,
    Imm32Unsigned,
    Imm64,
    Rel32,
}

#[derive(Debug, Clone, Copy)]
pub struct EncodingTemplate {
    pub mnemonic: &'static str,
    pub width: Width,
    /// Destination-first, matching the order the driver hands operands to the encoder.
    pub roles: [OperandRole; 3],
    pub modrm_reg_role: Option<u8>,
    pub modrm_rm_role: Option<u8>,
    pub opcode_ext: Option<u8>,
    pub opcode_plus_reg_role: Option<u8>,
    pub rex_w: bool,
    pub opsize_prefix: bool,
    pub two_byte_opcode: bool,
    pub opcode: u8,
    pub imm_role: Option<u8>,
    pub rel32_role: Option<u8>,
}

const BASE: EncodingTemplate = EncodingTemplate {
    mnemonic: "",
    width: Width::Qword,
    roles: [OperandRole::None, OperandRole::None, OperandRole::None],
    modrm_reg_role: None,
    modrm_rm_role: None,
    opcode_ext: None,
    opcode_plus_reg_role: None,
    rex_w: false,
    opsize_prefix: false,
    two_byte_opcode: false,
    opcode: 0,
    imm_role: None,
    rel32_role: None,
};

macro_rules! rm_reg {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $op:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [OperandRole::RegOrMem, OperandRole::Reg, OperandRole::None],
            modrm_rm_role: Some(0),
            modrm_reg_role: Some(1),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: $op,
            ..BASE
        }
    };
}

macro_rules! reg_rm {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $op:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
            modrm_reg_role: Some(0),
            modrm_rm_role: Some(1),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: $op,
            ..BASE
        }
    };
}

macro_rules! rm_imm {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $op:expr, $ext:expr, $immrole:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [OperandRole::RegOrMem, $immrole, OperandRole::None],
            modrm_rm_role: Some(0),
            opcode_ext: Some($ext),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: $op,
            imm_role: Some(1),
            ..BASE
        }
    };
}

macro_rules! rm_only {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $op:expr, $ext:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [OperandRole::RegOrMem, OperandRole::None, OperandRole::None],
            modrm_rm_role: Some(0),
            opcode_ext: Some($ext),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: $op,
            ..BASE
        }
    };
}

macro_rules! shift_imm8 {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $ext:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [OperandRole::RegOrMem, OperandRole::Imm8, OperandRole::None],
            modrm_rm_role: Some(0),
            opcode_ext: Some($ext),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: 0xC1,
            imm_role: Some(1),
            ..BASE
        }
    };
}

macro_rules! shift_cl {
    ($mnem:expr, $w:expr, $rexw:expr, $opsz:expr, $ext:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [
                OperandRole::RegOrMem,
                OperandRole::Fixed(1),
                OperandRole::None,
            ],
            modrm_rm_role: Some(0),
            opcode_ext: Some($ext),
            rex_w: $rexw,
            opsize_prefix: $opsz,
            opcode: 0xD3,
            ..BASE
        }
    };
}

macro_rules! acc_imm32 {
    ($mnem:expr, $w:expr, $rexw:expr, $op:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: $w,
            roles: [
                OperandRole::Fixed(0),
                OperandRole::Imm32Signed,
                OperandRole::None,
            ],
            rex_w: $rexw,
            opcode: $op,
            imm_role: Some(1),
            ..BASE
        }
    };
}

macro_rules! setcc {
    ($mnem:expr, $op:expr) => {
        EncodingTemplate {
            mnemonic: $mnem,
            width: Width::Byte,
            roles: [OperandRole::RegOrMem, OperandRole::None, OperandRole::None],
            modrm_rm_role: Some(0),
            opcode_ext: Some(0),
            two_byte_opcode: true,
            opcode: $op,
            ..BASE
        }
    };
}

/// The full set of encodings this assembler can produce. Ordered so that,
/// among rows that match equally well, the earliest one wins ties (see
/// `encoder::encode`'s selection rule) — shorter/simpler encodings are
/// listed first within each mnemonic group.
pub static ENCODINGS: &[EncodingTemplate] = &[
    // --- mov ---
    rm_reg!("movb", Width::Byte, false, false, 0x88),
    reg_rm!("movb", Width::Byte, false, false, 0x8A),
    rm_imm!("movb", Width::Byte, false, false, 0xC6, 0, OperandRole::Imm8),
    rm_reg!("movw", Width::Word, false, true, 0x89),
    reg_rm!("movw", Width::Word, false, true, 0x8B),
    rm_imm!(
        "movw",
        Width::Word,
        false,
        true,
        0xC7,
        0,
        OperandRole::Imm16
    ),
    rm_reg!("movl", Width::Dword, false, false, 0x89),
    reg_rm!("movl", Width::Dword, false, false, 0x8B),
    rm_imm!(
        "movl",
        Width::Dword,
        false,
        false,
        0xC7,
        0,
        OperandRole::Imm32Unsigned
    ),
    rm_reg!("movq", Width::Qword, true, false, 0x89),
    reg_rm!("movq", Width::Qword, true, false, 0x8B),
    rm_imm!(
        "movq",
        Width::Qword,
        true,
        false,
        0xC7,
        0,
        OperandRole::Imm32Signed
    ),
    EncodingTemplate {
        mnemonic: "movl",
        width: Width::Dword,
        roles: [
            OperandRole::Reg,
            OperandRole::Imm32Unsigned,
            OperandRole::None,
        ],
        opcode_plus_reg_role: Some(0),
        opcode: 0xB8,
        imm_role: Some(1),
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movabsq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::Imm64, OperandRole::None],
        opcode_plus_reg_role: Some(0),
        rex_w: true,
        opcode: 0xB8,
        imm_role: Some(1),
        ..BASE
    },
    // --- lea ---
    EncodingTemplate {
        mnemonic: "leal",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        opcode: 0x8D,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "leaq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        opcode: 0x8D,
        ..BASE
    },
    // --- movzx / movsx family ---
    EncodingTemplate {
        mnemonic: "movzbl",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        two_byte_opcode: true,
        opcode: 0xB6,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movzbq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        two_byte_opcode: true,
        opcode: 0xB6,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movzwl",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        two_byte_opcode: true,
        opcode: 0xB7,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movzwq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        two_byte_opcode: true,
        opcode: 0xB7,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movsbl",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        two_byte_opcode: true,
        opcode: 0xBE,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movsbw",
        width: Width::Word,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        opsize_prefix: true,
        two_byte_opcode: true,
        opcode: 0xBE,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movsbq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        two_byte_opcode: true,
        opcode: 0xBE,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movswl",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        two_byte_opcode: true,
        opcode: 0xBF,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movswq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        two_byte_opcode: true,
        opcode: 0xBF,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "movslq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        opcode: 0x63,
        ..BASE
    },
    // --- arithmetic/logic, long and quad ---
    rm_reg!("addl", Width::Dword, false, false, 0x01),
    reg_rm!("addl", Width::Dword, false, false, 0x03),
    rm_imm!("addl", Width::Dword, false, false, 0x83, 0, OperandRole::Imm8),
    rm_imm!(
        "addl",
        Width::Dword,
        false,
        false,
        0x81,
        0,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("addl", Width::Dword, false, 0x05),
    rm_reg!("addq", Width::Qword, true, false, 0x01),
    reg_rm!("addq", Width::Qword, true, false, 0x03),
    rm_imm!("addq", Width::Qword, true, false, 0x83, 0, OperandRole::Imm8),
    rm_imm!(
        "addq",
        Width::Qword,
        true,
        false,
        0x81,
        0,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("addq", Width::Qword, true, 0x05),
    rm_reg!("subl", Width::Dword, false, false, 0x29),
    reg_rm!("subl", Width::Dword, false, false, 0x2B),
    rm_imm!("subl", Width::Dword, false, false, 0x83, 5, OperandRole::Imm8),
    rm_imm!(
        "subl",
        Width::Dword,
        false,
        false,
        0x81,
        5,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("subl", Width::Dword, false, 0x2D),
    rm_reg!("subq", Width::Qword, true, false, 0x29),
    reg_rm!("subq", Width::Qword, true, false, 0x2B),
    rm_imm!("subq", Width::Qword, true, false, 0x83, 5, OperandRole::Imm8),
    rm_imm!(
        "subq",
        Width::Qword,
        true,
        false,
        0x81,
        5,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("subq", Width::Qword, true, 0x2D),
    rm_reg!("andl", Width::Dword, false, false, 0x21),
    reg_rm!("andl", Width::Dword, false, false, 0x23),
    rm_imm!("andl", Width::Dword, false, false, 0x83, 4, OperandRole::Imm8),
    rm_imm!(
        "andl",
        Width::Dword,
        false,
        false,
        0x81,
        4,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("andl", Width::Dword, false, 0x25),
    rm_reg!("andq", Width::Qword, true, false, 0x21),
    reg_rm!("andq", Width::Qword, true, false, 0x23),
    rm_imm!("andq", Width::Qword, true, false, 0x83, 4, OperandRole::Imm8),
    rm_imm!(
        "andq",
        Width::Qword,
        true,
        false,
        0x81,
        4,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("andq", Width::Qword, true, 0x25),
    rm_reg!("orl", Width::Dword, false, false, 0x09),
    reg_rm!("orl", Width::Dword, false, false, 0x0B),
    rm_imm!("orl", Width::Dword, false, false, 0x83, 1, OperandRole::Imm8),
    rm_imm!(
        "orl",
        Width::Dword,
        false,
        false,
        0x81,
        1,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("orl", Width::Dword, false, 0x0D),
    rm_reg!("orq", Width::Qword, true, false, 0x09),
    reg_rm!("orq", Width::Qword, true, false, 0x0B),
    rm_imm!("orq", Width::Qword, true, false, 0x83, 1, OperandRole::Imm8),
    rm_imm!(
        "orq",
        Width::Qword,
        true,
        false,
        0x81,
        1,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("orq", Width::Qword, true, 0x0D),
    rm_reg!("xorl", Width::Dword, false, false, 0x31),
    reg_rm!("xorl", Width::Dword, false, false, 0x33),
    rm_imm!("xorl", Width::Dword, false, false, 0x83, 6, OperandRole::Imm8),
    rm_imm!(
        "xorl",
        Width::Dword,
        false,
        false,
        0x81,
        6,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("xorl", Width::Dword, false, 0x35),
    rm_reg!("xorq", Width::Qword, true, false, 0x31),
    reg_rm!("xorq", Width::Qword, true, false, 0x33),
    rm_imm!("xorq", Width::Qword, true, false, 0x83, 6, OperandRole::Imm8),
    rm_imm!(
        "xorq",
        Width::Qword,
        true,
        false,
        0x81,
        6,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("xorq", Width::Qword, true, 0x35),
    rm_reg!("cmpl", Width::Dword, false, false, 0x39),
    reg_rm!("cmpl", Width::Dword, false, false, 0x3B),
    rm_imm!("cmpl", Width::Dword, false, false, 0x83, 7, OperandRole::Imm8),
    rm_imm!(
        "cmpl",
        Width::Dword,
        false,
        false,
        0x81,
        7,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("cmpl", Width::Dword, false, 0x3D),
    rm_reg!("cmpq", Width::Qword, true, false, 0x39),
    reg_rm!("cmpq", Width::Qword, true, false, 0x3B),
    rm_imm!("cmpq", Width::Qword, true, false, 0x83, 7, OperandRole::Imm8),
    rm_imm!(
        "cmpq",
        Width::Qword,
        true,
        false,
        0x81,
        7,
        OperandRole::Imm32Signed
    ),
    acc_imm32!("cmpq", Width::Qword, true, 0x3D),
    // --- test ---
    rm_reg!("testb", Width::Byte, false, false, 0x84),
    rm_imm!(
        "testb",
        Width::Byte,
        false,
        false,
        0xF6,
        0,
        OperandRole::Imm8
    ),
    rm_reg!("testl", Width::Dword, false, false, 0x85),
    rm_imm!(
        "testl",
        Width::Dword,
        false,
        false,
        0xF7,
        0,
        OperandRole::Imm32Unsigned
    ),
    rm_reg!("testq", Width::Qword, true, false, 0x85),
    rm_imm!(
        "testq",
        Width::Qword,
        true,
        false,
        0xF7,
        0,
        OperandRole::Imm32Signed
    ),
    // --- unary ---
    rm_only!("negl", Width::Dword, false, false, 0xF7, 3),
    rm_only!("negq", Width::Qword, true, false, 0xF7, 3),
    rm_only!("notl", Width::Dword, false, false, 0xF7, 2),
    rm_only!("notq", Width::Qword, true, false, 0xF7, 2),
    // --- multiply / divide ---
    rm_only!("mull", Width::Dword, false, false, 0xF7, 4),
    rm_only!("mulq", Width::Qword, true, false, 0xF7, 4),
    rm_only!("divl", Width::Dword, false, false, 0xF7, 6),
    rm_only!("divq", Width::Qword, true, false, 0xF7, 6),
    rm_only!("idivl", Width::Dword, false, false, 0xF7, 7),
    rm_only!("idivq", Width::Qword, true, false, 0xF7, 7),
    rm_only!("imull", Width::Dword, false, false, 0xF7, 5),
    rm_only!("imulq", Width::Qword, true, false, 0xF7, 5),
    EncodingTemplate {
        mnemonic: "imull",
        width: Width::Dword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        two_byte_opcode: true,
        opcode: 0xAF,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "imulq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::RegOrMem, OperandRole::None],
        modrm_reg_role: Some(0),
        modrm_rm_role: Some(1),
        rex_w: true,
        two_byte_opcode: true,
        opcode: 0xAF,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "imull",
        width: Width::Dword,
        roles: [OperandRole::Imm8, OperandRole::RegOrMem, OperandRole::Reg],
        modrm_reg_role: Some(2),
        modrm_rm_role: Some(1),
        opcode: 0x6B,
        imm_role: Some(0),
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "imulq",
        width: Width::Qword,
        roles: [OperandRole::Imm8, OperandRole::RegOrMem, OperandRole::Reg],
        modrm_reg_role: Some(2),
        modrm_rm_role: Some(1),
        rex_w: true,
        opcode: 0x6B,
        imm_role: Some(0),
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "imull",
        width: Width::Dword,
        roles: [
            OperandRole::Imm32Signed,
            OperandRole::RegOrMem,
            OperandRole::Reg,
        ],
        modrm_reg_role: Some(2),
        modrm_rm_role: Some(1),
        opcode: 0x69,
        imm_role: Some(0),
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "imulq",
        width: Width::Qword,
        roles: [
            OperandRole::Imm32Signed,
            OperandRole::RegOrMem,
            OperandRole::Reg,
        ],
        modrm_reg_role: Some(2),
        modrm_rm_role: Some(1),
        rex_w: true,
        opcode: 0x69,
        imm_role: Some(0),
        ..BASE
    },
    // --- push / pop ---
    EncodingTemplate {
        mnemonic: "pushq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::None, OperandRole::None],
        opcode_plus_reg_role: Some(0),
        opcode: 0x50,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "popq",
        width: Width::Qword,
        roles: [OperandRole::Reg, OperandRole::None, OperandRole::None],
        opcode_plus_reg_role: Some(0),
        opcode: 0x58,
        ..BASE
    },
    // --- shifts ---
    shift_imm8!("salq", Width::Qword, true, false, 4),
    shift_cl!("salq", Width::Qword, true, false, 4),
    shift_imm8!("sall", Width::Dword, false, false, 4),
    shift_cl!("sall", Width::Dword, false, false, 4),
    shift_imm8!("sarq", Width::Qword, true, false, 7),
    shift_cl!("sarq", Width::Qword, true, false, 7),
    shift_imm8!("sarl", Width::Dword, false, false, 7),
    shift_cl!("sarl", Width::Dword, false, false, 7),
    shift_imm8!("shrq", Width::Qword, true, false, 5),
    shift_cl!("shrq", Width::Qword, true, false, 5),
    shift_imm8!("shrl", Width::Dword, false, false, 5),
    shift_cl!("shrl", Width::Dword, false, false, 5),
    // --- setcc ---
    setcc!("sete", 0x94),
    setcc!("setne", 0x95),
    setcc!("setl", 0x9C),
    setcc!("setle", 0x9E),
    setcc!("setg", 0x9F),
    setcc!("setge", 0x9D),
    setcc!("seta", 0x97),
    setcc!("setae", 0x93),
    setcc!("setb", 0x92),
    setcc!("setbe", 0x96),
    // --- control flow & misc ---
    EncodingTemplate {
        mnemonic: "callq",
        width: Width::Qword,
        roles: [OperandRole::Rel32, OperandRole::None, OperandRole::None],
        opcode: 0xE8,
        rel32_role: Some(0),
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "callq",
        width: Width::Qword,
        roles: [
            OperandRole::RegIndirect,
            OperandRole::None,
            OperandRole::None,
        ],
        modrm_rm_role: Some(0),
        opcode_ext: Some(2),
        opcode: 0xFF,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "ret",
        opcode: 0xC3,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "leave",
        opcode: 0xC9,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "ud2",
        two_byte_opcode: true,
        opcode: 0x0B,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "cltd",
        opcode: 0x99,
        ..BASE
    },
    EncodingTemplate {
        mnemonic: "cqto",
        rex_w: true,
        opcode: 0x99,
        ..BASE
    },
];
