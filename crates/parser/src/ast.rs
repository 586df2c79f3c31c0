// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

use asm_types::operand::Operand;

/// One instruction, already in destination-first operand order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub line: u32,
}

/// An assembler directive payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Section(String),
    Global(String),
    /// NUL-terminated string literal bytes, escapes already processed.
    String(Vec<u8>),
    Zero(u64),
    Quad { value: i64, symbol: Option<String> },
    Byte(i64),
}

/// One record out of the parser's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseRecord {
    Instruction(Instruction),
    Label { name: String, line: u32 },
    Directive(Directive),
    Eof,
}
