// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! The single error type shared by the lexer, parser, encoder, and object
//! writer. Every variant is fatal: the driver loop reports the first one it
//! sees and stops, there is no error recovery.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("{line}: lexical error: {message}")]
    Lexical { line: u32, message: String },

    #[error("{line}: syntax error: {message}")]
    Syntax { line: u32, message: String },

    #[error("{line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: u32, mnemonic: String },

    #[error("{line}: no encoding of `{mnemonic}` matches the given operands")]
    NoMatchingEncoding { line: u32, mnemonic: String },

    #[error("{line}: illegal memory operand: {message}")]
    IllegalMemoryOperand { line: u32, message: String },

    #[error("{line}: displacement {value} does not fit in 32 bits")]
    DisplacementOverflow { line: u32, value: i64 },

    #[error("{line}: symbol `{name}` is already defined")]
    DuplicateSymbolDefinition { line: u32, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
