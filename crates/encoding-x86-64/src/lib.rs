// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! x86-64 instruction encoding.
//!
//! Three pieces: a static table of legal (mnemonic, operand shape)
//! encodings ([`template`]), a ModR/M and SIB byte builder for memory
//! operands ([`modrm`]), and the encoder proper ([`encoder`]), which picks
//! the shortest matching template and assembles it into bytes plus an
//! optional relocation.

pub mod encoder;
pub mod modrm;
pub mod template;

pub use encoder::{encode, EncodedInstruction, RelocationHint, RelocationKind};
pub use template::{EncodingTemplate, OperandRole};
