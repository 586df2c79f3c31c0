// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Shared data model for the x86-64 assembler: registers, operands, and the
//! single error type threaded through the parser, encoder, and object writer.

pub mod error;
pub mod operand;
pub mod register;

pub use error::AsmError;
pub use operand::Operand;
pub use register::Register;
