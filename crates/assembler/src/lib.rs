// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Section/symbol/relocation store, the driver loop that consumes parser
//! records, and the ELF64 object writer.

pub mod driver;
pub mod elf;
pub mod object;

pub use object::ObjectBuilder;
