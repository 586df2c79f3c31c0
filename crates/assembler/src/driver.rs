// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Drives a parser's record stream into an [`ObjectBuilder`]. One pass,
//! no backpatching: every record is consumed in order and turned into
//! section bytes, symbol definitions, or relocations immediately.

use asm_encoding_x86_64::encoder::{self, RelocationKind};
use asm_parser::{Directive, ParseRecord, Parser};
use asm_types::error::AsmError;

use crate::object::ObjectBuilder;

pub fn assemble_source(source: &str) -> Result<ObjectBuilder, AsmError> {
    let mut parser = Parser::new(source);
    let mut object = ObjectBuilder::new();

    loop {
        match parser.next_record()? {
            ParseRecord::Eof => break,
            ParseRecord::Label { name, line } => {
                log::debug!("label {name} at offset {}", object.current_offset());
                object.define_symbol_here(&name, 0, line)?;
            }
            ParseRecord::Directive(directive) => apply_directive(&mut object, directive)?,
            ParseRecord::Instruction(instruction) => {
                log::trace!(
                    "{}: {} {:?}",
                    instruction.line,
                    instruction.mnemonic,
                    instruction.operands
                );
                let encoded =
                    encoder::encode(&instruction.mnemonic, &instruction.operands, instruction.line)?;
                if let Some(hint) = &encoded.relocation {
                    object.record_relocation_hint(hint);
                }
                object.emit_bytes(&encoded.bytes);
            }
        }
    }

    Ok(object)
}

fn apply_directive(object: &mut ObjectBuilder, directive: Directive) -> Result<(), AsmError> {
    match directive {
        Directive::Section(name) => {
            object.select_section(&name);
        }
        Directive::Global(name) => {
            object.mark_global(&name);
        }
        Directive::String(bytes) => {
            object.emit_bytes(&bytes);
        }
        Directive::Zero(count) => {
            object.emit_zero(count);
        }
        Directive::Quad { value, symbol } => {
            if let Some(name) = symbol {
                object.reference_symbol_here(&name, 0, RelocationKind::Absolute64, value);
                object.emit_zero(8);
            } else {
                object.emit_bytes(&value.to_le_bytes());
            }
        }
        Directive::Byte(value) => {
            object.emit_bytes(&[value as u8]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_ret_only_program() {
        let object = assemble_source(".section .text\n.global main\nmain:\n    ret\n").unwrap();
        let bytes = crate::elf::build(&object);
        assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let err = assemble_source("a:\nb:\na:\n").unwrap_err();
        assert!(matches!(err, AsmError::DuplicateSymbolDefinition { .. }));
    }

    #[test]
    fn quad_with_symbol_emits_a_relocation_placeholder() {
        let object = assemble_source(".section .data\nptr:\n.quad target\n").unwrap();
        let bytes = crate::elf::build(&object);
        assert!(!bytes.is_empty());
    }
}
