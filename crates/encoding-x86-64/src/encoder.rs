// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Operand matching, shortest-encoding selection, and byte assembly.
//!
//! Byte order for an assembled instruction is fixed: 0x66 operand-size
//! prefix, REX, opcode (with its 0x0F escape if any), ModR/M, SIB,
//! displacement, immediate, and finally a rel32 for direct branches. A
//! template matches an instruction's operands role-by-role; among all
//! matching templates for a mnemonic the one producing the fewest bytes
//! wins, and a tie is broken by table order (the earlier row wins).

use asm_types::error::AsmError;
use asm_types::operand::Operand;
use asm_types::register::Width;

use crate::modrm::{self, MemOperand};
use crate::template::{EncodingTemplate, OperandRole, ENCODINGS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationKind {
    /// R_X86_64_64 — full 64-bit absolute address.
    Absolute64,
    /// R_X86_64_32S — sign-extended 32-bit absolute address.
    Absolute32,
    /// R_X86_64_PC32 — 32-bit value relative to the end of the referencing field.
    Pc32,
}

#[derive(Debug, Clone)]
pub struct RelocationHint {
    pub kind: RelocationKind,
    pub symbol: String,
    pub addend: i64,
    /// Byte offset within the returned instruction bytes where the
    /// relocated field begins.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct EncodedInstruction {
    pub bytes: Vec<u8>,
    pub relocation: Option<RelocationHint>,
}

fn fits_i8(v: i64) -> bool {
    i8::try_from(v).is_ok()
}

fn fits_i16(v: i64) -> bool {
    i16::try_from(v).is_ok()
}

fn fits_i32(v: i64) -> bool {
    v >= i32::MIN as i64 && v <= i32::MAX as i64
}

fn fits_imm32_unsigned(v: i64) -> bool {
    v >= i32::MIN as i64 && v <= u32::MAX as i64
}

fn role_matches(role: OperandRole, operand: &Operand, width: Width) -> bool {
    match role {
        OperandRole::None => operand.is_empty(),
        OperandRole::Fixed(index) => matches!(operand, Operand::Reg(r)
            if r.width == width && r.encoding_bits() == index && !r.needs_rex_extension()),
        OperandRole::Reg => matches!(operand, Operand::Reg(r) if r.width == width),
        OperandRole::RegIndirect => matches!(operand, Operand::RegIndirect(r) if r.width == width),
        OperandRole::RegOrMem => {
            matches!(operand, Operand::Reg(r) if r.width == width) || matches!(operand, Operand::Mem { .. })
        }
        OperandRole::Imm8 => matches!(operand, Operand::Imm { value, symbol: None } if fits_i8(*value)),
        OperandRole::Imm16 => matches!(operand, Operand::Imm { value, symbol: None } if fits_i16(*value)),
        OperandRole::Imm32Signed => {
            matches!(operand, Operand::Imm { value, symbol: None } if fits_i32(*value))
        }
        OperandRole::Imm32Unsigned => {
            matches!(operand, Operand::Imm { value, symbol } if symbol.is_some() || fits_imm32_unsigned(*value))
        }
        OperandRole::Imm64 => matches!(operand, Operand::Imm { .. }),
        OperandRole::Rel32 => matches!(operand, Operand::RelImm { .. }),
    }
}

fn register_of<'a>(operand: &'a Operand) -> Option<&'a asm_types::register::Register> {
    match operand {
        Operand::Reg(r) | Operand::RegIndirect(r) => Some(r),
        _ => None,
    }
}

/// REX would be forced by an extension bit, `rex_w`, or a register that
/// requires it (SPL/BPL/SIL/DIL); it is illegal to combine that with an
/// operand that forbids it (AH/BH/CH/DH).
fn rex_is_consistent(template: &EncodingTemplate, operands: &[Operand; 3]) -> bool {
    let forces_rex = template.rex_w
        || operands
            .iter()
            .filter_map(register_of)
            .any(|r| r.requires_rex || r.needs_rex_extension());
    if !forces_rex {
        return true;
    }
    !operands
        .iter()
        .filter_map(register_of)
        .any(|r| r.forbids_rex)
}

fn shape_matches(template: &EncodingTemplate, operands: &[Operand; 3]) -> bool {
    for i in 0..3 {
        if !role_matches(template.roles[i], &operands[i], template.width) {
            return false;
        }
    }
    rex_is_consistent(template, operands)
}

fn operand_at<'a>(operands: &'a [Operand], index: usize) -> &'a Operand {
    operands.get(index).unwrap_or(&Operand::Empty)
}

fn mem_operand(operand: &Operand, line: u32) -> Result<MemOperand, AsmError> {
    match operand {
        Operand::Mem {
            base,
            index,
            scale,
            disp,
        } => {
            if !fits_i32(*disp) {
                return Err(AsmError::DisplacementOverflow { line, value: *disp });
            }
            if !matches!(scale, 1 | 2 | 4 | 8) {
                return Err(AsmError::IllegalMemoryOperand {
                    line,
                    message: format!("scale must be 1, 2, 4, or 8, found {scale}"),
                });
            }
            if let Some(idx) = index {
                if idx.encoding_bits() == 0b100 && !idx.needs_rex_extension() {
                    return Err(AsmError::IllegalMemoryOperand {
                        line,
                        message: "%rsp cannot be used as an index register".to_string(),
                    });
                }
            }
            Ok(MemOperand {
                base: *base,
                index: *index,
                scale: *scale,
                disp: *disp,
            })
        }
        _ => unreachable!("mem_operand called on a non-memory operand"),
    }
}

fn rex_byte(w: bool, r: bool, x: bool, b: bool) -> u8 {
    0b0100_0000 | ((w as u8) << 3) | ((r as u8) << 2) | ((x as u8) << 1) | (b as u8)
}

/// Assemble one instruction against a single already-shape-matched template.
fn assemble(
    template: &EncodingTemplate,
    operands: &[Operand; 3],
    line: u32,
) -> Result<EncodedInstruction, AsmError> {
    let mut bytes = Vec::with_capacity(8);
    let mut relocation = None;

    if template.opsize_prefix {
        bytes.push(0x66);
    }

    // --- REX + opcode + ModR/M/SIB/disp, or the opcode_plus_reg short form ---
    if let Some(role_index) = template.opcode_plus_reg_role {
        let reg = register_of(&operands[role_index])
            .expect("opcode_plus_reg_role must reference a register operand");
        let rex_needed = template.rex_w || reg.requires_rex || reg.needs_rex_extension();
        if rex_needed {
            bytes.push(rex_byte(template.rex_w, false, false, reg.needs_rex_extension()));
        }
        bytes.push(template.opcode + reg.encoding_bits());
    } else if template.modrm_rm_role.is_some() || template.opcode_ext.is_some() {
        let rm_operand = template
            .modrm_rm_role
            .map(|i| &operands[i])
            .unwrap_or(&Operand::Empty);
        let reg_field_role = template.modrm_reg_role.map(|i| &operands[i]);
        let reg_field_bits = if let Some(reg_operand) = reg_field_role {
            register_of(reg_operand)
                .expect("modrm_reg_role must reference a register operand")
                .encoding_bits()
        } else {
            template.opcode_ext.unwrap_or(0)
        };
        let reg_field_rex_r = reg_field_role
            .and_then(register_of)
            .map(|r| r.needs_rex_extension())
            .unwrap_or(false);

        let (rex_r, rex_x, rex_b, modrm, sib, disp) = match rm_operand {
            Operand::Reg(rm_reg) => (
                reg_field_rex_r,
                false,
                rm_reg.needs_rex_extension(),
                modrm::encode_register(*rm_reg, reg_field_bits),
                None,
                Vec::new(),
            ),
            Operand::RegIndirect(rm_reg) => (
                reg_field_rex_r,
                false,
                rm_reg.needs_rex_extension(),
                modrm::encode_register(*rm_reg, reg_field_bits),
                None,
                Vec::new(),
            ),
            Operand::Mem { .. } => {
                let mem = mem_operand(rm_operand, line)?;
                let addr = modrm::encode_memory(&mem, reg_field_bits);
                (reg_field_rex_r, addr.rex_x, addr.rex_b, addr.modrm, addr.sib, addr.disp)
            }
            Operand::Empty => (
                reg_field_rex_r,
                false,
                false,
                modrm::encode_register(asm_types::register::Register::new(0, Width::Qword), reg_field_bits),
                None,
                Vec::new(),
            ),
            _ => unreachable!("ModR/M rm role must be a register or memory operand"),
        };

        let needs_rex = template.rex_w
            || rex_r
            || rex_x
            || rex_b
            || operands.iter().filter_map(register_of).any(|r| r.requires_rex);
        if needs_rex {
            bytes.push(rex_byte(template.rex_w, rex_r, rex_x, rex_b));
        }
        if template.two_byte_opcode {
            bytes.push(0x0F);
        }
        bytes.push(template.opcode);
        bytes.push(modrm);
        if let Some(sib) = sib {
            bytes.push(sib);
        }
        bytes.extend(disp);
    } else {
        // Zero-operand or implicit-operand instruction (ret, leave, cltd, cqto, ud2).
        if template.rex_w {
            bytes.push(rex_byte(true, false, false, false));
        }
        if template.two_byte_opcode {
            bytes.push(0x0F);
        }
        bytes.push(template.opcode);
    }

    // --- immediate ---
    if let Some(role_index) = template.imm_role {
        match &operands[role_index] {
            Operand::Imm { value, symbol } => {
                let role = template.roles[role_index];
                let nbytes: u8 = match role {
                    OperandRole::Imm8 => 1,
                    OperandRole::Imm16 => 2,
                    OperandRole::Imm32Signed | OperandRole::Imm32Unsigned => 4,
                    OperandRole::Imm64 => 8,
                    _ => unreachable!("imm_role must point to an immediate-shaped role"),
                };
                if let Some(name) = symbol {
                    relocation = Some(RelocationHint {
                        kind: match nbytes {
                            8 => RelocationKind::Absolute64,
                            _ => RelocationKind::Absolute32,
                        },
                        symbol: name.clone(),
                        addend: *value,
                        offset: bytes.len(),
                    });
                }
                match nbytes {
                    1 => bytes.push(*value as i8 as u8),
                    2 => bytes.extend((*value as i16).to_le_bytes()),
                    4 => bytes.extend((*value as i32).to_le_bytes()),
                    8 => bytes.extend(value.to_le_bytes()),
                    _ => unreachable!(),
                }
            }
            _ => unreachable!("imm_role must point to an immediate operand"),
        }
    }

    // --- rel32 (direct call/jmp target) ---
    if let Some(role_index) = template.rel32_role {
        if let Operand::RelImm { value, symbol } = &operands[role_index] {
            if let Some(name) = symbol {
                relocation = Some(RelocationHint {
                    kind: RelocationKind::Pc32,
                    symbol: name.clone(),
                    addend: *value,
                    offset: bytes.len(),
                });
            }
            bytes.extend((*value as i32).to_le_bytes());
        }
    }

    Ok(EncodedInstruction { bytes, relocation })
}

/// Encode one instruction: find every template whose mnemonic and operand
/// shape match, assemble each, and keep the shortest (earliest row wins
/// ties). `operands` is destination-first, as produced by the parser.
pub fn encode(mnemonic: &str, operands: &[Operand], line: u32) -> Result<EncodedInstruction, AsmError> {
    let padded = [
        operand_at(operands, 0).clone(),
        operand_at(operands, 1).clone(),
        operand_at(operands, 2).clone(),
    ];

    let mut any_mnemonic_match = false;
    let mut best: Option<EncodedInstruction> = None;

    for template in ENCODINGS.iter().filter(|t| t.mnemonic == mnemonic) {
        any_mnemonic_match = true;
        if !shape_matches(template, &padded) {
            continue;
        }
        let encoded = assemble(template, &padded, line)?;
        let better = match &best {
            None => true,
            Some(current) => encoded.bytes.len() < current.bytes.len(),
        };
        if better {
            best = Some(encoded);
        }
    }

    match best {
        Some(encoded) => Ok(encoded),
        None if any_mnemonic_match => Err(AsmError::NoMatchingEncoding {
            line,
            mnemonic: mnemonic.to_string(),
        }),
        None => Err(AsmError::UnknownMnemonic {
            line,
            mnemonic: mnemonic.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asm_types::register::Register;
    use pretty_assertions::assert_eq;

    fn reg(name: &str) -> Operand {
        Operand::Reg(Register::from_att_name(name).unwrap())
    }

    #[test]
    fn movq_immediate_to_register() {
        // movq $1, %rax -> 48 c7 c0 01 00 00 00
        let encoded = encode(
            "movq",
            &[
                reg("rax"),
                Operand::Imm {
                    value: 1,
                    symbol: None,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0xC7, 0xC0, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn movl_immediate_prefers_shorter_opcode_plus_reg_form() {
        // movl $5, %eax should prefer b8+r (5 bytes) over c7/0 (6 bytes).
        let encoded = encode(
            "movl",
            &[
                reg("eax"),
                Operand::Imm {
                    value: 5,
                    symbol: None,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0xB8, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn addq_immediate_prefers_imm8_form_when_it_fits() {
        let encoded = encode(
            "addq",
            &[
                reg("rax"),
                Operand::Imm {
                    value: 1,
                    symbol: None,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x83, 0xC0, 0x01]);
    }

    #[test]
    fn addq_immediate_falls_back_to_imm32_when_needed() {
        // %rbx isn't the accumulator, so this can't use the 0x05 short form.
        let encoded = encode(
            "addq",
            &[
                reg("rbx"),
                Operand::Imm {
                    value: 1000,
                    symbol: None,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(
            encoded.bytes,
            vec![0x48, 0x81, 0xC3, 0xE8, 0x03, 0x00, 0x00]
        );
    }

    #[test]
    fn addq_immediate_prefers_accumulator_short_form_for_rax() {
        // addq $1000, %rax -> 48 05 e8 03 00 00 (6 bytes), shorter than the
        // generic 0x81 /0 id form (7 bytes) that %rbx above falls back to.
        let encoded = encode(
            "addq",
            &[
                reg("rax"),
                Operand::Imm {
                    value: 1000,
                    symbol: None,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x05, 0xE8, 0x03, 0x00, 0x00]);
    }

    #[test]
    fn memory_operand_with_base_and_displacement() {
        // movq 8(%rdi), %rax -> 48 8b 47 08
        let encoded = encode(
            "movq",
            &[
                reg("rax"),
                Operand::Mem {
                    base: Some(Register::from_att_name("rdi").unwrap()),
                    index: None,
                    scale: 1,
                    disp: 8,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x8B, 0x47, 0x08]);
    }

    #[test]
    fn memory_operand_with_base_index_scale() {
        // movq (%rdi,%rsi,4), %rax -> 48 8b 04 b7
        let encoded = encode(
            "movq",
            &[
                reg("rax"),
                Operand::Mem {
                    base: Some(Register::from_att_name("rdi").unwrap()),
                    index: Some(Register::from_att_name("rsi").unwrap()),
                    scale: 4,
                    disp: 0,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x8B, 0x04, 0xB7]);
    }

    #[test]
    fn call_with_symbol_produces_pc32_relocation() {
        let encoded = encode(
            "callq",
            &[Operand::RelImm {
                value: 0,
                symbol: Some("puts".to_string()),
            }],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes[0], 0xE8);
        let reloc = encoded.relocation.unwrap();
        assert_eq!(reloc.kind, RelocationKind::Pc32);
        assert_eq!(reloc.symbol, "puts");
        assert_eq!(reloc.offset, 1);
    }

    #[test]
    fn lea_memory_operand() {
        // leaq (%rax), %rbx -> 48 8d 18
        let encoded = encode(
            "leaq",
            &[
                reg("rbx"),
                Operand::Mem {
                    base: Some(Register::from_att_name("rax").unwrap()),
                    index: None,
                    scale: 1,
                    disp: 0,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x8D, 0x18]);
    }

    #[test]
    fn movzx_byte_to_long() {
        let encoded = encode("movzbl", &[reg("eax"), reg("cl")], 1).unwrap();
        assert_eq!(encoded.bytes, vec![0x0F, 0xB6, 0xC1]);
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        let err = encode("frobnicate", &[], 1).unwrap_err();
        assert!(matches!(err, AsmError::UnknownMnemonic { .. }));
    }

    #[test]
    fn wrong_shape_is_no_matching_encoding() {
        // addq takes a register/memory destination, not an immediate.
        let err = encode(
            "addq",
            &[
                Operand::Imm {
                    value: 1,
                    symbol: None,
                },
                reg("rax"),
            ],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, AsmError::NoMatchingEncoding { .. }));
    }

    #[test]
    fn ret_has_no_operands() {
        let encoded = encode("ret", &[], 1).unwrap();
        assert_eq!(encoded.bytes, vec![0xC3]);
    }

    #[test]
    fn cqto_has_rex_w_prefix() {
        let encoded = encode("cqto", &[], 1).unwrap();
        assert_eq!(encoded.bytes, vec![0x48, 0x99]);
    }

    #[test]
    fn imm32_signed_rejects_symbol_bearing_operand() {
        // addq only offers a signed-imm32 row, so a relocatable immediate
        // here has no matching encoding at all.
        let err = encode(
            "addq",
            &[
                reg("rax"),
                Operand::Imm {
                    value: 0,
                    symbol: Some("target".to_string()),
                },
            ],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, AsmError::NoMatchingEncoding { .. }));
    }

    #[test]
    fn r12_is_legal_as_sib_index() {
        // movq (%rbx,%r12,4), %rax -> 4a 8b 04 a3
        let encoded = encode(
            "movq",
            &[
                reg("rax"),
                Operand::Mem {
                    base: Some(Register::from_att_name("rbx").unwrap()),
                    index: Some(Register::from_att_name("r12").unwrap()),
                    scale: 4,
                    disp: 0,
                },
            ],
            1,
        )
        .unwrap();
        assert_eq!(encoded.bytes, vec![0x4A, 0x8B, 0x04, 0xA3]);
    }

    #[test]
    fn rsp_is_still_illegal_as_sib_index() {
        let err = encode(
            "movq",
            &[
                reg("rax"),
                Operand::Mem {
                    base: Some(Register::from_att_name("rbx").unwrap()),
                    index: Some(Register::from_att_name("rsp").unwrap()),
                    scale: 4,
                    disp: 0,
                },
            ],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, AsmError::IllegalMemoryOperand { .. }));
    }
}
