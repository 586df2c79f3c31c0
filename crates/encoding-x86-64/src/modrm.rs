// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! ModR/M and SIB byte construction for memory and register operands.
//!
//! Two encodings are irregular enough to need special-casing, both because
//! their natural ModR/M form collides with a different addressing mode:
//! - `rm == 0b100` (RSP, R12) always means "SIB byte follows", so a base of
//!   RSP/R12 forces a SIB byte even with no index.
//! - `mod == 0b00, rm == 0b101` means "no base, disp32 follows" (RIP-relative
//!   in 64-bit mode, absolute otherwise), so a base of RBP/R13 with a zero
//!   displacement must be re-encoded as `mod == 0b01` with an explicit
//!   `disp8 == 0` to keep addressing that register directly.

use asm_types::register::Register;

/// A fully resolved memory operand addressing mode, ready to encode.
pub struct MemOperand {
    pub base: Option<Register>,
    pub index: Option<Register>,
    pub scale: u8,
    pub disp: i64,
}

/// ModR/M mode field.
const MOD_NO_DISP: u8 = 0b00;
const MOD_DISP8: u8 = 0b01;
const MOD_DISP32: u8 = 0b10;
const MOD_REGISTER: u8 = 0b11;

pub struct EncodedAddress {
    pub modrm: u8,
    pub sib: Option<u8>,
    pub disp: Vec<u8>,
    /// REX.X — set when an index register needs the extension bit.
    pub rex_x: bool,
    /// REX.B — set when a base/rm register needs the extension bit.
    pub rex_b: bool,
}

fn encode_disp(disp: i64, force_disp32: bool) -> (u8, Vec<u8>) {
    if disp == 0 && !force_disp32 {
        (MOD_NO_DISP, Vec::new())
    } else if !force_disp32 && i8::try_from(disp).is_ok() {
        (MOD_DISP8, vec![disp as i8 as u8])
    } else {
        (MOD_DISP32, (disp as i32).to_le_bytes().to_vec())
    }
}

fn scale_bits(scale: u8) -> u8 {
    match scale {
        1 => 0b00,
        2 => 0b01,
        4 => 0b10,
        8 => 0b11,
        _ => unreachable!("scale must be validated to one of 1, 2, 4, 8 before reaching here"),
    }
}

/// Build the ModR/M (+ optional SIB, + optional displacement) encoding of a
/// memory operand. `reg_field` is the 3-bit value that goes in ModR/M.reg —
/// either another operand's register, or a fixed opcode extension digit.
pub fn encode_memory(mem: &MemOperand, reg_field: u8) -> EncodedAddress {
    let reg_field = reg_field & 0b111;

    match (mem.base, mem.index) {
        (None, None) => {
            // Absolute disp32, no base and no index: SIB with base=101, index=100 (none).
            let (_, disp) = encode_disp(mem.disp, true);
            EncodedAddress {
                modrm: (MOD_NO_DISP << 6) | (reg_field << 3) | 0b100,
                sib: Some((0b00 << 6) | (0b100 << 3) | 0b101),
                disp,
                rex_x: false,
                rex_b: false,
            }
        }
        (None, Some(index)) => {
            // disp32(,%index,scale): SIB base=101 (none), mod=00.
            let (_, disp) = encode_disp(mem.disp, true);
            let sib = (scale_bits(mem.scale) << 6) | (index.encoding_bits() << 3) | 0b101;
            EncodedAddress {
                modrm: (MOD_NO_DISP << 6) | (reg_field << 3) | 0b100,
                sib: Some(sib),
                disp,
                rex_x: index.needs_rex_extension(),
                rex_b: false,
            }
        }
        (Some(base), None) => {
            let base_bits = base.encoding_bits();
            if base_bits == 0b100 {
                // RSP/R12 as base: rm=100 always means SIB follows, even with no index.
                let (md, disp) = encode_disp(mem.disp, false);
                let sib = (0b00 << 6) | (0b100 << 3) | base_bits;
                EncodedAddress {
                    modrm: (md << 6) | (reg_field << 3) | 0b100,
                    sib: Some(sib),
                    disp,
                    rex_x: false,
                    rex_b: base.needs_rex_extension(),
                }
            } else if base_bits == 0b101 {
                // RBP/R13 as base: mod=00,rm=101 means "no base"; force disp8=0 minimum.
                let (md, disp) = encode_disp(mem.disp, false);
                let md = if md == MOD_NO_DISP { MOD_DISP8 } else { md };
                let disp = if disp.is_empty() { vec![0u8] } else { disp };
                EncodedAddress {
                    modrm: (md << 6) | (reg_field << 3) | base_bits,
                    sib: None,
                    disp,
                    rex_x: false,
                    rex_b: base.needs_rex_extension(),
                }
            } else {
                let (md, disp) = encode_disp(mem.disp, false);
                EncodedAddress {
                    modrm: (md << 6) | (reg_field << 3) | base_bits,
                    sib: None,
                    disp,
                    rex_x: false,
                    rex_b: base.needs_rex_extension(),
                }
            }
        }
        (Some(base), Some(index)) => {
            let base_bits = base.encoding_bits();
            let (md, disp) = if base_bits == 0b101 {
                let (md, disp) = encode_disp(mem.disp, false);
                let md = if md == MOD_NO_DISP { MOD_DISP8 } else { md };
                let disp = if disp.is_empty() { vec![0u8] } else { disp };
                (md, disp)
            } else {
                encode_disp(mem.disp, false)
            };
            let sib = (scale_bits(mem.scale) << 6) | (index.encoding_bits() << 3) | base_bits;
            EncodedAddress {
                modrm: (md << 6) | (reg_field << 3) | 0b100,
                sib: Some(sib),
                disp,
                rex_x: index.needs_rex_extension(),
                rex_b: base.needs_rex_extension(),
            }
        }
    }
}

/// ModR/M byte for a direct register operand (no memory indirection).
pub fn encode_register(rm: Register, reg_field: u8) -> u8 {
    (MOD_REGISTER << 6) | ((reg_field & 0b111) << 3) | rm.encoding_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use asm_types::register::Width;

    fn reg(index: u8) -> Register {
        Register::new(index, Width::Qword)
    }

    #[test]
    fn base_only_no_special_case() {
        // (%rax), reg_field=0 -> mod=00, rm=000, no SIB.
        let addr = encode_memory(
            &MemOperand {
                base: Some(reg(0)),
                index: None,
                scale: 1,
                disp: 0,
            },
            0,
        );
        assert_eq!(addr.modrm, 0b00_000_000);
        assert!(addr.sib.is_none());
        assert!(addr.disp.is_empty());
    }

    #[test]
    fn rbp_base_forces_disp8_zero() {
        let addr = encode_memory(
            &MemOperand {
                base: Some(reg(5)),
                index: None,
                scale: 1,
                disp: 0,
            },
            0,
        );
        assert_eq!(addr.modrm, 0b01_000_101);
        assert!(addr.sib.is_none());
        assert_eq!(addr.disp, vec![0]);
    }

    #[test]
    fn rsp_base_forces_sib() {
        let addr = encode_memory(
            &MemOperand {
                base: Some(reg(4)),
                index: None,
                scale: 1,
                disp: 8,
            },
            0,
        );
        assert_eq!(addr.modrm & 0b11_000_111, 0b01_000_100);
        assert_eq!(addr.sib, Some(0b00_100_100));
        assert_eq!(addr.disp, vec![8]);
    }

    #[test]
    fn base_index_scale() {
        let addr = encode_memory(
            &MemOperand {
                base: Some(reg(0)),
                index: Some(reg(1)),
                scale: 4,
                disp: 0,
            },
            2,
        );
        assert_eq!(addr.modrm, 0b00_010_100);
        assert_eq!(addr.sib, Some(0b10_001_000));
    }
}
