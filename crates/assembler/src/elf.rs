// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Hand-rolled ET_REL ELF64 little-endian object writer. No external object
//! file crate is used: the layout (section order, `e_shoff`, symbol
//! ordering) is specified exactly enough that writing it directly is
//! simpler and more auditable than going through a general-purpose library.

use std::collections::HashMap;

use asm_encoding_x86_64::encoder::RelocationKind;

use crate::object::{ObjectBuilder, SectionKind};

const EHDR_SIZE: u64 = 64;
const SHDR_SIZE: u64 = 64;

const ET_REL: u16 = 1;
const EM_X86_64: u16 = 0x3e;

const SHT_NULL: u32 = 0;
const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_RELA: u32 = 4;
const SHT_NOBITS: u32 = 8;

const SHF_WRITE: u64 = 0x1;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;

const SHN_UNDEF: u16 = 0;

const STB_LOCAL: u8 = 0;
const STB_GLOBAL: u8 = 1;
const STT_NOTYPE: u8 = 0;

fn section_flags(name: &str) -> u64 {
    match name {
        ".text" => SHF_ALLOC | SHF_EXECINSTR,
        ".bss" | ".data" => SHF_ALLOC | SHF_WRITE,
        _ => SHF_ALLOC,
    }
}

fn relocation_type(kind: RelocationKind) -> u32 {
    match kind {
        RelocationKind::Absolute64 => 1, // R_X86_64_64
        RelocationKind::Pc32 => 2,       // R_X86_64_PC32
        RelocationKind::Absolute32 => 11, // R_X86_64_32S
    }
}

struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        StringTable { bytes: vec![0] }
    }

    fn intern(&mut self, s: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        offset
    }
}

struct ShdrEntry {
    name: u32,
    sh_type: u32,
    flags: u64,
    content: Option<Vec<u8>>,
    size: u64,
    link: u32,
    info: u32,
    addralign: u64,
    entsize: u64,
}

fn write_ehdr(buf: &mut Vec<u8>, shnum: u16, shstrndx: u16) {
    let mut h = [0u8; EHDR_SIZE as usize];
    h[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    h[4] = 2; // ELFCLASS64
    h[5] = 1; // ELFDATA2LSB
    h[6] = 1; // EV_CURRENT
    h[16..18].copy_from_slice(&ET_REL.to_le_bytes());
    h[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
    h[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
    h[40..48].copy_from_slice(&EHDR_SIZE.to_le_bytes()); // e_shoff
    h[52..54].copy_from_slice(&(EHDR_SIZE as u16).to_le_bytes()); // e_ehsize
    h[58..60].copy_from_slice(&(SHDR_SIZE as u16).to_le_bytes()); // e_shentsize
    h[60..62].copy_from_slice(&shnum.to_le_bytes());
    h[62..64].copy_from_slice(&shstrndx.to_le_bytes());
    buf.extend_from_slice(&h);
}

fn write_shdr(buf: &mut Vec<u8>, entry: &ShdrEntry, offset: u64) {
    buf.extend_from_slice(&entry.name.to_le_bytes());
    buf.extend_from_slice(&entry.sh_type.to_le_bytes());
    buf.extend_from_slice(&entry.flags.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
    buf.extend_from_slice(&offset.to_le_bytes());
    buf.extend_from_slice(&entry.size.to_le_bytes());
    buf.extend_from_slice(&entry.link.to_le_bytes());
    buf.extend_from_slice(&entry.info.to_le_bytes());
    buf.extend_from_slice(&entry.addralign.to_le_bytes());
    buf.extend_from_slice(&entry.entsize.to_le_bytes());
}

fn build_symtab(
    symbols: &[crate::object::FinalSymbol],
    symbol_name_off: &[u32],
    section_shdr_index: &[u16],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(24 * (symbols.len() + 1));
    buf.extend_from_slice(&[0u8; 24]); // STN_UNDEF
    for (i, symbol) in symbols.iter().enumerate() {
        let binding = if symbol.global { STB_GLOBAL } else { STB_LOCAL };
        let st_info = (binding << 4) | STT_NOTYPE;
        let st_shndx = match symbol.section {
            Some(idx) => section_shdr_index[idx],
            None => SHN_UNDEF,
        };
        buf.extend_from_slice(&symbol_name_off[i].to_le_bytes());
        buf.push(st_info);
        buf.push(0); // st_other
        buf.extend_from_slice(&st_shndx.to_le_bytes());
        buf.extend_from_slice(&symbol.value.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes()); // st_size
    }
    buf
}

fn build_rela(
    relocations: &[crate::object::PendingRelocation],
    symbol_index: &HashMap<String, u32>,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(24 * relocations.len());
    for reloc in relocations {
        let sym_idx = *symbol_index.get(&reloc.symbol).unwrap_or(&0) as u64;
        let r_info = (sym_idx << 32) | relocation_type(reloc.kind) as u64;
        buf.extend_from_slice(&reloc.offset.to_le_bytes());
        buf.extend_from_slice(&r_info.to_le_bytes());
        buf.extend_from_slice(&reloc.addend.to_le_bytes());
    }
    buf
}

/// Serialize the object builder's current state into a complete ET_REL
/// ELF64 file. Calling this twice on the same state yields identical bytes.
pub fn build(object: &ObjectBuilder) -> Vec<u8> {
    let sections = object.sections();
    let symbols = object.finalized_symbols();

    let mut shstrtab = StringTable::new();
    let mut strtab = StringTable::new();

    let section_name_off: Vec<u32> = sections.iter().map(|s| shstrtab.intern(&s.name)).collect();
    let symtab_name = shstrtab.intern(".symtab");
    let rela_name: Vec<Option<u32>> = sections
        .iter()
        .map(|s| {
            if s.relocations.is_empty() {
                None
            } else {
                Some(shstrtab.intern(&format!(".rela{}", s.name)))
            }
        })
        .collect();
    let strtab_name = shstrtab.intern(".strtab");
    let shstrtab_name = shstrtab.intern(".shstrtab");

    let symbol_name_off: Vec<u32> = symbols.iter().map(|s| strtab.intern(&s.name)).collect();
    let local_count = symbols.iter().filter(|s| !s.global).count();

    let mut symbol_index = HashMap::new();
    for (i, symbol) in symbols.iter().enumerate() {
        symbol_index.insert(symbol.name.clone(), (i + 1) as u32);
    }

    let mut headers: Vec<ShdrEntry> = Vec::new();
    headers.push(ShdrEntry {
        name: 0,
        sh_type: SHT_NULL,
        flags: 0,
        content: None,
        size: 0,
        link: 0,
        info: 0,
        addralign: 0,
        entsize: 0,
    });

    let mut section_shdr_index = Vec::with_capacity(sections.len());
    for (i, section) in sections.iter().enumerate() {
        section_shdr_index.push(headers.len() as u16);
        let is_bss = section.kind == SectionKind::Nobits;
        headers.push(ShdrEntry {
            name: section_name_off[i],
            sh_type: if is_bss { SHT_NOBITS } else { SHT_PROGBITS },
            flags: section_flags(&section.name),
            content: if is_bss { None } else { Some(section.data.clone()) },
            size: section.len(),
            link: 0,
            info: 0,
            addralign: 1,
            entsize: 0,
        });
    }

    let symtab_shdr_index = headers.len() as u32;
    headers.push(ShdrEntry {
        name: symtab_name,
        sh_type: SHT_SYMTAB,
        flags: 0,
        content: Some(build_symtab(&symbols, &symbol_name_off, &section_shdr_index)),
        size: 24 * (symbols.len() as u64 + 1),
        link: 0, // patched below, once .strtab's index is known
        info: (1 + local_count) as u32,
        addralign: 8,
        entsize: 24,
    });

    for (i, section) in sections.iter().enumerate() {
        if section.relocations.is_empty() {
            continue;
        }
        headers.push(ShdrEntry {
            name: rela_name[i].unwrap(),
            sh_type: SHT_RELA,
            flags: 0,
            content: Some(build_rela(&section.relocations, &symbol_index)),
            size: 24 * section.relocations.len() as u64,
            link: symtab_shdr_index,
            info: section_shdr_index[i] as u32,
            addralign: 8,
            entsize: 24,
        });
    }

    let strtab_shdr_index = headers.len() as u32;
    headers.push(ShdrEntry {
        name: strtab_name,
        sh_type: SHT_STRTAB,
        flags: 0,
        content: Some(strtab.bytes.clone()),
        size: strtab.bytes.len() as u64,
        link: 0,
        info: 0,
        addralign: 1,
        entsize: 0,
    });
    headers[symtab_shdr_index as usize].link = strtab_shdr_index;

    let shstrtab_shdr_index = headers.len() as u32;
    headers.push(ShdrEntry {
        name: shstrtab_name,
        sh_type: SHT_STRTAB,
        flags: 0,
        content: Some(shstrtab.bytes.clone()),
        size: shstrtab.bytes.len() as u64,
        link: 0,
        info: 0,
        addralign: 1,
        entsize: 0,
    });

    let shnum = headers.len() as u16;
    let mut content_offset = EHDR_SIZE + SHDR_SIZE * shnum as u64;
    let mut offsets = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        if i == 0 {
            // SHN_UNDEF: no content, conventionally offset 0.
            offsets.push(0);
            continue;
        }
        offsets.push(content_offset);
        if let Some(bytes) = &header.content {
            content_offset += bytes.len() as u64;
        }
    }

    let mut out = Vec::new();
    write_ehdr(&mut out, shnum, shstrtab_shdr_index as u16);
    for (header, offset) in headers.iter().zip(&offsets) {
        write_shdr(&mut out, header, *offset);
    }
    for header in &headers {
        if let Some(bytes) = &header.content {
            out.extend_from_slice(bytes);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ret_only_text_section_has_one_global_symbol() {
        let mut object = ObjectBuilder::new();
        object.select_section(".text");
        object.mark_global("main");
        object.define_symbol_here("main", 0, 1).unwrap();
        object.emit_bytes(&[0xc3]);

        let bytes = build(&object);
        assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
        assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), ET_REL);
        assert_eq!(u64::from_le_bytes(bytes[40..48].try_into().unwrap()), EHDR_SIZE);
    }

    #[test]
    fn writer_is_idempotent() {
        let mut object = ObjectBuilder::new();
        object.mark_global("main");
        object.define_symbol_here("main", 0, 1).unwrap();
        object.emit_bytes(&[0xc3]);

        assert_eq!(build(&object), build(&object));
    }
}
