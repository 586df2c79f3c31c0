// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! The in-memory section/symbol/relocation store the driver loop builds up
//! one record at a time, and the ELF writer later serializes. No linking
//! happens here: unresolved symbol references stay as relocations.

use std::collections::HashMap;

use asm_encoding_x86_64::encoder::{RelocationHint, RelocationKind};
use asm_types::error::AsmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    Progbits,
    Nobits,
}

#[derive(Debug)]
pub(crate) struct PendingRelocation {
    pub offset: u64,
    pub symbol: String,
    pub kind: RelocationKind,
    pub addend: i64,
}

#[derive(Debug)]
pub(crate) struct SectionState {
    pub name: String,
    pub kind: SectionKind,
    pub data: Vec<u8>,
    pub bss_len: u64,
    pub relocations: Vec<PendingRelocation>,
}

impl SectionState {
    pub fn len(&self) -> u64 {
        match self.kind {
            SectionKind::Progbits => self.data.len() as u64,
            SectionKind::Nobits => self.bss_len,
        }
    }
}

#[derive(Debug, Clone)]
struct SymbolState {
    section: Option<usize>,
    value: u64,
    global: bool,
    defined: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FinalSymbol {
    pub name: String,
    pub section: Option<usize>,
    pub value: u64,
    pub global: bool,
}

/// Sections, symbols, and pending relocations for one object file.
pub struct ObjectBuilder {
    sections: Vec<SectionState>,
    section_index: HashMap<String, usize>,
    current: usize,
    symbols: HashMap<String, SymbolState>,
    symbol_order: Vec<String>,
}

impl Default for ObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBuilder {
    pub fn new() -> Self {
        let mut builder = ObjectBuilder {
            sections: Vec::new(),
            section_index: HashMap::new(),
            current: 0,
            symbols: HashMap::new(),
            symbol_order: Vec::new(),
        };
        builder.select_section(".text");
        builder
    }

    pub fn select_section(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.section_index.get(name) {
            self.current = idx;
            return idx;
        }
        let kind = if name == ".bss" {
            SectionKind::Nobits
        } else {
            SectionKind::Progbits
        };
        let idx = self.sections.len();
        self.sections.push(SectionState {
            name: name.to_string(),
            kind,
            data: Vec::new(),
            bss_len: 0,
            relocations: Vec::new(),
        });
        self.section_index.insert(name.to_string(), idx);
        self.current = idx;
        idx
    }

    pub fn current_offset(&self) -> u64 {
        self.sections[self.current].len()
    }

    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.sections[self.current].data.extend_from_slice(bytes);
    }

    pub fn emit_zero(&mut self, n: u64) {
        let section = &mut self.sections[self.current];
        match section.kind {
            SectionKind::Nobits => section.bss_len += n,
            SectionKind::Progbits => {
                let new_len = section.data.len() + n as usize;
                section.data.resize(new_len, 0);
            }
        }
    }

    fn symbol_entry(&mut self, name: &str) -> &mut SymbolState {
        if !self.symbols.contains_key(name) {
            self.symbol_order.push(name.to_string());
            self.symbols.insert(
                name.to_string(),
                SymbolState {
                    section: None,
                    value: 0,
                    global: false,
                    defined: false,
                },
            );
        }
        self.symbols.get_mut(name).unwrap()
    }

    pub fn define_symbol_here(&mut self, name: &str, addend: i64, line: u32) -> Result<(), AsmError> {
        let current = self.current;
        let offset = self.current_offset();
        let entry = self.symbol_entry(name);
        if entry.defined {
            return Err(AsmError::DuplicateSymbolDefinition {
                line,
                name: name.to_string(),
            });
        }
        entry.section = Some(current);
        entry.value = (offset as i64 + addend) as u64;
        entry.defined = true;
        Ok(())
    }

    pub fn mark_global(&mut self, name: &str) {
        self.symbol_entry(name).global = true;
    }

    pub fn reference_symbol_here(
        &mut self,
        name: &str,
        offset_within_pending_inst: u64,
        kind: RelocationKind,
        addend: i64,
    ) {
        self.symbol_entry(name);
        let offset = self.current_offset() + offset_within_pending_inst;
        self.sections[self.current].relocations.push(PendingRelocation {
            offset,
            symbol: name.to_string(),
            kind,
            addend,
        });
    }

    pub fn record_relocation_hint(&mut self, hint: &RelocationHint) {
        self.reference_symbol_here(&hint.symbol, hint.offset as u64, hint.kind, hint.addend);
    }

    pub(crate) fn sections(&self) -> &[SectionState] {
        &self.sections
    }

    /// Local symbols (creation order) followed by global symbols (creation order).
    pub(crate) fn finalized_symbols(&self) -> Vec<FinalSymbol> {
        let mut locals = Vec::new();
        let mut globals = Vec::new();
        for name in &self.symbol_order {
            let state = &self.symbols[name];
            let symbol = FinalSymbol {
                name: name.clone(),
                section: state.section,
                value: state.value,
                global: state.global,
            };
            if state.global {
                globals.push(symbol);
            } else {
                locals.push(symbol);
            }
        }
        locals.extend(globals);
        locals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_redefine_is_an_error() {
        let mut object = ObjectBuilder::new();
        object.define_symbol_here("main", 0, 1).unwrap();
        let err = object.define_symbol_here("main", 0, 5).unwrap_err();
        assert!(matches!(err, AsmError::DuplicateSymbolDefinition { .. }));
    }

    #[test]
    fn locals_sort_before_globals() {
        let mut object = ObjectBuilder::new();
        object.define_symbol_here("helper", 0, 1).unwrap();
        object.define_symbol_here("main", 0, 2).unwrap();
        object.mark_global("main");
        let symbols = object.finalized_symbols();
        assert_eq!(symbols[0].name, "helper");
        assert_eq!(symbols[1].name, "main");
        assert!(symbols[1].global);
    }

    #[test]
    fn bss_reserves_without_growing_data() {
        let mut object = ObjectBuilder::new();
        object.select_section(".bss");
        object.emit_zero(16);
        assert_eq!(object.current_offset(), 16);
        assert!(object.sections()[object.sections().len() - 1].data.is_empty());
    }
}
