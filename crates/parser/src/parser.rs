// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Recursive-descent parser turning a token stream into [`ParseRecord`]s.

use crate::ast::{Directive, Instruction, ParseRecord};
use crate::lexer::{Lexer, Token};
use asm_types::error::AsmError;
use asm_types::operand::Operand;
use asm_types::register::Register;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    buffered: Vec<(Token, u32)>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            buffered: Vec::new(),
        }
    }

    fn fill(&mut self, n: usize) -> Result<(), AsmError> {
        while self.buffered.len() < n {
            let tok = self.lexer.next_token()?;
            self.buffered.push(tok);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<&Token, AsmError> {
        self.fill(1)?;
        Ok(&self.buffered[0].0)
    }

    fn peek2(&mut self) -> Result<&Token, AsmError> {
        self.fill(2)?;
        Ok(&self.buffered[1].0)
    }

    fn peek_clone(&mut self) -> Result<(Token, u32), AsmError> {
        self.fill(1)?;
        Ok(self.buffered[0].clone())
    }

    fn bump(&mut self) -> Result<(Token, u32), AsmError> {
        self.fill(1)?;
        Ok(self.buffered.remove(0))
    }

    fn skip_newlines(&mut self) -> Result<(), AsmError> {
        while matches!(self.peek()?, Token::Newline) {
            self.bump()?;
        }
        Ok(())
    }

    fn expect_end_of_line(&mut self) -> Result<(), AsmError> {
        match self.peek()?.clone() {
            Token::Newline => {
                self.bump()?;
                Ok(())
            }
            Token::Eof => Ok(()),
            other => {
                let (_, line) = self.bump()?;
                Err(AsmError::Syntax {
                    line,
                    message: format!("expected end of line, found {other:?}"),
                })
            }
        }
    }

    fn expect_identifier_like(&mut self) -> Result<String, AsmError> {
        let (tok, line) = self.bump()?;
        match tok {
            Token::Identifier(name) => Ok(name),
            other => Err(AsmError::Syntax {
                line,
                message: format!("expected a name, found {other:?}"),
            }),
        }
    }

    fn resolve_register(name: &str, line: u32) -> Result<Register, AsmError> {
        Register::from_att_name(name).ok_or_else(|| AsmError::Syntax {
            line,
            message: format!("unknown register `%{name}`"),
        })
    }

    fn parse_optional_register(&mut self) -> Result<Option<Register>, AsmError> {
        if let Token::Register(name) = self.peek()?.clone() {
            let (_, line) = self.bump()?;
            Ok(Some(Self::resolve_register(&name, line)?))
        } else {
            Ok(None)
        }
    }

    fn parse_memory_operand(&mut self) -> Result<Operand, AsmError> {
        let disp = if let Token::Number(n) = self.peek()?.clone() {
            self.bump()?;
            n
        } else {
            0
        };
        let (tok, line) = self.bump()?;
        if tok != Token::LParen {
            return Err(AsmError::Syntax {
                line,
                message: format!("expected `(`, found {tok:?}"),
            });
        }

        let base = self.parse_optional_register()?;
        let mut index = None;
        let mut scale = 1u8;
        if matches!(self.peek()?, Token::Comma) {
            self.bump()?;
            index = self.parse_optional_register()?;
            if matches!(self.peek()?, Token::Comma) {
                self.bump()?;
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Number(1) => scale = 1,
                    Token::Number(2) => scale = 2,
                    Token::Number(4) => scale = 4,
                    Token::Number(8) => scale = 8,
                    Token::Number(n) => {
                        return Err(AsmError::IllegalMemoryOperand {
                            line,
                            message: format!("scale must be 1, 2, 4, or 8, found {n}"),
                        })
                    }
                    other => {
                        return Err(AsmError::Syntax {
                            line,
                            message: format!("expected a scale factor, found {other:?}"),
                        })
                    }
                }
            }
        }

        let (tok, line) = self.bump()?;
        if tok != Token::RParen {
            return Err(AsmError::Syntax {
                line,
                message: format!("expected `)`, found {tok:?}"),
            });
        }

        if base.is_none() && index.is_none() {
            return Err(AsmError::IllegalMemoryOperand {
                line,
                message: "memory operand needs a base or an index register".to_string(),
            });
        }

        Ok(Operand::Mem {
            base,
            index,
            scale,
            disp,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, AsmError> {
        let (tok, line) = self.peek_clone()?;
        match tok {
            Token::Register(name) => {
                self.bump()?;
                Ok(Operand::Reg(Self::resolve_register(&name, line)?))
            }
            Token::Star => {
                self.bump()?;
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Register(name) => {
                        Ok(Operand::RegIndirect(Self::resolve_register(&name, line)?))
                    }
                    other => Err(AsmError::Syntax {
                        line,
                        message: format!("expected a register after `*`, found {other:?}"),
                    }),
                }
            }
            Token::Immediate(value) => {
                self.bump()?;
                Ok(Operand::Imm {
                    value,
                    symbol: None,
                })
            }
            Token::ImmediateSymbol(name) => {
                self.bump()?;
                Ok(Operand::Imm {
                    value: 0,
                    symbol: Some(name),
                })
            }
            Token::Identifier(name) => {
                self.bump()?;
                Ok(Operand::RelImm {
                    value: 0,
                    symbol: Some(name),
                })
            }
            Token::Number(_) | Token::LParen => self.parse_memory_operand(),
            other => Err(AsmError::Syntax {
                line,
                message: format!("unexpected token {other:?} in operand position"),
            }),
        }
    }

    fn parse_instruction(&mut self, mnemonic: String, line: u32) -> Result<ParseRecord, AsmError> {
        let mut operands = Vec::new();
        if !matches!(self.peek()?, Token::Newline | Token::Eof) {
            operands.push(self.parse_operand()?);
            while matches!(self.peek()?, Token::Comma) {
                self.bump()?;
                operands.push(self.parse_operand()?);
            }
        }
        self.expect_end_of_line()?;
        // AT&T source order is src-first; the encoding table is keyed
        // destination-first, so flip here once rather than at every call site.
        operands.reverse();
        Ok(ParseRecord::Instruction(Instruction {
            mnemonic,
            operands,
            line,
        }))
    }

    fn parse_directive(&mut self, name: String, line: u32) -> Result<ParseRecord, AsmError> {
        let directive = match name.as_str() {
            ".section" => Directive::Section(self.expect_identifier_like()?),
            ".text" => Directive::Section(".text".to_string()),
            ".data" => Directive::Section(".data".to_string()),
            ".bss" => Directive::Section(".bss".to_string()),
            ".global" | ".globl" => Directive::Global(self.expect_identifier_like()?),
            ".string" | ".asciz" => {
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Str(mut bytes) => {
                        bytes.push(0);
                        Directive::String(bytes)
                    }
                    other => {
                        return Err(AsmError::Syntax {
                            line,
                            message: format!("expected a string literal, found {other:?}"),
                        })
                    }
                }
            }
            ".zero" => {
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Number(n) if n >= 0 => Directive::Zero(n as u64),
                    other => {
                        return Err(AsmError::Syntax {
                            line,
                            message: format!("expected a non-negative size, found {other:?}"),
                        })
                    }
                }
            }
            ".quad" => {
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Number(n) => Directive::Quad {
                        value: n,
                        symbol: None,
                    },
                    Token::Identifier(symbol) => Directive::Quad {
                        value: 0,
                        symbol: Some(symbol),
                    },
                    other => {
                        return Err(AsmError::Syntax {
                            line,
                            message: format!("expected a quad value, found {other:?}"),
                        })
                    }
                }
            }
            ".byte" => {
                let (tok, line) = self.bump()?;
                match tok {
                    Token::Number(n) => Directive::Byte(n),
                    other => {
                        return Err(AsmError::Syntax {
                            line,
                            message: format!("expected a byte value, found {other:?}"),
                        })
                    }
                }
            }
            other => {
                return Err(AsmError::Syntax {
                    line,
                    message: format!("unknown directive `{other}`"),
                })
            }
        };
        self.expect_end_of_line()?;
        Ok(ParseRecord::Directive(directive))
    }

    /// Returns the next record. Once [`ParseRecord::Eof`] is returned it
    /// keeps being returned on every subsequent call.
    pub fn next_record(&mut self) -> Result<ParseRecord, AsmError> {
        self.skip_newlines()?;
        let (tok, line) = self.peek_clone()?;
        match tok {
            Token::Eof => Ok(ParseRecord::Eof),
            Token::Identifier(name) if name.starts_with('.') => {
                self.bump()?;
                self.parse_directive(name, line)
            }
            Token::Identifier(name) => {
                if matches!(self.peek2()?, Token::Colon) {
                    self.bump()?;
                    self.bump()?;
                    Ok(ParseRecord::Label { name, line })
                } else {
                    self.bump()?;
                    self.parse_instruction(name, line)
                }
            }
            other => Err(AsmError::Syntax {
                line,
                message: format!("expected a label, directive, or instruction, found {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asm_types::register::Width;
    use pretty_assertions::assert_eq;

    fn records(source: &str) -> Vec<ParseRecord> {
        let mut parser = Parser::new(source);
        let mut out = Vec::new();
        loop {
            let record = parser.next_record().unwrap();
            let is_eof = record == ParseRecord::Eof;
            out.push(record);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn parses_label_and_instruction() {
        let recs = records("main:\n  movq $1, %rax\n");
        assert_eq!(
            recs,
            vec![
                ParseRecord::Label {
                    name: "main".to_string(),
                    line: 1
                },
                ParseRecord::Instruction(Instruction {
                    mnemonic: "movq".to_string(),
                    operands: vec![
                        Operand::Reg(Register::new(0, Width::Qword)),
                        Operand::Imm {
                            value: 1,
                            symbol: None
                        },
                    ],
                    line: 2,
                }),
                ParseRecord::Eof,
            ]
        );
    }

    #[test]
    fn parses_memory_operand_with_base_index_scale() {
        let recs = records("movq -8(%rbp,%rax,4), %rbx\n");
        match &recs[0] {
            ParseRecord::Instruction(instr) => {
                assert_eq!(
                    instr.operands[1],
                    Operand::Mem {
                        base: Some(Register::new(5, Width::Qword)),
                        index: Some(Register::new(0, Width::Qword)),
                        scale: 4,
                        disp: -8,
                    }
                );
            }
            other => panic!("expected an instruction, got {other:?}"),
        }
    }

    #[test]
    fn parses_indirect_call_target() {
        let recs = records("call *%rax\n");
        match &recs[0] {
            ParseRecord::Instruction(instr) => {
                assert_eq!(
                    instr.operands[0],
                    Operand::RegIndirect(Register::new(0, Width::Qword))
                );
            }
            other => panic!("expected an instruction, got {other:?}"),
        }
    }

    #[test]
    fn parses_directives() {
        let recs = records(".global main\n.section .data\n.string \"hi\"\n.zero 4\n.quad 7\n.byte 9\n");
        assert_eq!(
            recs,
            vec![
                ParseRecord::Directive(Directive::Global("main".to_string())),
                ParseRecord::Directive(Directive::Section(".data".to_string())),
                ParseRecord::Directive(Directive::String(vec![b'h', b'i', 0])),
                ParseRecord::Directive(Directive::Zero(4)),
                ParseRecord::Directive(Directive::Quad {
                    value: 7,
                    symbol: None
                }),
                ParseRecord::Directive(Directive::Byte(9)),
                ParseRecord::Eof,
            ]
        );
    }

    #[test]
    fn rejects_unknown_register() {
        let mut parser = Parser::new("movq $1, %xmm0\n");
        assert!(parser.next_record().is_err());
    }
}
