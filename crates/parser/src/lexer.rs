// Copyright (c) 2025 the assembler project contributors, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and LICENSE.additional.

//! Character-at-a-time tokenizer for AT&T assembly source.

use asm_types::error::AsmError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Register(String),
    Immediate(i64),
    ImmediateSymbol(String),
    Number(i64),
    Str(Vec<u8>),
    Comma,
    Colon,
    LParen,
    RParen,
    Star,
    Newline,
    Eof,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'.'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_ident_continue(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    fn read_number(&mut self) -> Result<i64, AsmError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(AsmError::Lexical {
                line: self.line,
                message: "expected a number".to_string(),
            });
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        text.parse::<i64>().map_err(|e| AsmError::Lexical {
            line: self.line,
            message: format!("invalid integer literal `{text}`: {e}"),
        })
    }

    fn read_string(&mut self) -> Result<Vec<u8>, AsmError> {
        self.pos += 1; // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None | Some(b'\n') => {
                    return Err(AsmError::Lexical {
                        line: self.line,
                        message: "unterminated string literal".to_string(),
                    })
                }
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(b'0') => bytes.push(0),
                    Some(b'\\') => bytes.push(b'\\'),
                    Some(b'\'') => bytes.push(b'\''),
                    Some(b'"') => bytes.push(b'"'),
                    Some(other) => {
                        return Err(AsmError::Lexical {
                            line: self.line,
                            message: format!("unknown escape sequence `\\{}`", other as char),
                        })
                    }
                    None => {
                        return Err(AsmError::Lexical {
                            line: self.line,
                            message: "unterminated string literal".to_string(),
                        })
                    }
                },
                Some(b) => bytes.push(b),
            }
        }
        Ok(bytes)
    }

    /// Returns the next token along with the source line it started on.
    pub fn next_token(&mut self) -> Result<(Token, u32), AsmError> {
        self.skip_whitespace_and_comments();
        let line = self.line;

        let Some(b) = self.peek() else {
            return Ok((Token::Eof, line));
        };

        match b {
            b'\n' => {
                self.pos += 1;
                self.line += 1;
                Ok((Token::Newline, line))
            }
            b',' => {
                self.pos += 1;
                Ok((Token::Comma, line))
            }
            b':' => {
                self.pos += 1;
                Ok((Token::Colon, line))
            }
            b'(' => {
                self.pos += 1;
                Ok((Token::LParen, line))
            }
            b')' => {
                self.pos += 1;
                Ok((Token::RParen, line))
            }
            b'*' => {
                self.pos += 1;
                Ok((Token::Star, line))
            }
            b'"' => Ok((Token::Str(self.read_string()?), line)),
            b'%' => {
                self.pos += 1;
                Ok((Token::Register(self.read_identifier()), line))
            }
            b'$' => {
                self.pos += 1;
                if matches!(self.peek(), Some(b) if is_ident_start(b)) {
                    Ok((Token::ImmediateSymbol(self.read_identifier()), line))
                } else {
                    Ok((Token::Immediate(self.read_number()?), line))
                }
            }
            b'-' if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                Ok((Token::Number(self.read_number()?), line))
            }
            b if b.is_ascii_digit() => Ok((Token::Number(self.read_number()?), line)),
            b if is_ident_start(b) => Ok((Token::Identifier(self.read_identifier()), line)),
            other => Err(AsmError::Lexical {
                line,
                message: format!("unexpected character `{}`", other as char),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let (token, _) = lexer.next_token().unwrap();
            let is_eof = token == Token::Eof;
            out.push(token);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_a_simple_instruction_line() {
        assert_eq!(
            tokens("movq $1, %rax\n"),
            vec![
                Token::Identifier("movq".to_string()),
                Token::Immediate(1),
                Token::Comma,
                Token::Register("rax".to_string()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_memory_operand() {
        assert_eq!(
            tokens("-8(%rbp,%rax,4)"),
            vec![
                Token::Number(-8),
                Token::LParen,
                Token::Register("rbp".to_string()),
                Token::Comma,
                Token::Register("rax".to_string()),
                Token::Comma,
                Token::Number(4),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_escaped_string_literal() {
        assert_eq!(
            tokens("\"hi\\n\""),
            vec![Token::Str(vec![b'h', b'i', b'\n']), Token::Eof]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            tokens("movq %rax, %rbx # move it\n"),
            vec![
                Token::Identifier("movq".to_string()),
                Token::Register("rax".to_string()),
                Token::Comma,
                Token::Register("rbx".to_string()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }
}
