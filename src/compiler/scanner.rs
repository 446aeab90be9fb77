//! Tokenizer for the tiny indentation-sensitive surface language.
//!
//! Grounded on Cordy's `compiler/scanner.rs` (a hand-rolled token enum fed
//! by a straightforward char scan, no external lexer generator). Unlike
//! Cordy's brace-delimited language, blocks here are indentation-delimited
//! like the Python source `toy_compile` dedents before parsing
//! (`original_source/toyvm/compiler.py`), so the scanner groups tokens into
//! logical lines tagged with their indentation width and leaves block
//! structure to the parser.

use crate::code::dedent;
use crate::error::{CompilationError, PrismError};
use crate::trace::trace_parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    KwDef,
    KwReturn,
    KwPass,
    KwIf,
    KwElse,
    KwFor,
    KwIn,
    Plus,
    Star,
    Lt,
    Gt,
    Eq,
    Comma,
    Colon,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub indent: usize,
    pub tokens: Vec<Token>,
    pub line_no: usize,
}

pub fn scan(source: &str) -> Result<Vec<Line>, PrismError> {
    let dedented = dedent(source);
    let mut lines = Vec::new();
    for (i, raw) in dedented.lines().enumerate() {
        let line_no = i + 1;
        let trimmed_start = raw.trim_start();
        if trimmed_start.is_empty() || trimmed_start.starts_with('#') {
            continue;
        }
        let indent = raw.len() - trimmed_start.len();
        let tokens = tokenize_line(trimmed_start, line_no)?;
        trace_parser!("line {}: indent={} tokens={:?}", line_no, indent, tokens);
        lines.push(Line { indent, tokens, line_no });
    }
    Ok(lines)
}

fn tokenize_line(content: &str, line_no: usize) -> Result<Vec<Token>, PrismError> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '#' {
            break;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<i64>().map_err(|_| {
                PrismError::Compilation(CompilationError::ParseError {
                    message: format!("invalid integer literal: {}", text),
                    line: line_no,
                })
            })?;
            tokens.push(Token::Int(value));
        } else if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i >= chars.len() {
                return Err(PrismError::Compilation(CompilationError::ParseError {
                    message: "unterminated string literal".to_string(),
                    line: line_no,
                }));
            }
            let text: String = chars[start..i].iter().collect();
            i += 1;
            tokens.push(Token::Str(text));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.as_str() {
                "def" => Token::KwDef,
                "return" => Token::KwReturn,
                "pass" => Token::KwPass,
                "if" => Token::KwIf,
                "else" => Token::KwElse,
                "for" => Token::KwFor,
                "in" => Token::KwIn,
                _ => Token::Ident(word),
            });
        } else {
            let tok = match c {
                '+' => Token::Plus,
                '*' => Token::Star,
                '<' => Token::Lt,
                '>' => Token::Gt,
                '=' => Token::Eq,
                ',' => Token::Comma,
                ':' => Token::Colon,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => {
                    return Err(PrismError::Compilation(CompilationError::ParseError {
                        message: format!("unexpected character: {:?}", other),
                        line: line_no,
                    }))
                }
            };
            tokens.push(tok);
            i += 1;
        }
    }
    Ok(tokens)
}
