//! Recursive-descent parser over the scanner's logical lines.
//!
//! Grounded on Cordy's `compiler/parser.rs` (hand-rolled recursive descent,
//! one `parse_*` method per grammar production) scaled down to the tiny
//! statement/expression subset this crate's front end covers. Blocks are
//! delimited by indentation rather than braces, so `parse_block` groups
//! consecutive same-indented lines instead of matching a closing token.

use crate::compiler::ast::{BinOp, CompareOp, Expr, FuncDef, Module, Stmt};
use crate::compiler::scanner::{Line, Token};
use crate::error::{CompilationError, PrismError};

pub fn parse(lines: &[Line]) -> Result<Module, PrismError> {
    let mut parser = Parser { lines, pos: 0 };
    parser.parse_module()
}

struct Parser<'a> {
    lines: &'a [Line],
    pos: usize,
}

fn err(message: impl Into<String>, line: usize) -> PrismError {
    PrismError::Compilation(CompilationError::ParseError { message: message.into(), line })
}

impl<'a> Parser<'a> {
    fn parse_module(&mut self) -> Result<Module, PrismError> {
        let mut funcdefs = Vec::new();
        let mut pending_decorators = Vec::new();
        while self.pos < self.lines.len() {
            let line = &self.lines[self.pos];
            if line.indent != 0 {
                return Err(err("unexpected indentation at module level", line.line_no));
            }
            match line.tokens.as_slice() {
                [Token::KwDef, ..] => {
                    let decorators = std::mem::take(&mut pending_decorators);
                    funcdefs.push(self.parse_funcdef(decorators)?);
                }
                [Token::Ident(name)] => {
                    pending_decorators.push(name.clone());
                    self.pos += 1;
                }
                _ => return Err(err("expected a decorator name or a function definition", line.line_no)),
            }
        }
        Ok(Module { funcdefs })
    }

    fn parse_funcdef(&mut self, decorators: Vec<String>) -> Result<FuncDef, PrismError> {
        let line = &self.lines[self.pos];
        let def_indent = line.indent;
        let line_no = line.line_no;
        let mut cur = Cursor::new(&line.tokens, line_no);
        cur.expect(&Token::KwDef)?;
        let name = cur.expect_ident()?;
        cur.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !cur.check(&Token::RParen) {
            loop {
                params.push(cur.expect_ident()?);
                if cur.check(&Token::Comma) {
                    cur.next();
                } else {
                    break;
                }
            }
        }
        cur.expect(&Token::RParen)?;
        cur.expect(&Token::Colon)?;
        cur.expect_end()?;
        self.pos += 1;
        let body = self.parse_block(def_indent)?;
        Ok(FuncDef { name, params, body, decorators })
    }

    fn parse_block(&mut self, parent_indent: usize) -> Result<Vec<Stmt>, PrismError> {
        if self.pos >= self.lines.len() || self.lines[self.pos].indent <= parent_indent {
            let line_no = self.lines.get(self.pos).map(|l| l.line_no).unwrap_or(0);
            return Err(err("expected an indented block", line_no));
        }
        let block_indent = self.lines[self.pos].indent;
        let mut stmts = Vec::new();
        while self.pos < self.lines.len() && self.lines[self.pos].indent == block_indent {
            stmts.push(self.parse_stmt(block_indent)?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self, block_indent: usize) -> Result<Stmt, PrismError> {
        let line = self.lines[self.pos].clone();
        let mut cur = Cursor::new(&line.tokens, line.line_no);
        let stmt = match cur.peek() {
            Some(Token::KwPass) => {
                cur.next();
                cur.expect_end()?;
                self.pos += 1;
                Stmt::Pass
            }
            Some(Token::KwReturn) => {
                cur.next();
                let e = cur.parse_expr()?;
                cur.expect_end()?;
                self.pos += 1;
                Stmt::Return(e)
            }
            Some(Token::KwIf) => {
                cur.next();
                let cond = cur.parse_expr()?;
                cur.expect(&Token::Colon)?;
                cur.expect_end()?;
                self.pos += 1;
                let body = self.parse_block(block_indent)?;
                let mut orelse = Vec::new();
                if self.pos < self.lines.len()
                    && self.lines[self.pos].indent == block_indent
                    && self.lines[self.pos].tokens.first() == Some(&Token::KwElse)
                {
                    let eline = &self.lines[self.pos];
                    let mut ecur = Cursor::new(&eline.tokens, eline.line_no);
                    ecur.expect(&Token::KwElse)?;
                    ecur.expect(&Token::Colon)?;
                    ecur.expect_end()?;
                    self.pos += 1;
                    orelse = self.parse_block(block_indent)?;
                }
                Stmt::If { cond, body, orelse }
            }
            Some(Token::KwFor) => {
                cur.next();
                let target = cur.expect_ident()?;
                cur.expect(&Token::KwIn)?;
                let iter = cur.parse_expr()?;
                cur.expect(&Token::Colon)?;
                cur.expect_end()?;
                self.pos += 1;
                let body = self.parse_block(block_indent)?;
                Stmt::For { target, iter, body }
            }
            Some(Token::Ident(name)) if cur.peek_at(1) == Some(&Token::Eq) => {
                let name = name.clone();
                cur.next();
                cur.next();
                let e = cur.parse_expr()?;
                cur.expect_end()?;
                self.pos += 1;
                Stmt::Assign(name, e)
            }
            Some(_) => {
                let e = cur.parse_expr()?;
                cur.expect_end()?;
                self.pos += 1;
                Stmt::ExprStmt(e)
            }
            None => return Err(err("expected a statement", line.line_no)),
        };
        Ok(stmt)
    }
}

/// A cursor over one logical line's tokens, used for expression and
/// statement-header parsing.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    line_no: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token], line_no: usize) -> Cursor<'a> {
        Cursor { tokens, pos: 0, line_no }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn check(&self, t: &Token) -> bool {
        self.peek() == Some(t)
    }

    fn expect(&mut self, t: &Token) -> Result<(), PrismError> {
        if self.check(t) {
            self.pos += 1;
            Ok(())
        } else {
            Err(PrismError::Compilation(CompilationError::UnexpectedToken {
                expected: format!("{:?}", t),
                found: self.peek().map(|t| format!("{:?}", t)).unwrap_or_else(|| "end of line".to_string()),
                line: self.line_no,
            }))
        }
    }

    fn expect_ident(&mut self) -> Result<String, PrismError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            other => Err(PrismError::Compilation(CompilationError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.map(|t| format!("{:?}", t)).unwrap_or_else(|| "end of line".to_string()),
                line: self.line_no,
            })),
        }
    }

    fn expect_end(&self) -> Result<(), PrismError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(err(format!("unexpected trailing tokens: {:?}", &self.tokens[self.pos..]), self.line_no))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, PrismError> {
        let lhs = self.parse_add()?;
        match self.peek() {
            Some(Token::Lt) => {
                self.next();
                let rhs = self.parse_add()?;
                Ok(Expr::Compare(CompareOp::Lt, Box::new(lhs), Box::new(rhs)))
            }
            Some(Token::Gt) => {
                self.next();
                let rhs = self.parse_add()?;
                Ok(Expr::Compare(CompareOp::Gt, Box::new(lhs), Box::new(rhs)))
            }
            _ => Ok(lhs),
        }
    }

    fn parse_add(&mut self) -> Result<Expr, PrismError> {
        let mut lhs = self.parse_mul()?;
        while self.check(&Token::Plus) {
            self.next();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(BinOp::Add, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expr, PrismError> {
        let mut lhs = self.parse_atom()?;
        while self.check(&Token::Star) {
            self.next();
            let rhs = self.parse_atom()?;
            lhs = Expr::Binary(BinOp::Mul, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expr, PrismError> {
        match self.next().cloned() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LParen) => {
                if self.check(&Token::RParen) {
                    self.next();
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let mut items = vec![self.parse_expr()?];
                let mut saw_comma = false;
                while self.check(&Token::Comma) {
                    saw_comma = true;
                    self.next();
                    if self.check(&Token::RParen) {
                        break;
                    }
                    items.push(self.parse_expr()?);
                }
                self.expect(&Token::RParen)?;
                if saw_comma {
                    Ok(Expr::Tuple(items))
                } else {
                    Ok(items.into_iter().next().unwrap())
                }
            }
            Some(Token::Ident(name)) => {
                if self.check(&Token::LParen) {
                    self.next();
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.check(&Token::Comma) {
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    match name.as_str() {
                        "print" => Ok(Expr::Print(args)),
                        "UNROLL" => {
                            if args.len() != 1 {
                                return Err(err("UNROLL takes exactly one argument", self.line_no));
                            }
                            Ok(Expr::Unroll(Box::new(args.into_iter().next().unwrap())))
                        }
                        _ => Ok(Expr::Call(name, args)),
                    }
                } else {
                    Ok(Expr::Name(name))
                }
            }
            other => Err(err(format!("unexpected token in expression: {:?}", other), self.line_no)),
        }
    }
}
