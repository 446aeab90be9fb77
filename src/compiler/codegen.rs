//! Lowers the AST into opcodes (C4).
//!
//! A direct Rust translation of `toyvm/compiler.py`'s `FuncDefCompiler`/
//! `ModuleCompiler`, in the dispatch-by-variant idiom of Cordy's
//! `compiler/parser/codegen.rs`: local-variable discovery by walking
//! assignment/for-target nodes up front, then one emit method per
//! statement/expression shape.

use std::collections::HashSet;
use std::rc::Rc;

use crate::code::CodeObject;
use crate::compiler::ast::{self, BinOp, CompareOp, Expr, Stmt};
use crate::error::PrismError;
use crate::opcode::{is_green_name, Opcode};
use crate::value::Value;

pub struct CompiledFunc {
    pub name: String,
    pub argnames: Vec<String>,
    pub code: Rc<CodeObject>,
    pub is_green: bool,
}

pub fn compile_module(module: &ast::Module) -> Result<Vec<CompiledFunc>, PrismError> {
    let green_funcs: HashSet<String> = module
        .funcdefs
        .iter()
        .filter(|f| f.decorators.iter().any(|d| d == "green"))
        .map(|f| f.name.clone())
        .collect();
    module
        .funcdefs
        .iter()
        .map(|f| compile_funcdef(f, &green_funcs))
        .collect()
}

fn compile_funcdef(funcdef: &ast::FuncDef, green_funcs: &HashSet<String>) -> Result<CompiledFunc, PrismError> {
    let mut locals: HashSet<String> = funcdef.params.iter().cloned().collect();
    collect_locals(&funcdef.body, &mut locals);

    let mut fc = FuncDefCompiler {
        code: CodeObject::new(funcdef.name.clone(), funcdef.params.clone()),
        locals,
        green_funcs,
        counter: 0,
    };
    fc.compile_body(&funcdef.body)?;
    // Every compiled function body is suffixed with `load_const none;
    // return`, matching an implicit fall-through return of `none`.
    fc.code.emit(Opcode::LoadConst(Value::None));
    fc.code.emit(Opcode::Return);

    Ok(CompiledFunc {
        name: funcdef.name.clone(),
        argnames: funcdef.params.clone(),
        code: Rc::new(fc.code),
        is_green: green_funcs.contains(&funcdef.name),
    })
}

/// Walks assignment targets and `for` targets (including nested blocks) to
/// find every name a function body treats as a local.
fn collect_locals(body: &[Stmt], locals: &mut HashSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Assign(name, _) => {
                locals.insert(name.clone());
            }
            Stmt::For { target, body, .. } => {
                locals.insert(target.clone());
                collect_locals(body, locals);
            }
            Stmt::If { body, orelse, .. } => {
                collect_locals(body, locals);
                collect_locals(orelse, locals);
            }
            Stmt::Pass | Stmt::Return(_) | Stmt::ExprStmt(_) => {}
        }
    }
}

struct FuncDefCompiler<'a> {
    code: CodeObject,
    locals: HashSet<String>,
    green_funcs: &'a HashSet<String>,
    counter: u32,
}

impl<'a> FuncDefCompiler<'a> {
    fn new_labels(&mut self, stems: &[&str]) -> Vec<String> {
        let n = self.counter;
        self.counter += 1;
        stems.iter().map(|stem| format!("{}_{}", stem, n)).collect()
    }

    fn compile_body(&mut self, stmts: &[Stmt]) -> Result<(), PrismError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), PrismError> {
        match stmt {
            Stmt::Pass => {}
            Stmt::Return(e) => {
                self.compile_expr(e)?;
                self.code.emit(Opcode::Return);
            }
            Stmt::Assign(name, e) => {
                self.compile_expr(e)?;
                if is_green_name(name) {
                    self.code.emit(Opcode::StoreLocalGreen(name.clone()));
                } else {
                    self.code.emit(Opcode::StoreLocal(name.clone()));
                }
            }
            Stmt::If { cond, body, orelse } if orelse.is_empty() => {
                let labels = self.new_labels(&["then", "endif"]);
                let (then, endif) = (labels[0].clone(), labels[1].clone());
                self.compile_expr(cond)?;
                self.code.emit(Opcode::BrIf(then.clone(), endif.clone(), endif.clone()));
                self.code.emit(Opcode::Label(then));
                self.compile_body(body)?;
                self.code.emit(Opcode::Label(endif));
            }
            Stmt::If { cond, body, orelse } => {
                let labels = self.new_labels(&["then", "else", "endif"]);
                let (then, els, endif) = (labels[0].clone(), labels[1].clone(), labels[2].clone());
                self.compile_expr(cond)?;
                self.code.emit(Opcode::BrIf(then.clone(), els.clone(), endif.clone()));
                self.code.emit(Opcode::Label(then));
                self.compile_body(body)?;
                self.code.emit(Opcode::Br(endif.clone()));
                self.code.emit(Opcode::Label(els));
                self.compile_body(orelse)?;
                self.code.emit(Opcode::Label(endif));
            }
            Stmt::For { target, iter, body } => {
                let labels = self.new_labels(&["for", "@iter", "endfor"]);
                let (for_label, iter_name, endfor) = (labels[0].clone(), labels[1].clone(), labels[2].clone());
                self.compile_expr(iter)?;
                self.code.emit(Opcode::GetIter(iter_name.clone()));
                self.code.emit(Opcode::Label(for_label.clone()));
                self.code.emit(Opcode::ForIter(iter_name, target.clone(), endfor.clone()));
                self.compile_body(body)?;
                self.code.emit(Opcode::Br(for_label));
                self.code.emit(Opcode::Label(endfor));
            }
            Stmt::ExprStmt(e) => {
                self.compile_expr(e)?;
                self.code.emit(Opcode::Pop);
            }
        }
        Ok(())
    }

    fn compile_name_ref(&mut self, name: &str) {
        if self.locals.contains(name) {
            if is_green_name(name) {
                self.code.emit(Opcode::LoadLocalGreen(name.to_string()));
            } else {
                self.code.emit(Opcode::LoadLocal(name.to_string()));
            }
        } else if self.green_funcs.contains(name) {
            self.code.emit(Opcode::LoadNonlocalGreen(name.to_string()));
        } else {
            self.code.emit(Opcode::LoadNonlocal(name.to_string()));
        }
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), PrismError> {
        match expr {
            Expr::Int(i) => self.code.emit(Opcode::LoadConst(Value::Integer(*i))),
            Expr::Str(s) => self.code.emit(Opcode::LoadConst(Value::Str(Rc::from(s.as_str())))),
            Expr::Name(name) => self.compile_name_ref(name),
            Expr::Binary(op, lhs, rhs) => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.code.emit(match op {
                    BinOp::Add => Opcode::Add,
                    BinOp::Mul => Opcode::Mul,
                });
            }
            Expr::Compare(op, lhs, rhs) => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.code.emit(match op {
                    CompareOp::Lt => Opcode::Lt,
                    CompareOp::Gt => Opcode::Gt,
                });
            }
            Expr::Tuple(items) => {
                for item in items {
                    self.compile_expr(item)?;
                }
                self.code.emit(Opcode::MakeTuple(items.len()));
            }
            Expr::Call(name, args) => {
                // The callee is read exactly like any other name reference
                // before arguments are pushed, matching
                // `compiler.py::expr_Call`'s non-special-cased call path.
                self.compile_name_ref(name);
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.code.emit(Opcode::Call(args.len()));
            }
            Expr::Print(args) => {
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.code.emit(Opcode::Print(args.len()));
            }
            Expr::Unroll(inner) => {
                self.compile_expr(inner)?;
                self.code.emit(Opcode::Unroll);
            }
        }
        Ok(())
    }
}
