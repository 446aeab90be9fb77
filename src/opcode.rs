//! The opcode table (C2).
//!
//! One variant per row of the table in spec §4.1; `pops`/`pushes`/`is_pure`
//! mirror `toyvm/opcode.py`'s `STACK_EFFECT`/`PURE_OPS` tables (the ground
//! truth for exact arities and purity), and `disassembly`/`Display` mirror
//! Cordy's `Opcode::disassembly` in `vm/opcode.rs`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::code::CodeObject;
use crate::error::{OpcodeArityError, PrismError};
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
    LoadConst(Value),
    LoadLocal(String),
    StoreLocal(String),
    LoadLocalGreen(String),
    StoreLocalGreen(String),
    LoadNonlocal(String),
    LoadNonlocalGreen(String),
    Add,
    Mul,
    Lt,
    Gt,
    I32Add,
    MakeTuple(usize),
    Unroll,
    GetIter(String),
    ForIter(String, String, String),
    Print(usize),
    Call(usize),
    Pop,
    Label(String),
    Br(String),
    BrIf(String, String, String),
    MakeFunction(Rc<CodeObject>),
    Return,
    Abort(String),
}

/// Opcodes whose execution depends only on their operands and the current
/// operand stack, never on the surrounding frame's dynamic (red) state.
/// Ported verbatim from `toyvm/opcode.py::PURE_OPS`.
fn is_pure_name(op: &Opcode) -> bool {
    matches!(
        op,
        Opcode::LoadConst(_)
            | Opcode::Add
            | Opcode::Mul
            | Opcode::I32Add
            | Opcode::MakeTuple(_)
            | Opcode::Unroll
            | Opcode::LoadNonlocalGreen(_)
    )
}

impl Opcode {
    pub fn is_pure(&self) -> bool {
        is_pure_name(self)
    }

    pub fn pops(&self) -> usize {
        match self {
            Opcode::LoadConst(_) => 0,
            Opcode::LoadLocal(_) => 0,
            Opcode::StoreLocal(_) => 1,
            Opcode::LoadLocalGreen(_) => 0,
            Opcode::StoreLocalGreen(_) => 1,
            Opcode::LoadNonlocal(_) => 0,
            Opcode::LoadNonlocalGreen(_) => 0,
            Opcode::Add => 2,
            Opcode::Mul => 2,
            Opcode::Lt => 2,
            Opcode::Gt => 2,
            Opcode::I32Add => 2,
            Opcode::MakeTuple(k) => *k,
            Opcode::Unroll => 1,
            Opcode::GetIter(_) => 1,
            Opcode::ForIter(..) => 0,
            Opcode::Print(k) => *k,
            Opcode::Call(k) => *k + 1,
            Opcode::Pop => 1,
            Opcode::Label(_) => 0,
            Opcode::Br(_) => 0,
            Opcode::BrIf(..) => 1,
            Opcode::MakeFunction(_) => 0,
            Opcode::Return => 1,
            Opcode::Abort(_) => 0,
        }
    }

    pub fn pushes(&self) -> usize {
        match self {
            Opcode::LoadConst(_) => 1,
            Opcode::LoadLocal(_) => 1,
            Opcode::StoreLocal(_) => 0,
            Opcode::LoadLocalGreen(_) => 1,
            Opcode::StoreLocalGreen(_) => 0,
            Opcode::LoadNonlocal(_) => 1,
            Opcode::LoadNonlocalGreen(_) => 1,
            Opcode::Add => 1,
            Opcode::Mul => 1,
            Opcode::Lt => 1,
            Opcode::Gt => 1,
            Opcode::I32Add => 1,
            Opcode::MakeTuple(_) => 1,
            Opcode::Unroll => 1,
            Opcode::GetIter(_) => 0,
            Opcode::ForIter(..) => 0,
            Opcode::Print(_) => 1,
            Opcode::Call(_) => 1,
            Opcode::Pop => 0,
            Opcode::Label(_) => 0,
            Opcode::Br(_) => 0,
            Opcode::BrIf(..) => 0,
            Opcode::MakeFunction(_) => 1,
            Opcode::Return => 0,
            Opcode::Abort(_) => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::LoadConst(_) => "load_const",
            Opcode::LoadLocal(_) => "load_local",
            Opcode::StoreLocal(_) => "store_local",
            Opcode::LoadLocalGreen(_) => "load_local_green",
            Opcode::StoreLocalGreen(_) => "store_local_green",
            Opcode::LoadNonlocal(_) => "load_nonlocal",
            Opcode::LoadNonlocalGreen(_) => "load_nonlocal_green",
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::Lt => "lt",
            Opcode::Gt => "gt",
            Opcode::I32Add => "i32_add",
            Opcode::MakeTuple(_) => "make_tuple",
            Opcode::Unroll => "unroll",
            Opcode::GetIter(_) => "get_iter",
            Opcode::ForIter(..) => "for_iter",
            Opcode::Print(_) => "print",
            Opcode::Call(_) => "call",
            Opcode::Pop => "pop",
            Opcode::Label(_) => "label",
            Opcode::Br(_) => "br",
            Opcode::BrIf(..) => "br_if",
            Opcode::MakeFunction(_) => "make_function",
            Opcode::Return => "return",
            Opcode::Abort(_) => "abort",
        }
    }

    /// Rewrites every label this opcode mentions through `map`, used when a
    /// loop body is duplicated during unrolling. Every label name an opcode
    /// carries must be present in `map`; an absent one is an implementer bug
    /// (spec §7, `OpcodeArityError`).
    pub fn relabel(&self, map: &HashMap<String, String>) -> Result<Opcode, PrismError> {
        let get = |name: &str| -> Result<String, PrismError> {
            map.get(name).cloned().ok_or_else(|| {
                PrismError::OpcodeArity(OpcodeArityError::MissingRelabelTarget(name.to_string()))
            })
        };
        Ok(match self {
            // `get_iter`'s argument is the local slot holding the iterator,
            // not a branch target; it is never rewritten.
            Opcode::GetIter(_) => self.clone(),
            // `for_iter`'s first two args are the iterator/target locals;
            // only the trailing "jump here when exhausted" label rewrites.
            Opcode::ForIter(it, t, e) => Opcode::ForIter(it.clone(), t.clone(), get(e)?),
            Opcode::Label(n) => Opcode::Label(get(n)?),
            Opcode::Br(n) => Opcode::Br(get(n)?),
            Opcode::BrIf(t, e, f) => Opcode::BrIf(get(t)?, get(e)?, get(f)?),
            other => other.clone(),
        })
    }

    /// A one-line disassembly: opcode name followed by space-separated args.
    pub fn disassembly(&self) -> String {
        match self {
            Opcode::LoadConst(v) => format!("load_const {:?}", v),
            Opcode::LoadLocal(n) => format!("load_local {}", n),
            Opcode::StoreLocal(n) => format!("store_local {}", n),
            Opcode::LoadLocalGreen(n) => format!("load_local_green {}", n),
            Opcode::StoreLocalGreen(n) => format!("store_local_green {}", n),
            Opcode::LoadNonlocal(n) => format!("load_nonlocal {}", n),
            Opcode::LoadNonlocalGreen(n) => format!("load_nonlocal_green {}", n),
            Opcode::Add => "add".to_string(),
            Opcode::Mul => "mul".to_string(),
            Opcode::Lt => "lt".to_string(),
            Opcode::Gt => "gt".to_string(),
            Opcode::I32Add => "i32_add".to_string(),
            Opcode::MakeTuple(k) => format!("make_tuple {}", k),
            Opcode::Unroll => "unroll".to_string(),
            Opcode::GetIter(n) => format!("get_iter {}", n),
            Opcode::ForIter(it, t, e) => format!("for_iter {} {} {}", it, t, e),
            Opcode::Print(k) => format!("print {}", k),
            Opcode::Call(k) => format!("call {}", k),
            Opcode::Pop => "pop".to_string(),
            Opcode::Label(n) => format!("label {}", n),
            Opcode::Br(n) => format!("br {}", n),
            Opcode::BrIf(t, e, f) => format!("br_if {} {} {}", t, e, f),
            Opcode::MakeFunction(c) => format!("make_function {}", c.name),
            Opcode::Return => "return".to_string(),
            Opcode::Abort(msg) => format!("abort {:?}", msg),
        }
    }
}

/// A name is "green" when every cased character in it is uppercase and at
/// least one cased character is present — ported directly from Python's
/// `str.isupper()`, which both `toyvm/compiler.py` and `toyvm/rainbow.py`
/// rely on to decide whether a binding participates in partial evaluation.
pub fn is_green_name(name: &str) -> bool {
    name.chars().any(|c| c.is_alphabetic()) && name.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.disassembly())
    }
}
