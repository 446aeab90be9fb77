//! The code object (C3): a named, ordered sequence of opcodes.
//!
//! Grounded on Cordy's `CodeObject`/disassembly machinery in `vm/opcode.rs`
//! and on `toyvm/opcode.py::CodeObject`, including its `equals` helper used
//! throughout the Python test suite to compare a compiled body against a
//! dedented literal.

use itertools::Itertools;

use crate::opcode::Opcode;

#[derive(Debug, Clone, PartialEq)]
pub struct CodeObject {
    pub name: String,
    pub argnames: Vec<String>,
    pub body: Vec<Opcode>,
}

impl CodeObject {
    pub fn new(name: impl Into<String>, argnames: Vec<String>) -> CodeObject {
        CodeObject { name: name.into(), argnames, body: Vec::new() }
    }

    pub fn emit(&mut self, op: Opcode) {
        self.body.push(op);
    }

    pub fn dump(&self) -> String {
        self.body.iter().map(|op| op.disassembly()).join("\n")
    }

    /// Structural comparison against a dedented text form, one opcode
    /// disassembly per line, blank lines ignored. Mirrors
    /// `toyvm/opcode.py::CodeObject.equals`, which the reference test suite
    /// uses to assert compiled output without constructing `OpCode` lists by
    /// hand.
    pub fn equals_dedented(&self, text: &str) -> bool {
        let expected: Vec<&str> = dedent(text)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let actual: Vec<String> = self.body.iter().map(|op| op.disassembly()).collect();
        actual.len() == expected.len() && actual.iter().zip(expected.iter()).all(|(a, e)| a == e)
    }
}

/// Strips the common leading whitespace shared by every non-blank line,
/// mirroring Python's `textwrap.dedent`.
pub fn dedent(text: &str) -> String {
    let common = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| if l.len() >= common { &l[common..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    #[test]
    fn dump_and_equals_dedented_agree() {
        let mut code = CodeObject::new("fn", vec![]);
        code.emit(Opcode::LoadConst(Value::Integer(2)));
        code.emit(Opcode::LoadConst(Value::Integer(4)));
        code.emit(Opcode::Add);
        code.emit(Opcode::Return);
        assert!(code.equals_dedented(
            "
            load_const Int(2)
            load_const Int(4)
            add
            return
            "
        ));
    }

    #[test]
    fn equals_dedented_rejects_mismatch() {
        let mut code = CodeObject::new("fn", vec![]);
        code.emit(Opcode::Return);
        assert!(!code.equals_dedented("add\nreturn"));
    }
}
