//! A tiny bytecode compiler, stack interpreter, and rainbow partial
//! evaluator, in the shape of Cordy's compiler/VM split but for a much
//! smaller language: the point of this crate is the interpreter and the
//! partial evaluator, not the surface syntax that feeds them.

mod closure;
mod code;
pub mod compiler;
mod error;
mod frame;
mod opcode;
mod rainbow;
mod trace;
mod value;

pub use code::CodeObject;
pub use compiler::{compile, Module};
pub use error::{CompilationError, EvaluatorInvariantError, OpcodeArityError, PrismError, RuntimeTypeError, StackError};
pub use frame::Frame;
pub use opcode::Opcode;
pub use rainbow::peval;
pub use value::{FunctionData, IterStep, TupleData, TupleIterState, Value};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use closure::Closure;
use value::ModuleData;

/// Calls a compiled function with the given arguments, discarding any
/// `print` output.
pub fn call(func: &Rc<FunctionData>, args: &[Value]) -> Result<Value, PrismError> {
    let mut frame = Frame::new_with_args(func.clone(), args)?;
    frame.run()
}

/// Calls a compiled function with the given arguments, writing any `print`
/// output to `out`.
pub fn call_with<W: std::io::Write>(func: &Rc<FunctionData>, args: &[Value], out: &mut W) -> Result<Value, PrismError> {
    let mut frame = Frame::new_with_args(func.clone(), args)?;
    frame.run_with(out)
}

/// Builds a function from a hand-assembled opcode body with no enclosing
/// module, for tests that exercise the frame or the rainbow evaluator
/// directly rather than through the compiler. Mirrors `toyvm`'s own
/// `W_Function(name, code, {})` test helper.
pub fn standalone(name: &str, argnames: Vec<String>, body: Vec<Opcode>) -> Rc<FunctionData> {
    let mut code = CodeObject::new(name, argnames.clone());
    for op in body {
        code.emit(op);
    }
    let module = Rc::new(ModuleData { globals: Rc::new(RefCell::new(HashMap::new())), green_funcs: HashSet::new() });
    Rc::new(FunctionData { name: name.to_string(), argnames, code: Rc::new(code), closure: Closure::from_module(module) })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compile_and_call_a_simple_function() {
        let module = compile(
            "
            def add_one(x):
                return x + 1
            ",
        )
        .unwrap();
        let f = match module.get("add_one").unwrap() {
            Value::Function(f) => f,
            _ => unreachable!(),
        };
        assert_eq!(call(&f, &[Value::Integer(41)]).unwrap(), Value::Integer(42));
    }
}
