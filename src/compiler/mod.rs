pub mod ast;
pub mod codegen;
pub mod parser;
pub mod scanner;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::closure::Closure;
use crate::error::PrismError;
use crate::value::{FunctionData, ModuleData, Value};

/// A compiled module: a `ModuleData` (globals table + green-function
/// names) reference-counted so every top-level function's closure can
/// share it directly.
///
/// Functions are inserted into the globals table in source order as they
/// compile, so later-defined functions are visible to earlier ones at call
/// time — every function's closure holds the same `Rc<ModuleData>`, so
/// mutation during compilation is seen by all of them (spec's late-binding
/// module globals, ported from `toyvm/compiler.py::ModuleCompiler`, which
/// mutates one shared `dict`).
pub struct Module {
    pub data: Rc<ModuleData>,
}

impl Module {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.data.globals.borrow().get(name).cloned()
    }

    pub fn as_value(&self) -> Value {
        Value::Module(self.data.clone())
    }
}

pub fn compile(source: &str) -> Result<Module, PrismError> {
    let lines = scanner::scan(source)?;
    let ast_module = parser::parse(&lines)?;
    let compiled = codegen::compile_module(&ast_module)?;

    let green_funcs: HashSet<String> = compiled.iter().filter(|f| f.is_green).map(|f| f.name.clone()).collect();
    let data = Rc::new(ModuleData { globals: Rc::new(RefCell::new(HashMap::new())), green_funcs });
    let closure = Closure::from_module(data.clone());

    for f in &compiled {
        let func = Value::Function(Rc::new(FunctionData {
            name: f.name.clone(),
            argnames: f.argnames.clone(),
            code: f.code.clone(),
            closure: closure.clone(),
        }));
        data.globals.borrow_mut().insert(f.name.clone(), func);
    }

    Ok(Module { data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_module_compiles_to_a_first_class_value_that_is_identity_equal_to_itself() {
        let module = compile("def foo():\n    return 1\n").unwrap();
        let a = module.as_value();
        let b = module.as_value();
        assert_eq!(a, b);
        assert_eq!(a.display(), "<module>");
    }
}
