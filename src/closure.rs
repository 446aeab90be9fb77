//! Closures as a shared, immutably-extended scope chain.
//!
//! Grounded on `toyvm/objects.py`'s `Closure` (ground truth: `rainbow.py`'s
//! `op_make_function` calls `closure.copy_and_append(name, locals.copy())`)
//! and on Cordy's preference for `Rc`-shared, copy-on-append structures over
//! mutating shared state in place.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{PrismError, RuntimeTypeError};
use crate::value::{ModuleData, Value};

/// The base of every closure chain is the defining module (its live
/// globals table), looked up last. Nested function closures prepend
/// immutable locals snapshots captured at `make_function` time.
#[derive(Clone)]
pub enum Closure {
    Module(Rc<ModuleData>),
    Extended { parent: Rc<Closure>, scope: Rc<HashMap<String, Value>> },
}

impl Closure {
    pub fn from_module(module: Rc<ModuleData>) -> Closure {
        Closure::Module(module)
    }

    /// Appends a new innermost scope without touching the parent chain, so
    /// other closures sharing the same prefix are unaffected.
    pub fn extend(&self, scope: HashMap<String, Value>) -> Closure {
        Closure::Extended { parent: Rc::new(self.clone()), scope: Rc::new(scope) }
    }

    /// Walks the chain from innermost outward, returning the first match.
    pub fn lookup(&self, name: &str) -> Result<Value, PrismError> {
        match self {
            Closure::Extended { parent, scope } => {
                if let Some(v) = scope.get(name) {
                    Ok(v.clone())
                } else {
                    parent.lookup(name)
                }
            }
            Closure::Module(module) => module
                .globals
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| PrismError::RuntimeType(RuntimeTypeError::NameNotFound(name.to_string()))),
        }
    }
}
