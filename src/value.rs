//! The tagged value universe (C1): integers, strings, tuples, tuple
//! iterators, the `none` singleton, functions and modules.
//!
//! Grounded on Cordy's `vm::value::Value` (a tagged sum with `Rc`/`RefCell`
//! for the handful of variants that need shared, heap-allocated state).

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::closure::Closure;
use crate::code::CodeObject;

/// One element of the tagged value universe described in spec §3.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Str(Rc<str>),
    Tuple(Rc<TupleData>),
    TupleIterator(Rc<TupleIterState>),
    None,
    Function(Rc<FunctionData>),
    Module(Rc<ModuleData>),
}

/// An immutable ordered sequence of values, tagged with whether it was
/// produced by the `unroll` opcode.
pub struct TupleData {
    pub items: Vec<Value>,
    pub unroll: bool,
}

/// A cursor into a `TupleData`. `iter_next` advances the cursor and returns
/// either the next value or `IterStep::Stop`.
pub struct TupleIterState {
    pub tuple: Rc<TupleData>,
    pub unroll: bool,
    cursor: Cell<usize>,
}

pub enum IterStep {
    Value(Value),
    Stop,
}

impl TupleIterState {
    pub fn new(tuple: Rc<TupleData>) -> TupleIterState {
        let unroll = tuple.unroll;
        TupleIterState { tuple, unroll, cursor: Cell::new(0) }
    }

    pub fn iter_next(&self) -> IterStep {
        let i = self.cursor.get();
        if i >= self.tuple.items.len() {
            IterStep::Stop
        } else {
            self.cursor.set(i + 1);
            IterStep::Value(self.tuple.items[i].clone())
        }
    }

    /// The items from the current cursor to the end of the tuple, without
    /// advancing the cursor. Used by the rainbow interpreter to unroll a
    /// loop over a statically known iterable in one shot, rather than
    /// driving it one `iter_next()` at a time.
    pub fn remaining(&self) -> &[Value] {
        &self.tuple.items[self.cursor.get()..]
    }
}

/// A compiled function: its own name (distinct from the name it is bound
/// under in a module, which may differ after reassignment), parameter
/// names, code object, and captured closure.
pub struct FunctionData {
    pub name: String,
    pub argnames: Vec<String>,
    pub code: Rc<CodeObject>,
    pub closure: Closure,
}

/// A module's globals table plus the set of names declared green by the
/// `green` decorator marker. The table is mutated only during compilation;
/// afterwards it is logically frozen (spec §5) even though the `RefCell`
/// remains technically mutable.
pub struct ModuleData {
    pub globals: Rc<RefCell<HashMap<String, Value>>>,
    pub green_funcs: HashSet<String>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::TupleIterator(_) => "tuple_iterator",
            Value::None => "none",
            Value::Function(_) => "function",
            Value::Module(_) => "module",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// The textual form used by the `print` opcode.
    pub fn display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Tuple(t) => {
                let parts: Vec<String> = t.items.iter().map(Value::display).collect();
                format!("({})", parts.join(", "))
            }
            Value::TupleIterator(_) => String::from("<tuple_iterator>"),
            Value::None => String::from("none"),
            Value::Function(f) => format!("<function {}>", f.name),
            Value::Module(_) => String::from("<module>"),
        }
    }

}

impl Value {
    pub fn new_tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(TupleData { items, unroll: false }))
    }

    /// The `unroll` opcode: produces a new tuple value, sharing the same
    /// items, tagged as unroll-eligible.
    pub fn unrolled(&self) -> Option<Value> {
        match self {
            Value::Tuple(t) => Some(Value::Tuple(Rc::new(TupleData {
                items: t.items.clone(),
                unroll: true,
            }))),
            _ => None,
        }
    }

    pub fn get_iter(&self) -> Option<Value> {
        match self {
            Value::Tuple(t) => Some(Value::TupleIterator(Rc::new(TupleIterState::new(t.clone())))),
            _ => None,
        }
    }
}

/// Spec §3: integers and strings compare by content; every other variant
/// compares by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::TupleIterator(a), Value::TupleIterator(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "Int({})", i),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Tuple(t) => {
                write!(f, "Tuple(unroll={}, {:?})", t.unroll, t.items)
            }
            Value::TupleIterator(it) => write!(f, "TupleIterator(@{})", it.cursor.get()),
            Value::None => write!(f, "None"),
            Value::Function(fun) => write!(f, "Function({})", fun.name),
            Value::Module(_) => write!(f, "Module"),
        }
    }
}
