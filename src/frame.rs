//! The frame interpreter (C5): a stack machine over a single `CodeObject`.
//!
//! Grounded on Cordy's `VirtualMachine::run` dispatch loop (`vm/mod.rs`) and
//! its binary-operator helpers (`vm/operator.rs`), and on the real
//! semantics in `toyvm/frame.py::Frame`. `run_op` is split out from `run`'s
//! program-counter loop because the rainbow interpreter (`rainbow.rs`)
//! drives the same opcode handlers directly against a green frame without
//! ever stepping its `pc`.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use itertools::Itertools;

use crate::error::{OpcodeArityError, PrismError, RuntimeTypeError, StackError};
use crate::opcode::Opcode;
use crate::trace::{trace_interpreter, trace_interpreter_stack};
use crate::value::{FunctionData, IterStep, Value};

/// One activation of a function: an operand stack, a locals table, and the
/// label→pc map built once at construction (duplicate labels are rejected
/// immediately, matching spec's "well-formed code" invariant).
pub struct Frame {
    pub func: Rc<FunctionData>,
    pub stack: Vec<Value>,
    pub locals: HashMap<String, Value>,
    pub pc: usize,
    pub labels: HashMap<String, usize>,
}

impl Frame {
    pub fn new(func: Rc<FunctionData>) -> Result<Frame, PrismError> {
        let labels = build_label_map(&func.code.body)?;
        Ok(Frame { func, stack: Vec::new(), locals: HashMap::new(), pc: 0, labels })
    }

    pub fn new_with_args(func: Rc<FunctionData>, args: &[Value]) -> Result<Frame, PrismError> {
        if args.len() != func.argnames.len() {
            return Err(PrismError::RuntimeType(RuntimeTypeError::ArityMismatch {
                name: func.name.clone(),
                expected: func.argnames.len(),
                got: args.len(),
            }));
        }
        let mut frame = Frame::new(func)?;
        for (name, value) in frame.func.argnames.clone().iter().zip(args.iter()) {
            frame.locals.insert(name.clone(), value.clone());
        }
        Ok(frame)
    }

    fn pop(&mut self) -> Result<Value, PrismError> {
        self.stack.pop().ok_or(PrismError::Stack(StackError::Underflow { op: "pop" }))
    }

    fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    /// Runs to completion using a byte-sink writer, for callers that don't
    /// care about captured `print` output.
    pub fn run(&mut self) -> Result<Value, PrismError> {
        self.run_with(&mut std::io::sink())
    }

    pub fn run_with<W: Write>(&mut self, out: &mut W) -> Result<Value, PrismError> {
        loop {
            if self.pc >= self.func.code.body.len() {
                return Err(PrismError::Stack(StackError::RanPastEnd));
            }
            let op = self.func.code.body[self.pc].clone();
            trace_interpreter!("pc={} {}", self.pc, op.disassembly());
            if let Opcode::Return = op {
                self.pop_for_return()?;
                let result = self.pop()?;
                return Ok(result);
            }
            match self.exec(&op, out)? {
                Some(next_pc) => self.pc = next_pc,
                None => self.pc += 1,
            }
            trace_interpreter_stack!("stack = {:?}", self.stack);
        }
    }

    fn pop_for_return(&mut self) -> Result<(), PrismError> {
        if self.stack.len() != 1 {
            return Err(PrismError::Stack(StackError::NonSingletonAtReturn(self.stack.len())));
        }
        Ok(())
    }

    fn jump(&mut self, label: &str) -> Result<usize, PrismError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| PrismError::OpcodeArity(OpcodeArityError::UndefinedLabel(label.to_string())))
    }

    /// Executes the side effects of a single opcode (no pc bookkeeping
    /// beyond an explicit jump target, which callers apply themselves).
    /// Shared between `run`'s main loop and the rainbow interpreter's green
    /// frame, which calls this directly, opcode by opcode, without a pc.
    pub fn exec<W: Write>(&mut self, op: &Opcode, out: &mut W) -> Result<Option<usize>, PrismError> {
        match op {
            Opcode::LoadConst(v) => self.push(v.clone()),
            Opcode::LoadLocal(name) | Opcode::LoadLocalGreen(name) => {
                let v = self
                    .locals
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PrismError::RuntimeType(RuntimeTypeError::NameNotFound(name.clone())))?;
                self.push(v);
            }
            Opcode::StoreLocal(name) | Opcode::StoreLocalGreen(name) => {
                let v = self.pop()?;
                self.locals.insert(name.clone(), v);
            }
            Opcode::LoadNonlocal(name) | Opcode::LoadNonlocalGreen(name) => {
                let v = self.func.closure.lookup(name)?;
                self.push(v);
            }
            Opcode::Add => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op_add(lhs, rhs)?);
            }
            Opcode::Mul => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op_mul(lhs, rhs)?);
            }
            Opcode::I32Add => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op_i32_add(lhs, rhs)?);
            }
            Opcode::Lt => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op_compare("lt", lhs, rhs, |c| c.is_lt())?);
            }
            Opcode::Gt => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(op_compare("gt", lhs, rhs, |c| c.is_gt())?);
            }
            Opcode::MakeTuple(k) => {
                let mut items = Vec::with_capacity(*k);
                for _ in 0..*k {
                    items.push(self.pop()?);
                }
                items.reverse();
                self.push(Value::new_tuple(items));
            }
            Opcode::Unroll => {
                let v = self.pop()?;
                let unrolled = v
                    .unrolled()
                    .ok_or_else(|| PrismError::RuntimeType(RuntimeTypeError::NotATuple(v.type_name())))?;
                self.push(unrolled);
            }
            Opcode::GetIter(itername) => {
                let v = self.pop()?;
                let iter = v
                    .get_iter()
                    .ok_or_else(|| PrismError::RuntimeType(RuntimeTypeError::NotIterable(v.type_name())))?;
                self.locals.insert(itername.clone(), iter);
            }
            Opcode::ForIter(itername, target, endlabel) => {
                let iter = self
                    .locals
                    .get(itername)
                    .cloned()
                    .ok_or_else(|| PrismError::RuntimeType(RuntimeTypeError::NameNotFound(itername.clone())))?;
                let state = match &iter {
                    Value::TupleIterator(s) => s,
                    other => {
                        return Err(PrismError::RuntimeType(RuntimeTypeError::NotIterable(other.type_name())))
                    }
                };
                return match state.iter_next() {
                    IterStep::Value(v) => {
                        self.locals.insert(target.clone(), v);
                        Ok(None)
                    }
                    IterStep::Stop => {
                        self.locals.remove(itername);
                        Ok(Some(self.jump(endlabel)?))
                    }
                };
            }
            Opcode::Print(k) => {
                let mut items = Vec::with_capacity(*k);
                for _ in 0..*k {
                    items.push(self.pop()?);
                }
                items.reverse();
                let line = items.iter().map(Value::display).join(" ");
                let _ = writeln!(out, "{}", line);
                self.push(Value::None);
            }
            Opcode::Call(k) => {
                let mut args = Vec::with_capacity(*k);
                for _ in 0..*k {
                    args.push(self.pop()?);
                }
                args.reverse();
                let callee = self.pop()?;
                let func = match callee {
                    Value::Function(f) => f,
                    other => return Err(PrismError::RuntimeType(RuntimeTypeError::NotCallable(other.type_name()))),
                };
                let mut callee_frame = Frame::new_with_args(func, &args)?;
                let result = callee_frame.run_with(out)?;
                self.push(result);
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Label(_) => {}
            Opcode::Br(label) => return Ok(Some(self.jump(label)?)),
            Opcode::BrIf(then, els, _endif) => {
                let cond = self.pop()?;
                let truthy = match cond {
                    Value::Integer(i) => i != 0,
                    other => {
                        return Err(PrismError::RuntimeType(RuntimeTypeError::ConditionNotInteger(other.type_name())))
                    }
                };
                return Ok(Some(if truthy { self.jump(then)? } else { self.jump(els)? }));
            }
            Opcode::MakeFunction(code) => {
                let scope: HashMap<String, Value> = self.locals.clone();
                let closure = self.func.closure.extend(scope);
                let f = Value::Function(Rc::new(FunctionData {
                    name: code.name.clone(),
                    argnames: code.argnames.clone(),
                    code: code.clone(),
                    closure,
                }));
                self.push(f);
            }
            Opcode::Return => unreachable!("handled by run_with before dispatch"),
            Opcode::Abort(msg) => return Err(PrismError::RuntimeType(RuntimeTypeError::Aborted(msg.clone()))),
        }
        Ok(None)
    }
}

fn build_label_map(body: &[Opcode]) -> Result<HashMap<String, usize>, PrismError> {
    let mut labels = HashMap::new();
    for (pc, op) in body.iter().enumerate() {
        if let Opcode::Label(name) = op {
            if labels.insert(name.clone(), pc).is_some() {
                return Err(PrismError::OpcodeArity(OpcodeArityError::DuplicateLabel(name.clone())));
            }
        }
    }
    Ok(labels)
}

/// `+`: integer addition, string concatenation. Mirrors `toyvm/objects.py`'s
/// `W_Int.add`/`W_Str.add`, ported to Cordy's type-checked-operator style
/// (`vm/operator.rs`).
fn op_add(lhs: Value, rhs: Value) -> Result<Value, PrismError> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{}{}", a, b)))),
        (l, r) => Err(PrismError::RuntimeType(RuntimeTypeError::BinaryOpTypeMismatch {
            op: "+",
            lhs: l.type_name(),
            rhs: r.type_name(),
        })),
    }
}

/// `*`: integer multiplication, and string-repeat when one side is an int
/// (`"x" * 4 == "xxxx"`), matching `toyvm/objects.py`'s `W_Str.mul`.
fn op_mul(lhs: Value, rhs: Value) -> Result<Value, PrismError> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
        (Value::Str(s), Value::Integer(n)) | (Value::Integer(n), Value::Str(s)) => {
            let n = n.max(0) as usize;
            Ok(Value::Str(Rc::from(s.repeat(n))))
        }
        (l, r) => Err(PrismError::RuntimeType(RuntimeTypeError::BinaryOpTypeMismatch {
            op: "*",
            lhs: l.type_name(),
            rhs: r.type_name(),
        })),
    }
}

fn op_i32_add(lhs: Value, rhs: Value) -> Result<Value, PrismError> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_add(b) as i32 as i64)),
        (l, r) => Err(PrismError::RuntimeType(RuntimeTypeError::BinaryOpTypeMismatch {
            op: "i32_add",
            lhs: l.type_name(),
            rhs: r.type_name(),
        })),
    }
}

fn op_compare(
    name: &'static str,
    lhs: Value,
    rhs: Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, PrismError> {
    let truth = match (&lhs, &rhs) {
        (Value::Integer(a), Value::Integer(b)) => accept(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => accept(a.as_ref().cmp(b.as_ref())),
        _ => {
            return Err(PrismError::RuntimeType(RuntimeTypeError::CompareTypeMismatch {
                op: name,
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }))
        }
    };
    Ok(Value::Integer(if truth { 1 } else { 0 }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::closure::Closure;
    use crate::code::CodeObject;
    use crate::value::ModuleData;
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn make_frame(body: Vec<Opcode>) -> Frame {
        let mut code = CodeObject::new("fn", vec![]);
        for op in body {
            code.emit(op);
        }
        let module = Rc::new(ModuleData { globals: Rc::new(RefCell::new(HashMap::new())), green_funcs: HashSet::new() });
        let func = Rc::new(FunctionData {
            name: "fn".to_string(),
            argnames: vec![],
            code: Rc::new(code),
            closure: Closure::from_module(module),
        });
        Frame::new(func).unwrap()
    }

    #[test]
    fn simple_add() {
        let mut frame = make_frame(vec![
            Opcode::LoadConst(Value::Integer(2)),
            Opcode::LoadConst(Value::Integer(4)),
            Opcode::Add,
            Opcode::Return,
        ]);
        assert_eq!(frame.run().unwrap(), Value::Integer(6));
    }

    #[test]
    fn locals_roundtrip() {
        let mut frame = make_frame(vec![
            Opcode::LoadConst(Value::Integer(2)),
            Opcode::StoreLocal("a".to_string()),
            Opcode::LoadLocal("a".to_string()),
            Opcode::Return,
        ]);
        assert_eq!(frame.run().unwrap(), Value::Integer(2));
    }

    #[test]
    fn add_strings() {
        let mut frame = make_frame(vec![
            Opcode::LoadConst(Value::Str(Rc::from("hello "))),
            Opcode::LoadConst(Value::Str(Rc::from("world"))),
            Opcode::Add,
            Opcode::Return,
        ]);
        assert_eq!(frame.run().unwrap(), Value::Str(Rc::from("hello world")));
    }

    #[test]
    fn mul_string_by_int() {
        let mut frame = make_frame(vec![
            Opcode::LoadConst(Value::Str(Rc::from("x"))),
            Opcode::LoadConst(Value::Integer(4)),
            Opcode::Mul,
            Opcode::Return,
        ]);
        assert_eq!(frame.run().unwrap(), Value::Str(Rc::from("xxxx")));
    }

    #[test]
    fn br_if_picks_the_right_branch() {
        let body = vec![
            Opcode::LoadLocal("a".to_string()),
            Opcode::LoadConst(Value::Integer(0)),
            Opcode::Gt,
            Opcode::BrIf("then_0".to_string(), "else_0".to_string(), "endif_0".to_string()),
            Opcode::Label("then_0".to_string()),
            Opcode::LoadConst(Value::Integer(3)),
            Opcode::Return,
            Opcode::Label("else_0".to_string()),
            Opcode::LoadConst(Value::Integer(4)),
            Opcode::Return,
            Opcode::Label("endif_0".to_string()),
            Opcode::Abort("unreachable".to_string()),
        ];
        let mut frame = make_frame(body.clone());
        frame.locals.insert("a".to_string(), Value::Integer(10));
        assert_eq!(frame.run().unwrap(), Value::Integer(3));

        let mut frame = make_frame(body);
        frame.locals.insert("a".to_string(), Value::Integer(-10));
        assert_eq!(frame.run().unwrap(), Value::Integer(4));
    }

    #[test]
    fn duplicate_labels_are_rejected_at_construction() {
        let mut code = CodeObject::new("fn", vec![]);
        code.emit(Opcode::Label("x".to_string()));
        code.emit(Opcode::Label("x".to_string()));
        code.emit(Opcode::Return);
        let module = Rc::new(ModuleData { globals: Rc::new(RefCell::new(HashMap::new())), green_funcs: HashSet::new() });
        let func = Rc::new(FunctionData {
            name: "fn".to_string(),
            argnames: vec![],
            code: Rc::new(code),
            closure: Closure::from_module(module),
        });
        assert!(Frame::new(func).is_err());
    }
}
