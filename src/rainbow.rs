//! The rainbow partial evaluator (C6).
//!
//! A direct Rust port of `toyvm/rainbow.py`'s `RainbowInterpreter`: it walks
//! a function's code once, running every "green" (statically decidable) op
//! eagerly on a real `Frame` it reuses as scratch state, and re-emitting
//! every "red" op (plus materialized `load_const`s for any green values a
//! red op depends on) into a fresh `CodeObject`. `op_br_if`/`op_get_iter`/
//! `op_unroll`/`op_for_iter` are the special cases the generic purity-based
//! dispatch can't handle on its own, ported opcode-for-opcode from the
//! Python reference, which is the ground truth for exact behavior where
//! spec prose alone is ambiguous.

use std::collections::HashMap;
use std::rc::Rc;

use crate::code::CodeObject;
use crate::error::{EvaluatorInvariantError, PrismError, RuntimeTypeError};
use crate::frame::Frame;
use crate::opcode::{is_green_name, Opcode};
use crate::value::{FunctionData, Value};

pub struct RainbowInterpreter {
    code: Rc<crate::code::CodeObject>,
    out: CodeObject,
    stack_length: usize,
    green_frame: Frame,
    label_maps: Vec<HashMap<String, String>>,
    unique_id: u32,
}

/// Partially evaluates `func` against no argument values (the argument
/// locals are, by construction, never stored to by the caller and so never
/// appear as green — only names a `green`-cased assignment or `green`
/// function call actually populates participate in green execution).
pub fn peval(func: &Rc<FunctionData>) -> Result<Rc<FunctionData>, PrismError> {
    let mut interp = RainbowInterpreter::new(func.clone())?;
    let end = interp.code.body.len();
    interp.run_range(0, end)?;
    Ok(Rc::new(FunctionData {
        name: func.name.clone(),
        argnames: func.argnames.clone(),
        code: Rc::new(interp.out),
        closure: func.closure.clone(),
    }))
}

impl RainbowInterpreter {
    fn new(func: Rc<FunctionData>) -> Result<RainbowInterpreter, PrismError> {
        let code = func.code.clone();
        let out = CodeObject::new(func.name.clone(), func.argnames.clone());
        let green_frame = Frame::new(func)?;
        Ok(RainbowInterpreter { code, out, stack_length: 0, green_frame, label_maps: Vec::new(), unique_id: 0 })
    }

    fn n_greens(&self) -> usize {
        self.green_frame.stack.len()
    }

    fn get_pc(&self, label: &str) -> Result<usize, PrismError> {
        self.green_frame
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| PrismError::OpcodeArity(crate::error::OpcodeArityError::UndefinedLabel(label.to_string())))
    }

    fn run_range(&mut self, start: usize, end: usize) -> Result<(), PrismError> {
        let mut pc = start;
        while pc < end {
            pc = self.run_single_op(pc)?;
        }
        self.flush()?;
        Ok(())
    }

    fn run_single_op(&mut self, pc: usize) -> Result<usize, PrismError> {
        let op = self.code.body[pc].clone();
        let next = match &op {
            Opcode::BrIf(then, els, endif) => self.op_br_if(then, els, endif)?,
            Opcode::GetIter(itername) => self.op_get_iter(&op, itername)?,
            Opcode::Unroll => {
                self.op_unroll(&op)?;
                None
            }
            Opcode::ForIter(itername, target, endfor) => self.op_for_iter(pc, &op, itername, target, endfor)?,
            Opcode::StoreLocalGreen(name) => {
                if self.n_greens() < 1 {
                    return Err(PrismError::EvaluatorInvariant(EvaluatorInvariantError::StoreGreenWithoutGreenValue(
                        name.clone(),
                    )));
                }
                self.op_green(&op)?;
                None
            }
            Opcode::LoadLocalGreen(_) => {
                self.op_green(&op)?;
                None
            }
            _ => self.op_default(&op)?,
        };
        Ok(next.unwrap_or(pc + 1))
    }

    fn is_green(&self, op: &Opcode) -> bool {
        op.is_pure() && self.n_greens() >= op.pops()
    }

    fn op_default(&mut self, op: &Opcode) -> Result<Option<usize>, PrismError> {
        if self.is_green(op) {
            self.op_green(op)?;
        } else {
            self.op_red(op)?;
        }
        Ok(None)
    }

    /// Runs `op`'s side effects eagerly on the scratch green frame; it
    /// never reaches the output code object.
    fn op_green(&mut self, op: &Opcode) -> Result<(), PrismError> {
        self.green_frame.exec(op, &mut std::io::sink())?;
        Ok(())
    }

    /// Flushes pending green values, then emits `op` into the output code,
    /// updating the tracked (red) operand stack depth.
    fn op_red(&mut self, op: &Opcode) -> Result<(), PrismError> {
        self.flush()?;
        let pops = op.pops();
        if self.stack_length < pops {
            return Err(PrismError::Stack(crate::error::StackError::Underflow { op: op.name() }));
        }
        self.stack_length = self.stack_length - pops + op.pushes();
        self.emit(op.clone())?;
        Ok(())
    }

    fn emit(&mut self, op: Opcode) -> Result<(), PrismError> {
        let op = match self.label_maps.last() {
            Some(map) => op.relabel(map)?,
            None => op,
        };
        self.out.emit(op);
        Ok(())
    }

    /// Materializes every value left on the green frame's operand stack as
    /// a `load_const`, in stack order, before any red op may depend on it.
    fn flush(&mut self) -> Result<(), PrismError> {
        let pending: Vec<Value> = self.green_frame.stack.drain(..).collect();
        for v in pending {
            self.stack_length += 1;
            self.emit(Opcode::LoadConst(v))?;
        }
        Ok(())
    }

    fn op_br_if(&mut self, then: &str, els: &str, endif: &str) -> Result<Option<usize>, PrismError> {
        let pc_then = self.get_pc(then)?;
        let pc_else = self.get_pc(els)?;
        let pc_endif = self.get_pc(endif)?;
        if self.n_greens() >= 1 {
            let cond = self.green_frame.stack.pop().unwrap();
            let truthy = match cond {
                Value::Integer(i) => i != 0,
                other => return Err(PrismError::RuntimeType(RuntimeTypeError::ConditionNotInteger(other.type_name()))),
            };
            if truthy {
                self.run_range(pc_then, pc_else)?;
            } else {
                self.run_range(pc_else, pc_endif)?;
            }
        } else {
            self.op_red(&Opcode::BrIf(then.to_string(), els.to_string(), endif.to_string()))?;
            self.run_range(pc_then, pc_endif)?;
        }
        Ok(Some(pc_endif))
    }

    fn op_get_iter(&mut self, op: &Opcode, _itername: &str) -> Result<Option<usize>, PrismError> {
        let top_is_unroll_tuple = matches!(self.green_frame.stack.last(), Some(Value::Tuple(t)) if t.unroll);
        if self.n_greens() >= 1 && top_is_unroll_tuple {
            self.op_green(op)?;
        } else {
            self.op_red(op)?;
        }
        Ok(None)
    }

    fn op_unroll(&mut self, op: &Opcode) -> Result<(), PrismError> {
        if self.n_greens() < 1 {
            return Err(PrismError::EvaluatorInvariant(EvaluatorInvariantError::UnrollOnRedValue));
        }
        self.op_green(op)
    }

    fn op_for_iter(
        &mut self,
        pc: usize,
        op: &Opcode,
        itername: &str,
        target: &str,
        endfor: &str,
    ) -> Result<Option<usize>, PrismError> {
        let pc_endfor = self.get_pc(endfor)?;
        match self.green_frame.locals.get(itername).cloned() {
            Some(iter_value) => self.op_unroll_for_iter(pc, itername, target, endfor, pc_endfor, iter_value),
            None => {
                self.op_red(op)?;
                self.run_range(pc + 1, pc_endfor)?;
                Ok(Some(pc_endfor))
            }
        }
    }

    fn op_unroll_for_iter(
        &mut self,
        pc: usize,
        itername: &str,
        target: &str,
        endfor: &str,
        pc_endfor: usize,
        iter_value: Value,
    ) -> Result<Option<usize>, PrismError> {
        if !is_green_name(target) {
            return Err(PrismError::EvaluatorInvariant(EvaluatorInvariantError::UnrollTargetNotGreenName(
                target.to_string(),
            )));
        }
        let pc_br = pc_endfor - 1;
        match self.code.body.get(pc_br) {
            Some(Opcode::Br(_)) => {}
            _ => {
                return Err(PrismError::EvaluatorInvariant(EvaluatorInvariantError::BackBranchNotFound(
                    endfor.to_string(),
                )))
            }
        }
        let state = match &iter_value {
            Value::TupleIterator(s) => s.clone(),
            other => return Err(PrismError::RuntimeType(RuntimeTypeError::NotIterable(other.type_name()))),
        };
        let items: Vec<Value> = state.remaining().to_vec();
        for item in items {
            self.green_frame.locals.insert(target.to_string(), item);
            self.push_label_map(pc + 1, pc_br);
            self.run_range(pc + 1, pc_br)?;
            self.pop_label_map();
        }
        self.green_frame.locals.remove(itername);
        Ok(Some(pc_endfor + 1))
    }

    fn push_label_map(&mut self, start: usize, end: usize) {
        let mut map = HashMap::new();
        for op in &self.code.body[start..end] {
            if let Opcode::Label(name) = op {
                map.insert(name.clone(), format!("{}#{}", name, self.unique_id));
            }
        }
        self.unique_id += 1;
        self.label_maps.push(map);
    }

    fn pop_label_map(&mut self) {
        self.label_maps.pop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::closure::Closure;
    use crate::code::CodeObject;
    use crate::value::{FunctionData, ModuleData};
    use std::cell::RefCell;
    use std::collections::{HashMap as Map, HashSet};

    fn make_func(name: &str, argnames: Vec<&str>, body: Vec<Opcode>) -> Rc<FunctionData> {
        let mut code = CodeObject::new(name, argnames.iter().map(|s| s.to_string()).collect());
        for op in body {
            code.emit(op);
        }
        let module = Rc::new(ModuleData { globals: Rc::new(RefCell::new(Map::new())), green_funcs: HashSet::new() });
        Rc::new(FunctionData {
            name: name.to_string(),
            argnames: argnames.iter().map(|s| s.to_string()).collect(),
            code: Rc::new(code),
            closure: Closure::from_module(module),
        })
    }

    #[test]
    fn constant_folding_of_a_pure_chain() {
        let func = make_func(
            "fn",
            vec![],
            vec![
                Opcode::LoadConst(Value::Integer(2)),
                Opcode::LoadConst(Value::Integer(4)),
                Opcode::Add,
                Opcode::Return,
            ],
        );
        let residual = peval(&func).unwrap();
        assert!(residual.code.equals_dedented("load_const Int(6)\nreturn"));
    }

    #[test]
    fn a_red_load_local_flushes_pending_greens() {
        let func = make_func(
            "fn",
            vec!["x"],
            vec![
                Opcode::LoadConst(Value::Integer(1)),
                Opcode::LoadLocal("x".to_string()),
                Opcode::Add,
                Opcode::Return,
            ],
        );
        let residual = peval(&func).unwrap();
        assert!(residual.code.equals_dedented("load_const Int(1)\nload_local x\nadd\nreturn"));
    }
}
