//! Stack machine for compiled routines

use std::rc::Rc;

use log::debug;

use crate::ast::Ident;
use crate::config::Config;
use crate::eval::{format_print, unbound_name, EvalError, Interpreter};
use crate::frame::Frame;
use crate::function::{CompiledFunction, Function, Signature};
use crate::numeric;
use crate::value::Value;

use super::instr::{Instr, SlotId};
use super::namespace::Slot;
use super::{Routine, Unit};

/// Runs compiled units against a global frame
pub struct Vm {
    interp: Interpreter,
}

impl Vm {
    pub fn new(config: Config) -> Self {
        Self {
            interp: Interpreter::new(config),
        }
    }

    pub fn with_globals(config: Config, globals: Frame) -> Self {
        Self {
            interp: Interpreter::with_globals(config, globals),
        }
    }

    pub fn globals(&self) -> &Frame {
        self.interp.globals()
    }

    pub fn run(&mut self, unit: &Unit) -> Result<Value, EvalError> {
        run_unit(&mut self.interp, unit)
    }
}

/// Execute a unit's module routine in `interp`'s global frame
pub fn run_unit(interp: &mut Interpreter, unit: &Unit) -> Result<Value, EvalError> {
    debug!("running compiled {}", unit.routine.name);
    let globals = interp.globals().clone();
    let activation = Activation::new(&unit.routine, Vec::new(), Rc::from(Vec::new()), None, globals);
    execute(interp, activation)
}

/// Run a compiled function on already-bound arguments
pub fn invoke(interp: &mut Interpreter, function: &Rc<CompiledFunction>, args: Vec<Value>) -> Result<Value, EvalError> {
    let activation = Activation::new(
        &function.routine,
        args,
        function.captured.clone(),
        Some(Value::Function(Function::Compiled(function.clone()))),
        function.globals.clone(),
    );
    execute(interp, activation)
}

struct Activation<'r> {
    routine: &'r Routine,
    args: Vec<Value>,
    locals: Vec<Option<Value>>,
    captured: Rc<[Value]>,
    callee: Option<Value>,
    globals: Frame,
    stack: Vec<Value>,
    result: Value,
}

impl<'r> Activation<'r> {
    fn new(
        routine: &'r Routine,
        args: Vec<Value>,
        captured: Rc<[Value]>,
        callee: Option<Value>,
        globals: Frame,
    ) -> Self {
        Self {
            routine,
            args,
            locals: vec![None; routine.local_count],
            captured,
            callee,
            globals,
            stack: Vec::new(),
            result: Value::Null,
        }
    }

    fn slot(&self, id: SlotId) -> Result<&'r Slot, EvalError> {
        self.routine
            .slots
            .get(id.0 as usize)
            .ok_or(EvalError::Internal("unknown slot"))
    }

    fn slot_ident(&self, id: SlotId) -> Ident {
        self.routine
            .slot_names
            .get(id.0 as usize)
            .cloned()
            .unwrap_or_else(|| Ident::from("?"))
    }

    fn load(&self, id: SlotId) -> Result<Value, EvalError> {
        match self.slot(id)? {
            Slot::Arg(i) => self.args.get(*i).cloned().ok_or(EvalError::Internal("argument slot")),
            Slot::Local(i) => match self.locals.get(*i) {
                Some(Some(value)) => Ok(value.clone()),
                _ => Err(EvalError::UnboundLocal(self.slot_ident(id))),
            },
            Slot::Captured(i) => self
                .captured
                .get(*i)
                .cloned()
                .ok_or(EvalError::Internal("captured slot")),
            Slot::Callee => self.callee.clone().ok_or(EvalError::Internal("no callee")),
            Slot::Global(name) => {
                let found = self.globals.borrow().lookup(name);
                found.ok_or_else(|| unbound_name(name, &self.globals))
            }
        }
    }

    fn store(&mut self, id: SlotId, value: Value) -> Result<(), EvalError> {
        match self.slot(id)? {
            Slot::Arg(i) => match self.args.get_mut(*i) {
                Some(arg) => *arg = value,
                None => return Err(EvalError::Internal("argument slot")),
            },
            Slot::Local(i) => match self.locals.get_mut(*i) {
                Some(cell) => *cell = Some(value),
                None => return Err(EvalError::Internal("local slot")),
            },
            Slot::Global(name) => self.globals.borrow_mut().define(name.clone(), value),
            Slot::Captured(_) | Slot::Callee => {
                return Err(EvalError::Internal("store to read-only slot"));
            }
        }
        Ok(())
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, EvalError> {
        self.stack.pop().ok_or(EvalError::Internal("stack underflow"))
    }

    fn top(&self) -> Result<&Value, EvalError> {
        self.stack.last().ok_or(EvalError::Internal("stack underflow"))
    }

    /// Pop the top `n` values, oldest first
    fn take(&mut self, n: u32) -> Result<Vec<Value>, EvalError> {
        let at = self
            .stack
            .len()
            .checked_sub(n as usize)
            .ok_or(EvalError::Internal("stack underflow"))?;
        Ok(self.stack.split_off(at))
    }
}

fn execute(interp: &mut Interpreter, mut act: Activation<'_>) -> Result<Value, EvalError> {
    let routine = act.routine;
    let mut pc = 0;
    loop {
        let instr = routine
            .code
            .get(pc)
            .ok_or(EvalError::Internal("ran past end of routine"))?;
        pc += 1;

        match instr {
            Instr::Const(index) => {
                let value = routine
                    .constants
                    .get(*index as usize)
                    .cloned()
                    .ok_or(EvalError::Internal("unknown constant"))?;
                act.push(value);
            }
            Instr::Load(id) => {
                let value = act.load(*id)?;
                act.push(value);
            }
            Instr::Store(id) => {
                let value = act.pop()?;
                act.store(*id, value)?;
            }
            Instr::Pop => {
                act.pop()?;
            }
            Instr::Dup => {
                let value = act.top()?.clone();
                act.push(value);
            }
            Instr::Swap => {
                let b = act.pop()?;
                let a = act.pop()?;
                act.push(b);
                act.push(a);
            }
            Instr::Rot3 => {
                let top = act.pop()?;
                let at = act
                    .stack
                    .len()
                    .checked_sub(2)
                    .ok_or(EvalError::Internal("stack underflow"))?;
                act.stack.insert(at, top);
            }
            Instr::StoreResult => act.result = act.pop()?,
            Instr::LoadResult => {
                let value = act.result.clone();
                act.push(value);
            }
            Instr::Unary(op) => {
                let value = act.pop()?;
                act.push(numeric::unary(*op, &value)?);
            }
            Instr::Binary(op) => {
                let b = act.pop()?;
                let a = act.pop()?;
                act.push(numeric::binary(*op, &a, &b)?);
            }
            Instr::Compare(op) => {
                let b = act.pop()?;
                let a = act.pop()?;
                act.push(Value::Bool(numeric::compare_op(*op, &a, &b)?));
            }
            Instr::Jump(target) => pc = *target,
            Instr::JumpIfFalse(target) => {
                if !act.pop()?.is_truthy() {
                    pc = *target;
                }
            }
            Instr::JumpIfFalseOrPop(target) => {
                if act.top()?.is_truthy() {
                    act.pop()?;
                } else {
                    pc = *target;
                }
            }
            Instr::JumpIfTrueOrPop(target) => {
                if act.top()?.is_truthy() {
                    pc = *target;
                } else {
                    act.pop()?;
                }
            }
            Instr::Call {
                positional,
                keywords,
            } => {
                let keyword_values = act.take(keywords.len() as u32)?;
                let args = act.take(*positional)?;
                let callee = act.pop()?;
                let keywords = keywords.iter().cloned().zip(keyword_values).collect();
                let result = interp.call(&callee, args, keywords)?;
                act.push(result);
            }
            Instr::MakeFunction { proto, defaults } => {
                let proto = routine
                    .prototypes
                    .get(*proto as usize)
                    .ok_or(EvalError::Internal("unknown prototype"))?;
                let defaults = act.take(*defaults)?;
                let captured = proto
                    .captures
                    .iter()
                    .map(|slot| act.load(*slot))
                    .collect::<Result<Vec<_>, _>>()?;
                let signature = Signature::new(
                    proto.name.clone(),
                    proto.params.clone(),
                    defaults,
                    proto.list_catch_all,
                    proto.map_catch_all,
                );
                debug!(
                    "created compiled function {} ({} params, {} captured)",
                    signature.name,
                    signature.declared(),
                    captured.len()
                );
                act.push(Value::Function(Function::Compiled(Rc::new(CompiledFunction {
                    signature,
                    routine: proto.routine.clone(),
                    captured: captured.into(),
                    globals: act.globals.clone(),
                }))));
            }
            Instr::Print { count, newline } => {
                let values = act.take(*count)?;
                interp.write(&format_print(&values, *newline))?;
            }
            Instr::Return => return act.pop(),
            Instr::Unsupported(what) => return Err(EvalError::Unsupported(*what)),
        }
    }
}
