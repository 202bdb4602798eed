//! AST lowering
//!
//! Each node lowers itself into the [`RoutineBuilder`] of the routine that
//! contains it. A `def` lowers its body into a fresh builder, producing a
//! [`Prototype`] the enclosing routine instantiates with `MakeFunction`.

use std::rc::Rc;

use log::debug;

use crate::ast::*;
use crate::value::Value;

use super::instr::{CodeBuilder, Instr, SlotId};
use super::namespace::Namespace;
use super::{CompileError, Prototype, Routine, Unit};

/// Lowering state of the routine being built
pub struct RoutineBuilder {
    name: Ident,
    code: CodeBuilder,
    namespace: Namespace,
    prototypes: Vec<Rc<Prototype>>,
    is_module: bool,
}

impl RoutineBuilder {
    fn new(name: Ident, namespace: Namespace, is_module: bool) -> Self {
        Self {
            name,
            code: CodeBuilder::new(),
            namespace,
            prototypes: Vec::new(),
            is_module,
        }
    }

    fn emit(&mut self, instr: Instr) {
        self.code.emit(instr);
    }

    fn constant(&mut self, value: Value) -> Result<(), CompileError> {
        let index = self.code.constant(value)?;
        self.emit(Instr::Const(index));
        Ok(())
    }

    fn slot(&mut self, name: &Name) -> Result<SlotId, CompileError> {
        self.namespace.resolve(name)
    }

    fn finish(self) -> Result<Routine, CompileError> {
        let (code, constants) = self.code.finish()?;
        let table = self.namespace.finish();
        debug!(
            "lowered routine {}: {} instructions, {} slots",
            self.name,
            code.len(),
            table.slots.len()
        );
        Ok(Routine {
            name: self.name,
            code,
            constants,
            slots: table.slots,
            slot_names: table.names,
            prototypes: self.prototypes,
            local_count: table.local_count,
        })
    }
}

/// Lower a resolved program into a compiled unit
pub fn compile(program: &Program) -> Result<Unit, CompileError> {
    let mut builder = RoutineBuilder::new(program.source_name.clone(), Namespace::root(), true);
    for stmt in &program.body {
        stmt.lower(&mut builder)?;
    }
    builder.emit(Instr::LoadResult);
    builder.emit(Instr::Return);
    Ok(Unit {
        routine: Rc::new(builder.finish()?),
    })
}

fn lower_function(def: &FunctionDef) -> Result<Routine, CompileError> {
    let mut builder = RoutineBuilder::new(def.name.ident.clone(), Namespace::nested(def), false);
    for stmt in &def.body {
        stmt.lower(&mut builder)?;
    }
    builder.constant(Value::Null)?;
    builder.emit(Instr::Return);
    builder.finish()
}

fn count(n: usize) -> Result<u32, CompileError> {
    u32::try_from(n).map_err(|_| CompileError::TooManyOperands)
}

impl Expr {
    pub fn lower(&self, cx: &mut RoutineBuilder) -> Result<(), CompileError> {
        match &self.node {
            ExprKind::Literal(lit) => cx.constant(Value::from(lit))?,

            ExprKind::Name(name) => {
                let slot = cx.slot(name)?;
                cx.emit(Instr::Load(slot));
            }

            ExprKind::Unary { op, operand } => {
                operand.lower(cx)?;
                cx.emit(Instr::Unary(*op));
            }

            ExprKind::Binary { op, left, right } => {
                left.lower(cx)?;
                right.lower(cx)?;
                cx.emit(Instr::Binary(*op));
            }

            ExprKind::Compare { first, rest } => {
                first.lower(cx)?;
                let cleanup = cx.code.new_label();
                let last = rest.len().saturating_sub(1);
                for (i, (op, operand)) in rest.iter().enumerate() {
                    operand.lower(cx)?;
                    if i < last {
                        // keep the right operand as the next left operand
                        cx.emit(Instr::Dup);
                        cx.emit(Instr::Rot3);
                        cx.emit(Instr::Compare(*op));
                        cx.code.emit_jump(Instr::JumpIfFalseOrPop, cleanup);
                    } else {
                        cx.emit(Instr::Compare(*op));
                    }
                }
                if rest.len() > 1 {
                    let end = cx.code.new_label();
                    cx.code.emit_jump(Instr::Jump, end);
                    cx.code.bind(cleanup);
                    cx.emit(Instr::Swap);
                    cx.emit(Instr::Pop);
                    cx.code.bind(end);
                } else {
                    cx.code.bind(cleanup);
                }
            }

            ExprKind::Logical { op, left, right } => {
                left.lower(cx)?;
                let end = cx.code.new_label();
                let jump: fn(usize) -> Instr = match op {
                    LogicOp::And => Instr::JumpIfFalseOrPop,
                    LogicOp::Or => Instr::JumpIfTrueOrPop,
                };
                cx.code.emit_jump(jump, end);
                right.lower(cx)?;
                cx.code.bind(end);
            }

            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                let otherwise = cx.code.new_label();
                let end = cx.code.new_label();
                cond.lower(cx)?;
                cx.code.emit_jump(Instr::JumpIfFalse, otherwise);
                then_branch.lower(cx)?;
                cx.code.emit_jump(Instr::Jump, end);
                cx.code.bind(otherwise);
                else_branch.lower(cx)?;
                cx.code.bind(end);
            }

            ExprKind::Call { callee, args } => {
                callee.lower(cx)?;
                let mut positional = 0;
                let mut keywords = Vec::new();
                for arg in args {
                    match arg {
                        Arg::Positional(value) => {
                            value.lower(cx)?;
                            positional += 1;
                        }
                        Arg::Keyword(name, value) => {
                            value.lower(cx)?;
                            keywords.push(name.clone());
                        }
                    }
                }
                cx.emit(Instr::Call {
                    positional: count(positional)?,
                    keywords: keywords.into(),
                });
            }

            ExprKind::Member { .. } => cx.emit(Instr::Unsupported("member access")),
            ExprKind::Index { .. } => cx.emit(Instr::Unsupported("indexing")),
            ExprKind::Tuple(_) => cx.emit(Instr::Unsupported("tuple literal")),
        }
        Ok(())
    }
}

impl Stmt {
    pub fn lower(&self, cx: &mut RoutineBuilder) -> Result<(), CompileError> {
        match &self.node {
            StmtKind::Def(def) => {
                let mut defaults = 0;
                for default in def.defaults() {
                    default.lower(cx)?;
                    defaults += 1;
                }
                let captures = def
                    .captures
                    .iter()
                    .map(|ident| cx.namespace.resolve_capture(ident))
                    .collect::<Result<Vec<_>, _>>()?;
                let prototype = Prototype {
                    name: def.name.ident.clone(),
                    params: def.param_names(),
                    list_catch_all: def.has_list_param(),
                    map_catch_all: def.has_map_param(),
                    captures,
                    routine: Rc::new(lower_function(def)?),
                };
                let proto = count(cx.prototypes.len())?;
                cx.prototypes.push(Rc::new(prototype));
                cx.emit(Instr::MakeFunction {
                    proto,
                    defaults: count(defaults)?,
                });
                let slot = cx.slot(&def.name)?;
                cx.emit(Instr::Store(slot));
            }

            StmtKind::Return(value) => {
                match value {
                    Some(expr) => expr.lower(cx)?,
                    None => cx.constant(Value::Null)?,
                }
                cx.emit(Instr::Return);
            }

            StmtKind::Print { values, newline } => {
                for value in values {
                    value.lower(cx)?;
                }
                cx.emit(Instr::Print {
                    count: count(values.len())?,
                    newline: *newline,
                });
            }

            StmtKind::Assign { target, value, .. } => {
                value.lower(cx)?;
                let slot = cx.slot(target)?;
                cx.emit(Instr::Store(slot));
            }

            StmtKind::Expr(expr) => {
                expr.lower(cx)?;
                cx.emit(if cx.is_module {
                    Instr::StoreResult
                } else {
                    Instr::Pop
                });
            }

            StmtKind::Pass => {}
        }
        Ok(())
    }
}
