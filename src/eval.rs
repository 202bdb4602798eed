//! Tree-walking interpreter for slate
//!
//! Expressions evaluate to a [`Value`]; statements execute to a [`Flow`],
//! which carries `return` out of arbitrarily nested blocks up to the
//! nearest call boundary.

use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::ast::*;
use crate::binding::{self, BindError};
use crate::codegen::vm;
use crate::config::Config;
use crate::errors::find_similar;
use crate::frame::{visible_names, Frame, FrameInner};
use crate::function::{Function, InterpretedFunction, Signature};
use crate::numeric;
use crate::value::Value;

/// Remaining stack below which a call runs on a freshly allocated segment
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("{0}")]
    Type(String),
    #[error(transparent)]
    Binding(#[from] BindError),
    #[error("{0}")]
    DivideByZero(&'static str),
    #[error("name '{name}' is not defined")]
    UnboundName { name: Ident, suggestions: Vec<String> },
    #[error("local variable '{0}' referenced before assignment")]
    UnboundLocal(Ident),
    #[error("'{0}' object is not callable")]
    NotCallable(String),
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    #[error("maximum recursion depth exceeded")]
    RecursionLimit(usize),
    #[error("output error: {0}")]
    Output(String),
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl EvalError {
    /// Operator mismatches and call-binding failures form one family
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            EvalError::Type(_) | EvalError::Binding(_) | EvalError::NotCallable(_)
        )
    }

    /// Category name used in diagnostics headers
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Type(_) | EvalError::Binding(_) | EvalError::NotCallable(_) => "TYPE ERROR",
            EvalError::DivideByZero(_) => "DIVIDE BY ZERO",
            EvalError::UnboundName { .. } | EvalError::UnboundLocal(_) => "NAME ERROR",
            EvalError::Unsupported(_) => "UNSUPPORTED",
            EvalError::RecursionLimit(_) => "RECURSION ERROR",
            EvalError::Output(_) => "OUTPUT ERROR",
            EvalError::Internal(_) => "INTERNAL ERROR",
        }
    }
}

/// Result of executing a statement
#[derive(Debug, Clone)]
pub enum Flow {
    Value(Value),
    /// Unwinds to the enclosing call
    Return(Value),
}

/// Text written by a `print` statement
pub fn format_print(values: &[Value], newline: bool) -> String {
    let mut text = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    text.push(if newline { '\n' } else { ' ' });
    text
}

/// Execution state shared by both engines for the duration of a run:
/// the configuration, the global frame and the current call depth.
pub struct Interpreter {
    config: Config,
    globals: Frame,
    depth: usize,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self::with_globals(config, FrameInner::new())
    }

    pub fn with_globals(config: Config, globals: Frame) -> Self {
        Self {
            config,
            globals,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn globals(&self) -> &Frame {
        &self.globals
    }

    /// Run a program against the interpreter's global frame
    pub fn run(&mut self, program: &Program) -> Result<Value, EvalError> {
        let globals = self.globals.clone();
        self.execute(program, &globals)
    }

    /// Run a program against `frame`; the result is the value of the last
    /// expression statement, or null
    pub fn execute(&mut self, program: &Program, frame: &Frame) -> Result<Value, EvalError> {
        debug!(
            "interpreting {} ({} statements)",
            program.source_name,
            program.body.len()
        );
        let mut last = Value::Null;
        for stmt in &program.body {
            match stmt.execute(self, frame)? {
                Flow::Return(value) => return Ok(value),
                Flow::Value(value) => {
                    if matches!(stmt.node, StmtKind::Expr(_)) {
                        last = value;
                    }
                }
            }
        }
        Ok(last)
    }

    pub fn execute_block(&mut self, body: &[Stmt], frame: &Frame) -> Result<Flow, EvalError> {
        for stmt in body {
            if let Flow::Return(value) = stmt.execute(self, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Value(Value::Null))
    }

    /// Bind and invoke `callee`, whichever engine created it
    pub fn call(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        keywords: Vec<(Ident, Value)>,
    ) -> Result<Value, EvalError> {
        let Value::Function(function) = callee else {
            return Err(EvalError::NotCallable(callee.type_name().to_string()));
        };
        let bound = binding::bind(function.signature(), args, keywords)?;

        if self.depth >= self.config.max_call_depth {
            return Err(EvalError::RecursionLimit(self.depth));
        }
        self.depth += 1;
        // Recursion up to the depth limit never exhausts the native stack
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || match function {
            Function::Interpreted(f) => self.invoke(f, bound),
            Function::Compiled(f) => vm::invoke(self, f, bound),
        });
        self.depth -= 1;
        result
    }

    fn invoke(&mut self, function: &InterpretedFunction, bound: Vec<Value>) -> Result<Value, EvalError> {
        let frame = FrameInner::with_parent(&function.frame);
        {
            let mut locals = frame.borrow_mut();
            for (name, value) in function.signature.params.iter().zip(bound) {
                locals.define(name.clone(), value);
            }
        }
        match self.execute_block(&function.def.body, &frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Value(_) => Ok(Value::Null),
        }
    }

    pub fn write(&self, text: &str) -> Result<(), EvalError> {
        self.config.output.write_str(text)
    }

    fn make_function(&mut self, def: &Rc<FunctionDef>, frame: &Frame) -> Result<Value, EvalError> {
        let defaults = def
            .defaults()
            .map(|expr| expr.evaluate(self, frame))
            .collect::<Result<Vec<_>, _>>()?;
        let signature = Signature::new(
            def.name.ident.clone(),
            def.param_names(),
            defaults,
            def.has_list_param(),
            def.has_map_param(),
        );
        debug!(
            "created interpreted function {} ({} params, {} required)",
            signature.name,
            signature.declared(),
            signature.required
        );
        Ok(Value::Function(Function::Interpreted(Rc::new(
            InterpretedFunction {
                signature,
                def: def.clone(),
                frame: frame.clone(),
            },
        ))))
    }

    fn load(&self, name: &Name, frame: &Frame) -> Result<Value, EvalError> {
        let found = match name.scope {
            ScopeKind::Local => {
                return frame
                    .borrow()
                    .get_local(&name.ident)
                    .ok_or_else(|| EvalError::UnboundLocal(name.ident.clone()));
            }
            ScopeKind::ClosedOver => frame.borrow().lookup_enclosing(&name.ident),
            ScopeKind::Global | ScopeKind::Free => frame.borrow().lookup(&name.ident),
        };
        found.ok_or_else(|| unbound_name(&name.ident, frame))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

pub(crate) fn unbound_name(name: &Ident, frame: &Frame) -> EvalError {
    let candidates = visible_names(frame);
    EvalError::UnboundName {
        name: name.clone(),
        suggestions: find_similar(name, candidates.iter().map(String::as_str), 2),
    }
}

impl Expr {
    pub fn evaluate(&self, interp: &mut Interpreter, frame: &Frame) -> Result<Value, EvalError> {
        match &self.node {
            ExprKind::Literal(lit) => Ok(Value::from(lit)),

            ExprKind::Name(name) => interp.load(name, frame),

            ExprKind::Unary { op, operand } => {
                let value = operand.evaluate(interp, frame)?;
                numeric::unary(*op, &value)
            }

            ExprKind::Binary { op, left, right } => {
                let a = left.evaluate(interp, frame)?;
                let b = right.evaluate(interp, frame)?;
                numeric::binary(*op, &a, &b)
            }

            ExprKind::Compare { first, rest } => {
                let mut left = first.evaluate(interp, frame)?;
                for (op, operand) in rest {
                    let right = operand.evaluate(interp, frame)?;
                    if !numeric::compare_op(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            ExprKind::Logical { op, left, right } => {
                let value = left.evaluate(interp, frame)?;
                let decided = match op {
                    LogicOp::And => !value.is_truthy(),
                    LogicOp::Or => value.is_truthy(),
                };
                if decided {
                    Ok(value)
                } else {
                    right.evaluate(interp, frame)
                }
            }

            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if cond.evaluate(interp, frame)?.is_truthy() {
                    then_branch.evaluate(interp, frame)
                } else {
                    else_branch.evaluate(interp, frame)
                }
            }

            ExprKind::Call { callee, args } => {
                let function = callee.evaluate(interp, frame)?;
                let mut positional = Vec::new();
                let mut keywords = Vec::new();
                for arg in args {
                    match arg {
                        Arg::Positional(expr) => positional.push(expr.evaluate(interp, frame)?),
                        Arg::Keyword(name, expr) => {
                            keywords.push((name.clone(), expr.evaluate(interp, frame)?))
                        }
                    }
                }
                interp.call(&function, positional, keywords)
            }

            ExprKind::Member { .. } => Err(EvalError::Unsupported("member access")),
            ExprKind::Index { .. } => Err(EvalError::Unsupported("indexing")),
            ExprKind::Tuple(_) => Err(EvalError::Unsupported("tuple literal")),
        }
    }
}

impl Stmt {
    pub fn execute(&self, interp: &mut Interpreter, frame: &Frame) -> Result<Flow, EvalError> {
        match &self.node {
            StmtKind::Def(def) => {
                let function = interp.make_function(def, frame)?;
                frame.borrow_mut().define(def.name.ident.clone(), function);
                Ok(Flow::Value(Value::Null))
            }

            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => expr.evaluate(interp, frame)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            StmtKind::Print { values, newline } => {
                let values = values
                    .iter()
                    .map(|expr| expr.evaluate(interp, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                interp.write(&format_print(&values, *newline))?;
                Ok(Flow::Value(Value::Null))
            }

            StmtKind::Assign { target, value, .. } => {
                let value = value.evaluate(interp, frame)?;
                frame.borrow_mut().define(target.ident.clone(), value);
                Ok(Flow::Value(Value::Null))
            }

            StmtKind::Expr(expr) => Ok(Flow::Value(expr.evaluate(interp, frame)?)),

            StmtKind::Pass => Ok(Flow::Value(Value::Null)),
        }
    }
}
