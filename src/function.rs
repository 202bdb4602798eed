//! Function objects and their parameter shapes

use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDef, Ident};
use crate::codegen::Routine;
use crate::frame::Frame;
use crate::value::Value;

/// Declared parameter shape of a function.
///
/// Catch-alls, when present, are the trailing one or two parameters
/// (list before map). `defaults` covers the tail of the plain region, so
/// the default for plain slot `i` is `defaults[i - required]`.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub defaults: Vec<Value>,
    pub required: usize,
    pub list_catch_all: bool,
    pub map_catch_all: bool,
}

impl Signature {
    pub fn new(name: Ident, params: Vec<Ident>, defaults: Vec<Value>, list_catch_all: bool, map_catch_all: bool) -> Self {
        let plain = params.len() - usize::from(list_catch_all) - usize::from(map_catch_all);
        let required = plain.saturating_sub(defaults.len());
        debug_assert!(defaults.len() <= plain, "more defaults than plain parameters");
        Self {
            name,
            params,
            defaults,
            required,
            list_catch_all,
            map_catch_all,
        }
    }

    /// Plain parameters only, no defaults
    pub fn simple(name: &str, params: &[&str]) -> Self {
        Self::new(
            Rc::from(name),
            params.iter().map(|p| Rc::from(*p)).collect(),
            Vec::new(),
            false,
            false,
        )
    }

    pub fn declared(&self) -> usize {
        self.params.len()
    }

    /// Number of slots that take plain positional arguments
    pub fn positional_len(&self) -> usize {
        self.params.len() - usize::from(self.list_catch_all) - usize::from(self.map_catch_all)
    }

    pub fn list_slot(&self) -> Option<usize> {
        self.list_catch_all.then(|| self.positional_len())
    }

    pub fn map_slot(&self) -> Option<usize> {
        self.map_catch_all.then(|| self.params.len() - 1)
    }

    pub fn default_for(&self, index: usize) -> Option<&Value> {
        index.checked_sub(self.required).and_then(|i| self.defaults.get(i))
    }
}

/// A function created by executing a `def` in the tree interpreter
pub struct InterpretedFunction {
    pub signature: Signature,
    pub def: Rc<FunctionDef>,
    /// Live reference to the frame the `def` ran in
    pub frame: Frame,
}

/// A function created by the compiled backend
pub struct CompiledFunction {
    pub signature: Signature,
    pub routine: Rc<Routine>,
    /// Closed-over values, copied when the function was created
    pub captured: Rc<[Value]>,
    pub globals: Frame,
}

#[derive(Clone)]
pub enum Function {
    Interpreted(Rc<InterpretedFunction>),
    Compiled(Rc<CompiledFunction>),
}

impl Function {
    pub fn signature(&self) -> &Signature {
        match self {
            Function::Interpreted(f) => &f.signature,
            Function::Compiled(f) => &f.signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature().name
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Interpreted(a), Function::Interpreted(b)) => Rc::ptr_eq(a, b),
            (Function::Compiled(a), Function::Compiled(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Function::Interpreted(_) => "interpreted",
            Function::Compiled(_) => "compiled",
        };
        write!(f, "<{kind} function {}>", self.name())
    }
}
