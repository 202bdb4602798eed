//! Compiled backend: AST → routines → stack VM
//!
//! 1. Lower the resolved AST into [`Routine`]s, resolving every name to a
//!    slot once (`namespace`, `lower`)
//! 2. Execute routines on a value stack (`vm`), calling back into the
//!    tree interpreter for functions it created

pub mod instr;
pub mod lower;
pub mod namespace;
pub mod vm;

use std::fmt::Write as _;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::Ident;
use crate::value::Value;

pub use instr::{CodeBuilder, Instr, Label, SlotId};
pub use lower::compile;
pub use namespace::{Namespace, Slot};
pub use vm::Vm;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("too many constants in one routine")]
    TooManyConstants,
    #[error("too many names in one routine")]
    TooManySlots,
    #[error("too many operands in one instruction")]
    TooManyOperands,
    #[error("jump to unbound label {0}")]
    UnboundLabel(u32),
}

/// Lowered body of a module or function
#[derive(Debug)]
pub struct Routine {
    pub name: Ident,
    pub code: Vec<Instr>,
    pub constants: Vec<Value>,
    pub slots: Vec<Slot>,
    /// Source name of each slot, for diagnostics
    pub slot_names: Vec<Ident>,
    pub prototypes: Vec<Rc<Prototype>>,
    pub local_count: usize,
}

/// Everything `MakeFunction` needs besides the default values
#[derive(Debug)]
pub struct Prototype {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub list_catch_all: bool,
    pub map_catch_all: bool,
    /// Slots of the enclosing routine copied into the new function
    pub captures: Vec<SlotId>,
    pub routine: Rc<Routine>,
}

/// A compiled program: its module-level routine
#[derive(Debug, Clone)]
pub struct Unit {
    pub routine: Rc<Routine>,
}

impl Unit {
    pub fn disassemble(&self) -> String {
        self.routine.disassemble()
    }
}

impl Routine {
    pub fn slot_name(&self, id: SlotId) -> &str {
        self.slot_names.get(id.0 as usize).map_or("?", |n| &**n)
    }

    /// Render this routine and, indented below it, its nested routines
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        self.write_listing(&mut out, 0);
        out
    }

    fn write_listing(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        let _ = writeln!(
            out,
            "{pad}routine {} ({} slots, {} locals)",
            self.name,
            self.slots.len(),
            self.local_count
        );
        for (offset, instr) in self.code.iter().enumerate() {
            let _ = writeln!(out, "{pad}  {offset:>4}  {}", self.describe(instr));
        }
        for proto in &self.prototypes {
            proto.routine.write_listing(out, indent + 1);
        }
    }

    fn describe(&self, instr: &Instr) -> String {
        let slot = |id: &SlotId| {
            let kind = self.slots.get(id.0 as usize).map(Slot::to_string).unwrap_or_default();
            format!("{} ({kind})", self.slot_name(*id))
        };
        match instr {
            Instr::Const(i) => match self.constants.get(*i as usize) {
                Some(value) => format!("CONST {value:?}"),
                None => format!("CONST #{i}"),
            },
            Instr::Load(id) => format!("LOAD {}", slot(id)),
            Instr::Store(id) => format!("STORE {}", slot(id)),
            Instr::Pop => "POP".to_string(),
            Instr::Dup => "DUP".to_string(),
            Instr::Swap => "SWAP".to_string(),
            Instr::Rot3 => "ROT3".to_string(),
            Instr::StoreResult => "STORE_RESULT".to_string(),
            Instr::LoadResult => "LOAD_RESULT".to_string(),
            Instr::Unary(op) => format!("UNARY {}", op.symbol()),
            Instr::Binary(op) => format!("BINARY {}", op.symbol()),
            Instr::Compare(op) => format!("COMPARE {}", op.symbol()),
            Instr::Jump(target) => format!("JUMP {target}"),
            Instr::JumpIfFalse(target) => format!("JUMP_IF_FALSE {target}"),
            Instr::JumpIfFalseOrPop(target) => format!("JUMP_IF_FALSE_OR_POP {target}"),
            Instr::JumpIfTrueOrPop(target) => format!("JUMP_IF_TRUE_OR_POP {target}"),
            Instr::Call {
                positional,
                keywords,
            } if keywords.is_empty() => format!("CALL {positional}"),
            Instr::Call {
                positional,
                keywords,
            } => format!("CALL {positional} [{}]", keywords.join(", ")),
            Instr::MakeFunction { proto, defaults } => {
                let name = self
                    .prototypes
                    .get(*proto as usize)
                    .map_or("?", |p| &*p.name);
                format!("MAKE_FUNCTION {name} defaults={defaults}")
            }
            Instr::Print { count, newline } => {
                format!("PRINT {count}{}", if *newline { "" } else { " no-newline" })
            }
            Instr::Return => "RETURN".to_string(),
            Instr::Unsupported(what) => format!("UNSUPPORTED {what}"),
        }
    }
}
