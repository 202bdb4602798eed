//! Instruction set of the compiled backend
//!
//! Routines are flat instruction vectors executed on a value stack. Jumps
//! are emitted against forward-declared labels and patched to instruction
//! offsets by [`CodeBuilder::finish`].

use std::fmt;
use std::rc::Rc;

use crate::ast::{BinOp, CmpOp, Ident, UnaryOp};
use crate::value::Value;

use super::CompileError;

/// Index into a routine's slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Forward-declared jump target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

#[derive(Debug, Clone)]
pub enum Instr {
    /// Push `constants[i]`
    Const(u32),
    Load(SlotId),
    Store(SlotId),
    Pop,
    Dup,
    Swap,
    /// Move the top value below the next two
    Rot3,
    /// Pop into the module result register
    StoreResult,
    LoadResult,
    Unary(UnaryOp),
    Binary(BinOp),
    Compare(CmpOp),
    Jump(usize),
    /// Pops the condition
    JumpIfFalse(usize),
    /// Jump keeping the top value if it is falsy, else pop it
    JumpIfFalseOrPop(usize),
    JumpIfTrueOrPop(usize),
    /// Stack: callee, positional values, keyword values
    Call {
        positional: u32,
        keywords: Rc<[Ident]>,
    },
    /// Stack: default values; captured values are read from the
    /// prototype's capture slots
    MakeFunction {
        proto: u32,
        defaults: u32,
    },
    Print {
        count: u32,
        newline: bool,
    },
    Return,
    Unsupported(&'static str),
}

impl Instr {
    fn jump_target_mut(&mut self) -> Option<&mut usize> {
        match self {
            Instr::Jump(target)
            | Instr::JumpIfFalse(target)
            | Instr::JumpIfFalseOrPop(target)
            | Instr::JumpIfTrueOrPop(target) => Some(target),
            _ => None,
        }
    }
}

/// Accumulates the code and constants of one routine
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<Instr>,
    constants: Vec<Value>,
    labels: Vec<Option<usize>>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Point `label` at the next instruction to be emitted
    pub fn bind(&mut self, label: Label) {
        if let Some(entry) = self.labels.get_mut(label.0 as usize) {
            *entry = Some(self.code.len());
        }
    }

    /// Emit a jump-family instruction aimed at `label`
    pub fn emit_jump(&mut self, make: fn(usize) -> Instr, label: Label) {
        self.code.push(make(label.0 as usize));
    }

    pub fn constant(&mut self, value: Value) -> Result<u32, CompileError> {
        let index = u32::try_from(self.constants.len()).map_err(|_| CompileError::TooManyConstants)?;
        self.constants.push(value);
        Ok(index)
    }

    /// Replace label numbers in jumps with instruction offsets
    pub fn finish(mut self) -> Result<(Vec<Instr>, Vec<Value>), CompileError> {
        for instr in &mut self.code {
            if let Some(target) = instr.jump_target_mut() {
                let label = *target;
                *target = self
                    .labels
                    .get(label)
                    .copied()
                    .flatten()
                    .ok_or(CompileError::UnboundLabel(label as u32))?;
            }
        }
        Ok((self.code, self.constants))
    }
}
