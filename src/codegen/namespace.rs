//! Name to storage resolution for compiled routines
//!
//! Every name referenced in a routine is resolved once, on first use, to a
//! [`Slot`]; later references reuse the same [`SlotId`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::trace;

use crate::ast::{FunctionDef, Ident, Name, ScopeKind};
use crate::resolve::assigned_names;

use super::instr::SlotId;
use super::CompileError;

/// Where a resolved name is stored at run time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Bound argument `i`
    Arg(usize),
    /// Local cell `i`, unset until first assignment
    Local(usize),
    /// Closed-over value `i`, fixed when the function was created
    Captured(usize),
    /// The executing function itself
    Callee,
    /// Entry of the global frame, looked up by name on each access
    Global(Ident),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Arg(i) => write!(f, "arg{i}"),
            Slot::Local(i) => write!(f, "local{i}"),
            Slot::Captured(i) => write!(f, "captured{i}"),
            Slot::Callee => write!(f, "callee"),
            Slot::Global(name) => write!(f, "global:{name}"),
        }
    }
}

#[derive(Debug)]
enum Scope {
    /// Module level: every name lives in the global frame
    Root,
    Nested {
        own_name: Ident,
        params: Vec<Ident>,
        locals: HashSet<Ident>,
        captures: Vec<Ident>,
    },
}

#[derive(Debug)]
pub struct Namespace {
    scope: Scope,
    slots: Vec<Slot>,
    names: Vec<Ident>,
    memo: HashMap<Ident, SlotId>,
    local_count: usize,
}

/// Resolved slot table of a finished routine
pub struct SlotTable {
    pub slots: Vec<Slot>,
    pub names: Vec<Ident>,
    pub local_count: usize,
}

impl Namespace {
    pub fn root() -> Self {
        Self::with_scope(Scope::Root)
    }

    pub fn nested(def: &FunctionDef) -> Self {
        let params = def.param_names();
        let mut locals = assigned_names(&def.body);
        locals.extend(params.iter().cloned());
        Self::with_scope(Scope::Nested {
            own_name: def.name.ident.clone(),
            params,
            locals,
            captures: def.captures.clone(),
        })
    }

    fn with_scope(scope: Scope) -> Self {
        Self {
            scope,
            slots: Vec::new(),
            names: Vec::new(),
            memo: HashMap::new(),
            local_count: 0,
        }
    }

    pub fn resolve(&mut self, name: &Name) -> Result<SlotId, CompileError> {
        self.resolve_ident(&name.ident, name.scope)
    }

    /// Slot holding a value a nested function captures from this scope
    pub fn resolve_capture(&mut self, ident: &Ident) -> Result<SlotId, CompileError> {
        let scope = match &self.scope {
            Scope::Nested { locals, .. } if locals.contains(ident) => ScopeKind::Local,
            Scope::Nested { .. } => ScopeKind::ClosedOver,
            Scope::Root => ScopeKind::Global,
        };
        self.resolve_ident(ident, scope)
    }

    fn resolve_ident(&mut self, ident: &Ident, kind: ScopeKind) -> Result<SlotId, CompileError> {
        if let Some(&id) = self.memo.get(ident) {
            return Ok(id);
        }

        let slot = match &self.scope {
            Scope::Root => Slot::Global(ident.clone()),
            Scope::Nested {
                own_name,
                params,
                captures,
                ..
            } => match kind {
                ScopeKind::Local => match params.iter().position(|p| p == ident) {
                    Some(index) => Slot::Arg(index),
                    None => {
                        self.local_count += 1;
                        Slot::Local(self.local_count - 1)
                    }
                },
                ScopeKind::ClosedOver => match captures.iter().position(|c| c == ident) {
                    Some(index) => Slot::Captured(index),
                    None if ident == own_name => Slot::Callee,
                    None => Slot::Global(ident.clone()),
                },
                ScopeKind::Global | ScopeKind::Free => Slot::Global(ident.clone()),
            },
        };

        let id = SlotId(u32::try_from(self.slots.len()).map_err(|_| CompileError::TooManySlots)?);
        trace!("slot {id}: {ident} -> {slot}");
        self.slots.push(slot);
        self.names.push(ident.clone());
        self.memo.insert(ident.clone(), id);
        Ok(id)
    }

    pub fn finish(self) -> SlotTable {
        SlotTable {
            slots: self.slots,
            names: self.names,
            local_count: self.local_count,
        }
    }
}
