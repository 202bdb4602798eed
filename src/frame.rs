//! Lexical environments for the tree interpreter

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Ident;
use crate::value::Value;

pub type Frame = Rc<RefCell<FrameInner>>;

/// Ordered local bindings plus links to the defining frame and the root.
///
/// Plain lookups check the locals and then jump straight to the root;
/// walking the parent chain is reserved for closed-over names.
#[derive(Debug, Default)]
pub struct FrameInner {
    names: Vec<Ident>,
    values: Vec<Value>,
    index: HashMap<Ident, usize>,
    parent: Option<Frame>,
    root: Option<Frame>,
}

impl FrameInner {
    /// A fresh root frame
    pub fn new() -> Frame {
        Rc::new(RefCell::new(FrameInner::default()))
    }

    pub fn with_parent(parent: &Frame) -> Frame {
        let root = root_of(parent);
        Rc::new(RefCell::new(FrameInner {
            parent: Some(parent.clone()),
            root: Some(root),
            ..FrameInner::default()
        }))
    }

    pub fn is_root(&self) -> bool {
        self.root.is_none()
    }

    pub fn define(&mut self, name: Ident, value: Value) {
        match self.index.get(&name) {
            Some(&slot) => self.values[slot] = value,
            None => {
                self.index.insert(name.clone(), self.values.len());
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.index.get(name).map(|&slot| self.values[slot].clone())
    }

    /// Locals first, then the root frame
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.get_local(name)
            .or_else(|| self.root.as_ref().and_then(|root| root.borrow().get_local(name)))
    }

    /// Walk the defining frames outward, ending at the root
    pub fn lookup_enclosing(&self, name: &str) -> Option<Value> {
        let mut current = self.parent.clone();
        while let Some(frame) = current {
            if let Some(value) = frame.borrow().get_local(name) {
                return Some(value);
            }
            current = frame.borrow().parent.clone();
        }
        None
    }

    /// Binding names in definition order
    pub fn names(&self) -> impl Iterator<Item = &Ident> {
        self.names.iter()
    }
}

pub fn root_of(frame: &Frame) -> Frame {
    frame.borrow().root.clone().unwrap_or_else(|| frame.clone())
}

/// Names visible from `frame` without closure capture, for suggestions
pub fn visible_names(frame: &Frame) -> Vec<String> {
    let mut names: Vec<String> = frame.borrow().names().map(|n| n.to_string()).collect();
    let root = root_of(frame);
    if !Rc::ptr_eq(&root, frame) {
        names.extend(root.borrow().names().map(|n| n.to_string()));
    }
    names
}
