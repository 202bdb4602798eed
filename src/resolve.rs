//! Scope resolution
//!
//! Runs once over a freshly parsed program and fixes the `ScopeKind` of
//! every `Name`, plus the capture list of every `def`. A function that
//! reads a local of an enclosing function captures it, and so does every
//! function in between, so the value can be threaded down when closures
//! are created.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::*;

struct FunctionScope {
    name: Ident,
    locals: HashSet<Ident>,
    captures: Vec<Ident>,
}

struct Resolver {
    module_names: HashSet<Ident>,
    scopes: Vec<FunctionScope>,
}

pub fn resolve_program(program: &mut Program) {
    let mut resolver = Resolver {
        module_names: assigned_names(&program.body),
        scopes: Vec::new(),
    };
    for stmt in &mut program.body {
        resolver.stmt(stmt);
    }
}

/// Names bound directly by a block: assignment targets and `def` names
pub(crate) fn assigned_names(body: &[Stmt]) -> HashSet<Ident> {
    body.iter()
        .filter_map(|stmt| match &stmt.node {
            StmtKind::Assign { target, .. } => Some(target.ident.clone()),
            StmtKind::Def(def) => Some(def.name.ident.clone()),
            _ => None,
        })
        .collect()
}

impl Resolver {
    fn classify(&mut self, ident: &Ident) -> ScopeKind {
        let Some(innermost) = self.scopes.len().checked_sub(1) else {
            return self.global_or_free(ident);
        };
        if self.scopes[innermost].locals.contains(ident) {
            return ScopeKind::Local;
        }

        let owner = (0..innermost).rev().find(|&k| self.scopes[k].locals.contains(ident));
        match owner {
            Some(owner) => {
                for level in owner + 1..=innermost {
                    // a function naming itself is served from the callee
                    let self_reference = level == owner + 1 && self.scopes[level].name == *ident;
                    let scope = &mut self.scopes[level];
                    if !self_reference && !scope.captures.contains(ident) {
                        scope.captures.push(ident.clone());
                    }
                }
                ScopeKind::ClosedOver
            }
            None => self.global_or_free(ident),
        }
    }

    fn global_or_free(&self, ident: &Ident) -> ScopeKind {
        if self.module_names.contains(ident) {
            ScopeKind::Global
        } else {
            ScopeKind::Free
        }
    }

    /// Scope of a name being bound in the current block
    fn binding_scope(&self) -> ScopeKind {
        if self.scopes.is_empty() {
            ScopeKind::Global
        } else {
            ScopeKind::Local
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.node {
            StmtKind::Def(def) => {
                let scope = self.binding_scope();
                let def = Rc::make_mut(def);
                def.name.scope = scope;
                self.function(def);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            StmtKind::Print { values, .. } => {
                for value in values {
                    self.expr(value);
                }
            }
            StmtKind::Assign { target, value, .. } => {
                self.expr(value);
                target.scope = self.binding_scope();
            }
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Pass => {}
        }
    }

    fn function(&mut self, def: &mut FunctionDef) {
        // defaults run in the defining scope
        for param in &mut def.params {
            if let Some(default) = &mut param.default {
                self.expr(default);
            }
        }

        let mut locals = assigned_names(&def.body);
        locals.extend(def.params.iter().map(|p| p.name.clone()));
        self.scopes.push(FunctionScope {
            name: def.name.ident.clone(),
            locals,
            captures: Vec::new(),
        });
        for stmt in &mut def.body {
            self.stmt(stmt);
        }
        if let Some(scope) = self.scopes.pop() {
            def.captures = scope.captures;
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match &mut expr.node {
            ExprKind::Literal(_) => {}
            ExprKind::Name(name) => name.scope = self.classify(&name.ident),
            ExprKind::Unary { operand, .. } => self.expr(Rc::make_mut(operand)),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(Rc::make_mut(left));
                self.expr(Rc::make_mut(right));
            }
            ExprKind::Compare { first, rest } => {
                self.expr(Rc::make_mut(first));
                for (_, operand) in rest {
                    self.expr(operand);
                }
            }
            ExprKind::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(Rc::make_mut(cond));
                self.expr(Rc::make_mut(then_branch));
                self.expr(Rc::make_mut(else_branch));
            }
            ExprKind::Call { callee, args } => {
                self.expr(Rc::make_mut(callee));
                for arg in args {
                    match arg {
                        Arg::Positional(value) | Arg::Keyword(_, value) => self.expr(value),
                    }
                }
            }
            ExprKind::Member { target, .. } => self.expr(Rc::make_mut(target)),
            ExprKind::Index { target, index } => {
                self.expr(Rc::make_mut(target));
                self.expr(Rc::make_mut(index));
            }
            ExprKind::Tuple(items) => {
                for item in items {
                    self.expr(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse;

    fn def_named<'a>(body: &'a [Stmt], name: &str) -> &'a FunctionDef {
        body.iter()
            .find_map(|s| match &s.node {
                StmtKind::Def(def) if &*def.name.ident == name => Some(def.as_ref()),
                _ => None,
            })
            .unwrap()
    }

    fn return_name_scope(def: &FunctionDef) -> ScopeKind {
        def.body
            .iter()
            .find_map(|s| match &s.node {
                StmtKind::Return(Some(Spanned {
                    node: ExprKind::Name(name),
                    ..
                })) => Some(name.scope),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn module_and_local_scopes() {
        let program = parse("g = 1\ndef f(a):\n    b = a\n    return g\n", "<test>").unwrap();
        let f = def_named(&program.body, "f");
        assert_eq!(f.name.scope, ScopeKind::Global);
        assert_eq!(return_name_scope(f), ScopeKind::Global);
        assert!(f.captures.is_empty());
    }

    #[test]
    fn unknown_names_are_free() {
        let program = parse("def f():\n    return host_value\n", "<test>").unwrap();
        assert_eq!(return_name_scope(def_named(&program.body, "f")), ScopeKind::Free);
    }

    #[test]
    fn captures_thread_through_intermediate_functions() {
        let src = "def outer(x):\n    def middle():\n        def inner():\n            return x\n        return inner\n    return middle\n";
        let program = parse(src, "<test>").unwrap();
        let outer = def_named(&program.body, "outer");
        let middle = def_named(&outer.body, "middle");
        let inner = def_named(&middle.body, "inner");
        assert!(outer.captures.is_empty());
        assert_eq!(&*middle.captures, &[Ident::from("x")]);
        assert_eq!(&*inner.captures, &[Ident::from("x")]);
        assert_eq!(return_name_scope(inner), ScopeKind::ClosedOver);
        assert_eq!(return_name_scope(middle), ScopeKind::Local);
    }

    #[test]
    fn self_reference_is_not_captured() {
        let src = "def outer():\n    def again(n):\n        return again\n    return again\n";
        let program = parse(src, "<test>").unwrap();
        let again = def_named(&def_named(&program.body, "outer").body, "again");
        assert!(again.captures.is_empty());
        assert_eq!(return_name_scope(again), ScopeKind::ClosedOver);
    }
}
