//! Lexical declaration lookup.
//!
//! [`DeclarationTree`] is the narrow query surface the engine uses for names;
//! [`LexicalScopes`] answers it by walking the arena outward from the
//! reference:
//! - statements strictly before the reference in each enclosing block
//! - parameters of each enclosing function
//! - loop variables of each enclosing `for`
//! - the own name of an enclosing `local function`
//!
//! A `local` statement's names are not visible in its own initializer, so
//! `local x = x or {}` resolves the inner `x` past the statement.

use crate::syntax::{NodeKind, Program};
use emmy_common::NodeId;

/// Lexical declaration queries.
pub trait DeclarationTree: Send + Sync {
    /// Innermost `NameDef` named `name` visible at `from`.
    fn resolve_local(&self, name: &str, from: NodeId) -> Option<NodeId>;

    /// The receiver expression of a non-static (`:`) method; `None` for
    /// `function A.m()` and for anything that is not a method.
    fn resolve_self(&self, method: NodeId) -> Option<NodeId>;
}

pub struct LexicalScopes<'p> {
    program: &'p Program,
}

impl<'p> LexicalScopes<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    fn name_matches(&self, def: NodeId, name: &str) -> bool {
        matches!(self.program.kind(def), Some(NodeKind::NameDef { name: n }) if &**n == name)
    }

    /// Last of `defs` named `name`; later declarations in a list shadow
    /// earlier ones.
    fn last_named(&self, defs: &[NodeId], name: &str) -> Option<NodeId> {
        defs.iter().rev().copied().find(|&def| self.name_matches(def, name))
    }

    /// Declarations introduced by `scope` that are visible to its child
    /// `from_child`.
    fn lookup_in(&self, scope: NodeId, from_child: NodeId, name: &str) -> Option<NodeId> {
        let kind = self.program.kind(scope)?;
        match kind {
            NodeKind::Block { stmts } => {
                let position = stmts.iter().position(|&stmt| stmt == from_child)?;
                stmts[..position]
                    .iter()
                    .rev()
                    .find_map(|&stmt| self.declared_by(stmt, name))
            }
            NodeKind::LocalFuncDef { name: def, body } => {
                if self.name_matches(*def, name) {
                    return Some(*def);
                }
                (from_child == body.block)
                    .then(|| self.last_named(&body.params, name))
                    .flatten()
            }
            NodeKind::FuncDef { body, .. }
            | NodeKind::ClassMethodDef { body, .. }
            | NodeKind::Closure { body } => (from_child == body.block)
                .then(|| self.last_named(&body.params, name))
                .flatten(),
            NodeKind::ForNum { var, body, .. } => {
                (from_child == *body && self.name_matches(*var, name)).then_some(*var)
            }
            NodeKind::ForIn { vars, body, .. } => (from_child == *body)
                .then(|| self.last_named(vars, name))
                .flatten(),
            _ => None,
        }
    }

    /// The declaration `stmt` makes for statements after it.
    fn declared_by(&self, stmt: NodeId, name: &str) -> Option<NodeId> {
        match self.program.kind(stmt)? {
            NodeKind::LocalDef { names, .. } => self.last_named(names, name),
            NodeKind::LocalFuncDef { name: def, .. } => {
                self.name_matches(*def, name).then_some(*def)
            }
            _ => None,
        }
    }
}

impl DeclarationTree for LexicalScopes<'_> {
    fn resolve_local(&self, name: &str, from: NodeId) -> Option<NodeId> {
        let mut child = from;
        for scope in self.program.ancestors(from) {
            if let Some(found) = self.lookup_in(scope, child, name) {
                return Some(found);
            }
            child = scope;
        }
        None
    }

    fn resolve_self(&self, method: NodeId) -> Option<NodeId> {
        match self.program.kind(method)? {
            NodeKind::ClassMethodDef {
                prefix,
                colon: true,
                ..
            } => Some(*prefix),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../tests/scope_tests.rs"]
mod tests;
