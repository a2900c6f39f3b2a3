//! Union construction.
//!
//! Every union in the engine is built here so the representation invariants
//! hold everywhere:
//! - members are flattened (a union never directly contains a union)
//! - members are deduplicated, first occurrence keeps its display position
//! - `Unknown`/`Invalid` never appear among several members

use crate::types::{Ty, UnionTy};
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

/// Accumulates union members.
#[derive(Default)]
pub struct UnionBuilder {
    members: IndexSet<Ty, FxBuildHasher>,
    saw_unknown: bool,
    saw_invalid: bool,
}

impl UnionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ty: &Ty) {
        match ty {
            Ty::Unknown => self.saw_unknown = true,
            Ty::Invalid => self.saw_invalid = true,
            Ty::Union(union) => {
                for member in union.members() {
                    self.members.insert(member.clone());
                }
            }
            other => {
                self.members.insert(other.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The union of everything added. With no real members the result is
    /// `Invalid` if only `Invalid` was seen, `Unknown` otherwise.
    pub fn build(self) -> Ty {
        if self.members.is_empty() {
            return if self.saw_invalid && !self.saw_unknown {
                Ty::Invalid
            } else {
                Ty::Unknown
            };
        }
        self.build_non_empty().unwrap_or(Ty::Unknown)
    }

    /// Like [`build`](Self::build) but `None` when no real member was added.
    pub fn build_non_empty(self) -> Option<Ty> {
        let mut members: Vec<Ty> = self.members.into_iter().collect();
        match members.len() {
            0 => None,
            1 => members.pop(),
            _ => Some(Ty::Union(UnionTy::from_members(members))),
        }
    }
}

impl Ty {
    /// `union(a, b)`: commutative, idempotent, with sentinels absorbed.
    pub fn union(&self, other: &Ty) -> Ty {
        match (self.is_invalid(), other.is_invalid()) {
            (true, true) => {
                if matches!((self, other), (Ty::Invalid, Ty::Invalid)) {
                    Ty::Invalid
                } else {
                    Ty::Unknown
                }
            }
            (true, false) => other.clone(),
            (false, true) => self.clone(),
            (false, false) if self == other => self.clone(),
            (false, false) => {
                let mut builder = UnionBuilder::new();
                builder.add(self);
                builder.add(other);
                builder.build()
            }
        }
    }

    /// Fold [`Ty::union`] over `types`, starting from `Unknown`.
    pub fn union_all<'a>(types: impl IntoIterator<Item = &'a Ty>) -> Ty {
        let mut builder = UnionBuilder::new();
        for ty in types {
            builder.add(ty);
        }
        builder.build()
    }
}

#[cfg(test)]
#[path = "../tests/union_tests.rs"]
mod tests;
