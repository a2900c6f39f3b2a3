//! Resolved member tables with override precedence.
//!
//! A [`MemberChain`] holds the own members of one class plus one chain per
//! direct superclass. Lookup checks the own table first, then the super
//! chains in declaration order, first match wins.
//!
//! ## Override rule
//!
//! | Existing member | New member is inserted when |
//! |-----------------|-----------------------------|
//! | none anywhere | always |
//! | in a superclass | `worth` strictly greater, or equal and above [`WORTH_ASSIGN`] |
//! | in own table | `worth` strictly greater, or the first authoritative claim on the name |
//!
//! Two authoritative declarations of the same name: a later one in the same
//! file (greater offset) replaces the earlier; across files the first claim
//! is kept.

use crate::class::ClassTy;
use emmy_common::{FileId, Name};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Plain `a.b = v` assignment.
pub const WORTH_ASSIGN: u8 = 10;
/// Field of a table literal.
pub const WORTH_TABLE_FIELD: u8 = 20;
/// `function A:m()` / `function A.m()`.
pub const WORTH_METHOD: u8 = 30;
/// `---@field`.
pub const WORTH_DOC_FIELD: u8 = 30;

/// A member declaration as seen by the chain.
pub trait ChainMember: Clone {
    fn name(&self) -> &Name;

    /// Override priority of the declaration's syntactic origin.
    fn worth(&self) -> u8;

    /// Declaring file and offset, used to order authoritative claims.
    fn source(&self) -> (FileId, u32);
}

#[derive(Clone, Debug)]
pub struct MemberChain<M> {
    class: Arc<ClassTy>,
    supers: Vec<MemberChain<M>>,
    members: IndexMap<Name, M, FxBuildHasher>,
    authoritative: FxHashSet<Name>,
}

impl<M: ChainMember> MemberChain<M> {
    pub fn new(class: Arc<ClassTy>, supers: Vec<MemberChain<M>>) -> Self {
        Self {
            class,
            supers,
            members: IndexMap::default(),
            authoritative: FxHashSet::default(),
        }
    }

    pub fn class(&self) -> &Arc<ClassTy> {
        &self.class
    }

    pub fn supers(&self) -> &[MemberChain<M>] {
        &self.supers
    }

    /// Number of own members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member of this class. `authoritative` marks the declaration
    /// site that defines this exact class (a method on a `---@class` local).
    pub fn add(&mut self, member: M, authoritative: bool) {
        let name = member.name().clone();
        if let Some(inherited) = self.find_super_member(&name) {
            if !can_override(member.worth(), inherited.worth()) {
                return;
            }
        }
        let Some(existing) = self.members.get(&name) else {
            if authoritative {
                self.authoritative.insert(name.clone());
            }
            self.members.insert(name, member);
            return;
        };

        let replace = if !authoritative {
            member.worth() > existing.worth()
        } else if !self.authoritative.contains(&name) {
            true
        } else {
            let (old_file, old_offset) = existing.source();
            let (new_file, new_offset) = member.source();
            member.worth() > existing.worth() || (old_file == new_file && new_offset > old_offset)
        };
        if authoritative {
            self.authoritative.insert(name.clone());
        }
        if replace {
            self.members.insert(name, member);
        }
    }

    /// Own member, else the first superclass chain that has one.
    pub fn find_member(&self, name: &str) -> Option<&M> {
        self.members
            .get(name)
            .or_else(|| self.find_super_member(name))
    }

    pub fn find_super_member(&self, name: &str) -> Option<&M> {
        self.supers.iter().find_map(|chain| chain.find_member(name))
    }

    pub fn own_member(&self, name: &str) -> Option<&M> {
        self.members.get(name)
    }

    /// Visit members, own first, then (with `deep`) superclass members.
    /// A name already visited is skipped, so overridden members are never
    /// reported.
    pub fn for_each(
        &self,
        deep: bool,
        visitor: &mut dyn FnMut(&Arc<ClassTy>, &M) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let mut seen = FxHashSet::default();
        self.for_each_inner(deep, &mut seen, visitor)
    }

    fn for_each_inner(
        &self,
        deep: bool,
        seen: &mut FxHashSet<Name>,
        visitor: &mut dyn FnMut(&Arc<ClassTy>, &M) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        for (name, member) in &self.members {
            if seen.insert(name.clone()) {
                visitor(&self.class, member)?;
            }
        }
        if deep {
            for chain in &self.supers {
                chain.for_each_inner(true, seen, visitor)?;
            }
        }
        ControlFlow::Continue(())
    }
}

#[inline]
fn can_override(worth: u8, inherited: u8) -> bool {
    worth > inherited || (worth == inherited && worth > WORTH_ASSIGN)
}

#[cfg(test)]
#[path = "../tests/member_chain_tests.rs"]
mod tests;
