//! Class types and their lazily-resolved details.
//!
//! A class type is often created before the declaration it names is known
//! (a doc annotation `---@type Foo` read before `---@class Foo` is indexed).
//! Construction therefore only records the stable `className`; superclasses,
//! generic parameter names and the alias target are resolved on first use
//! through a [`ClassResolver`] and memoized in a `OnceLock` (first call wins).
//! A resolver that is not ready yet leaves the class unresolved.
//!
//! Declaration sites construct the class with its details already known, so
//! the lazy step never runs for them.
//!
//! Class relationships are kept as names, never as references to other
//! class values: a superclass cycle is just a repeated name, detected with a
//! visited-name set.

use crate::types::{PrimitiveKind, Ty};
use crate::union::UnionBuilder;
use bitflags::bitflags;
use emmy_common::words::{WORD_TABLE, global_type_name};
use emmy_common::{FileId, Name, NodeId, limits};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::ops::ControlFlow;
use std::sync::{Arc, OnceLock};
use tracing::trace;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u8 {
        /// Synthetic type of a global variable (`$name`) or `_G`.
        const GLOBAL = 1 << 0;
        /// Synthetic type of a local variable.
        const ANONYMOUS = 1 << 1;
        /// Type of a table literal.
        const ANONYMOUS_TABLE = 1 << 2;
    }
}

/// Declared relationships of a class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassDetails {
    pub generic_names: Vec<Name>,
    pub super_class_names: Vec<Name>,
    pub alias_name: Option<Name>,
}

impl ClassDetails {
    pub fn with_supers(supers: &[&str]) -> Self {
        Self {
            super_class_names: supers.iter().map(|s| Name::from(*s)).collect(),
            ..Self::default()
        }
    }
}

/// A field of an inline doc table (`{ x: number }`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocTableField {
    pub name: Name,
    pub ty: Ty,
}

/// Where a class type came from.
#[derive(Clone, Debug)]
pub enum ClassOrigin {
    /// A named class, a global or anonymous variable type.
    Named,
    /// A table literal: members are its fields plus anything indexed under
    /// its synthesized name.
    Table {
        file: FileId,
        node: NodeId,
        field_count: usize,
    },
    /// An inline doc table: member lookup never leaves its own field list.
    DocTable { fields: Arc<[DocTableField]> },
}

/// Read-only view of declared classes and aliases.
///
/// Implemented by the class registry adapter. All lookups are in-memory
/// index queries; an implementation that cannot answer yet returns `None`.
pub trait ClassResolver {
    /// Declared details of the class named `name`.
    fn class_details(&self, name: &str) -> Option<ClassDetails>;

    /// Target type of the alias declared as `name`.
    fn alias_target(&self, name: &str) -> Option<Ty>;

    /// Advisory cancellation, checked between candidate superclasses.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// A resolver that is not ready answers nothing, and its empty answers
    /// are not memoized into lazy classes.
    fn is_ready(&self) -> bool {
        true
    }
}

static NO_DETAILS: ClassDetails = ClassDetails {
    generic_names: Vec::new(),
    super_class_names: Vec::new(),
    alias_name: None,
};

/// A resolver that knows nothing. Lazy details resolve to empty.
pub struct NoClasses;

impl ClassResolver for NoClasses {
    fn class_details(&self, _name: &str) -> Option<ClassDetails> {
        None
    }

    fn alias_target(&self, _name: &str) -> Option<Ty> {
        None
    }
}

// =============================================================================
// ClassTy
// =============================================================================

#[derive(Debug)]
pub struct ClassTy {
    name: Name,
    var_name: Name,
    flags: ClassFlags,
    origin: ClassOrigin,
    details: OnceLock<ClassDetails>,
}

impl ClassTy {
    fn build(name: Name, var_name: Name, flags: ClassFlags, origin: ClassOrigin) -> Self {
        Self {
            name,
            var_name,
            flags,
            origin,
            details: OnceLock::new(),
        }
    }

    fn preset(mut self, details: ClassDetails) -> Self {
        self.details = OnceLock::from(details);
        self
    }

    /// A reference to a class by name; details are resolved on first use.
    pub fn lazy(name: &str) -> Self {
        Self::build(Name::from(name), Name::from(name), ClassFlags::empty(), ClassOrigin::Named)
    }

    /// A class at its declaration site, details known.
    pub fn declared(name: &str, details: ClassDetails) -> Self {
        Self::lazy(name).preset(details)
    }

    /// A class recovered from a serialized stub.
    pub fn serialized(
        name: &str,
        var_name: &str,
        flags: ClassFlags,
        details: Option<ClassDetails>,
    ) -> Self {
        let class = Self::build(
            Name::from(name),
            Name::from(var_name),
            flags,
            ClassOrigin::Named,
        );
        match details {
            Some(details) => class.preset(details),
            None => class,
        }
    }

    pub fn universal_table() -> Self {
        Self::declared(WORD_TABLE, ClassDetails::default())
    }

    /// The synthetic type that stores the fields of global `var`.
    pub fn global(var: &str) -> Self {
        Self::build(
            Name::from(global_type_name(var)),
            Name::from(var),
            ClassFlags::GLOBAL,
            ClassOrigin::Named,
        )
        .preset(ClassDetails::default())
    }

    /// The class named like global `var`, when globals double as types.
    pub fn global_named(var: &str) -> Self {
        Self::build(
            Name::from(var),
            Name::from(var),
            ClassFlags::GLOBAL,
            ClassOrigin::Named,
        )
    }

    /// The synthetic type of a local variable (`offset@file`).
    pub fn anonymous(name: &str, var_name: &str) -> Self {
        Self::build(
            Name::from(name),
            Name::from(var_name),
            ClassFlags::ANONYMOUS,
            ClassOrigin::Named,
        )
        .preset(ClassDetails::default())
    }

    /// The type of a table literal.
    pub fn table(
        file_path: &str,
        file: FileId,
        node: NodeId,
        offset: u32,
        field_count: usize,
    ) -> Self {
        Self::build(
            Name::from(table_type_name(file_path, offset)),
            Name::from(""),
            ClassFlags::ANONYMOUS | ClassFlags::ANONYMOUS_TABLE,
            ClassOrigin::Table {
                file,
                node,
                field_count,
            },
        )
        .preset(ClassDetails::default())
    }

    /// An inline doc table type.
    pub fn doc_table(file_path: &str, offset: u32, fields: Vec<DocTableField>) -> Self {
        Self::doc_table_named(&doc_table_type_name(file_path, offset), fields)
    }

    pub fn doc_table_named(name: &str, fields: Vec<DocTableField>) -> Self {
        Self::build(
            Name::from(name),
            Name::from(""),
            ClassFlags::empty(),
            ClassOrigin::DocTable {
                fields: fields.into(),
            },
        )
        .preset(ClassDetails::default())
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn var_name(&self) -> &Name {
        &self.var_name
    }

    #[inline]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    #[inline]
    pub fn origin(&self) -> &ClassOrigin {
        &self.origin
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains(ClassFlags::GLOBAL)
    }

    pub fn is_anonymous(&self) -> bool {
        self.flags.contains(ClassFlags::ANONYMOUS)
    }

    pub fn is_table_literal(&self) -> bool {
        matches!(self.origin, ClassOrigin::Table { .. })
    }

    pub fn is_doc_table(&self) -> bool {
        matches!(self.origin, ClassOrigin::DocTable { .. })
    }

    pub fn is_universal_table(&self) -> bool {
        &*self.name == WORD_TABLE && self.flags.is_empty()
    }

    /// Details if they have already been resolved.
    pub fn resolved_details(&self) -> Option<&ClassDetails> {
        self.details.get()
    }

    /// Declared details, resolved through `resolver` at most once.
    ///
    /// While `resolver` is not ready the class reads as undeclared and stays
    /// lazy.
    pub fn details(&self, resolver: &dyn ClassResolver) -> &ClassDetails {
        if let Some(details) = self.details.get() {
            return details;
        }
        if !resolver.is_ready() {
            return &NO_DETAILS;
        }
        self.details.get_or_init(|| {
            let found = resolver.class_details(&self.name);
            trace!(class = %self.name, found = found.is_some(), "class lazy init");
            found.unwrap_or_default()
        })
    }

    pub fn generic_names(&self, resolver: &dyn ClassResolver) -> &[Name] {
        &self.details(resolver).generic_names
    }

    pub fn super_class_names(&self, resolver: &dyn ClassResolver) -> &[Name] {
        &self.details(resolver).super_class_names
    }

    pub fn alias_name(&self, resolver: &dyn ClassResolver) -> Option<&Name> {
        self.details(resolver).alias_name.as_ref()
    }

    /// Names whose members also belong to this class.
    ///
    /// Empty unless the class declares an alias different from itself. With
    /// `global_names_as_types`, a named class also absorbs the members of the
    /// global variable spelled like it.
    pub fn alias_names(
        &self,
        resolver: &dyn ClassResolver,
        global_names_as_types: bool,
    ) -> SmallVec<[Name; 2]> {
        let mut names = SmallVec::new();
        let Some(alias) = self.alias_name(resolver) else {
            return names;
        };
        if *alias == self.name {
            return names;
        }
        names.push(alias.clone());
        if !self.is_global() && !self.is_anonymous() && global_names_as_types {
            names.push(Name::from(global_type_name(&self.name)));
        }
        names
    }

    /// The superclass type: a single class, a union for multiple
    /// inheritance, or `None`.
    pub fn super_class(&self, resolver: &dyn ClassResolver) -> Option<Ty> {
        let mut builder = UnionBuilder::new();
        for super_name in self.super_class_names(resolver) {
            if let Some(builtin) = builtin_ty(super_name) {
                builder.add(&builtin);
            } else if let Some(details) = resolver.class_details(super_name) {
                builder.add(&Ty::Class(Arc::new(ClassTy::declared(super_name, details))));
            }
        }
        builder.build_non_empty()
    }
}

/// Identity is the class name plus flags, never the instance.
impl PartialEq for ClassTy {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.flags == other.flags
    }
}

impl Eq for ClassTy {}

impl Hash for ClassTy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// =============================================================================
// Names and builtins
// =============================================================================

pub fn table_type_name(file_path: &str, offset: u32) -> String {
    format!("{file_path}@({offset})table")
}

pub fn doc_table_type_name(file_path: &str, offset: u32) -> String {
    format!("10|{file_path}|{offset}")
}

pub fn anonymous_type_name(file_path: &str, offset: u32) -> String {
    format!("{offset}@{file_path}")
}

/// Builtin type for a name used as a superclass or a doc type reference.
pub fn builtin_ty(name: &str) -> Option<Ty> {
    if let Some(kind) = PrimitiveKind::from_name(name) {
        return Some(Ty::Primitive(kind));
    }
    (name == WORD_TABLE).then(Ty::table)
}

// =============================================================================
// Superclass walk
// =============================================================================

/// Visit every transitive superclass of `start`, depth-first in declaration
/// order, each class at most once.
///
/// Returns `Break` if the visitor stopped the walk. A superclass cycle (or
/// `start` reappearing) ends that branch silently.
pub fn walk_super_classes(
    start: &ClassTy,
    resolver: &dyn ClassResolver,
    visitor: &mut dyn FnMut(&Arc<ClassTy>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let mut visited = FxHashSet::default();
    visited.insert(start.name.clone());
    walk_from(start, resolver, &mut visited, visitor)
}

fn walk_from(
    class: &ClassTy,
    resolver: &dyn ClassResolver,
    visited: &mut FxHashSet<Name>,
    visitor: &mut dyn FnMut(&Arc<ClassTy>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let Some(super_ty) = class.super_class(resolver) else {
        return ControlFlow::Continue(());
    };
    for super_class in super_ty.each().filter_map(Ty::as_class) {
        if resolver.is_cancelled() || visited.len() >= limits::MAX_SUPER_CLASS_WALK {
            return ControlFlow::Continue(());
        }
        if !visited.insert(super_class.name.clone()) {
            trace!(class = %class.name, super_class = %super_class.name, "superclass cycle");
            continue;
        }
        visitor(super_class)?;
        walk_from(super_class, resolver, visited, visitor)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
#[path = "../tests/class_tests.rs"]
mod tests;
