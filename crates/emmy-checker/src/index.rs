//! In-memory class registry.
//!
//! [`ClassIndex`] stores class, alias and member declarations in concurrent
//! maps keyed by name, so many inference requests can query one index at
//! once. [`Indexer`] fills it from a [`Program`] in two passes:
//!
//! 1. **Tags**: `---@class` and `---@alias` comments, and which globals are
//!    class-tagged (`---@class Foo` on `Foo = {}`).
//! 2. **Members**: doc fields, methods, fields of class-tagged table
//!    initializers, `a.b = v` assignments, and global assignments and global
//!    functions as members of `_G`.
//!
//! Every member is keyed by the class its prefix names: a tagged local or
//! global gives its class, a local initialized with a table literal gives the
//! table's type name, any other local gives its anonymous type name, and an
//! untagged global `foo` gives `$foo`.

use crate::registry::{
    AliasDecl, ClassDecl, ClassRegistry, MemberDecl, MemberKind, MemberQuery, RegistryResolver,
};
use crate::scope::{DeclarationTree, LexicalScopes};
use crate::syntax::{DocComment, FieldKey, IndexKey, NodeKind, Program, SourceFile};
use dashmap::DashMap;
use emmy_common::words::{WORD_G, WORD_SELF, global_type_name};
use emmy_common::{Name, NodeId};
use emmy_solver::class::{anonymous_type_name, table_type_name, walk_super_classes};
use emmy_solver::{ClassDetails, ClassTy};
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

// =============================================================================
// ClassIndex
// =============================================================================

pub struct ClassIndex {
    classes: DashMap<Name, ClassDecl>,
    aliases: DashMap<Name, AliasDecl>,
    /// Class name -> members in indexing order.
    members: DashMap<Name, Vec<MemberDecl>>,
    ready: AtomicBool,
}

impl Default for ClassIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassIndex {
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
            aliases: DashMap::new(),
            members: DashMap::new(),
            ready: AtomicBool::new(true),
        }
    }

    /// Index every file of `program`.
    pub fn from_program(program: &Program) -> Self {
        let index = Self::new();
        Indexer::new(program, &index).run();
        index
    }

    /// Mark the index degraded (`false`) or queryable again.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// The first declaration of a class name wins.
    pub fn add_class(&self, decl: ClassDecl) {
        self.classes.entry(decl.name.clone()).or_insert(decl);
    }

    pub fn add_alias(&self, decl: AliasDecl) {
        self.aliases.entry(decl.name.clone()).or_insert(decl);
    }

    pub fn add_member(&self, decl: MemberDecl) {
        trace!(class = %decl.class_name, member = %decl.name, kind = ?decl.kind, "member indexed");
        self.members
            .entry(decl.class_name.clone())
            .or_default()
            .push(decl);
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn has_members(&self, class_name: &str) -> bool {
        self.is_ready()
            && self
                .members
                .get(class_name)
                .is_some_and(|entry| !entry.value().is_empty())
    }

    fn members_of(&self, class_name: &str) -> Vec<MemberDecl> {
        self.members
            .get(class_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn visit_own(
        &self,
        class: &str,
        member: &str,
        visitor: &mut dyn FnMut(&MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        for decl in self.members_of(class).iter().filter(|decl| &*decl.name == member) {
            visitor(decl)?;
        }
        ControlFlow::Continue(())
    }

    fn process_exact(
        &self,
        class: &str,
        member: &str,
        deep: bool,
        visitor: &mut dyn FnMut(&MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let mut processed: FxHashSet<Name> = FxHashSet::default();
        processed.insert(Name::from(class));
        self.visit_own(class, member, visitor)?;
        if !deep {
            return ControlFlow::Continue(());
        }
        let Some(decl) = self.find_class(class) else {
            return ControlFlow::Continue(());
        };
        if let Some(alias) = &decl.details.alias_name {
            if processed.insert(alias.clone()) {
                self.visit_own(alias, member, visitor)?;
            }
        }
        let resolver = RegistryResolver::new(self);
        let start = ClassTy::declared(class, decl.details);
        walk_super_classes(&start, &resolver, &mut |super_class| {
            if processed.insert(super_class.name().clone()) {
                self.visit_own(super_class.name(), member, visitor)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    fn process_wildcard(
        &self,
        class: &str,
        visitor: &mut dyn FnMut(&MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let all = self.members_of(class);
        let (std_lib, project): (Vec<_>, Vec<_>) = all.iter().partition(|decl| decl.is_std_lib);
        let mut extensions = Vec::new();
        for decl in std_lib.into_iter().chain(project) {
            if decl.is_defining() {
                visitor(decl)?;
            } else {
                extensions.push(decl);
            }
        }
        for decl in extensions {
            visitor(decl)?;
        }
        ControlFlow::Continue(())
    }
}

impl ClassRegistry for ClassIndex {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn find_class(&self, name: &str) -> Option<ClassDecl> {
        if !self.is_ready() {
            return None;
        }
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    fn find_alias(&self, name: &str) -> Option<AliasDecl> {
        if !self.is_ready() {
            return None;
        }
        self.aliases.get(name).map(|entry| entry.value().clone())
    }

    fn process_members(
        &self,
        query: MemberQuery<'_>,
        visitor: &mut dyn FnMut(&MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if !self.is_ready() {
            return ControlFlow::Continue(());
        }
        match query {
            MemberQuery::Exact { class, member, deep } => {
                self.process_exact(class, member, deep, visitor)
            }
            MemberQuery::Wildcard { class } => self.process_wildcard(class, visitor),
        }
    }
}

// =============================================================================
// Indexer
// =============================================================================

pub struct Indexer<'a> {
    program: &'a Program,
    scopes: LexicalScopes<'a>,
    index: &'a ClassIndex,
    /// Global variable -> class named by its `---@class` tag.
    global_classes: FxHashMap<Name, Name>,
}

impl<'a> Indexer<'a> {
    pub fn new(program: &'a Program, index: &'a ClassIndex) -> Self {
        Self {
            program,
            scopes: LexicalScopes::new(program),
            index,
            global_classes: FxHashMap::default(),
        }
    }

    pub fn run(mut self) {
        for file in self.program.files() {
            for id in self.preorder(file) {
                self.collect_tags(file, id);
            }
        }
        for file in self.program.files() {
            for id in self.preorder(file) {
                self.collect_members(file, id);
            }
        }
        debug!(
            files = self.program.files().len(),
            classes = self.index.class_count(),
            members = self.index.member_count(),
            "program indexed"
        );
    }

    fn preorder(&self, file: &SourceFile) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![file.root];
        while let Some(id) = stack.pop() {
            let Some(kind) = self.program.kind(id) else {
                continue;
            };
            out.push(id);
            stack.extend(kind.children().into_iter().rev());
        }
        out
    }

    // -------------------------------------------------------------------------
    // Pass 1: tags
    // -------------------------------------------------------------------------

    fn collect_tags(&mut self, file: &SourceFile, id: NodeId) {
        let Some(doc) = self.program.doc(id) else {
            return;
        };
        if let Some(class) = &doc.class {
            self.index.add_class(ClassDecl {
                name: class.name.clone(),
                file: file.id,
                node: id,
                is_std_lib: file.is_std_lib,
                details: ClassDetails {
                    generic_names: class.generics.clone(),
                    super_class_names: class.supers.clone(),
                    alias_name: class.alias.clone(),
                },
            });
            if let Some(NodeKind::Assign { targets, .. }) = self.program.kind(id) {
                if let Some(NodeKind::Name { name }) =
                    targets.first().and_then(|&t| self.program.kind(t))
                {
                    if self.scopes.resolve_local(name, targets[0]).is_none() {
                        self.global_classes.insert(name.clone(), class.name.clone());
                    }
                }
            }
        }
        for alias in &doc.aliases {
            self.index.add_alias(AliasDecl {
                name: alias.name.clone(),
                file: file.id,
                ty: alias.ty.clone(),
            });
        }
    }

    // -------------------------------------------------------------------------
    // Pass 2: members
    // -------------------------------------------------------------------------

    fn member(
        &self,
        file: &SourceFile,
        class_name: Name,
        name: Name,
        kind: MemberKind,
        offset: u32,
    ) -> MemberDecl {
        MemberDecl {
            name,
            class_name,
            kind,
            file: file.id,
            offset,
            is_std_lib: file.is_std_lib,
            authoritative: false,
        }
    }

    fn collect_members(&self, file: &SourceFile, id: NodeId) {
        let program = self.program;
        let Some(kind) = program.kind(id) else {
            return;
        };
        let offset = program.offset(id);
        if let Some(doc) = program.doc(id) {
            self.collect_doc_fields(file, doc, offset);
        }
        match kind {
            NodeKind::ClassMethodDef { prefix, name, .. } => {
                let Some(class_name) = self.prefix_class_name(*prefix) else {
                    return;
                };
                let mut decl = self.member(
                    file,
                    class_name.clone(),
                    name.clone(),
                    MemberKind::Method(id),
                    offset,
                );
                decl.authoritative = self.is_tagged_prefix(*prefix, &class_name);
                self.index.add_member(decl);
            }
            NodeKind::FuncDef { name, .. } => {
                self.index.add_member(self.member(
                    file,
                    Name::from(WORD_G),
                    name.clone(),
                    MemberKind::FuncDef(id),
                    offset,
                ));
            }
            NodeKind::Assign { targets, values } => {
                for &target in targets {
                    self.collect_assign_target(file, target);
                }
                self.collect_tagged_table(file, id, values);
            }
            NodeKind::LocalDef { values, .. } => self.collect_tagged_table(file, id, values),
            _ => {}
        }
    }

    fn collect_doc_fields(&self, file: &SourceFile, doc: &DocComment, offset: u32) {
        let Some(class) = &doc.class else {
            return;
        };
        for field in &doc.fields {
            self.index.add_member(self.member(
                file,
                class.name.clone(),
                field.name.clone(),
                MemberKind::DocField(field.ty.clone()),
                offset,
            ));
        }
    }

    fn collect_assign_target(&self, file: &SourceFile, target: NodeId) {
        let program = self.program;
        match program.kind(target) {
            Some(NodeKind::Index {
                prefix,
                key: IndexKey::Dot(name),
            }) => {
                if let Some(class_name) = self.prefix_class_name(*prefix) {
                    self.index.add_member(self.member(
                        file,
                        class_name,
                        name.clone(),
                        MemberKind::Assign(target),
                        program.offset(target),
                    ));
                }
            }
            Some(NodeKind::Name { name }) if self.scopes.resolve_local(name, target).is_none() => {
                self.index.add_member(self.member(
                    file,
                    Name::from(WORD_G),
                    name.clone(),
                    MemberKind::GlobalAssign(target),
                    program.offset(target),
                ));
            }
            _ => {}
        }
    }

    /// Fields of a table literal initializing a `---@class` variable are
    /// members of that class.
    fn collect_tagged_table(&self, file: &SourceFile, stmt: NodeId, values: &[NodeId]) {
        let program = self.program;
        let Some(class) = program.doc(stmt).and_then(|doc| doc.class.as_ref()) else {
            return;
        };
        let Some(NodeKind::Table { fields }) = values.first().and_then(|&v| program.kind(v)) else {
            return;
        };
        for &field in fields {
            if let Some(NodeKind::TableField {
                key: FieldKey::Name(name),
                ..
            }) = program.kind(field)
            {
                self.index.add_member(self.member(
                    file,
                    class.name.clone(),
                    name.clone(),
                    MemberKind::TableField(field),
                    program.offset(field),
                ));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Prefix classes
    // -------------------------------------------------------------------------

    /// Class that members declared on `prefix` belong to.
    fn prefix_class_name(&self, prefix: NodeId) -> Option<Name> {
        let program = self.program;
        let NodeKind::Name { name } = program.kind(prefix)? else {
            return None;
        };
        if let Some(def) = self.scopes.resolve_local(name, prefix) {
            return Some(self.local_class_name(def));
        }
        if &**name == WORD_SELF {
            let method = program.enclosing_method(prefix)?;
            let receiver = self.scopes.resolve_self(method)?;
            return self.prefix_class_name(receiver);
        }
        if let Some(class) = self.global_classes.get(name) {
            return Some(class.clone());
        }
        Some(Name::from(global_type_name(name)))
    }

    fn local_class_name(&self, def: NodeId) -> Name {
        let program = self.program;
        let path = program.file_of(def).map_or("", |file| file.path.as_str());
        if let Some(stmt) = program.parent(def) {
            if let Some(NodeKind::LocalDef { names, values }) = program.kind(stmt) {
                let position = names.iter().position(|&n| n == def).unwrap_or(0);
                if position == 0 {
                    if let Some(class) = program.doc(stmt).and_then(|doc| doc.class.as_ref()) {
                        return class.name.clone();
                    }
                }
                if let Some(&value) = values.get(position) {
                    if matches!(program.kind(value), Some(NodeKind::Table { .. })) {
                        return Name::from(table_type_name(path, program.offset(value)));
                    }
                }
            }
        }
        Name::from(anonymous_type_name(path, program.offset(def)))
    }

    /// `prefix` names a variable whose own `---@class` tag declares
    /// `class_name`.
    fn is_tagged_prefix(&self, prefix: NodeId, class_name: &str) -> bool {
        let program = self.program;
        let Some(NodeKind::Name { name }) = program.kind(prefix) else {
            return false;
        };
        if let Some(def) = self.scopes.resolve_local(name, prefix) {
            return program
                .parent(def)
                .and_then(|stmt| program.doc(stmt))
                .and_then(|doc| doc.class.as_ref())
                .is_some_and(|class| &*class.name == class_name);
        }
        self.global_classes
            .get(name)
            .is_some_and(|class| &**class == class_name)
    }
}

#[cfg(test)]
#[path = "../tests/index_tests.rs"]
mod tests;
