//! Class registry adapter: the query surface over indexed declarations.
//!
//! The engine never scans files for declarations. It asks a
//! [`ClassRegistry`] for classes, aliases and members by name. The
//! in-memory implementation lives in [`crate::index`].

use emmy_common::{FileId, Name, NodeId};
use emmy_solver::class::ClassResolver;
use emmy_solver::member_chain::{
    ChainMember, WORTH_ASSIGN, WORTH_DOC_FIELD, WORTH_METHOD, WORTH_TABLE_FIELD,
};
use emmy_solver::{ClassDetails, Ty};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};

/// A `---@class` declaration.
#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: Name,
    pub file: FileId,
    /// The statement carrying the tag.
    pub node: NodeId,
    pub is_std_lib: bool,
    pub details: ClassDetails,
}

/// A `---@alias` declaration.
#[derive(Clone, Debug)]
pub struct AliasDecl {
    pub name: Name,
    pub file: FileId,
    pub ty: Ty,
}

/// Syntactic origin of a member declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// `function A:m()` / `function A.m()`, the `ClassMethodDef` node.
    Method(NodeId),
    /// Global `function f()`, a member of `_G`.
    FuncDef(NodeId),
    /// `---@field name Type`
    DocField(Ty),
    /// Field of an inline doc table type.
    DocTableField(Ty),
    /// `{ name = value }`, the `TableField` node.
    TableField(NodeId),
    /// `a.name = value`, the `Index` target.
    Assign(NodeId),
    /// `name = value` at global scope, the `Name` target.
    GlobalAssign(NodeId),
}

#[derive(Clone, Debug)]
pub struct MemberDecl {
    pub name: Name,
    pub class_name: Name,
    pub kind: MemberKind,
    pub file: FileId,
    pub offset: u32,
    pub is_std_lib: bool,
    /// Declared on the `---@class` local of this exact class.
    pub authoritative: bool,
}

impl MemberDecl {
    /// Doc fields, methods and authoritative declarations define a class;
    /// plain assignments and table fields only extend it.
    pub fn is_defining(&self) -> bool {
        self.authoritative || matches!(self.kind, MemberKind::DocField(_) | MemberKind::Method(_))
    }
}

impl ChainMember for MemberDecl {
    fn name(&self) -> &Name {
        &self.name
    }

    fn worth(&self) -> u8 {
        match self.kind {
            MemberKind::Method(_) | MemberKind::FuncDef(_) => WORTH_METHOD,
            MemberKind::DocField(_) | MemberKind::DocTableField(_) => WORTH_DOC_FIELD,
            MemberKind::TableField(_) => WORTH_TABLE_FIELD,
            MemberKind::Assign(_) | MemberKind::GlobalAssign(_) => WORTH_ASSIGN,
        }
    }

    fn source(&self) -> (FileId, u32) {
        (self.file, self.offset)
    }
}

/// What a member scan visits.
#[derive(Copy, Clone, Debug)]
pub enum MemberQuery<'a> {
    /// Declarations of `member` on `class`; with `deep`, also on the class's
    /// alias names and transitive superclasses.
    Exact {
        class: &'a str,
        member: &'a str,
        deep: bool,
    },
    /// Every member of `class`, regardless of declaring file. Standard
    /// library definitions come first, then project definitions, then plain
    /// extensions from either scope.
    Wildcard { class: &'a str },
}

/// Read-only class and member lookup.
///
/// An implementation that is not ready answers every query with nothing.
pub trait ClassRegistry: Send + Sync {
    fn is_ready(&self) -> bool {
        true
    }

    fn find_class(&self, name: &str) -> Option<ClassDecl>;

    fn find_alias(&self, name: &str) -> Option<AliasDecl>;

    /// Every member of `class_name`, ordered like a wildcard scan.
    fn class_members(&self, class_name: &str) -> Vec<MemberDecl> {
        let mut members = Vec::new();
        let _ = self.process_members(MemberQuery::Wildcard { class: class_name }, &mut |member| {
            members.push(member.clone());
            ControlFlow::Continue(())
        });
        members
    }

    /// Visit matching members until the visitor breaks.
    fn process_members(
        &self,
        query: MemberQuery<'_>,
        visitor: &mut dyn FnMut(&MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()>;
}

/// Resolves lazy class details through a registry.
pub struct RegistryResolver<'r> {
    registry: &'r dyn ClassRegistry,
    cancel: Option<&'r AtomicBool>,
}

impl<'r> RegistryResolver<'r> {
    pub fn new(registry: &'r dyn ClassRegistry) -> Self {
        Self {
            registry,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<&'r AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }
}

impl ClassResolver for RegistryResolver<'_> {
    fn class_details(&self, name: &str) -> Option<ClassDetails> {
        self.registry.find_class(name).map(|decl| decl.details)
    }

    fn alias_target(&self, name: &str) -> Option<Ty> {
        self.registry.find_alias(name).map(|decl| decl.ty)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
    fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }
}
