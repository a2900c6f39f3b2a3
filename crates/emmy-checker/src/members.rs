//! Member chains and field type guessing.
//!
//! A class's member chain links its own members to the chains of its
//! superclasses. Chains are built once per class per request and shared
//! through the context memo. Building walks superclasses with a visited set
//! and a depth budget, so inheritance cycles end the walk instead of
//! recursing.

use crate::context::InferContext;
use crate::registry::{MemberDecl, MemberKind, MemberQuery};
use crate::syntax::{FieldKey, NodeKind};
use emmy_common::words::WORD_G;
use emmy_common::{FileId, Name};
use emmy_solver::{ClassOrigin, ClassTy, MemberChain, Ty};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::trace;

/// What a member access will be used as.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectType {
    /// `a.b(...)`: only function-valued members.
    OnlyMethod,
    /// `a.b.c`: the member must hold fields.
    OnlyField,
    Both,
}

impl<'a> InferContext<'a> {
    /// Member chain of `class`, memoized for the rest of the request.
    pub fn member_chain(&mut self, class: &Arc<ClassTy>) -> Arc<MemberChain<MemberDecl>> {
        if let Some(chain) = self.chains.get(class.name()) {
            return chain.clone();
        }
        let mut visited = FxHashSet::default();
        let chain = Arc::new(self.build_chain(class, &mut visited));
        self.chains.insert(class.name().clone(), chain.clone());
        chain
    }

    fn build_chain(
        &mut self,
        class: &Arc<ClassTy>,
        visited: &mut FxHashSet<Name>,
    ) -> MemberChain<MemberDecl> {
        visited.insert(class.name().clone());
        if !self.chain_depth.enter() {
            trace!(class = %class.name(), "member chain too deep");
            return MemberChain::new(class.clone(), Vec::new());
        }

        let super_ty = class.super_class(&self.resolver());
        let mut supers = Vec::new();
        if let Some(super_ty) = super_ty {
            for super_class in super_ty.each().filter_map(Ty::as_class) {
                if self.is_cancelled() {
                    break;
                }
                if visited.contains(super_class.name()) {
                    trace!(class = %class.name(), super_class = %super_class.name(), "cycle");
                    continue;
                }
                supers.push(self.build_chain(super_class, visited));
            }
        }

        let mut chain = MemberChain::new(class.clone(), supers);
        self.add_origin_members(class, &mut chain);
        for decl in self.registry.class_members(class.name()) {
            let authoritative = decl.authoritative;
            chain.add(decl, authoritative);
        }
        let aliases =
            class.alias_names(&self.resolver(), self.settings.recognize_global_name_as_type);
        for alias in aliases {
            for decl in self.registry.class_members(&alias) {
                chain.add(decl, false);
            }
        }

        self.chain_depth.leave();
        chain
    }

    /// Members carried by the class type itself: the fields of a table
    /// literal or of an inline doc table.
    fn add_origin_members(&self, class: &ClassTy, chain: &mut MemberChain<MemberDecl>) {
        let program = self.program;
        match class.origin() {
            ClassOrigin::Table { file, node, .. } => {
                let Some(NodeKind::Table { fields }) = program.kind(*node) else {
                    return;
                };
                let is_std_lib = program.file(*file).is_some_and(|source| source.is_std_lib);
                for &field in fields {
                    if let Some(NodeKind::TableField {
                        key: FieldKey::Name(name),
                        ..
                    }) = program.kind(field)
                    {
                        let decl = MemberDecl {
                            name: name.clone(),
                            class_name: class.name().clone(),
                            kind: MemberKind::TableField(field),
                            file: *file,
                            offset: program.offset(field),
                            is_std_lib,
                            authoritative: false,
                        };
                        chain.add(decl, false);
                    }
                }
            }
            ClassOrigin::DocTable { fields } => {
                for (position, field) in fields.iter().enumerate() {
                    let decl = MemberDecl {
                        name: field.name.clone(),
                        class_name: class.name().clone(),
                        kind: MemberKind::DocTableField(field.ty.clone()),
                        file: FileId(u32::MAX),
                        offset: u32::try_from(position).unwrap_or(u32::MAX),
                        is_std_lib: false,
                        authoritative: false,
                    };
                    chain.add(decl, false);
                }
            }
            ClassOrigin::Named => {}
        }
    }

    /// Winning declaration of `name` on `class` or its superclasses.
    pub fn find_member(&mut self, class: &Arc<ClassTy>, name: &str) -> Option<MemberDecl> {
        self.member_chain(class).find_member(name).cloned()
    }

    /// Winning declaration of `name` inherited by `class`, ignoring its own.
    pub fn find_super_member(&mut self, class: &Arc<ClassTy>, name: &str) -> Option<MemberDecl> {
        self.member_chain(class).find_super_member(name).cloned()
    }

    /// Visit the winning member of each name, own members first. With
    /// `deep`, inherited members that are not overridden follow.
    pub fn process_members(
        &mut self,
        class: &Arc<ClassTy>,
        deep: bool,
        visitor: &mut dyn FnMut(&Arc<ClassTy>, &MemberDecl) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        self.member_chain(class).for_each(deep, visitor)
    }

    /// Type of member `name` on `class`, given how the access is used.
    pub fn guess_field_type(
        &mut self,
        name: &Name,
        class: &Arc<ClassTy>,
        select: SelectType,
    ) -> Ty {
        if &**class.name() == WORD_G {
            return self.global_type(name);
        }
        let Some(winner) = self.find_member(class, name) else {
            return Ty::Unknown;
        };

        // The winner's class may hold further declarations of the same name.
        let mut candidates: SmallVec<[MemberDecl; 4]> = SmallVec::new();
        let mut seen = FxHashSet::default();
        seen.insert((winner.file, winner.offset));
        let owner = winner.class_name.clone();
        candidates.push(winner);
        let _ = self.registry.process_members(
            MemberQuery::Exact {
                class: &owner,
                member: name,
                deep: false,
            },
            &mut |decl| {
                if seen.insert((decl.file, decl.offset)) {
                    candidates.push(decl.clone());
                }
                ControlFlow::Continue(())
            },
        );

        let mut ty = Ty::Unknown;
        for decl in &candidates {
            if self.is_cancelled() {
                break;
            }
            match &decl.kind {
                MemberKind::Method(_) | MemberKind::FuncDef(_) => {
                    if select != SelectType::OnlyField {
                        ty = ty.union(&self.member_type(decl));
                    }
                    if select == SelectType::OnlyMethod && !ty.is_invalid() {
                        break;
                    }
                }
                MemberKind::DocField(_) => {
                    let field = self.member_type(decl);
                    if select == SelectType::OnlyMethod {
                        if field.each().any(|member| matches!(member, Ty::Function(_))) {
                            ty = ty.union(&field);
                            break;
                        }
                    } else {
                        ty = ty.union(&field);
                    }
                    if select == SelectType::OnlyField && !ty.is_invalid() {
                        break;
                    }
                }
                MemberKind::DocTableField(_) | MemberKind::TableField(_) => {
                    ty = ty.union(&self.member_type(decl));
                    if !ty.is_invalid() {
                        break;
                    }
                }
                MemberKind::Assign(_) | MemberKind::GlobalAssign(_) => {
                    ty = ty.union(&self.member_type(decl));
                }
            }
        }
        ty
    }
}

#[cfg(test)]
#[path = "../tests/members_tests.rs"]
mod tests;
