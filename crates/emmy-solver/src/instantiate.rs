//! Type substitution.
//!
//! A [`Substitutor`] decides what to do with class and generic nodes; the
//! structural walk in [`substitute`] handles everything else and rebuilds
//! unions (re-unioned after substitution), generics, every signature of a
//! function, arrays and tuples.
//!
//! Three substitutors exist:
//! - [`GenericSubstitutor`]: type-parameter name to bound type
//! - [`AliasSubstitutor`]: class to `alias target | class`, cycle-safe
//! - [`SelfSubstitutor`]: the `self` placeholder to the receiver type

use crate::class::{ClassResolver, ClassTy};
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::types::{FunctionTy, GenericTy, ParamInfo, Signature, Ty};
use crate::union::UnionBuilder;
use emmy_common::Name;
use emmy_common::words::WORD_SELF;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::Arc;
use tracing::trace;

pub trait Substitutor {
    /// Replacement for a class node, or `None` to keep it.
    fn substitute_class(&mut self, class: &Arc<ClassTy>) -> Option<Ty>;

    /// Replacement for a whole generic node, or `None` to rewrite its base
    /// and arguments structurally.
    fn substitute_generic(&mut self, _generic: &Arc<GenericTy>) -> Option<Ty> {
        None
    }
}

impl Ty {
    pub fn substitute(&self, substitutor: &mut dyn Substitutor) -> Ty {
        substitute(self, substitutor)
    }
}

/// Rewrite `ty` with `substitutor`. Nodes the substitutor leaves alone are
/// kept as they are; subtrees deeper than the substitution limit are kept
/// unchanged.
pub fn substitute(ty: &Ty, substitutor: &mut dyn Substitutor) -> Ty {
    let mut depth = DepthCounter::with_profile(RecursionProfile::Substitution);
    let out = walk(ty, substitutor, &mut depth);
    if depth.hit_limit() {
        trace!(ty = %ty, "substitution depth exceeded");
    }
    out
}

fn walk(ty: &Ty, sub: &mut dyn Substitutor, depth: &mut DepthCounter) -> Ty {
    if !depth.enter() {
        return ty.clone();
    }
    let out = match ty {
        Ty::Unknown | Ty::Invalid | Ty::Primitive(_) => ty.clone(),
        Ty::Class(class) => sub.substitute_class(class).unwrap_or_else(|| ty.clone()),
        Ty::Union(union) => {
            let mut builder = UnionBuilder::new();
            for member in union.members() {
                builder.add(&walk(member, sub, depth));
            }
            builder.build()
        }
        Ty::Generic(generic) => match sub.substitute_generic(generic) {
            Some(replaced) => replaced,
            None => Ty::generic(
                walk(&generic.base, sub, depth),
                generic.args.iter().map(|arg| walk(arg, sub, depth)).collect::<Vec<_>>(),
            ),
        },
        Ty::Function(func) => Ty::Function(Arc::new(FunctionTy {
            main: walk_signature(&func.main, sub, depth),
            overloads: func
                .overloads
                .iter()
                .map(|sig| walk_signature(sig, sub, depth))
                .collect(),
        })),
        Ty::Array(element) => Ty::array(walk(element, sub, depth)),
        Ty::Tuple(items) => {
            Ty::tuple(items.iter().map(|item| walk(item, sub, depth)).collect::<Vec<_>>())
        }
    };
    depth.leave();
    out
}

fn walk_signature(
    sig: &Signature,
    sub: &mut dyn Substitutor,
    depth: &mut DepthCounter,
) -> Signature {
    Signature {
        colon_call: sig.colon_call,
        params: sig
            .params
            .iter()
            .map(|param| ParamInfo {
                name: param.name.clone(),
                ty: walk(&param.ty, sub, depth),
            })
            .collect(),
        vararg: sig.vararg.as_ref().map(|vararg| walk(vararg, sub, depth)),
        ret: walk(&sig.ret, sub, depth),
        type_params: sig.type_params.clone(),
    }
}

// =============================================================================
// Generic parameters
// =============================================================================

/// Replaces every class node named like a bound type parameter.
#[derive(Clone, Debug, Default)]
pub struct GenericSubstitutor {
    bindings: IndexMap<Name, Ty, FxBuildHasher>,
}

impl GenericSubstitutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: IndexMap<Name, Ty, FxBuildHasher>) -> Self {
        Self { bindings }
    }

    pub fn bind(&mut self, name: &str, ty: Ty) {
        self.bindings.insert(Name::from(name), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Ty> {
        self.bindings.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

impl Substitutor for GenericSubstitutor {
    fn substitute_class(&mut self, class: &Arc<ClassTy>) -> Option<Ty> {
        self.bindings.get(&**class.name()).cloned()
    }
}

// =============================================================================
// Aliases
// =============================================================================

/// Expands a class into `recovered alias target | class`.
///
/// Each class name is expanded at most once per substitutor, so alias
/// cycles (`A = B`, `B = A`) terminate.
pub struct AliasSubstitutor<'r> {
    resolver: &'r dyn ClassResolver,
    visited: FxHashSet<Name>,
}

impl<'r> AliasSubstitutor<'r> {
    pub fn new(resolver: &'r dyn ClassResolver) -> Self {
        Self {
            resolver,
            visited: FxHashSet::default(),
        }
    }

    /// Substitute `ty` with a fresh alias substitutor.
    pub fn expand(ty: &Ty, resolver: &'r dyn ClassResolver) -> Ty {
        substitute(ty, &mut Self::new(resolver))
    }

    fn recover(&mut self, class: &Arc<ClassTy>) -> Option<Ty> {
        if class.is_global() || class.is_anonymous() || class.is_doc_table() {
            return None;
        }
        let target = self.resolver.alias_target(class.name()).or_else(|| {
            class
                .alias_name(self.resolver)
                .filter(|alias| *alias != class.name())
                .and_then(|alias| self.resolver.alias_target(alias))
        })?;
        trace!(class = %class.name(), target = %target, "alias recovered");
        Some(substitute(&target, self))
    }
}

impl Substitutor for AliasSubstitutor<'_> {
    fn substitute_class(&mut self, class: &Arc<ClassTy>) -> Option<Ty> {
        if !self.visited.insert(class.name().clone()) {
            return None;
        }
        let this = Ty::Class(class.clone());
        Some(match self.recover(class) {
            Some(recovered) => recovered.union(&this),
            None => this,
        })
    }

    fn substitute_generic(&mut self, generic: &Arc<GenericTy>) -> Option<Ty> {
        Some(Ty::Generic(generic.clone()))
    }
}

// =============================================================================
// Self
// =============================================================================

enum SelfSource<'a> {
    Ready(Ty),
    Pending(Box<dyn FnOnce() -> Ty + 'a>),
}

/// Replaces the `self` placeholder class with the receiver type. A pending
/// receiver is computed on the first `self` occurrence only.
pub struct SelfSubstitutor<'a> {
    source: Option<SelfSource<'a>>,
}

impl<'a> SelfSubstitutor<'a> {
    pub fn with_self(self_ty: Ty) -> Self {
        Self {
            source: Some(SelfSource::Ready(self_ty)),
        }
    }

    pub fn lazy(compute: impl FnOnce() -> Ty + 'a) -> Self {
        Self {
            source: Some(SelfSource::Pending(Box::new(compute))),
        }
    }

    fn self_ty(&mut self) -> Ty {
        let ty = match self.source.take() {
            Some(SelfSource::Ready(ty)) => ty,
            Some(SelfSource::Pending(compute)) => compute(),
            None => Ty::Unknown,
        };
        self.source = Some(SelfSource::Ready(ty.clone()));
        ty
    }
}

impl Substitutor for SelfSubstitutor<'_> {
    fn substitute_class(&mut self, class: &Arc<ClassTy>) -> Option<Ty> {
        (&**class.name() == WORD_SELF).then(|| self.self_ty())
    }
}

#[cfg(test)]
#[path = "../tests/instantiate_tests.rs"]
mod tests;
