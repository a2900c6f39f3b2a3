//! Generic argument inference from call sites.
//!
//! [`GenericAnalyzer`] walks a formal parameter type in lock-step with the
//! actual argument type. A class node named like a declared type parameter
//! binds (unions into) that parameter; arrays, generics and function
//! returns are descended pairwise; a structural mismatch binds nothing.

use crate::instantiate::GenericSubstitutor;
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::types::{Signature, Ty};
use emmy_common::Name;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

pub struct GenericAnalyzer {
    bindings: IndexMap<Name, Ty, FxBuildHasher>,
    depth: DepthCounter,
}

impl GenericAnalyzer {
    /// An analyzer that binds only the type parameters of `sig`.
    pub fn for_signature(sig: &Signature) -> Self {
        let mut bindings = IndexMap::default();
        for param in &sig.type_params {
            bindings.insert(param.name.clone(), Ty::Unknown);
        }
        Self {
            bindings,
            depth: DepthCounter::with_profile(RecursionProfile::Substitution),
        }
    }

    /// Unify one actual argument type against its formal type.
    pub fn analyze(&mut self, actual: &Ty, formal: &Ty) {
        if actual.is_invalid() || !self.depth.enter() {
            return;
        }
        self.visit(actual, formal);
        self.depth.leave();
    }

    fn visit(&mut self, actual: &Ty, formal: &Ty) {
        match formal {
            Ty::Class(class) => {
                if let Some(bound) = self.bindings.get_mut(&**class.name()) {
                    *bound = bound.union(actual);
                }
            }
            Ty::Union(union) => {
                for member in union.members() {
                    self.analyze(actual, member);
                }
            }
            Ty::Array(formal_element) => {
                for candidate in actual.each() {
                    if let Ty::Array(actual_element) = candidate {
                        self.analyze(actual_element, formal_element);
                    }
                }
            }
            Ty::Generic(formal_generic) => {
                for candidate in actual.each() {
                    if let Ty::Generic(actual_generic) = candidate {
                        self.analyze(&actual_generic.base, &formal_generic.base);
                        for (index, arg) in actual_generic.args.iter().enumerate() {
                            self.analyze(arg, &formal_generic.arg(index));
                        }
                    }
                }
            }
            Ty::Function(formal_fn) => {
                for candidate in actual.each() {
                    if let Ty::Function(actual_fn) = candidate {
                        self.analyze(&actual_fn.main.ret, &formal_fn.main.ret);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Ty> {
        self.bindings.get(name)
    }

    /// Finish: parameters left unbound default to their declared bound.
    pub fn into_substitutor(mut self, sig: &Signature) -> GenericSubstitutor {
        for param in &sig.type_params {
            let Some(bound) = &param.super_class else {
                continue;
            };
            if let Some(slot) = self.bindings.get_mut(&*param.name) {
                if slot.is_invalid() {
                    *slot = Ty::class(bound);
                }
            }
        }
        self.bindings.retain(|_, ty| !ty.is_invalid());
        GenericSubstitutor::from_bindings(std::mem::take(&mut self.bindings))
    }
}

/// Bind the type parameters of `sig` from call-site argument types.
///
/// `args` must already include the receiver when the call is a colon call.
/// For a colon-declared signature the receiver occupies an implicit first
/// slot that binds nothing. Fixed formals pair positionally; the vararg
/// formal pairs with every remaining argument. `None` for non-generic
/// signatures.
pub fn build_generic_substitutor(sig: &Signature, args: &[Ty]) -> Option<GenericSubstitutor> {
    if !sig.is_generic() {
        return None;
    }
    let mut analyzer = GenericAnalyzer::for_signature(sig);
    let receiver_slots = usize::from(sig.colon_call);
    let fixed = receiver_slots + sig.params.len();
    for (param, actual) in sig.params.iter().zip(args.iter().skip(receiver_slots)) {
        analyzer.analyze(actual, &param.ty);
    }
    if let Some(vararg) = &sig.vararg {
        for actual in args.iter().skip(fixed) {
            analyzer.analyze(actual, vararg);
        }
    }
    Some(analyzer.into_substitutor(sig))
}

#[cfg(test)]
#[path = "../tests/generic_analyzer_tests.rs"]
mod tests;
