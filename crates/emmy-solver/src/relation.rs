//! Subtype relation.
//!
//! `Unknown` on either side is compatible, and the universal table accepts
//! every class and table. An empty table literal is accepted as an array.

use crate::class::{ClassOrigin, ClassResolver, ClassTy, walk_super_classes};
use crate::types::Ty;
use std::ops::ControlFlow;

/// `a <: b`.
pub fn is_subtype_of(a: &Ty, b: &Ty, resolver: &dyn ClassResolver) -> bool {
    if a == b || a.is_invalid() || b.is_invalid() {
        return true;
    }
    match (a, b) {
        (Ty::Union(union), _) => union
            .members()
            .iter()
            .all(|member| is_subtype_of(member, b, resolver)),
        (_, Ty::Union(union)) => union
            .members()
            .iter()
            .any(|member| is_subtype_of(a, member, resolver)),
        (Ty::Generic(generic), _) => is_subtype_of(&generic.base, b, resolver),
        (Ty::Class(_) | Ty::Array(_), Ty::Class(target)) if target.is_universal_table() => true,
        (Ty::Class(class), Ty::Array(_)) => {
            matches!(class.origin(), ClassOrigin::Table { field_count: 0, .. })
        }
        (Ty::Class(class), Ty::Generic(generic)) => is_subtype_of(
            &Ty::Class(class.clone()),
            &generic.base,
            resolver,
        ),
        (Ty::Class(class), Ty::Class(target)) => inherits_from(class, target, resolver),
        (Ty::Array(x), Ty::Array(y)) => is_subtype_of(x, y, resolver),
        (Ty::Function(_), Ty::Function(_)) => true,
        _ => false,
    }
}

fn inherits_from(class: &ClassTy, target: &ClassTy, resolver: &dyn ClassResolver) -> bool {
    let mut found = false;
    let _ = walk_super_classes(class, resolver, &mut |sup| {
        if **sup == *target {
            found = true;
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    found
}

#[cfg(test)]
#[path = "../tests/relation_tests.rs"]
mod tests;
