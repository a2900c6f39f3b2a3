//! Type algebra and substitution engine
//!
//! This crate holds everything about types that does not need a syntax tree:
//!
//! - **Type values**: `Ty` with primitive, class, union, generic, function,
//!   array and tuple variants, plus union construction, display and the
//!   subtype relation
//! - **Classes**: name-keyed class types whose superclass, generic and alias
//!   details are resolved once, on first use, through a `ClassResolver`
//! - **Substitution**: generic-parameter, alias and `self` substitutors and
//!   call-site generic argument inference
//! - **Member chains**: per-class member tables with override precedence
//!
//! Recursion in every walk is bounded by the guards in [`recursion`].
pub mod class;
mod format;
pub mod generic_analyzer;
pub mod instantiate;
pub mod member_chain;
pub mod recursion;
pub mod relation;
pub mod serialize;
pub mod types;
mod union;

pub use class::{ClassDetails, ClassFlags, ClassOrigin, ClassResolver, ClassTy, DocTableField};
pub use generic_analyzer::{GenericAnalyzer, build_generic_substitutor};
pub use instantiate::{AliasSubstitutor, GenericSubstitutor, SelfSubstitutor, Substitutor};
pub use member_chain::{ChainMember, MemberChain};
pub use recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
pub use relation::is_subtype_of;
pub use serialize::{ClassStub, TyRepr};
pub use types::{
    FunctionTy, GenericTy, ParamInfo, PrimitiveKind, Signature, Ty, TypeParamInfo, UnionTy,
};
pub use union::UnionBuilder;

#[cfg(test)]
#[path = "../tests/concurrency_tests.rs"]
mod concurrency_tests;
