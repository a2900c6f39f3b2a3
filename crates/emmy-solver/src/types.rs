//! Type values.
//!
//! `Ty` is an immutable tagged union, cheap to clone (every compound variant
//! is behind an `Arc`) and compared structurally, except for classes which
//! compare by `className` and flags.
//!
//! ## Variants
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Unknown` / `Invalid` | nothing could be derived; absorbing for union |
//! | `Primitive` | boolean, number, string, nil, void |
//! | `Class` | nominal class, global/anonymous type, or table literal |
//! | `Union` | flattened, deduplicated set of members |
//! | `Generic` | base class applied to type arguments |
//! | `Function` | one or more call signatures |
//! | `Array` | element type |
//! | `Tuple` | multi-value return position only |

use crate::class::ClassTy;
use emmy_common::Name;
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// Primitive
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Number,
    String,
    Nil,
    Void,
}

impl PrimitiveKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Nil => "nil",
            Self::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "nil" => Some(Self::Nil),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

// =============================================================================
// Ty
// =============================================================================

#[derive(Clone, Debug)]
pub enum Ty {
    Unknown,
    Invalid,
    Primitive(PrimitiveKind),
    Class(Arc<ClassTy>),
    Union(UnionTy),
    Generic(Arc<GenericTy>),
    Function(Arc<FunctionTy>),
    Array(Arc<Ty>),
    Tuple(Arc<[Ty]>),
}

impl Ty {
    pub const UNKNOWN: Ty = Ty::Unknown;
    pub const INVALID: Ty = Ty::Invalid;
    pub const BOOLEAN: Ty = Ty::Primitive(PrimitiveKind::Boolean);
    pub const NUMBER: Ty = Ty::Primitive(PrimitiveKind::Number);
    pub const STRING: Ty = Ty::Primitive(PrimitiveKind::String);
    pub const NIL: Ty = Ty::Primitive(PrimitiveKind::Nil);
    pub const VOID: Ty = Ty::Primitive(PrimitiveKind::Void);

    /// A class reference whose details are resolved on first use.
    pub fn class(name: &str) -> Ty {
        Ty::Class(Arc::new(ClassTy::lazy(name)))
    }

    /// The universal table/object type.
    pub fn table() -> Ty {
        Ty::Class(Arc::new(ClassTy::universal_table()))
    }

    pub fn array(element: Ty) -> Ty {
        Ty::Array(Arc::new(element))
    }

    pub fn tuple(items: impl IntoIterator<Item = Ty>) -> Ty {
        Ty::Tuple(items.into_iter().collect())
    }

    pub fn generic(base: Ty, args: impl IntoIterator<Item = Ty>) -> Ty {
        Ty::Generic(Arc::new(GenericTy {
            base,
            args: args.into_iter().collect(),
        }))
    }

    pub fn function(main: Signature) -> Ty {
        Ty::Function(Arc::new(FunctionTy {
            main,
            overloads: Vec::new(),
        }))
    }

    /// "No information derived". `Nil`/`Void` are real types, not sentinels.
    #[inline]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Ty::Unknown | Ty::Invalid)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Primitive(_))
    }

    pub fn as_class(&self) -> Option<&Arc<ClassTy>> {
        match self {
            Ty::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<FunctionTy>> {
        match self {
            Ty::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Iterate union members, or the type itself for non-unions.
    pub fn each(&self) -> impl Iterator<Item = &Ty> {
        let members: &[Ty] = match self {
            Ty::Union(union) => union.members(),
            other => std::slice::from_ref(other),
        };
        members.iter()
    }

    /// Iterate the classes reachable at the top of this type: classes
    /// themselves and the base class of generics.
    pub fn each_top_class(&self) -> impl Iterator<Item = &Arc<ClassTy>> {
        self.each().filter_map(|ty| match ty {
            Ty::Class(class) => Some(class),
            Ty::Generic(generic) => generic.base.as_class(),
            _ => None,
        })
    }

    /// A tuple outside of a multi-value position degrades to the element at
    /// `index`, or its first element.
    pub fn tuple_at(&self, index: usize) -> Ty {
        match self {
            Ty::Tuple(items) => items
                .get(index)
                .or_else(|| items.first())
                .cloned()
                .unwrap_or(Ty::Unknown),
            other => other.clone(),
        }
    }

    fn kind_tag(&self) -> u8 {
        match self {
            Ty::Unknown => 0,
            Ty::Invalid => 1,
            Ty::Primitive(_) => 2,
            Ty::Class(_) => 3,
            Ty::Union(_) => 4,
            Ty::Generic(_) => 5,
            Ty::Function(_) => 6,
            Ty::Array(_) => 7,
            Ty::Tuple(_) => 8,
        }
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ty::Unknown, Ty::Unknown) | (Ty::Invalid, Ty::Invalid) => true,
            (Ty::Primitive(a), Ty::Primitive(b)) => a == b,
            (Ty::Class(a), Ty::Class(b)) => a == b,
            (Ty::Union(a), Ty::Union(b)) => a == b,
            (Ty::Generic(a), Ty::Generic(b)) => a == b,
            (Ty::Function(a), Ty::Function(b)) => a == b,
            (Ty::Array(a), Ty::Array(b)) => a == b,
            (Ty::Tuple(a), Ty::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.kind_tag());
        match self {
            Ty::Unknown | Ty::Invalid => {}
            Ty::Primitive(kind) => kind.hash(state),
            Ty::Class(class) => class.hash(state),
            Ty::Union(union) => union.hash(state),
            Ty::Generic(generic) => generic.hash(state),
            Ty::Function(func) => func.hash(state),
            Ty::Array(element) => element.hash(state),
            Ty::Tuple(items) => items.hash(state),
        }
    }
}

// =============================================================================
// Union
// =============================================================================

/// Members of a union. Never nested, never contains a sentinel, at least two
/// members. Built only through [`crate::union::UnionBuilder`].
#[derive(Clone, Debug)]
pub struct UnionTy {
    members: Arc<[Ty]>,
}

impl UnionTy {
    pub(crate) fn from_members(members: Vec<Ty>) -> Self {
        debug_assert!(members.len() >= 2);
        debug_assert!(members.iter().all(|m| !matches!(m, Ty::Union(_))));
        Self {
            members: members.into(),
        }
    }

    /// Members in insertion order (display order).
    pub fn members(&self) -> &[Ty] {
        &self.members
    }

    pub fn contains(&self, ty: &Ty) -> bool {
        self.members.iter().any(|m| m == ty)
    }
}

/// Set equality: insertion order only matters for display.
impl PartialEq for UnionTy {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().all(|m| other.contains(m))
    }
}

impl Eq for UnionTy {}

/// Order-independent hash, consistent with set equality.
impl Hash for UnionTy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined: u64 = 0;
        for member in self.members.iter() {
            let mut hasher = FxHasher::default();
            member.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        state.write_usize(self.members.len());
        state.write_u64(combined);
    }
}

// =============================================================================
// Generic
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenericTy {
    pub base: Ty,
    pub args: SmallVec<[Ty; 2]>,
}

impl GenericTy {
    /// Type argument at `index`, `Unknown` when absent.
    pub fn arg(&self, index: usize) -> Ty {
        self.args.get(index).cloned().unwrap_or(Ty::Unknown)
    }
}

// =============================================================================
// Function
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: Name,
    pub ty: Ty,
}

impl ParamInfo {
    pub fn new(name: &str, ty: Ty) -> Self {
        Self {
            name: Name::from(name),
            ty,
        }
    }
}

/// A declared type parameter, with an optional upper bound (`T : Base`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParamInfo {
    pub name: Name,
    pub super_class: Option<Name>,
}

impl TypeParamInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: Name::from(name),
            super_class: None,
        }
    }

    pub fn bounded(name: &str, bound: &str) -> Self {
        Self {
            name: Name::from(name),
            super_class: Some(Name::from(bound)),
        }
    }
}

/// One call signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Declared with `:`; the receiver is implicit and not in `params`.
    pub colon_call: bool,
    pub params: SmallVec<[ParamInfo; 4]>,
    pub vararg: Option<Ty>,
    /// Possibly a `Tuple` for multi-value returns.
    pub ret: Ty,
    pub type_params: Vec<TypeParamInfo>,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = ParamInfo>, ret: Ty) -> Self {
        Self {
            colon_call: false,
            params: params.into_iter().collect(),
            vararg: None,
            ret,
            type_params: Vec::new(),
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParamInfo>) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn with_vararg(mut self, vararg: Ty) -> Self {
        self.vararg = Some(vararg);
        self
    }

    pub fn with_colon_call(mut self, colon_call: bool) -> Self {
        self.colon_call = colon_call;
        self
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionTy {
    pub main: Signature,
    pub overloads: Vec<Signature>,
}

impl FunctionTy {
    /// Main signature first, then overloads in declaration order.
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        std::iter::once(&self.main).chain(self.overloads.iter())
    }
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
