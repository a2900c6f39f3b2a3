//! Serializable mirrors of type values, for caching across runs.
//!
//! Classes round-trip their name, generic names, variable name, superclass
//! names, alias name and flags. Table-literal origins are not persisted; a
//! recovered table class keeps its name and flags and resolves members by
//! name like any other class.

use crate::class::{ClassDetails, ClassFlags, ClassOrigin, ClassTy, DocTableField};
use crate::types::{FunctionTy, GenericTy, ParamInfo, PrimitiveKind, Signature, Ty, TypeParamInfo};
use crate::union::UnionBuilder;
use emmy_common::Name;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStub {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_names: Vec<String>,
    pub var_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub super_class_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_name: Option<String>,
    #[serde(default)]
    pub flags: u8,
}

impl ClassStub {
    /// Stub for `class`. Details that were never resolved are written empty.
    pub fn from_class(class: &ClassTy) -> Self {
        let details = class.resolved_details().cloned().unwrap_or_default();
        Self {
            class_name: class.name().to_string(),
            generic_names: details.generic_names.iter().map(|n| n.to_string()).collect(),
            var_name: class.var_name().to_string(),
            super_class_names: details
                .super_class_names
                .iter()
                .map(|n| n.to_string())
                .collect(),
            alias_name: details.alias_name.as_deref().map(str::to_string),
            flags: class.flags().bits(),
        }
    }

    pub fn to_class(&self) -> ClassTy {
        let details = ClassDetails {
            generic_names: self.generic_names.iter().map(|n| Name::from(n.as_str())).collect(),
            super_class_names: self
                .super_class_names
                .iter()
                .map(|n| Name::from(n.as_str()))
                .collect(),
            alias_name: self.alias_name.as_deref().map(Name::from),
        };
        let flags = ClassFlags::from_bits_truncate(self.flags);
        let has_details = !details.generic_names.is_empty()
            || !details.super_class_names.is_empty()
            || details.alias_name.is_some();
        // A stub without details may describe a class whose declaration is
        // indexed later, so it stays lazy.
        let preset = (has_details || !flags.is_empty()).then_some(details);
        ClassTy::serialized(&self.class_name, &self.var_name, flags, preset)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRepr {
    pub name: String,
    pub ty: TyRepr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeParamRepr {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_class: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRepr {
    #[serde(default)]
    pub colon_call: bool,
    pub params: Vec<ParamRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vararg: Option<TyRepr>,
    pub ret: TyRepr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParamRepr>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocFieldRepr {
    pub name: String,
    pub ty: TyRepr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TyRepr {
    Unknown,
    Invalid,
    Primitive { name: String },
    Class(ClassStub),
    DocTable {
        class_name: String,
        fields: Vec<DocFieldRepr>,
    },
    Union { members: Vec<TyRepr> },
    Generic { base: Box<TyRepr>, args: Vec<TyRepr> },
    Function {
        main: Box<SignatureRepr>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        overloads: Vec<SignatureRepr>,
    },
    Array { element: Box<TyRepr> },
    Tuple { items: Vec<TyRepr> },
}

impl From<&Ty> for TyRepr {
    fn from(ty: &Ty) -> Self {
        match ty {
            Ty::Unknown => TyRepr::Unknown,
            Ty::Invalid => TyRepr::Invalid,
            Ty::Primitive(kind) => TyRepr::Primitive {
                name: kind.as_str().to_string(),
            },
            Ty::Class(class) => match class.origin() {
                ClassOrigin::DocTable { fields } => TyRepr::DocTable {
                    class_name: class.name().to_string(),
                    fields: fields
                        .iter()
                        .map(|field| DocFieldRepr {
                            name: field.name.to_string(),
                            ty: TyRepr::from(&field.ty),
                        })
                        .collect(),
                },
                _ => TyRepr::Class(ClassStub::from_class(class)),
            },
            Ty::Union(union) => TyRepr::Union {
                members: union.members().iter().map(TyRepr::from).collect(),
            },
            Ty::Generic(generic) => TyRepr::Generic {
                base: Box::new(TyRepr::from(&generic.base)),
                args: generic.args.iter().map(TyRepr::from).collect(),
            },
            Ty::Function(func) => TyRepr::Function {
                main: Box::new(SignatureRepr::from(&func.main)),
                overloads: func.overloads.iter().map(SignatureRepr::from).collect(),
            },
            Ty::Array(element) => TyRepr::Array {
                element: Box::new(TyRepr::from(&**element)),
            },
            Ty::Tuple(items) => TyRepr::Tuple {
                items: items.iter().map(TyRepr::from).collect(),
            },
        }
    }
}

impl From<&Signature> for SignatureRepr {
    fn from(sig: &Signature) -> Self {
        Self {
            colon_call: sig.colon_call,
            params: sig
                .params
                .iter()
                .map(|p| ParamRepr {
                    name: p.name.to_string(),
                    ty: TyRepr::from(&p.ty),
                })
                .collect(),
            vararg: sig.vararg.as_ref().map(TyRepr::from),
            ret: TyRepr::from(&sig.ret),
            type_params: sig
                .type_params
                .iter()
                .map(|tp| TypeParamRepr {
                    name: tp.name.to_string(),
                    super_class: tp.super_class.as_deref().map(str::to_string),
                })
                .collect(),
        }
    }
}

impl TyRepr {
    pub fn to_ty(&self) -> Ty {
        match self {
            TyRepr::Unknown => Ty::Unknown,
            TyRepr::Invalid => Ty::Invalid,
            TyRepr::Primitive { name } => PrimitiveKind::from_name(name)
                .map(Ty::Primitive)
                .unwrap_or(Ty::Unknown),
            TyRepr::Class(stub) => Ty::Class(Arc::new(stub.to_class())),
            TyRepr::DocTable { class_name, fields } => {
                let fields = fields
                    .iter()
                    .map(|f| DocTableField {
                        name: Name::from(f.name.as_str()),
                        ty: f.ty.to_ty(),
                    })
                    .collect::<Vec<_>>();
                Ty::Class(Arc::new(ClassTy::doc_table_named(class_name, fields)))
            }
            TyRepr::Union { members } => {
                let mut builder = UnionBuilder::new();
                for member in members {
                    builder.add(&member.to_ty());
                }
                builder.build()
            }
            TyRepr::Generic { base, args } => Ty::Generic(Arc::new(GenericTy {
                base: base.to_ty(),
                args: args.iter().map(TyRepr::to_ty).collect(),
            })),
            TyRepr::Function { main, overloads } => Ty::Function(Arc::new(FunctionTy {
                main: main.to_signature(),
                overloads: overloads.iter().map(SignatureRepr::to_signature).collect(),
            })),
            TyRepr::Array { element } => Ty::array(element.to_ty()),
            TyRepr::Tuple { items } => {
                Ty::tuple(items.iter().map(TyRepr::to_ty).collect::<Vec<_>>())
            }
        }
    }
}

impl SignatureRepr {
    pub fn to_signature(&self) -> Signature {
        Signature {
            colon_call: self.colon_call,
            params: self
                .params
                .iter()
                .map(|p| ParamInfo::new(&p.name, p.ty.to_ty()))
                .collect(),
            vararg: self.vararg.as_ref().map(TyRepr::to_ty),
            ret: self.ret.to_ty(),
            type_params: self
                .type_params
                .iter()
                .map(|tp| match &tp.super_class {
                    Some(bound) => TypeParamInfo::bounded(&tp.name, bound),
                    None => TypeParamInfo::new(&tp.name),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/serialize_tests.rs"]
mod tests;
