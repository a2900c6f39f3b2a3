//! Function types of function-like nodes.

use crate::context::InferContext;
use crate::syntax::NodeKind;
use emmy_common::NodeId;
use emmy_solver::{FunctionTy, ParamInfo, Signature, Ty};
use smallvec::SmallVec;
use std::sync::Arc;

impl<'a> InferContext<'a> {
    /// Signature of a function declaration, method or closure. Documented
    /// parameter and return types win; undocumented returns are inferred
    /// from the body's `return` statements.
    pub fn function_type(&mut self, func: NodeId) -> Ty {
        let program = self.program;
        let Some(kind) = program.kind(func) else {
            return Ty::Unknown;
        };
        let Some(body) = kind.func_body() else {
            return Ty::Unknown;
        };
        let colon_call = matches!(kind, NodeKind::ClassMethodDef { colon: true, .. });
        let doc = program.function_doc(func);

        let params = body
            .params
            .iter()
            .filter_map(|&param| match program.kind(param) {
                Some(NodeKind::NameDef { name }) => Some(name),
                _ => None,
            })
            .map(|name| {
                let ty = doc
                    .and_then(|doc| doc.param_ty(name))
                    .map_or(Ty::Unknown, |ty| self.expand_doc_ty(ty));
                ParamInfo::new(name, ty)
            })
            .collect();
        let vararg = body.vararg.then(|| {
            doc.and_then(|doc| doc.vararg.as_ref())
                .map_or(Ty::Unknown, |ty| self.expand_doc_ty(ty))
        });

        let documented: &[Ty] = doc.map_or(&[], |doc| doc.returns.as_slice());
        let ret = match documented {
            [] => self.infer_body_returns(body.block),
            [single] => self.expand_doc_ty(single),
            many => Ty::tuple(many.iter().map(|ty| self.expand_doc_ty(ty))),
        };

        let main = Signature {
            colon_call,
            params,
            vararg,
            ret,
            type_params: doc.map(|doc| doc.generics.clone()).unwrap_or_default(),
        };
        let overloads = doc.map(|doc| doc.overloads.clone()).unwrap_or_default();
        Ty::Function(Arc::new(FunctionTy { main, overloads }))
    }

    /// Union of every `return` in `block`, nested functions excluded.
    /// A body without any value-returning `return` is `void`.
    fn infer_body_returns(&mut self, block: NodeId) -> Ty {
        let program = self.program;
        let mut returns: SmallVec<[NodeId; 4]> = SmallVec::new();
        let mut stack = vec![block];
        while let Some(id) = stack.pop() {
            let Some(kind) = program.kind(id) else {
                continue;
            };
            if kind.func_body().is_some() {
                continue;
            }
            match kind {
                NodeKind::Return { values } if !values.is_empty() => returns.push(id),
                _ => stack.extend(kind.children()),
            }
        }

        let mut ty = Ty::Unknown;
        let mut any = false;
        for stmt in returns {
            if self.is_cancelled() {
                break;
            }
            let Some(NodeKind::Return { values }) = program.kind(stmt) else {
                continue;
            };
            any = true;
            let returned = match values.as_slice() {
                [single] => self.infer_tuple(*single),
                many => Ty::tuple(many.iter().map(|&value| self.infer(value)).collect::<Vec<_>>()),
            };
            ty = ty.union(&returned);
        }
        if any { ty } else { Ty::VOID }
    }
}

#[cfg(test)]
#[path = "../tests/functions_tests.rs"]
mod tests;
