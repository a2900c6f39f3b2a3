//! Expression inference.
//!
//! [`InferContext::infer`] is total: every node kind maps to a type, and
//! anything that cannot be resolved (missing declarations, cycles, limits,
//! cancellation) degrades to [`Ty::Unknown`].
//!
//! Every node is inferred under an [`InferKey::Node`] guard, so a
//! declaration that refers to itself (`x = x + 1`) sees `Unknown` for the
//! inner reference instead of recursing.

use crate::context::{InferContext, InferKey};
use crate::members::SelectType;
use crate::registry::{MemberDecl, MemberKind, MemberQuery};
use crate::syntax::{BinaryOp, DocComment, IndexKey, LiteralKind, NodeKind, UnaryOp};
use emmy_common::words::{WORD_G, WORD_NIL, WORD_SELF, WORD_STRING};
use emmy_common::{FileId, Name, NodeId};
use emmy_solver::class::anonymous_type_name;
use emmy_solver::{
    AliasSubstitutor, ClassDetails, ClassTy, GenericSubstitutor, GenericTy, PrimitiveKind,
    SelfSubstitutor, Signature, Ty, build_generic_substitutor,
};
use smallvec::SmallVec;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace};

/// Which value of a multi-value expression the caller wants.
#[derive(Copy, Clone, Debug)]
struct ValuePos {
    index: usize,
    keep_tuple: bool,
}

impl ValuePos {
    const FIRST: Self = Self {
        index: 0,
        keep_tuple: false,
    };
}

type Candidates = SmallVec<[(Arc<ClassTy>, Option<Arc<GenericTy>>); 4]>;

impl<'a> InferContext<'a> {
    /// Type of `node`. Multi-value expressions yield their first value.
    pub fn infer(&mut self, node: NodeId) -> Ty {
        self.infer_value(node, ValuePos::FIRST)
    }

    /// Type of the `index`-th value produced by `node`.
    pub fn infer_at(&mut self, node: NodeId, index: usize) -> Ty {
        self.infer_value(
            node,
            ValuePos {
                index,
                keep_tuple: false,
            },
        )
    }

    /// Type of `node`, keeping a multi-value result as a `Tuple`.
    pub fn infer_tuple(&mut self, node: NodeId) -> Ty {
        self.infer_value(
            node,
            ValuePos {
                index: 0,
                keep_tuple: true,
            },
        )
    }

    fn infer_value(&mut self, node: NodeId, pos: ValuePos) -> Ty {
        if self.is_cancelled() {
            return Ty::Unknown;
        }
        self.guarded(InferKey::Node(node), |ctx| ctx.infer_node(node, pos))
    }

    fn infer_node(&mut self, node: NodeId, pos: ValuePos) -> Ty {
        let program = self.program;
        let Some(kind) = program.kind(node) else {
            return Ty::Unknown;
        };
        match kind {
            NodeKind::NameDef { name } => self.infer_name_def(node, name),
            NodeKind::Name { name } => self.infer_name(node, name),
            NodeKind::Index { prefix, key } => self.infer_index(node, *prefix, key),
            NodeKind::Call { callee, args } => self.infer_call(*callee, args, pos),
            NodeKind::Unary { op, .. } => match op {
                UnaryOp::Not => Ty::BOOLEAN,
                UnaryOp::Neg | UnaryOp::Len | UnaryOp::BitNot => Ty::NUMBER,
            },
            NodeKind::Binary { op, lhs, rhs } => self.infer_binary(node, *op, *lhs, *rhs),
            NodeKind::Literal(literal) => match literal {
                LiteralKind::Nil => Ty::NIL,
                LiteralKind::Bool(_) => Ty::BOOLEAN,
                LiteralKind::Number(_) => Ty::NUMBER,
                LiteralKind::String(_) => Ty::STRING,
                LiteralKind::Vararg => self.vararg_ty(node).unwrap_or(Ty::Unknown),
            },
            NodeKind::Table { fields } => self.infer_table(node, fields),
            NodeKind::TableField { value, .. } => {
                match program.doc(node).and_then(|doc| doc.ty.as_ref()) {
                    Some(ty) => self.expand_doc_ty(ty),
                    None => self.infer(*value),
                }
            }
            NodeKind::Paren { expr } => self.infer(*expr),
            NodeKind::Closure { .. }
            | NodeKind::FuncDef { .. }
            | NodeKind::LocalFuncDef { .. }
            | NodeKind::ClassMethodDef { .. } => self.function_type(node),
            _ => Ty::Unknown,
        }
    }

    // =========================================================================
    // Doc types
    // =========================================================================

    /// A doc type with aliases expanded.
    pub(crate) fn expand_doc_ty(&self, ty: &Ty) -> Ty {
        AliasSubstitutor::expand(ty, &self.resolver())
    }

    /// Type declared by a statement's doc comment: its `@class`, else its
    /// `@type`.
    pub(crate) fn doc_declared_ty(&self, doc: &DocComment) -> Option<Ty> {
        if let Some(class) = &doc.class {
            let details = ClassDetails {
                generic_names: class.generics.clone(),
                super_class_names: class.supers.clone(),
                alias_name: class.alias.clone(),
            };
            return Some(Ty::Class(Arc::new(ClassTy::declared(&class.name, details))));
        }
        doc.ty.as_ref().map(|ty| self.expand_doc_ty(ty))
    }

    /// Declared `@vararg` type of the function enclosing `node`.
    pub(crate) fn vararg_ty(&self, node: NodeId) -> Option<Ty> {
        let program = self.program;
        let func = program.enclosing_function(node)?;
        let vararg = program.function_doc(func)?.vararg.as_ref()?;
        Some(self.expand_doc_ty(vararg))
    }

    // =========================================================================
    // Names
    // =========================================================================

    fn infer_name_def(&mut self, def: NodeId, name: &Name) -> Ty {
        let program = self.program;
        let Some(parent) = program.parent(def) else {
            return Ty::Unknown;
        };
        let Some(kind) = program.kind(parent) else {
            return Ty::Unknown;
        };
        match kind {
            NodeKind::LocalDef { names, values } => {
                let position = names.iter().position(|&n| n == def).unwrap_or(0);
                let declared = (position == 0)
                    .then(|| program.doc(parent).and_then(|doc| self.doc_declared_ty(doc)))
                    .flatten();
                let ty = match declared {
                    Some(ty) => ty,
                    None => self.value_type_at(values, position),
                };
                self.with_anonymous_members(def, name, ty)
            }
            NodeKind::LocalFuncDef { name: own, .. } if *own == def => self.infer(parent),
            NodeKind::ForNum { var, .. } if *var == def => Ty::NUMBER,
            NodeKind::ForIn { vars, exprs, .. } => {
                let position = vars.iter().position(|&v| v == def).unwrap_or(0);
                self.iterator_value_ty(exprs, position)
            }
            _ => match kind.func_body() {
                Some(_) => program
                    .function_doc(parent)
                    .and_then(|doc| doc.param_ty(name))
                    .map_or(Ty::Unknown, |ty| self.expand_doc_ty(ty)),
                None => Ty::Unknown,
            },
        }
    }

    /// Add the anonymous class of a local when members were assigned
    /// through it (`local obj = make(); obj.x = 1`).
    fn with_anonymous_members(&self, def: NodeId, name: &Name, ty: Ty) -> Ty {
        let program = self.program;
        let path = program.file_of(def).map_or("", |file| file.path.as_str());
        let anonymous = anonymous_type_name(path, program.offset(def));
        let has_members = self
            .registry
            .process_members(MemberQuery::Wildcard { class: &anonymous }, &mut |_| {
                ControlFlow::Break(())
            })
            .is_break();
        if has_members {
            ty.union(&Ty::Class(Arc::new(ClassTy::anonymous(&anonymous, name))))
        } else {
            ty
        }
    }

    /// `for k, v in iter(...)`: the iterator function's return at `position`.
    fn iterator_value_ty(&mut self, exprs: &[NodeId], position: usize) -> Ty {
        let Some(&first) = exprs.first() else {
            return Ty::Unknown;
        };
        let iterator = self.infer(first);
        let returns: SmallVec<[Ty; 2]> = iterator
            .each()
            .filter_map(Ty::as_function)
            .map(|func| func.main.ret.tuple_at(position))
            .collect();
        Ty::union_all(&returns)
    }

    /// Type of the `index`-th assigned value: the last value expression
    /// expands to fill the remaining positions.
    pub(crate) fn value_type_at(&mut self, values: &[NodeId], index: usize) -> Ty {
        let Some(last) = values.len().checked_sub(1) else {
            return Ty::Unknown;
        };
        if index <= last {
            self.infer(values[index])
        } else {
            self.infer_at(values[last], index - last)
        }
    }

    fn infer_name(&mut self, node: NodeId, name: &Name) -> Ty {
        if let Some(def) = self.decls.resolve_local(name, node) {
            return self.infer(def);
        }
        if &**name == WORD_SELF {
            let receiver = self
                .program
                .enclosing_method(node)
                .and_then(|method| self.decls.resolve_self(method));
            if let Some(receiver) = receiver {
                return self.infer(receiver);
            }
        }
        self.global_type(name)
    }

    /// Type of global `name`: every project-wide declaration, plus the
    /// synthetic global class storing its fields unless it is primitive.
    pub fn global_type(&mut self, name: &str) -> Ty {
        let key = InferKey::Member(Name::from(WORD_G), Name::from(name));
        let declared = self.guarded(key, |ctx| {
            let mut decls = Vec::new();
            let _ = ctx.registry.process_members(
                MemberQuery::Exact {
                    class: WORD_G,
                    member: name,
                    deep: false,
                },
                &mut |decl| {
                    decls.push(decl.clone());
                    ControlFlow::Continue(())
                },
            );
            let mut ty = Ty::Unknown;
            for decl in &decls {
                if ctx.is_cancelled() {
                    break;
                }
                ty = ty.union(&ctx.member_type(decl));
            }
            ty
        });
        if declared.is_primitive() {
            return declared;
        }
        let mut ty = declared.union(&Ty::Class(Arc::new(ClassTy::global(name))));
        if self.settings.recognize_global_name_as_type {
            ty = ty.union(&Ty::Class(Arc::new(ClassTy::global_named(name))));
        }
        ty
    }

    // =========================================================================
    // Index
    // =========================================================================

    fn infer_index(&mut self, node: NodeId, prefix: NodeId, key: &IndexKey) -> Ty {
        let program = self.program;
        let target = program.assign_target(node);
        if let Some((stmt, _)) = target {
            let declared = program.doc(stmt).and_then(|doc| self.doc_declared_ty(doc));
            if let Some(ty) = declared.filter(|ty| !ty.is_invalid()) {
                return ty;
            }
        }

        let prefix_ty = self.infer(prefix);
        let mut ty = Ty::Unknown;
        if let IndexKey::Bracket(_) = key {
            for member in prefix_ty.each() {
                if let Ty::Array(element) = member {
                    ty = ty.union(element);
                }
            }
            if !ty.is_invalid() {
                return ty;
            }
        }

        // table<string, V>
        for member in prefix_ty.each() {
            if let Ty::Generic(generic) = member {
                if generic.args.len() == 2 && generic.arg(0) == Ty::STRING {
                    ty = ty.union(&generic.arg(1));
                }
            }
        }
        if !ty.is_invalid() {
            return ty;
        }

        let member_name = match key {
            IndexKey::Dot(name) | IndexKey::Colon(name) => Some(name.clone()),
            IndexKey::Bracket(key) => match program.kind(*key) {
                Some(NodeKind::Literal(LiteralKind::String(value))) => {
                    Some(Name::from(value.as_str()))
                }
                _ => None,
            },
        };
        if let Some(member_name) = member_name {
            ty = self.lookup_member_of(&prefix_ty, &member_name, self.select_type(node));
        }

        if ty.is_invalid() {
            if let Some((stmt, index)) = target {
                if let Some(NodeKind::Assign { values, .. }) = program.kind(stmt) {
                    let text = program.text_of(node);
                    ty = self.guarded(InferKey::Text(text), |ctx| ctx.value_type_at(values, index));
                }
            }
        }
        ty
    }

    /// Member continuation after the access: `a.b(` wants a method, `a.b.c`
    /// wants a field.
    fn select_type(&self, node: NodeId) -> SelectType {
        let program = self.program;
        match program.parent(node).and_then(|parent| program.kind(parent)) {
            Some(NodeKind::Call { callee, .. }) if *callee == node => SelectType::OnlyMethod,
            Some(NodeKind::Index { prefix, .. }) if *prefix == node => SelectType::OnlyField,
            _ => SelectType::Both,
        }
    }

    /// Resolve `name` on every class at the top of `prefix_ty`. Standard
    /// library classes are consulted first; project classes only when the
    /// library yields nothing.
    pub fn lookup_member_of(&mut self, prefix_ty: &Ty, name: &Name, select: SelectType) -> Ty {
        let mut library = Candidates::new();
        let mut project = Candidates::new();
        for member in prefix_ty.each() {
            let candidate = match member {
                Ty::Class(class) => (class.clone(), None),
                Ty::Generic(generic) => match generic.base.as_class() {
                    Some(base) => (base.clone(), Some(generic.clone())),
                    None => continue,
                },
                Ty::Primitive(PrimitiveKind::String) => {
                    (Arc::new(ClassTy::lazy(WORD_STRING)), None)
                }
                _ => continue,
            };
            let is_std_lib = self
                .registry
                .find_class(candidate.0.name())
                .is_some_and(|decl| decl.is_std_lib);
            if is_std_lib {
                library.push(candidate);
            } else {
                project.push(candidate);
            }
        }

        let mut ty = self.lookup_in_candidates(&library, name, select);
        if ty.is_invalid() {
            ty = ty.union(&self.lookup_in_candidates(&project, name, select));
        }
        ty
    }

    fn lookup_in_candidates(
        &mut self,
        candidates: &Candidates,
        name: &Name,
        select: SelectType,
    ) -> Ty {
        let mut ty = Ty::Unknown;
        for (class, generic) in candidates {
            if self.is_cancelled() {
                break;
            }
            let mut found = if &**class.name() == WORD_G {
                self.global_type(name)
            } else {
                let key = InferKey::Member(class.name().clone(), name.clone());
                self.guarded(key, |ctx| ctx.guess_field_type(name, class, select))
            };
            if let Some(generic) = generic {
                found = self.instantiate_generic_member(&found, class, generic);
            }
            ty = ty.union(&found);
        }
        ty
    }

    /// Replace the class's generic parameter names with the type arguments
    /// of the prefix (`List<T>` accessed as `List<string>`).
    fn instantiate_generic_member(&self, ty: &Ty, class: &ClassTy, generic: &GenericTy) -> Ty {
        let resolver = self.resolver();
        let names = class.generic_names(&resolver);
        if names.is_empty() {
            return ty.clone();
        }
        let mut substitutor = GenericSubstitutor::new();
        for (index, param) in names.iter().enumerate() {
            substitutor.bind(param, generic.arg(index));
        }
        ty.substitute(&mut substitutor)
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn infer_call(&mut self, callee: NodeId, args: &[NodeId], pos: ValuePos) -> Ty {
        let program = self.program;
        if let Some(NodeKind::Name { name }) = program.kind(callee) {
            if self.settings.is_require_like(name) {
                return self.infer_require(args);
            }
        }

        let receiver = match program.kind(callee) {
            Some(NodeKind::Index { prefix, key }) => {
                Some((*prefix, matches!(key, IndexKey::Colon(_))))
            }
            _ => None,
        };
        let callee_ty = self.infer(callee);
        let mut actual_args: Option<Vec<Ty>> = None;
        let mut ret = Ty::Unknown;
        for member in callee_ty.each() {
            if self.is_cancelled() {
                break;
            }
            match member {
                Ty::Function(func) => {
                    let mut matched: SmallVec<[&Signature; 2]> =
                        func.signatures().filter(|sig| sig.params.len() == args.len()).collect();
                    if matched.is_empty() {
                        matched.push(&func.main);
                    }
                    for sig in matched {
                        let ty = self.call_return(sig, receiver, args, &mut actual_args, pos);
                        ret = ret.union(&ty);
                    }
                }
                // Callable class tables. Synthetic global types are not.
                Ty::Class(class)
                    if !class.is_global() || self.registry.find_class(class.name()).is_some() =>
                {
                    ret = ret.union(member);
                }
                _ => {}
            }
        }

        // A.new(), A:get()
        if ret.is_invalid() {
            if let Some(NodeKind::Index {
                prefix,
                key: IndexKey::Dot(name) | IndexKey::Colon(name),
            }) = program.kind(callee)
            {
                if self.settings.is_constructor_name(name) {
                    ret = ret.union(&self.infer(*prefix));
                }
            }
        }
        ret
    }

    fn call_return(
        &mut self,
        sig: &Signature,
        receiver: Option<(NodeId, bool)>,
        args: &[NodeId],
        actual_args: &mut Option<Vec<Ty>>,
        pos: ValuePos,
    ) -> Ty {
        let mut ret = sig.ret.clone();
        if sig.is_generic() {
            if actual_args.is_none() {
                let mut actual = Vec::with_capacity(args.len() + 1);
                if let Some((prefix, true)) = receiver {
                    actual.push(self.infer(prefix));
                }
                for &arg in args {
                    actual.push(self.infer(arg));
                }
                *actual_args = Some(actual);
            }
            let actual = actual_args.as_deref().unwrap_or_default();
            if let Some(mut substitutor) = build_generic_substitutor(sig, actual) {
                ret = ret.substitute(&mut substitutor);
            }
        }
        if let Some((prefix, _)) = receiver {
            ret = ret.substitute(&mut SelfSubstitutor::lazy(|| self.infer(prefix)));
        }
        if pos.keep_tuple { ret } else { ret.tuple_at(pos.index) }
    }

    fn infer_require(&mut self, args: &[NodeId]) -> Ty {
        let program = self.program;
        let path = args.first().and_then(|&arg| match program.kind(arg) {
            Some(NodeKind::Literal(LiteralKind::String(path))) => Some(path.as_str()),
            _ => None,
        });
        let Some(path) = path else {
            return Ty::Unknown;
        };
        match self.modules.resolve_imported_file(path) {
            Some(file) => {
                debug!(module = path, file = file.0, "import resolved");
                self.guess_module_type(file)
            }
            None => Ty::Unknown,
        }
    }

    /// Export type of a file: the first value of its last top-level
    /// `return`.
    pub fn guess_module_type(&mut self, file: FileId) -> Ty {
        let program = self.program;
        let Some(source) = program.file(file) else {
            return Ty::Unknown;
        };
        let Some(NodeKind::Block { stmts }) = program.kind(source.root) else {
            return Ty::Unknown;
        };
        let value = stmts.iter().rev().find_map(|&stmt| match program.kind(stmt) {
            Some(NodeKind::Return { values }) => values.first().copied(),
            _ => None,
        });
        let Some(value) = value else {
            return Ty::Unknown;
        };
        self.guarded(InferKey::Module(file), |ctx| ctx.infer(value))
    }

    // =========================================================================
    // Operators and tables
    // =========================================================================

    fn infer_binary(&mut self, node: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Ty {
        match op {
            BinaryOp::And => {
                if self.is_own_target(node, rhs) {
                    Ty::Unknown
                } else {
                    self.infer(rhs)
                }
            }
            BinaryOp::Or => {
                if self.is_own_target(node, lhs) {
                    self.infer(rhs)
                } else {
                    let left = self.infer(lhs);
                    left.union(&self.infer(rhs))
                }
            }
            BinaryOp::Concat => Ty::STRING,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => Ty::BOOLEAN,
            _ => Ty::NUMBER,
        }
    }

    /// `operand` reads the variable that the statement containing `node`
    /// assigns (`x = x or {}`, `local t = t and t.y`).
    ///
    /// A `local` is not visible in its own initializer, so there the operand
    /// only counts when no outer local of that name is in scope.
    fn is_own_target(&self, node: NodeId, operand: NodeId) -> bool {
        let program = self.program;
        let stmt = program.ancestors(node).find(|&ancestor| {
            program
                .kind(ancestor)
                .is_some_and(|kind| kind.is_statement() || kind.func_body().is_some())
        });
        let text = program.text_of(operand);
        match stmt.and_then(|stmt| program.kind(stmt)) {
            Some(NodeKind::Assign { targets, .. }) => {
                targets.iter().any(|&target| program.text_of(target) == text)
            }
            Some(NodeKind::LocalDef { names, .. }) => {
                let Some(NodeKind::Name { name }) = program.kind(operand) else {
                    return false;
                };
                self.decls.resolve_local(name, operand).is_none()
                    && names.iter().any(|&target| program.text_of(target) == text)
            }
            _ => false,
        }
    }

    fn infer_table(&mut self, node: NodeId, fields: &[NodeId]) -> Ty {
        let program = self.program;
        if let [field] = fields {
            if let Some(NodeKind::TableField { value, .. }) = program.kind(*field) {
                if matches!(program.kind(*value), Some(NodeKind::Literal(LiteralKind::Vararg))) {
                    if let Some(element) = self.vararg_ty(node) {
                        return Ty::array(element);
                    }
                }
            }
        }
        let Some(file) = program.file_of(node) else {
            return Ty::Unknown;
        };
        trace!(node = %node, fields = fields.len(), "table literal");
        Ty::Class(Arc::new(ClassTy::table(
            &file.path,
            file.id,
            node,
            program.offset(node),
            fields.len(),
        )))
    }

    /// Declared type of an assignment member (`a.b = v`, `g = v`).
    pub(crate) fn assigned_member_type(&mut self, target: NodeId) -> Ty {
        let program = self.program;
        let Some((stmt, index)) = program.assign_target(target) else {
            return Ty::Unknown;
        };
        let Some(NodeKind::Assign { values, .. }) = program.kind(stmt) else {
            return Ty::Unknown;
        };
        let declared = program.doc(stmt).and_then(|doc| self.doc_declared_ty(doc));
        let is_table_value = values
            .get(index)
            .is_some_and(|&value| matches!(program.kind(value), Some(NodeKind::Table { .. })));
        if let Some(ty) = &declared {
            if !ty.is_invalid() && !is_table_value {
                return ty.clone();
            }
        }
        let declared = declared.unwrap_or(Ty::Unknown);
        let text = program.text_of_list(values);
        // `x = nil` clears a field, `x = _G` aliases the environment.
        if text == WORD_NIL || text == WORD_G {
            return declared;
        }
        let value = self.guarded(InferKey::Text(text), |ctx| ctx.value_type_at(values, index));
        declared.union(&value)
    }

    /// Declaration type of a registry member.
    pub fn member_type(&mut self, decl: &MemberDecl) -> Ty {
        match &decl.kind {
            MemberKind::Method(node) | MemberKind::FuncDef(node) | MemberKind::TableField(node) => {
                self.infer(*node)
            }
            MemberKind::DocField(ty) | MemberKind::DocTableField(ty) => self.expand_doc_ty(ty),
            MemberKind::Assign(target) | MemberKind::GlobalAssign(target) => {
                self.assigned_member_type(*target)
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/infer_tests.rs"]
mod tests;
