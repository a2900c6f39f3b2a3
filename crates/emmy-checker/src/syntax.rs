//! Syntax tree consumed by the inference engine.
//!
//! Parsing is done elsewhere; the engine sees a [`Program`]: a flat arena of
//! nodes for every source file plus the pre-parsed doc comments attached to
//! statements and table fields. Every node knows its file, its parent and its
//! offset. Offsets follow source order within a file.
//!
//! Doc comment type references arrive as ready-made [`Ty`] values.

use emmy_common::{FileId, Name, NodeId};
use emmy_solver::{Signature, Ty, TypeParamInfo};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Write;

// =============================================================================
// Nodes
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
    BitNot,
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "not ",
            Self::Len => "#",
            Self::BitNot => "~",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::IDiv => "//",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::Concat => "..",
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "~",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Nil,
    Bool(bool),
    /// Source text of the number.
    Number(String),
    /// Unquoted string value.
    String(String),
    /// `...`
    Vararg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexKey {
    /// `a.b`
    Dot(Name),
    /// `a:b`, only as a call target
    Colon(Name),
    /// `a[expr]`
    Bracket(NodeId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKey {
    /// `name = value`
    Name(Name),
    /// `[expr] = value`
    Expr(NodeId),
    /// positional `value`
    Positional,
}

/// Parameters and block of a function-like node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncBody {
    /// `NameDef` nodes.
    pub params: Vec<NodeId>,
    pub vararg: bool,
    pub block: NodeId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Block {
        stmts: Vec<NodeId>,
    },
    LocalDef {
        /// `NameDef` nodes.
        names: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    Assign {
        targets: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    ExprStat {
        expr: NodeId,
    },
    Return {
        values: Vec<NodeId>,
    },
    /// `function name() end`, a global function.
    FuncDef {
        name: Name,
        body: FuncBody,
    },
    /// `local function name() end`
    LocalFuncDef {
        /// `NameDef` node.
        name: NodeId,
        body: FuncBody,
    },
    /// `function A:m() end` / `function A.m() end`
    ClassMethodDef {
        prefix: NodeId,
        name: Name,
        colon: bool,
        body: FuncBody,
    },
    If {
        cond: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    ForNum {
        var: NodeId,
        start: NodeId,
        end: NodeId,
        step: Option<NodeId>,
        body: NodeId,
    },
    ForIn {
        vars: Vec<NodeId>,
        exprs: Vec<NodeId>,
        body: NodeId,
    },
    Do {
        body: NodeId,
    },
    /// Declared name of a local, parameter or loop variable.
    NameDef {
        name: Name,
    },
    Name {
        name: Name,
    },
    Index {
        prefix: NodeId,
        key: IndexKey,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Literal(LiteralKind),
    Table {
        fields: Vec<NodeId>,
    },
    TableField {
        key: FieldKey,
        value: NodeId,
    },
    Closure {
        body: FuncBody,
    },
    Paren {
        expr: NodeId,
    },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        let body_children = |body: &FuncBody, out: &mut SmallVec<[NodeId; 4]>| {
            out.extend(body.params.iter().copied());
            out.push(body.block);
        };
        match self {
            NodeKind::Block { stmts } => out.extend(stmts.iter().copied()),
            NodeKind::LocalDef { names, values } => {
                out.extend(names.iter().copied());
                out.extend(values.iter().copied());
            }
            NodeKind::Assign { targets, values } => {
                out.extend(targets.iter().copied());
                out.extend(values.iter().copied());
            }
            NodeKind::ExprStat { expr } | NodeKind::Paren { expr } => out.push(*expr),
            NodeKind::Return { values } => out.extend(values.iter().copied()),
            NodeKind::FuncDef { body, .. } | NodeKind::Closure { body } => {
                body_children(body, &mut out)
            }
            NodeKind::LocalFuncDef { name, body } => {
                out.push(*name);
                body_children(body, &mut out);
            }
            NodeKind::ClassMethodDef { prefix, body, .. } => {
                out.push(*prefix);
                body_children(body, &mut out);
            }
            NodeKind::If {
                cond,
                then_block,
                else_block,
            } => {
                out.push(*cond);
                out.push(*then_block);
                out.extend(*else_block);
            }
            NodeKind::While { cond, body } => {
                out.push(*cond);
                out.push(*body);
            }
            NodeKind::ForNum {
                var,
                start,
                end,
                step,
                body,
            } => {
                out.extend([*var, *start, *end]);
                out.extend(*step);
                out.push(*body);
            }
            NodeKind::ForIn { vars, exprs, body } => {
                out.extend(vars.iter().copied());
                out.extend(exprs.iter().copied());
                out.push(*body);
            }
            NodeKind::Do { body } => out.push(*body),
            NodeKind::NameDef { .. } | NodeKind::Name { .. } | NodeKind::Literal(_) => {}
            NodeKind::Index { prefix, key } => {
                out.push(*prefix);
                if let IndexKey::Bracket(key) = key {
                    out.push(*key);
                }
            }
            NodeKind::Call { callee, args } => {
                out.push(*callee);
                out.extend(args.iter().copied());
            }
            NodeKind::Unary { operand, .. } => out.push(*operand),
            NodeKind::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            NodeKind::Table { fields } => out.extend(fields.iter().copied()),
            NodeKind::TableField { key, value } => {
                if let FieldKey::Expr(key) = key {
                    out.push(*key);
                }
                out.push(*value);
            }
        }
        out
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::LocalDef { .. }
                | NodeKind::Assign { .. }
                | NodeKind::ExprStat { .. }
                | NodeKind::Return { .. }
                | NodeKind::FuncDef { .. }
                | NodeKind::LocalFuncDef { .. }
                | NodeKind::ClassMethodDef { .. }
                | NodeKind::If { .. }
                | NodeKind::While { .. }
                | NodeKind::ForNum { .. }
                | NodeKind::ForIn { .. }
                | NodeKind::Do { .. }
        )
    }

    pub fn func_body(&self) -> Option<&FuncBody> {
        match self {
            NodeKind::FuncDef { body, .. }
            | NodeKind::LocalFuncDef { body, .. }
            | NodeKind::ClassMethodDef { body, .. }
            | NodeKind::Closure { body } => Some(body),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub file: FileId,
    pub parent: Option<NodeId>,
    pub offset: u32,
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    pub root: NodeId,
    /// Standard library definitions take priority in member lookup.
    pub is_std_lib: bool,
}

// =============================================================================
// Doc comments
// =============================================================================

/// `---@class Name<T> : Super1, Super2`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocClass {
    pub name: Name,
    pub generics: Vec<Name>,
    pub supers: Vec<Name>,
    pub alias: Option<Name>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocParam {
    pub name: Name,
    pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocField {
    pub name: Name,
    pub ty: Ty,
}

/// `---@alias Name Type`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocAlias {
    pub name: Name,
    pub ty: Ty,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocComment {
    pub class: Option<DocClass>,
    /// `---@type`
    pub ty: Option<Ty>,
    pub params: Vec<DocParam>,
    /// `---@return`, one entry per returned value.
    pub returns: Vec<Ty>,
    pub vararg: Option<Ty>,
    pub generics: Vec<TypeParamInfo>,
    pub fields: Vec<DocField>,
    pub overloads: Vec<Signature>,
    pub aliases: Vec<DocAlias>,
}

impl DocComment {
    pub fn class(name: &str) -> Self {
        Self {
            class: Some(DocClass {
                name: Name::from(name),
                ..DocClass::default()
            }),
            ..Self::default()
        }
    }

    pub fn typed(ty: Ty) -> Self {
        Self {
            ty: Some(ty),
            ..Self::default()
        }
    }

    /// Adds a superclass to the `@class` tag, if any.
    pub fn with_super(mut self, name: &str) -> Self {
        if let Some(class) = &mut self.class {
            class.supers.push(Name::from(name));
        }
        self
    }

    pub fn with_class_generic(mut self, name: &str) -> Self {
        if let Some(class) = &mut self.class {
            class.generics.push(Name::from(name));
        }
        self
    }

    pub fn with_class_alias(mut self, name: &str) -> Self {
        if let Some(class) = &mut self.class {
            class.alias = Some(Name::from(name));
        }
        self
    }

    pub fn with_param(mut self, name: &str, ty: Ty) -> Self {
        self.params.push(DocParam {
            name: Name::from(name),
            ty,
        });
        self
    }

    pub fn with_return(mut self, ty: Ty) -> Self {
        self.returns.push(ty);
        self
    }

    pub fn with_vararg(mut self, ty: Ty) -> Self {
        self.vararg = Some(ty);
        self
    }

    pub fn with_generic(mut self, param: TypeParamInfo) -> Self {
        self.generics.push(param);
        self
    }

    pub fn with_field(mut self, name: &str, ty: Ty) -> Self {
        self.fields.push(DocField {
            name: Name::from(name),
            ty,
        });
        self
    }

    pub fn with_overload(mut self, sig: Signature) -> Self {
        self.overloads.push(sig);
        self
    }

    pub fn with_alias(mut self, name: &str, ty: Ty) -> Self {
        self.aliases.push(DocAlias {
            name: Name::from(name),
            ty,
        });
        self
    }

    pub fn param_ty(&self, name: &str) -> Option<&Ty> {
        self.params
            .iter()
            .find(|param| &*param.name == name)
            .map(|param| &param.ty)
    }
}

// =============================================================================
// Program
// =============================================================================

/// Every parsed file of a project, in one arena.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub(crate) nodes: Vec<Node>,
    pub(crate) files: Vec<SourceFile>,
    pub(crate) docs: FxHashMap<NodeId, DocComment>,
}

impl Program {
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn offset(&self, id: NodeId) -> u32 {
        self.node(id).map_or(0, |node| node.offset)
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.index())
    }

    pub fn file_of(&self, id: NodeId) -> Option<&SourceFile> {
        self.node(id).and_then(|node| self.file(node.file))
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.path == path)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn doc(&self, id: NodeId) -> Option<&DocComment> {
        self.docs.get(&id)
    }

    /// Parent chain of `id`, nearest first, `id` excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Innermost function-like node containing `id`.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.kind(ancestor).is_some_and(|kind| kind.func_body().is_some()))
    }

    /// Innermost `function A:m()` / `function A.m()` containing `id`, seen
    /// through nested closures.
    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| matches!(self.kind(ancestor), Some(NodeKind::ClassMethodDef { .. })))
    }

    /// Innermost assignment statement whose subtree contains `id`.
    pub fn enclosing_assign(&self, id: NodeId) -> Option<NodeId> {
        for ancestor in self.ancestors(id) {
            match self.kind(ancestor) {
                Some(NodeKind::Assign { .. }) => return Some(ancestor),
                Some(kind) if kind.is_statement() || kind.func_body().is_some() => return None,
                _ => {}
            }
        }
        None
    }

    /// Doc comment of a function-like node. A closure borrows the comment of
    /// the declaration it is the value of.
    pub fn function_doc(&self, func: NodeId) -> Option<&DocComment> {
        match self.kind(func)? {
            NodeKind::Closure { .. } => {
                let parent = self.parent(func)?;
                match self.kind(parent)? {
                    NodeKind::LocalDef { .. }
                    | NodeKind::Assign { .. }
                    | NodeKind::TableField { .. } => self.doc(parent),
                    _ => None,
                }
            }
            _ => self.doc(func),
        }
    }

    /// When `expr` is the `index`-th target of an assignment, the statement
    /// and position.
    pub fn assign_target(&self, expr: NodeId) -> Option<(NodeId, usize)> {
        let stmt = self.parent(expr)?;
        match self.kind(stmt)? {
            NodeKind::Assign { targets, .. } => {
                let index = targets.iter().position(|&target| target == expr)?;
                Some((stmt, index))
            }
            _ => None,
        }
    }

    /// Canonical source text of a node, used for textual identity checks.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_text(id, &mut out);
        out
    }

    /// Canonical text of an expression list (`a, b`).
    pub fn text_of_list(&self, ids: &[NodeId]) -> String {
        let mut out = String::new();
        self.write_list(ids, &mut out);
        out
    }

    fn write_list(&self, ids: &[NodeId], out: &mut String) {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_text(id, out);
        }
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Name { name } | NodeKind::NameDef { name } => out.push_str(name),
            NodeKind::Index { prefix, key } => {
                self.write_text(*prefix, out);
                match key {
                    IndexKey::Dot(name) => {
                        out.push('.');
                        out.push_str(name);
                    }
                    IndexKey::Colon(name) => {
                        out.push(':');
                        out.push_str(name);
                    }
                    IndexKey::Bracket(key) => {
                        out.push('[');
                        self.write_text(*key, out);
                        out.push(']');
                    }
                }
            }
            NodeKind::Call { callee, args } => {
                self.write_text(*callee, out);
                out.push('(');
                self.write_list(args, out);
                out.push(')');
            }
            NodeKind::Unary { op, operand } => {
                out.push_str(op.as_str());
                self.write_text(*operand, out);
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.write_text(*lhs, out);
                let _ = write!(out, " {} ", op.as_str());
                self.write_text(*rhs, out);
            }
            NodeKind::Literal(literal) => match literal {
                LiteralKind::Nil => out.push_str("nil"),
                LiteralKind::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
                LiteralKind::Number(text) => out.push_str(text),
                LiteralKind::String(value) => {
                    let _ = write!(out, "{value:?}");
                }
                LiteralKind::Vararg => out.push_str("..."),
            },
            NodeKind::Table { fields } => {
                out.push('{');
                self.write_list(fields, out);
                out.push('}');
            }
            NodeKind::TableField { key, value } => {
                match key {
                    FieldKey::Name(name) => {
                        let _ = write!(out, "{name} = ");
                    }
                    FieldKey::Expr(key) => {
                        out.push('[');
                        self.write_text(*key, out);
                        out.push_str("] = ");
                    }
                    FieldKey::Positional => {}
                }
                self.write_text(*value, out);
            }
            NodeKind::Closure { body } => {
                out.push_str("function(");
                self.write_list(&body.params, out);
                if body.vararg {
                    out.push_str(if body.params.is_empty() { "..." } else { ", ..." });
                }
                out.push_str(") end");
            }
            NodeKind::Paren { expr } => {
                out.push('(');
                self.write_text(*expr, out);
                out.push(')');
            }
            _ => {
                let _ = write!(out, "<stmt {id}>");
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/syntax_tests.rs"]
mod tests;
