//! Arena construction for [`Program`].
//!
//! Nodes are created bottom-up (children first, as a parser would reduce
//! them). [`ProgramBuilder::add_file`] roots a statement list in a file;
//! [`ProgramBuilder::build`] then links parents and assigns source-ordered
//! offsets with one pre-order walk per file.

use crate::syntax::{
    BinaryOp, DocComment, FieldKey, FuncBody, IndexKey, LiteralKind, Node, NodeKind, Program,
    SourceFile, UnaryOp,
};
use emmy_common::{FileId, Name, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// File id of nodes that were never attached to a file.
const DETACHED: FileId = FileId(u32::MAX);

#[derive(Default)]
pub struct ProgramBuilder {
    kinds: Vec<NodeKind>,
    docs: FxHashMap<NodeId, DocComment>,
    files: Vec<PendingFile>,
}

struct PendingFile {
    path: String,
    root: NodeId,
    is_std_lib: bool,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    /// Attach a doc comment to a statement or table field.
    pub fn doc(&mut self, node: NodeId, doc: DocComment) -> NodeId {
        self.docs.insert(node, doc);
        node
    }

    // -------------------------------------------------------------------------
    // Files
    // -------------------------------------------------------------------------

    pub fn add_file(&mut self, path: &str, stmts: Vec<NodeId>) -> FileId {
        self.add_file_with(path, stmts, false)
    }

    /// A file whose declarations belong to the standard library scope.
    pub fn add_std_lib_file(&mut self, path: &str, stmts: Vec<NodeId>) -> FileId {
        self.add_file_with(path, stmts, true)
    }

    fn add_file_with(&mut self, path: &str, stmts: Vec<NodeId>, is_std_lib: bool) -> FileId {
        let root = self.block(stmts);
        let id = FileId(self.files.len() as u32);
        self.files.push(PendingFile {
            path: path.to_string(),
            root,
            is_std_lib,
        });
        id
    }

    pub fn build(self) -> Program {
        let mut nodes: Vec<Node> = self
            .kinds
            .into_iter()
            .map(|kind| Node {
                kind,
                file: DETACHED,
                parent: None,
                offset: 0,
            })
            .collect();

        let mut files = Vec::with_capacity(self.files.len());
        for (index, pending) in self.files.into_iter().enumerate() {
            let file = FileId(index as u32);
            let mut offset = 0u32;
            let mut stack = vec![(pending.root, None)];
            while let Some((id, parent)) = stack.pop() {
                let Some(node) = nodes.get_mut(id.index()) else {
                    continue;
                };
                node.file = file;
                node.parent = parent;
                node.offset = offset;
                offset += 1;
                let children = node.kind.children();
                stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
            }
            debug!(path = %pending.path, nodes = offset, "file linked");
            files.push(SourceFile {
                id: file,
                path: pending.path,
                root: pending.root,
                is_std_lib: pending.is_std_lib,
            });
        }

        Program {
            nodes,
            files,
            docs: self.docs,
        }
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block { stmts })
    }

    /// `local a, b = values`
    pub fn local(&mut self, names: &[&str], values: Vec<NodeId>) -> NodeId {
        let names = names.iter().map(|name| self.name_def(name)).collect();
        self.local_def(names, values)
    }

    /// `local` over pre-built `NameDef` nodes.
    pub fn local_def(&mut self, names: Vec<NodeId>, values: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::LocalDef { names, values })
    }

    pub fn assign(&mut self, targets: Vec<NodeId>, values: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Assign { targets, values })
    }

    pub fn expr_stat(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExprStat { expr })
    }

    pub fn ret(&mut self, values: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Return { values })
    }

    fn func_body(&mut self, params: &[&str], vararg: bool, stmts: Vec<NodeId>) -> FuncBody {
        let params = params.iter().map(|name| self.name_def(name)).collect();
        let block = self.block(stmts);
        FuncBody {
            params,
            vararg,
            block,
        }
    }

    /// `function name(params) body end`
    pub fn function(
        &mut self,
        name: &str,
        params: &[&str],
        vararg: bool,
        body: Vec<NodeId>,
    ) -> NodeId {
        let body = self.func_body(params, vararg, body);
        self.push(NodeKind::FuncDef {
            name: Name::from(name),
            body,
        })
    }

    /// `local function name(params) body end`
    pub fn local_function(
        &mut self,
        name: &str,
        params: &[&str],
        vararg: bool,
        body: Vec<NodeId>,
    ) -> NodeId {
        let name = self.name_def(name);
        let body = self.func_body(params, vararg, body);
        self.push(NodeKind::LocalFuncDef { name, body })
    }

    /// `function prefix:name(params)` with `colon`, else `function prefix.name(params)`.
    pub fn method(
        &mut self,
        prefix: NodeId,
        name: &str,
        colon: bool,
        params: &[&str],
        body: Vec<NodeId>,
    ) -> NodeId {
        let body = self.func_body(params, false, body);
        self.push(NodeKind::ClassMethodDef {
            prefix,
            name: Name::from(name),
            colon,
            body,
        })
    }

    pub fn if_stat(
        &mut self,
        cond: NodeId,
        then: Vec<NodeId>,
        otherwise: Option<Vec<NodeId>>,
    ) -> NodeId {
        let then_block = self.block(then);
        let else_block = otherwise.map(|stmts| self.block(stmts));
        self.push(NodeKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_stat(&mut self, cond: NodeId, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.push(NodeKind::While { cond, body })
    }

    pub fn for_num(
        &mut self,
        var: &str,
        start: NodeId,
        end: NodeId,
        step: Option<NodeId>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let var = self.name_def(var);
        let body = self.block(body);
        self.push(NodeKind::ForNum {
            var,
            start,
            end,
            step,
            body,
        })
    }

    pub fn for_in(&mut self, vars: &[&str], exprs: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        let vars = vars.iter().map(|name| self.name_def(name)).collect();
        let body = self.block(body);
        self.push(NodeKind::ForIn { vars, exprs, body })
    }

    pub fn do_stat(&mut self, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.push(NodeKind::Do { body })
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    pub fn name_def(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::NameDef {
            name: Name::from(name),
        })
    }

    pub fn name(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Name {
            name: Name::from(name),
        })
    }

    /// `prefix.name`
    pub fn index(&mut self, prefix: NodeId, name: &str) -> NodeId {
        self.push(NodeKind::Index {
            prefix,
            key: IndexKey::Dot(Name::from(name)),
        })
    }

    /// `prefix:name`
    pub fn colon_index(&mut self, prefix: NodeId, name: &str) -> NodeId {
        self.push(NodeKind::Index {
            prefix,
            key: IndexKey::Colon(Name::from(name)),
        })
    }

    /// `prefix[key]`
    pub fn bracket(&mut self, prefix: NodeId, key: NodeId) -> NodeId {
        self.push(NodeKind::Index {
            prefix,
            key: IndexKey::Bracket(key),
        })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Call { callee, args })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.push(NodeKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary { op, lhs, rhs })
    }

    pub fn nil(&mut self) -> NodeId {
        self.push(NodeKind::Literal(LiteralKind::Nil))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(NodeKind::Literal(LiteralKind::Bool(value)))
    }

    pub fn number(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Literal(LiteralKind::Number(text.to_string())))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.push(NodeKind::Literal(LiteralKind::String(value.to_string())))
    }

    pub fn vararg(&mut self) -> NodeId {
        self.push(NodeKind::Literal(LiteralKind::Vararg))
    }

    pub fn table(&mut self, fields: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Table { fields })
    }

    /// `name = value`
    pub fn field(&mut self, name: &str, value: NodeId) -> NodeId {
        self.push(NodeKind::TableField {
            key: FieldKey::Name(Name::from(name)),
            value,
        })
    }

    /// `[key] = value`
    pub fn keyed_field(&mut self, key: NodeId, value: NodeId) -> NodeId {
        self.push(NodeKind::TableField {
            key: FieldKey::Expr(key),
            value,
        })
    }

    /// Positional `value`.
    pub fn item(&mut self, value: NodeId) -> NodeId {
        self.push(NodeKind::TableField {
            key: FieldKey::Positional,
            value,
        })
    }

    pub fn closure(&mut self, params: &[&str], vararg: bool, body: Vec<NodeId>) -> NodeId {
        let body = self.func_body(params, vararg, body);
        self.push(NodeKind::Closure { body })
    }

    pub fn paren(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::Paren { expr })
    }
}
