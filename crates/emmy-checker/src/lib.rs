//! Expression type inference for Lua with EmmyLua doc annotations
//!
//! The engine answers "what is the type of this expression?" over a parsed
//! program. It is organized as:
//!
//! - **Syntax model** (`syntax`, `builder`): the node arena an external
//!   parser fills, with pre-parsed doc comments
//! - **Collaborators** (`scope`, `registry`, `modules`): the declaration
//!   tree, class registry and module resolution the engine queries, plus
//!   in-memory implementations (`LexicalScopes`, `ClassIndex`,
//!   `PathModuleResolver`)
//! - **Inference** (`context`, `infer`, `members`, `functions`): the
//!   request-scoped `InferContext` and the per-node dispatch, member chain
//!   construction and function signatures
//!
//! Inference is total. Anything unresolvable becomes `Ty::Unknown`.
pub mod builder;
pub mod context;
mod functions;
pub mod index;
mod infer;
pub mod members;
pub mod modules;
pub mod registry;
pub mod scope;
pub mod syntax;
pub mod tracing_config;

pub use builder::ProgramBuilder;
pub use context::{InferContext, InferKey, TypeInferrer};
pub use index::{ClassIndex, Indexer};
pub use members::SelectType;
pub use modules::{ModuleResolver, NoModules, PathModuleResolver};
pub use registry::{
    AliasDecl, ClassDecl, ClassRegistry, MemberDecl, MemberKind, MemberQuery, RegistryResolver,
};
pub use scope::{DeclarationTree, LexicalScopes};
pub use syntax::{DocComment, NodeKind, Program, SourceFile};
pub use tracing_config::init_tracing;
