//! Request-scoped inference state.
//!
//! One [`InferContext`] serves one inference request. It owns the recursion
//! guard, the member-chain memo and the optional cancellation flag; all
//! collaborators are borrowed read-only. Concurrent requests each build their
//! own context from a shared [`TypeInferrer`].

use crate::modules::ModuleResolver;
use crate::registry::{ClassRegistry, MemberDecl, RegistryResolver};
use crate::scope::DeclarationTree;
use crate::syntax::Program;
use emmy_common::{FileId, Name, NodeId, Settings};
use emmy_solver::{DepthCounter, MemberChain, RecursionGuard, RecursionProfile, RecursionResult, Ty};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// In-progress computation, for cycle detection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InferKey {
    Node(NodeId),
    /// Member lookup of `(class, member)`.
    Member(Name, Name),
    /// An expression identified by its source text.
    Text(String),
    Module(FileId),
}

pub struct InferContext<'a> {
    pub(crate) program: &'a Program,
    pub(crate) decls: &'a dyn DeclarationTree,
    pub(crate) registry: &'a dyn ClassRegistry,
    pub(crate) modules: &'a dyn ModuleResolver,
    pub(crate) settings: &'a Settings,
    guard: RecursionGuard<InferKey>,
    pub(crate) chain_depth: DepthCounter,
    pub(crate) chains: FxHashMap<Name, Arc<MemberChain<MemberDecl>>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> InferContext<'a> {
    pub fn new(
        program: &'a Program,
        decls: &'a dyn DeclarationTree,
        registry: &'a dyn ClassRegistry,
        modules: &'a dyn ModuleResolver,
        settings: &'a Settings,
    ) -> Self {
        Self {
            program,
            decls,
            registry,
            modules,
            settings,
            guard: RecursionGuard::with_profile(RecursionProfile::ExpressionInference),
            chain_depth: DepthCounter::with_profile(RecursionProfile::MemberChain),
            chains: FxHashMap::default(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Class detail resolution for lazily created class types.
    pub(crate) fn resolver(&self) -> RegistryResolver<'_> {
        RegistryResolver::new(self.registry).with_cancel(self.cancel.as_deref())
    }

    /// Run `f` unless `key` is already in progress, or a limit was hit.
    pub(crate) fn guarded(&mut self, key: InferKey, f: impl FnOnce(&mut Self) -> Ty) -> Ty {
        match self.guard.enter(key.clone()) {
            RecursionResult::Entered => {
                let ty = f(self);
                self.guard.leave(&key);
                ty
            }
            denied => {
                trace!(key = ?key, result = ?denied, "inference cut");
                Ty::Unknown
            }
        }
    }
}

/// Shared entry point: borrows the collaborators once and hands out a fresh
/// [`InferContext`] per request.
#[derive(Clone)]
pub struct TypeInferrer<'a> {
    program: &'a Program,
    decls: &'a dyn DeclarationTree,
    registry: &'a dyn ClassRegistry,
    modules: &'a dyn ModuleResolver,
    settings: &'a Settings,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> TypeInferrer<'a> {
    pub fn new(
        program: &'a Program,
        decls: &'a dyn DeclarationTree,
        registry: &'a dyn ClassRegistry,
        modules: &'a dyn ModuleResolver,
        settings: &'a Settings,
    ) -> Self {
        Self {
            program,
            decls,
            registry,
            modules,
            settings,
            cancel: None,
        }
    }

    /// Requests started from this inferrer stop early once `cancel` is set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn context(&self) -> InferContext<'a> {
        InferContext::new(self.program, self.decls, self.registry, self.modules, self.settings)
            .with_cancel(self.cancel.clone())
    }

    /// Type of `node`, in a request of its own.
    pub fn infer(&self, node: NodeId) -> Ty {
        self.context().infer(node)
    }

    /// Type of the `index`-th value produced by `node`.
    pub fn infer_at(&self, node: NodeId, index: usize) -> Ty {
        self.context().infer_at(node, index)
    }
}
