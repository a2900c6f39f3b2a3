//! Cycle and depth limits for re-entrant type computations.
//!
//! Lua programs refer to themselves all the time: `x = x or {}`, a class
//! listed among its own superclasses, two aliases naming each other. Every
//! such computation re-enters itself with the same key. [`RecursionGuard`]
//! reports that re-entry as [`RecursionResult::Cycle`] and the caller
//! answers `Ty::Unknown` for the inner occurrence.
//!
//! Besides cycles the guard bounds nesting depth and the total number of
//! entries per request ("work"), so a pathological but acyclic program still
//! finishes.
//!
//! Guards belong to one inference request and are never shared. In debug
//! builds dropping a guard that still has keys in progress panics, which
//! catches an `enter` without its `leave`.

use emmy_common::limits;
use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Limit presets, one per kind of walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Names, members, calls and declarations of one request.
    ExpressionInference,
    /// Superclass nesting while member chains are built.
    MemberChain,
    /// Nesting inside one substitution pass.
    Substitution,
    Custom { max_depth: u32, max_work: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::ExpressionInference => limits::MAX_INFER_DEPTH,
            Self::MemberChain => limits::MAX_MEMBER_CHAIN_DEPTH,
            Self::Substitution => limits::MAX_SUBSTITUTION_DEPTH,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    /// Entries allowed over the guard's lifetime.
    pub const fn max_work(self) -> u32 {
        match self {
            Self::Custom { max_work, .. } => max_work,
            _ => limits::MAX_INFER_WORK,
        }
    }
}

/// Outcome of [`RecursionGuard::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already in progress further up the stack.
    Cycle,
    DepthExceeded,
    /// The request used up its work budget.
    BudgetExhausted,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        self == Self::Entered
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        self == Self::Cycle
    }

    /// A limit, not a cycle, denied entry.
    #[inline]
    pub fn is_limit(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::BudgetExhausted)
    }
}

/// Keys currently being computed, plus depth and work counters.
///
/// Every [`RecursionResult::Entered`] must be paired with a
/// [`leave`](Self::leave) of the same key.
pub struct RecursionGuard<K: Hash + Eq> {
    in_progress: FxHashSet<K>,
    depth: u32,
    work: u32,
    max_depth: u32,
    max_work: u32,
    hit_limit: bool,
}

impl<K: Hash + Eq> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_work: u32) -> Self {
        Self {
            in_progress: FxHashSet::default(),
            depth: 0,
            work: 0,
            max_depth,
            max_work,
            hit_limit: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_work())
    }

    /// Limits are checked before cycles, and every attempt counts as work.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.work = self.work.saturating_add(1);
        if self.work > self.max_work {
            self.hit_limit = true;
            return RecursionResult::BudgetExhausted;
        }
        if self.depth >= self.max_depth {
            self.hit_limit = true;
            return RecursionResult::DepthExceeded;
        }
        if !self.in_progress.insert(key) {
            return RecursionResult::Cycle;
        }
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: &K) {
        let removed = self.in_progress.remove(key);
        debug_assert!(removed, "leave() without a matching enter()");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn is_in_progress(&self, key: &K) -> bool {
        self.in_progress.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn work(&self) -> u32 {
        self.work
    }

    /// Stays `true` once any limit denied an entry. Cycles do not count.
    #[inline]
    pub fn hit_limit(&self) -> bool {
        self.hit_limit
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.in_progress.is_empty() {
            panic!("recursion guard dropped with {} keys in progress", self.in_progress.len());
        }
    }
}

/// Depth-only limit, for walks that may meet the same key twice without it
/// being a cycle (one class in both arms of a union).
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
    hit_limit: bool,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            hit_limit: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    /// `false` at the limit. The depth is then unchanged and must not be
    /// left.
    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.hit_limit = true;
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "leave() at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn hit_limit(&self) -> bool {
        self.hit_limit
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!("depth counter dropped at depth {}", self.depth);
        }
    }
}

#[cfg(test)]
#[path = "../tests/recursion_tests.rs"]
mod tests;
