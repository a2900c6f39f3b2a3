//! Centralized limits and thresholds for the type engine.
//!
//! Inference over self-referential programs is expected input, not an error
//! case. The cycle guards catch repeated keys; these limits catch everything
//! else (long alias chains, pathological generic nesting) before the stack
//! does.
//!
//! The solver's `RecursionProfile` reads its presets from here so every limit
//! lives in one place.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting of expression inference within a single request.
///
/// Each name, member, call or declaration hop pushes one level. Deep member
/// chains such as `a.b.c.d.e` resolved through several assignments stay far
/// below this.
pub const MAX_INFER_DEPTH: u32 = 200;

/// Total enter attempts allowed per inference request.
///
/// Bounds the work done on wide programs where every member fans out into
/// many declarations.
pub const MAX_INFER_WORK: u32 = 100_000;

/// Maximum depth of superclass nesting while building a member chain.
pub const MAX_MEMBER_CHAIN_DEPTH: u32 = 64;

/// Maximum number of classes visited by a single superclass walk.
pub const MAX_SUPER_CLASS_WALK: usize = 256;

/// Maximum nesting of a single substitution pass.
///
/// Alias substitution re-enters itself for every alias it expands.
pub const MAX_SUBSTITUTION_DEPTH: u32 = 50;
