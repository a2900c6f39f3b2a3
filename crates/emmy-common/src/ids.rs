//! Stable identifiers shared between the solver and the checker.
//!
//! The solver never looks inside a syntax tree, but some types (table
//! literals, anonymous locals) need to point back at the node that created
//! them. Both crates agree on these plain index newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared, cheaply clonable identifier text (class names, member names).
pub type Name = Arc<str>;

/// Index of a source file inside a `Program`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Index of a syntax node inside a `Program` arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl FileId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Convert anything string-like into a [`Name`].
#[inline]
pub fn name(text: impl AsRef<str>) -> Name {
    Arc::from(text.as_ref())
}
