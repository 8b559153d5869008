//! Identifier types for the entity arena.
//!
//! Entities are stored in flat vectors inside the registry and addressed by
//! these index newtypes. Owning edges are "this id lives in that vector";
//! back references (parent scope, parent class, superclass) are plain ids and
//! carry no ownership.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw arena index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Get the underlying index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Get the raw value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self::new(index)
            }
        }
    };
}

arena_id!(
    /// Identifies a named entity (variable, function, class, namespace, alias, type).
    ItemId,
    "item_"
);

arena_id!(
    /// Identifies a lexical scope.
    ScopeId,
    "scope_"
);

arena_id!(
    /// Identifies a compilation unit.
    ModuleId,
    "module_"
);

/// Identifies one AST node.
///
/// Node ids are unique across every tree built in the process, so handles for
/// nodes of different modules (and nodes synthesised during detailing) never
/// collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

impl NodeId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}
