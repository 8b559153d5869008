//! The detailed entity tree arena.
//!
//! This crate stores what detailing produces: modules, scopes and the items
//! declared in them. It answers the structural questions the detailer asks
//! while it builds that graph:
//!
//! - scoped name lookup with shadowing, kind exclusion and visibility
//!   filtering ([`EntityGraph::find_all`])
//! - alias resolution with a cycle guard
//! - class hierarchy queries ([`EntityGraph::has_parent`],
//!   [`EntityGraph::inheritance_distance`])
//! - throw propagation through enclosing scopes
//! - source-like rendering of types and signatures
//!
//! # Example
//!
//! ```
//! use tessera_core::{ItemHeader, ItemKind, ItemKindSet, Type, Variable};
//! use tessera_registry::EntityGraph;
//!
//! let mut graph = EntityGraph::new();
//! let module = graph.new_module("main", "main.tsr", "");
//! let scope = graph.module(module).scope;
//! let x = graph.add_item(
//!     ItemHeader::new("x", scope, module),
//!     ItemKind::Variable(Variable::new(Type::int())),
//! );
//! assert_eq!(graph.find_all("x", scope, ItemKindSet::empty(), None), vec![x]);
//! ```

mod error;
mod graph;
mod hierarchy;
mod lookup;

pub use error::RegistryError;
pub use graph::{EntityGraph, ScopeChain};
