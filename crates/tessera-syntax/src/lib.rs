//! Syntax tree for the Tessera language.
//!
//! The tree is what the detailer walks: declarations, statements, expressions
//! and written type expressions, all allocated in a `bumpalo` arena so a whole
//! module can be dropped at once. [`AstBuilder`] is the single way to build
//! nodes; it hands out the [`NodeId`](tessera_core::NodeId)s that detail
//! handles are keyed by.

pub mod ast;
mod builder;

pub use ast::*;
pub use builder::AstBuilder;
