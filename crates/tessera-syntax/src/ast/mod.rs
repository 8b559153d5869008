//! Abstract syntax tree consumed by the detailer.
//!
//! All nodes borrow from a `bumpalo` arena. Every node that can carry a detail
//! handle has a [`NodeId`] and a [`Position`]. Declarations are statements, so
//! a [`RootNode`] is simply a list of statements.

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use stmt::*;
pub use types::*;

use tessera_core::{FileId, NodeId, Position};

/// A name as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub position: Position,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, position: Position) -> Self {
        Self { name, position }
    }
}

/// An attribute argument: an expression (literal or name) or a type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeArgument<'ast> {
    Expr(&'ast Expr<'ast>),
    Type(&'ast TypeExpr<'ast>),
}

/// `@path.to.attribute(args...)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attribute<'ast> {
    pub path: &'ast [Ident<'ast>],
    pub arguments: &'ast [AttributeArgument<'ast>],
    pub position: Position,
}

impl Attribute<'_> {
    /// The dotted path as a single string.
    pub fn path_text(&self) -> String {
        join_path(self.path)
    }
}

/// Join identifiers with `.`.
pub fn join_path(path: &[Ident<'_>]) -> String {
    let mut text = String::new();
    for (i, ident) in path.iter().enumerate() {
        if i > 0 {
            text.push('.');
        }
        text.push_str(ident.name);
    }
    text
}

/// The root of one module's tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootNode<'ast> {
    pub id: NodeId,
    pub file: FileId,
    pub statements: &'ast [Stmt<'ast>],
    pub position: Position,
}
