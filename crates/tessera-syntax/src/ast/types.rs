//! Type expressions as written in source.

use tessera_core::{Modifier, NativeType, NodeId, Position};

use super::Ident;

/// A written type: a kind plus the modifier layers around it.
///
/// `modifiers` follows the same base-outward layer convention as
/// `tessera_core::Type`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeExpr<'ast> {
    pub id: NodeId,
    pub kind: TypeExprKind<'ast>,
    pub modifiers: &'ast [Modifier],
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeExprKind<'ast> {
    /// `a.b.Name<Args>`
    Named {
        path: &'ast [Ident<'ast>],
        generic_args: &'ast [TypeExpr<'ast>],
    },
    Native(NativeType),
    /// `(a: T, ...rest: U) => R`
    Function {
        parameters: &'ast [FunctionTypeParameter<'ast>],
        return_type: &'ast TypeExpr<'ast>,
    },
    /// `A | B`
    Union(&'ast [TypeExpr<'ast>]),
    /// `T?`
    Optional(&'ast TypeExpr<'ast>),
    /// `any`
    Any,
    /// The class whose body encloses the type expression.
    SelfType,
}

/// A parameter inside a function type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionTypeParameter<'ast> {
    pub name: Option<Ident<'ast>>,
    pub ty: &'ast TypeExpr<'ast>,
    pub is_variadic: bool,
}

impl<'ast> TypeExpr<'ast> {
    /// The single name of an unqualified, non-generic named type.
    pub fn simple_name(&self) -> Option<&'ast str> {
        match self.kind {
            TypeExprKind::Named { path, generic_args } if path.len() == 1 && generic_args.is_empty() => {
                Some(path[0].name)
            }
            _ => None,
        }
    }
}
