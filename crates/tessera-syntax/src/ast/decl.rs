//! Declaration nodes: functions, classes, namespaces, imports and exports.

use bitflags::bitflags;
use tessera_core::{AccessorKind, NodeId, Operator, Orientation, Position, Visibility};

use super::{Attribute, Block, Expr, Ident, TypeExpr};

bitflags! {
    /// Keywords written on a function declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionModifiers: u8 {
        const ASYNC = 1 << 0;
        const GENERATOR = 1 << 1;
        const VIRTUAL = 1 << 2;
        /// No body; provided outside the language.
        const EXTERNAL = 1 << 3;
        const EXPORT = 1 << 4;
    }
}

bitflags! {
    /// Keywords written on a class declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassModifiers: u8 {
        const STRUCTURE = 1 << 0;
        const EXTERNAL = 1 << 1;
        const TYPED = 1 << 2;
        const LITERAL = 1 << 3;
        const EXPORT = 1 << 4;
        const BITFIELD = 1 << 5;
    }
}

/// Direction of a user-defined cast declared in a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastDirection {
    /// `from(value: T)`: builds the class from a `T`.
    From,
    /// `to(): T`: converts the class to a `T`.
    To,
}

/// What a function declaration is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FunctionRole {
    #[default]
    Plain,
    Constructor,
    Destructor,
    Cast(CastDirection),
    Operator(Operator, Orientation),
    Accessor(AccessorKind),
}

/// A function parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    /// Default value; parameters with one may be omitted from the right.
    pub default: Option<&'ast Expr<'ast>>,
    pub is_variadic: bool,
    pub position: Position,
}

/// A function, method, constructor, destructor, cast, operator or accessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDefinition<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub role: FunctionRole,
    pub generics: &'ast [Ident<'ast>],
    pub parameters: &'ast [Parameter<'ast>],
    /// `None` means `void`.
    pub return_type: Option<TypeExpr<'ast>>,
    /// Type received by a generator on each resumption.
    pub generator_parameter: Option<TypeExpr<'ast>>,
    pub body: Option<&'ast Block<'ast>>,
    pub modifiers: FunctionModifiers,
    pub visibility: Visibility,
    pub attributes: &'ast [Attribute<'ast>],
    pub position: Position,
}

impl FunctionDefinition<'_> {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    /// Number of trailing parameters that carry a default.
    pub fn optional_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .rev()
            .take_while(|p| p.default.is_some() && !p.is_variadic)
            .count()
    }
}

/// A class member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassMember<'ast> {
    Field(&'ast FieldDeclaration<'ast>),
    Function(&'ast FunctionDefinition<'ast>),
}

impl ClassMember<'_> {
    pub fn id(&self) -> NodeId {
        match self {
            ClassMember::Field(f) => f.id,
            ClassMember::Function(f) => f.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ClassMember::Field(f) => f.position,
            ClassMember::Function(f) => f.position,
        }
    }
}

/// A data member. Bitfield classes give each member a width in bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDeclaration<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub initializer: Option<&'ast Expr<'ast>>,
    pub bits: Option<u32>,
    pub is_constant: bool,
    pub visibility: Visibility,
    pub attributes: &'ast [Attribute<'ast>],
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassDefinition<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub generics: &'ast [Ident<'ast>],
    pub parents: &'ast [TypeExpr<'ast>],
    pub members: &'ast [ClassMember<'ast>],
    pub modifiers: ClassModifiers,
    /// Underlying native of a bitfield class.
    pub bitfield_type: Option<TypeExpr<'ast>>,
    pub visibility: Visibility,
    pub attributes: &'ast [Attribute<'ast>],
    pub position: Position,
}

impl<'ast> ClassDefinition<'ast> {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn functions(&self) -> impl Iterator<Item = &'ast FunctionDefinition<'ast>> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Function(f) => Some(*f),
            ClassMember::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &'ast FieldDeclaration<'ast>> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Field(f) => Some(*f),
            ClassMember::Function(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamespaceDefinition<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub statements: &'ast [super::Stmt<'ast>],
    pub visibility: Visibility,
    pub position: Position,
}

/// One name in an import or export list: `name` or `name as alias`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportItem<'ast> {
    pub name: Ident<'ast>,
    pub alias: Option<Ident<'ast>>,
}

impl<'ast> ImportItem<'ast> {
    /// The name the item is bound to locally.
    pub fn local_name(&self) -> &'ast str {
        self.alias.unwrap_or(self.name).name
    }
}

/// `import "m"`, `import { a, b as c } from "m"`, `import * as m from "m"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportStmt<'ast> {
    pub id: NodeId,
    pub request: &'ast str,
    /// Selected items; `None` imports everything exported.
    pub items: Option<&'ast [ImportItem<'ast>]>,
    /// Bind the module's exports under one namespace name.
    pub namespace: Option<Ident<'ast>>,
    pub position: Position,
}

/// `export { a, b as c }`, `export { a } from "m"`, `export * from "m"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportStmt<'ast> {
    pub id: NodeId,
    pub items: &'ast [ImportItem<'ast>],
    /// Re-export from another module.
    pub from: Option<&'ast str>,
    pub wildcard: bool,
    pub position: Position,
}

/// `using a.b.c as d;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsingStmt<'ast> {
    pub id: NodeId,
    pub path: &'ast [Ident<'ast>],
    pub alias: Option<Ident<'ast>>,
    pub position: Position,
}

impl<'ast> UsingStmt<'ast> {
    /// The local name: the alias, or the last path segment.
    pub fn local_name(&self) -> Option<&'ast str> {
        self.alias.or_else(|| self.path.last().copied()).map(|i| i.name)
    }
}
