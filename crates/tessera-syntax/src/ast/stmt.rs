//! Statement nodes.

use tessera_core::{NodeId, Position, Visibility};

use super::{
    Attribute, ClassDefinition, ExportStmt, Expr, FunctionDefinition, Ident, ImportStmt,
    NamespaceDefinition, TypeExpr, UsingStmt,
};

/// A statement. Declarations are statements too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    Expression(&'ast ExpressionStmt<'ast>),
    VariableDeclaration(&'ast VariableDeclaration<'ast>),
    Block(&'ast Block<'ast>),
    Return(&'ast ReturnStmt<'ast>),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    For(&'ast ForStmt<'ast>),
    RangedFor(&'ast RangedForStmt<'ast>),
    Break(&'ast JumpStmt),
    Continue(&'ast JumpStmt),
    Throw(&'ast ThrowStmt<'ast>),
    TryCatch(&'ast TryCatchStmt<'ast>),
    Delete(&'ast DeleteStmt<'ast>),
    Function(&'ast FunctionDefinition<'ast>),
    Class(&'ast ClassDefinition<'ast>),
    Namespace(&'ast NamespaceDefinition<'ast>),
    Import(&'ast ImportStmt<'ast>),
    Export(&'ast ExportStmt<'ast>),
    Using(&'ast UsingStmt<'ast>),
}

impl<'ast> Stmt<'ast> {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Expression(s) => s.id,
            Self::VariableDeclaration(s) => s.id,
            Self::Block(s) => s.id,
            Self::Return(s) => s.id,
            Self::If(s) => s.id,
            Self::While(s) => s.id,
            Self::For(s) => s.id,
            Self::RangedFor(s) => s.id,
            Self::Break(s) | Self::Continue(s) => s.id,
            Self::Throw(s) => s.id,
            Self::TryCatch(s) => s.id,
            Self::Delete(s) => s.id,
            Self::Function(s) => s.id,
            Self::Class(s) => s.id,
            Self::Namespace(s) => s.id,
            Self::Import(s) => s.id,
            Self::Export(s) => s.id,
            Self::Using(s) => s.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Expression(s) => s.position,
            Self::VariableDeclaration(s) => s.position,
            Self::Block(s) => s.position,
            Self::Return(s) => s.position,
            Self::If(s) => s.position,
            Self::While(s) => s.position,
            Self::For(s) => s.position,
            Self::RangedFor(s) => s.position,
            Self::Break(s) | Self::Continue(s) => s.position,
            Self::Throw(s) => s.position,
            Self::TryCatch(s) => s.position,
            Self::Delete(s) => s.position,
            Self::Function(s) => s.position,
            Self::Class(s) => s.position,
            Self::Namespace(s) => s.position,
            Self::Import(s) => s.position,
            Self::Export(s) => s.position,
            Self::Using(s) => s.position,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Expression(_) => "expression statement",
            Self::VariableDeclaration(_) => "variable declaration",
            Self::Block(_) => "block",
            Self::Return(_) => "return",
            Self::If(_) => "if",
            Self::While(s) if s.is_do_while => "do-while",
            Self::While(_) => "while",
            Self::For(_) => "for",
            Self::RangedFor(_) => "ranged for",
            Self::Break(_) => "break",
            Self::Continue(_) => "continue",
            Self::Throw(_) => "throw",
            Self::TryCatch(_) => "try",
            Self::Delete(_) => "delete",
            Self::Function(_) => "function",
            Self::Class(_) => "class",
            Self::Namespace(_) => "namespace",
            Self::Import(_) => "import",
            Self::Export(_) => "export",
            Self::Using(_) => "using",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionStmt<'ast> {
    pub id: NodeId,
    pub expr: &'ast Expr<'ast>,
    pub position: Position,
}

/// `let name: T = value;` or `const name = value;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableDeclaration<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub initializer: Option<&'ast Expr<'ast>>,
    pub is_constant: bool,
    pub is_export: bool,
    pub visibility: Visibility,
    pub attributes: &'ast [Attribute<'ast>],
    pub position: Position,
}

/// `{ ... }`. Does not open a scope by itself; the enclosing construct
/// decides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub id: NodeId,
    pub statements: &'ast [Stmt<'ast>],
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub id: NodeId,
    pub value: Option<&'ast Expr<'ast>>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub id: NodeId,
    pub condition: &'ast Expr<'ast>,
    pub then_branch: &'ast Stmt<'ast>,
    pub else_branch: Option<&'ast Stmt<'ast>>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub id: NodeId,
    pub condition: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
    pub is_do_while: bool,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub id: NodeId,
    pub init: Option<&'ast Stmt<'ast>>,
    pub condition: Option<&'ast Expr<'ast>>,
    pub update: Option<&'ast Expr<'ast>>,
    pub body: &'ast Stmt<'ast>,
    pub position: Position,
}

/// `for (name of iterable) body`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangedForStmt<'ast> {
    pub id: NodeId,
    pub variable: Ident<'ast>,
    pub ty: Option<TypeExpr<'ast>>,
    pub iterable: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
    pub position: Position,
}

/// `break` or `continue`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpStmt {
    pub id: NodeId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowStmt<'ast> {
    pub id: NodeId,
    pub value: &'ast Expr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TryCatchStmt<'ast> {
    pub id: NodeId,
    pub body: &'ast Block<'ast>,
    pub catches: &'ast [CatchClause<'ast>],
    pub position: Position,
}

/// `catch (name: T) { ... }`; without a type it catches everything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchClause<'ast> {
    pub id: NodeId,
    pub variable: Option<Ident<'ast>>,
    pub ty: Option<TypeExpr<'ast>>,
    pub body: &'ast Block<'ast>,
    pub position: Position,
}

/// `delete e` or `delete persistent e`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteStmt<'ast> {
    pub id: NodeId,
    pub value: &'ast Expr<'ast>,
    pub persistent: bool,
    pub position: Position,
}
