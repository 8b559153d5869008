//! Expression nodes.

use ordered_float::OrderedFloat;
use tessera_core::{BinaryOperator, NodeId, Position, UnaryOperator};

use super::{Block, Ident, Parameter, TypeExpr};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Literal(&'ast LiteralExpr<'ast>),
    /// A bare name: `x`, `print`, `Box<int>`
    Fetch(&'ast FetchExpr<'ast>),
    /// Member access: `a.b`
    Accessor(&'ast AccessorExpr<'ast>),
    Call(&'ast CallExpr<'ast>),
    New(&'ast NewExpr<'ast>),
    Binary(&'ast BinaryExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    Assignment(&'ast AssignmentExpr<'ast>),
    /// `c ? a : b`
    Conditional(&'ast ConditionalExpr<'ast>),
    Cast(&'ast CastExpr<'ast>),
    Index(&'ast IndexExpr<'ast>),
    Lambda(&'ast LambdaExpr<'ast>),
    This(&'ast MarkerExpr),
    Super(&'ast MarkerExpr),
    Await(&'ast AwaitExpr<'ast>),
    Yield(&'ast YieldExpr<'ast>),
    SizeOf(&'ast SizeOfExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Literal(e) => e.id,
            Self::Fetch(e) => e.id,
            Self::Accessor(e) => e.id,
            Self::Call(e) => e.id,
            Self::New(e) => e.id,
            Self::Binary(e) => e.id,
            Self::Unary(e) => e.id,
            Self::Assignment(e) => e.id,
            Self::Conditional(e) => e.id,
            Self::Cast(e) => e.id,
            Self::Index(e) => e.id,
            Self::Lambda(e) => e.id,
            Self::This(e) | Self::Super(e) => e.id,
            Self::Await(e) => e.id,
            Self::Yield(e) => e.id,
            Self::SizeOf(e) => e.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Literal(e) => e.position,
            Self::Fetch(e) => e.position,
            Self::Accessor(e) => e.position,
            Self::Call(e) => e.position,
            Self::New(e) => e.position,
            Self::Binary(e) => e.position,
            Self::Unary(e) => e.position,
            Self::Assignment(e) => e.position,
            Self::Conditional(e) => e.position,
            Self::Cast(e) => e.position,
            Self::Index(e) => e.position,
            Self::Lambda(e) => e.position,
            Self::This(e) | Self::Super(e) => e.position,
            Self::Await(e) => e.position,
            Self::Yield(e) => e.position,
            Self::SizeOf(e) => e.position,
        }
    }

    /// Short description for diagnostics and validation context.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Fetch(_) => "name",
            Self::Accessor(_) => "member access",
            Self::Call(_) => "call",
            Self::New(_) => "new",
            Self::Binary(_) => "binary expression",
            Self::Unary(_) => "unary expression",
            Self::Assignment(_) => "assignment",
            Self::Conditional(_) => "conditional",
            Self::Cast(_) => "cast",
            Self::Index(_) => "index",
            Self::Lambda(_) => "lambda",
            Self::This(_) => "this",
            Self::Super(_) => "super",
            Self::Await(_) => "await",
            Self::Yield(_) => "yield",
            Self::SizeOf(_) => "sizeof",
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub id: NodeId,
    pub value: LiteralValue<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralValue<'ast> {
    Int(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Bool(bool),
    String(&'ast str),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchExpr<'ast> {
    pub id: NodeId,
    pub name: Ident<'ast>,
    pub generic_args: &'ast [TypeExpr<'ast>],
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessorExpr<'ast> {
    pub id: NodeId,
    pub object: &'ast Expr<'ast>,
    pub member: Ident<'ast>,
    pub generic_args: &'ast [TypeExpr<'ast>],
    pub position: Position,
}

/// A call argument, optionally named (`name: value`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Argument<'ast> {
    pub name: Option<Ident<'ast>>,
    pub value: &'ast Expr<'ast>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub id: NodeId,
    pub callee: &'ast Expr<'ast>,
    pub args: &'ast [Argument<'ast>],
    pub position: Position,
}

/// `new T(args)` or `new persistent T(args)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewExpr<'ast> {
    pub id: NodeId,
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [Argument<'ast>],
    /// Heap allocation; the expression yields a pointer.
    pub persistent: bool,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub id: NodeId,
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOperator,
    pub right: &'ast Expr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub id: NodeId,
    pub op: UnaryOperator,
    pub operand: &'ast Expr<'ast>,
    pub position: Position,
}

/// `target = value` or a compound form such as `target += value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentExpr<'ast> {
    pub id: NodeId,
    pub target: &'ast Expr<'ast>,
    pub op: Option<BinaryOperator>,
    pub value: &'ast Expr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionalExpr<'ast> {
    pub id: NodeId,
    pub condition: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub position: Position,
}

/// `value as T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub id: NodeId,
    pub value: &'ast Expr<'ast>,
    pub ty: TypeExpr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub id: NodeId,
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaExpr<'ast> {
    pub id: NodeId,
    pub parameters: &'ast [Parameter<'ast>],
    pub return_type: Option<TypeExpr<'ast>>,
    pub body: &'ast Block<'ast>,
    pub position: Position,
}

/// A keyword expression with no operands (`this`, `super`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerExpr {
    pub id: NodeId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AwaitExpr<'ast> {
    pub id: NodeId,
    pub value: &'ast Expr<'ast>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldExpr<'ast> {
    pub id: NodeId,
    pub value: Option<&'ast Expr<'ast>>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeOfExpr<'ast> {
    pub id: NodeId,
    pub ty: TypeExpr<'ast>,
    pub position: Position,
}
