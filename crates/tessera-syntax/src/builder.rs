//! Arena-backed AST construction.
//!
//! [`AstBuilder`] allocates nodes in a `bumpalo` arena and stamps each with a
//! fresh [`NodeId`] and the builder's current [`Position`]. Parsers, tests and
//! the detailer (when it synthesises constructors) all build trees through it.
//!
//! ```
//! use bumpalo::Bump;
//! use tessera_syntax::AstBuilder;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let call = b.call(b.fetch("add"), &[b.int(1), b.int(2)]);
//! let root = b.root(&[b.expr_stmt(call)]);
//! assert_eq!(root.statements.len(), 1);
//! ```

use std::cell::Cell;

use bumpalo::Bump;
use ordered_float::OrderedFloat;
use tessera_core::{
    AccessorKind, BinaryOperator, FileId, Modifier, NativeType, NodeId, Operator, Orientation,
    Position, UnaryOperator, Visibility,
};

use crate::ast::*;

pub struct AstBuilder<'ast> {
    arena: &'ast Bump,
    position: Cell<Position>,
}

impl<'ast> AstBuilder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            position: Cell::new(Position::default()),
        }
    }

    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    /// Stamp subsequently built nodes with this line and column.
    pub fn at(&self, line: u32, column: u32) -> &Self {
        let file = self.position.get().file;
        self.position.set(Position::at(file, line, column, 0));
        self
    }

    /// Stamp subsequently built nodes with this position.
    pub fn at_position(&self, position: Position) -> &Self {
        self.position.set(position);
        self
    }

    /// Stamp subsequently built nodes with this file.
    pub fn in_file(&self, file: FileId) -> &Self {
        let mut position = self.position.get();
        position.file = file;
        self.position.set(position);
        self
    }

    pub fn position(&self) -> Position {
        self.position.get()
    }

    // ========================================================================
    // Arena helpers
    // ========================================================================

    pub fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    pub fn slice<T: Copy>(&self, items: &[T]) -> &'ast [T] {
        self.arena.alloc_slice_copy(items)
    }

    pub fn str(&self, text: &str) -> &'ast str {
        self.arena.alloc_str(text)
    }

    pub fn ident(&self, name: &str) -> Ident<'ast> {
        Ident::new(self.str(name), self.position())
    }

    pub fn path(&self, names: &[&str]) -> &'ast [Ident<'ast>] {
        let idents: Vec<Ident<'ast>> = names.iter().map(|n| self.ident(n)).collect();
        self.slice(&idents)
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_expr(&self, kind: TypeExprKind<'ast>) -> TypeExpr<'ast> {
        TypeExpr {
            id: NodeId::fresh(),
            kind,
            modifiers: &[],
            position: self.position(),
        }
    }

    pub fn ty_native(&self, native: NativeType) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Native(native))
    }

    pub fn ty_int(&self) -> TypeExpr<'ast> {
        self.ty_native(NativeType::Integer)
    }

    pub fn ty_named(&self, name: &str) -> TypeExpr<'ast> {
        self.ty_path(&[name])
    }

    pub fn ty_path(&self, names: &[&str]) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Named {
            path: self.path(names),
            generic_args: &[],
        })
    }

    pub fn ty_generic(&self, name: &str, args: &[TypeExpr<'ast>]) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Named {
            path: self.path(&[name]),
            generic_args: self.slice(args),
        })
    }

    pub fn ty_self(&self) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::SelfType)
    }

    pub fn ty_any(&self) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Any)
    }

    pub fn ty_union(&self, members: &[TypeExpr<'ast>]) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Union(self.slice(members)))
    }

    pub fn ty_optional(&self, inner: TypeExpr<'ast>) -> TypeExpr<'ast> {
        self.type_expr(TypeExprKind::Optional(self.alloc(inner)))
    }

    pub fn ty_function(
        &self,
        parameters: &[(&str, TypeExpr<'ast>)],
        return_type: TypeExpr<'ast>,
    ) -> TypeExpr<'ast> {
        let parameters: Vec<FunctionTypeParameter<'ast>> = parameters
            .iter()
            .map(|(name, ty)| FunctionTypeParameter {
                name: Some(self.ident(name)),
                ty: self.alloc(*ty),
                is_variadic: false,
            })
            .collect();
        self.type_expr(TypeExprKind::Function {
            parameters: self.slice(&parameters),
            return_type: self.alloc(return_type),
        })
    }

    /// Replace the modifier layers of a type expression.
    pub fn with_modifiers(&self, ty: TypeExpr<'ast>, modifiers: &[Modifier]) -> TypeExpr<'ast> {
        TypeExpr {
            modifiers: self.slice(modifiers),
            ..ty
        }
    }

    /// `T&`
    pub fn ty_reference(&self, ty: TypeExpr<'ast>) -> TypeExpr<'ast> {
        self.push_layer(ty, Modifier::REFERENCE)
    }

    /// `T*`
    pub fn ty_pointer(&self, ty: TypeExpr<'ast>) -> TypeExpr<'ast> {
        self.push_layer(ty, Modifier::POINTER)
    }

    /// `const T`
    pub fn ty_const(&self, ty: TypeExpr<'ast>) -> TypeExpr<'ast> {
        let mut layers: Vec<Modifier> = ty.modifiers.to_vec();
        match layers.first_mut() {
            Some(first) if !first.is_indirection() => first.insert(Modifier::CONSTANT),
            _ => layers.insert(0, Modifier::CONSTANT),
        }
        self.with_modifiers(ty, &layers)
    }

    fn push_layer(&self, ty: TypeExpr<'ast>, layer: Modifier) -> TypeExpr<'ast> {
        let mut layers: Vec<Modifier> = ty.modifiers.to_vec();
        layers.push(layer);
        self.with_modifiers(ty, &layers)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn literal(&self, value: LiteralValue<'ast>) -> Expr<'ast> {
        Expr::Literal(self.alloc(LiteralExpr {
            id: NodeId::fresh(),
            value,
            position: self.position(),
        }))
    }

    pub fn int(&self, value: i64) -> Expr<'ast> {
        self.literal(LiteralValue::Int(value))
    }

    pub fn float(&self, value: f32) -> Expr<'ast> {
        self.literal(LiteralValue::Float(OrderedFloat(value)))
    }

    pub fn double(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralValue::Double(OrderedFloat(value)))
    }

    pub fn boolean(&self, value: bool) -> Expr<'ast> {
        self.literal(LiteralValue::Bool(value))
    }

    pub fn string(&self, value: &str) -> Expr<'ast> {
        self.literal(LiteralValue::String(self.str(value)))
    }

    pub fn null(&self) -> Expr<'ast> {
        self.literal(LiteralValue::Null)
    }

    pub fn fetch(&self, name: &str) -> Expr<'ast> {
        self.fetch_generic(name, &[])
    }

    pub fn fetch_generic(&self, name: &str, args: &[TypeExpr<'ast>]) -> Expr<'ast> {
        Expr::Fetch(self.alloc(FetchExpr {
            id: NodeId::fresh(),
            name: self.ident(name),
            generic_args: self.slice(args),
            position: self.position(),
        }))
    }

    pub fn member(&self, object: Expr<'ast>, name: &str) -> Expr<'ast> {
        Expr::Accessor(self.alloc(AccessorExpr {
            id: NodeId::fresh(),
            object: self.alloc(object),
            member: self.ident(name),
            generic_args: &[],
            position: self.position(),
        }))
    }

    pub fn arg(&self, value: Expr<'ast>) -> Argument<'ast> {
        Argument {
            name: None,
            value: self.alloc(value),
        }
    }

    pub fn named(&self, name: &str, value: Expr<'ast>) -> Argument<'ast> {
        Argument {
            name: Some(self.ident(name)),
            value: self.alloc(value),
        }
    }

    fn args(&self, values: &[Expr<'ast>]) -> &'ast [Argument<'ast>] {
        let args: Vec<Argument<'ast>> = values.iter().map(|v| self.arg(*v)).collect();
        self.slice(&args)
    }

    /// Call with positional arguments.
    pub fn call(&self, callee: Expr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        let args = self.args(args);
        self.call_with(callee, args)
    }

    /// Call with explicit (possibly named) arguments.
    pub fn call_args(&self, callee: Expr<'ast>, args: &[Argument<'ast>]) -> Expr<'ast> {
        self.call_with(callee, self.slice(args))
    }

    fn call_with(&self, callee: Expr<'ast>, args: &'ast [Argument<'ast>]) -> Expr<'ast> {
        Expr::Call(self.alloc(CallExpr {
            id: NodeId::fresh(),
            callee: self.alloc(callee),
            args,
            position: self.position(),
        }))
    }

    pub fn new_object(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        self.new_expr(ty, args, false)
    }

    pub fn new_persistent(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        self.new_expr(ty, args, true)
    }

    fn new_expr(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>], persistent: bool) -> Expr<'ast> {
        Expr::New(self.alloc(NewExpr {
            id: NodeId::fresh(),
            ty,
            args: self.args(args),
            persistent,
            position: self.position(),
        }))
    }

    pub fn binary(&self, left: Expr<'ast>, op: BinaryOperator, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.alloc(BinaryExpr {
            id: NodeId::fresh(),
            left: self.alloc(left),
            op,
            right: self.alloc(right),
            position: self.position(),
        }))
    }

    pub fn unary(&self, op: UnaryOperator, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Unary(self.alloc(UnaryExpr {
            id: NodeId::fresh(),
            op,
            operand: self.alloc(operand),
            position: self.position(),
        }))
    }

    pub fn assign(&self, target: Expr<'ast>, value: Expr<'ast>) -> Expr<'ast> {
        self.compound_assign(target, None, value)
    }

    pub fn compound_assign(
        &self,
        target: Expr<'ast>,
        op: Option<BinaryOperator>,
        value: Expr<'ast>,
    ) -> Expr<'ast> {
        Expr::Assignment(self.alloc(AssignmentExpr {
            id: NodeId::fresh(),
            target: self.alloc(target),
            op,
            value: self.alloc(value),
            position: self.position(),
        }))
    }

    pub fn conditional(
        &self,
        condition: Expr<'ast>,
        then_expr: Expr<'ast>,
        else_expr: Expr<'ast>,
    ) -> Expr<'ast> {
        Expr::Conditional(self.alloc(ConditionalExpr {
            id: NodeId::fresh(),
            condition: self.alloc(condition),
            then_expr: self.alloc(then_expr),
            else_expr: self.alloc(else_expr),
            position: self.position(),
        }))
    }

    pub fn cast(&self, value: Expr<'ast>, ty: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Cast(self.alloc(CastExpr {
            id: NodeId::fresh(),
            value: self.alloc(value),
            ty,
            position: self.position(),
        }))
    }

    pub fn index(&self, object: Expr<'ast>, index: Expr<'ast>) -> Expr<'ast> {
        Expr::Index(self.alloc(IndexExpr {
            id: NodeId::fresh(),
            object: self.alloc(object),
            index: self.alloc(index),
            position: self.position(),
        }))
    }

    pub fn lambda(
        &self,
        parameters: &[Parameter<'ast>],
        return_type: Option<TypeExpr<'ast>>,
        body: &[Stmt<'ast>],
    ) -> Expr<'ast> {
        Expr::Lambda(self.alloc(LambdaExpr {
            id: NodeId::fresh(),
            parameters: self.slice(parameters),
            return_type,
            body: self.block(body),
            position: self.position(),
        }))
    }

    fn marker(&self) -> &'ast MarkerExpr {
        self.alloc(MarkerExpr {
            id: NodeId::fresh(),
            position: self.position(),
        })
    }

    pub fn this(&self) -> Expr<'ast> {
        Expr::This(self.marker())
    }

    pub fn super_(&self) -> Expr<'ast> {
        Expr::Super(self.marker())
    }

    pub fn await_(&self, value: Expr<'ast>) -> Expr<'ast> {
        Expr::Await(self.alloc(AwaitExpr {
            id: NodeId::fresh(),
            value: self.alloc(value),
            position: self.position(),
        }))
    }

    pub fn yield_(&self, value: Option<Expr<'ast>>) -> Expr<'ast> {
        Expr::Yield(self.alloc(YieldExpr {
            id: NodeId::fresh(),
            value: value.map(|v| self.alloc(v)),
            position: self.position(),
        }))
    }

    pub fn size_of(&self, ty: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::SizeOf(self.alloc(SizeOfExpr {
            id: NodeId::fresh(),
            ty,
            position: self.position(),
        }))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn expr_stmt(&self, expr: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Expression(self.alloc(ExpressionStmt {
            id: NodeId::fresh(),
            expr: self.alloc(expr),
            position: self.position(),
        }))
    }

    /// A variable declaration value, for callers that want to set flags.
    pub fn variable(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        initializer: Option<Expr<'ast>>,
    ) -> VariableDeclaration<'ast> {
        VariableDeclaration {
            id: NodeId::fresh(),
            name: self.ident(name),
            ty,
            initializer: initializer.map(|e| self.alloc(e)),
            is_constant: false,
            is_export: false,
            visibility: Visibility::Public,
            attributes: &[],
            position: self.position(),
        }
    }

    pub fn var(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        initializer: Option<Expr<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::VariableDeclaration(self.alloc(self.variable(name, ty, initializer)))
    }

    pub fn declare(&self, declaration: VariableDeclaration<'ast>) -> Stmt<'ast> {
        Stmt::VariableDeclaration(self.alloc(declaration))
    }

    pub fn block(&self, statements: &[Stmt<'ast>]) -> &'ast Block<'ast> {
        self.alloc(Block {
            id: NodeId::fresh(),
            statements: self.slice(statements),
            position: self.position(),
        })
    }

    pub fn block_stmt(&self, statements: &[Stmt<'ast>]) -> Stmt<'ast> {
        Stmt::Block(self.block(statements))
    }

    pub fn ret(&self, value: Option<Expr<'ast>>) -> Stmt<'ast> {
        Stmt::Return(self.alloc(ReturnStmt {
            id: NodeId::fresh(),
            value: value.map(|v| self.alloc(v)),
            position: self.position(),
        }))
    }

    pub fn if_(
        &self,
        condition: Expr<'ast>,
        then_branch: Stmt<'ast>,
        else_branch: Option<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::If(self.alloc(IfStmt {
            id: NodeId::fresh(),
            condition: self.alloc(condition),
            then_branch: self.alloc(then_branch),
            else_branch: else_branch.map(|s| self.alloc(s)),
            position: self.position(),
        }))
    }

    pub fn while_(&self, condition: Expr<'ast>, body: Stmt<'ast>) -> Stmt<'ast> {
        self.loop_stmt(condition, body, false)
    }

    pub fn do_while(&self, body: Stmt<'ast>, condition: Expr<'ast>) -> Stmt<'ast> {
        self.loop_stmt(condition, body, true)
    }

    fn loop_stmt(&self, condition: Expr<'ast>, body: Stmt<'ast>, is_do_while: bool) -> Stmt<'ast> {
        Stmt::While(self.alloc(WhileStmt {
            id: NodeId::fresh(),
            condition: self.alloc(condition),
            body: self.alloc(body),
            is_do_while,
            position: self.position(),
        }))
    }

    pub fn for_(
        &self,
        init: Option<Stmt<'ast>>,
        condition: Option<Expr<'ast>>,
        update: Option<Expr<'ast>>,
        body: Stmt<'ast>,
    ) -> Stmt<'ast> {
        Stmt::For(self.alloc(ForStmt {
            id: NodeId::fresh(),
            init: init.map(|s| self.alloc(s)),
            condition: condition.map(|e| self.alloc(e)),
            update: update.map(|e| self.alloc(e)),
            body: self.alloc(body),
            position: self.position(),
        }))
    }

    pub fn ranged_for(&self, variable: &str, iterable: Expr<'ast>, body: Stmt<'ast>) -> Stmt<'ast> {
        Stmt::RangedFor(self.alloc(RangedForStmt {
            id: NodeId::fresh(),
            variable: self.ident(variable),
            ty: None,
            iterable: self.alloc(iterable),
            body: self.alloc(body),
            position: self.position(),
        }))
    }

    fn jump(&self) -> &'ast JumpStmt {
        self.alloc(JumpStmt {
            id: NodeId::fresh(),
            position: self.position(),
        })
    }

    pub fn break_(&self) -> Stmt<'ast> {
        Stmt::Break(self.jump())
    }

    pub fn continue_(&self) -> Stmt<'ast> {
        Stmt::Continue(self.jump())
    }

    pub fn throw(&self, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Throw(self.alloc(ThrowStmt {
            id: NodeId::fresh(),
            value: self.alloc(value),
            position: self.position(),
        }))
    }

    pub fn catch(
        &self,
        variable: Option<&str>,
        ty: Option<TypeExpr<'ast>>,
        body: &[Stmt<'ast>],
    ) -> CatchClause<'ast> {
        CatchClause {
            id: NodeId::fresh(),
            variable: variable.map(|v| self.ident(v)),
            ty,
            body: self.block(body),
            position: self.position(),
        }
    }

    pub fn try_catch(&self, body: &[Stmt<'ast>], catches: &[CatchClause<'ast>]) -> Stmt<'ast> {
        Stmt::TryCatch(self.alloc(TryCatchStmt {
            id: NodeId::fresh(),
            body: self.block(body),
            catches: self.slice(catches),
            position: self.position(),
        }))
    }

    pub fn delete(&self, value: Expr<'ast>, persistent: bool) -> Stmt<'ast> {
        Stmt::Delete(self.alloc(DeleteStmt {
            id: NodeId::fresh(),
            value: self.alloc(value),
            persistent,
            position: self.position(),
        }))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    pub fn param(&self, name: &str, ty: TypeExpr<'ast>) -> Parameter<'ast> {
        Parameter {
            id: NodeId::fresh(),
            name: self.ident(name),
            ty,
            default: None,
            is_variadic: false,
            position: self.position(),
        }
    }

    pub fn param_default(&self, name: &str, ty: TypeExpr<'ast>, default: Expr<'ast>) -> Parameter<'ast> {
        Parameter {
            default: Some(self.alloc(default)),
            ..self.param(name, ty)
        }
    }

    pub fn param_variadic(&self, name: &str, ty: TypeExpr<'ast>) -> Parameter<'ast> {
        Parameter {
            is_variadic: true,
            ..self.param(name, ty)
        }
    }

    /// A plain function with a body. Adjust the returned value's fields for
    /// other roles, then wrap it with [`AstBuilder::function_stmt`].
    pub fn function(
        &self,
        name: &str,
        parameters: &[Parameter<'ast>],
        return_type: Option<TypeExpr<'ast>>,
        body: &[Stmt<'ast>],
    ) -> FunctionDefinition<'ast> {
        FunctionDefinition {
            id: NodeId::fresh(),
            name: self.ident(name),
            role: FunctionRole::Plain,
            generics: &[],
            parameters: self.slice(parameters),
            return_type,
            generator_parameter: None,
            body: Some(self.block(body)),
            modifiers: FunctionModifiers::empty(),
            visibility: Visibility::Public,
            attributes: &[],
            position: self.position(),
        }
    }

    pub fn constructor(&self, parameters: &[Parameter<'ast>], body: &[Stmt<'ast>]) -> FunctionDefinition<'ast> {
        FunctionDefinition {
            role: FunctionRole::Constructor,
            ..self.function("constructor", parameters, None, body)
        }
    }

    pub fn destructor(&self, body: &[Stmt<'ast>]) -> FunctionDefinition<'ast> {
        FunctionDefinition {
            role: FunctionRole::Destructor,
            ..self.function("destructor", &[], None, body)
        }
    }

    pub fn operator(
        &self,
        operator: Operator,
        orientation: Orientation,
        parameters: &[Parameter<'ast>],
        return_type: TypeExpr<'ast>,
        body: &[Stmt<'ast>],
    ) -> FunctionDefinition<'ast> {
        FunctionDefinition {
            role: FunctionRole::Operator(operator, orientation),
            ..self.function(
                &format!("operator{}", operator.symbol()),
                parameters,
                Some(return_type),
                body,
            )
        }
    }

    /// `from(value: T)` when `direction` is `From`, `to(): T` otherwise.
    pub fn cast_function(
        &self,
        direction: CastDirection,
        ty: TypeExpr<'ast>,
        body: &[Stmt<'ast>],
    ) -> FunctionDefinition<'ast> {
        match direction {
            CastDirection::From => FunctionDefinition {
                role: FunctionRole::Cast(direction),
                ..self.function("from", &[self.param("value", ty)], None, body)
            },
            CastDirection::To => FunctionDefinition {
                role: FunctionRole::Cast(direction),
                ..self.function("to", &[], Some(ty), body)
            },
        }
    }

    pub fn accessor(
        &self,
        kind: AccessorKind,
        name: &str,
        ty: TypeExpr<'ast>,
        body: &[Stmt<'ast>],
    ) -> FunctionDefinition<'ast> {
        match kind {
            AccessorKind::Get => FunctionDefinition {
                role: FunctionRole::Accessor(kind),
                ..self.function(name, &[], Some(ty), body)
            },
            AccessorKind::Set => FunctionDefinition {
                role: FunctionRole::Accessor(kind),
                ..self.function(name, &[self.param("value", ty)], None, body)
            },
        }
    }

    pub fn generics(&self, names: &[&str]) -> &'ast [Ident<'ast>] {
        self.path(names)
    }

    pub fn function_stmt(&self, definition: FunctionDefinition<'ast>) -> Stmt<'ast> {
        Stmt::Function(self.alloc(definition))
    }

    pub fn field(
        &self,
        name: &str,
        ty: Option<TypeExpr<'ast>>,
        initializer: Option<Expr<'ast>>,
    ) -> FieldDeclaration<'ast> {
        FieldDeclaration {
            id: NodeId::fresh(),
            name: self.ident(name),
            ty,
            initializer: initializer.map(|e| self.alloc(e)),
            bits: None,
            is_constant: false,
            visibility: Visibility::Public,
            attributes: &[],
            position: self.position(),
        }
    }

    pub fn field_member(&self, field: FieldDeclaration<'ast>) -> ClassMember<'ast> {
        ClassMember::Field(self.alloc(field))
    }

    pub fn method_member(&self, function: FunctionDefinition<'ast>) -> ClassMember<'ast> {
        ClassMember::Function(self.alloc(function))
    }

    pub fn class(
        &self,
        name: &str,
        parents: &[TypeExpr<'ast>],
        members: &[ClassMember<'ast>],
    ) -> ClassDefinition<'ast> {
        ClassDefinition {
            id: NodeId::fresh(),
            name: self.ident(name),
            generics: &[],
            parents: self.slice(parents),
            members: self.slice(members),
            modifiers: ClassModifiers::empty(),
            bitfield_type: None,
            visibility: Visibility::Public,
            attributes: &[],
            position: self.position(),
        }
    }

    pub fn class_stmt(&self, definition: ClassDefinition<'ast>) -> Stmt<'ast> {
        Stmt::Class(self.alloc(definition))
    }

    pub fn namespace(&self, name: &str, statements: &[Stmt<'ast>]) -> Stmt<'ast> {
        Stmt::Namespace(self.alloc(NamespaceDefinition {
            id: NodeId::fresh(),
            name: self.ident(name),
            statements: self.slice(statements),
            visibility: Visibility::Public,
            position: self.position(),
        }))
    }

    pub fn import_item(&self, name: &str, alias: Option<&str>) -> ImportItem<'ast> {
        ImportItem {
            name: self.ident(name),
            alias: alias.map(|a| self.ident(a)),
        }
    }

    fn import_items(&self, names: &[&str]) -> &'ast [ImportItem<'ast>] {
        let items: Vec<ImportItem<'ast>> = names.iter().map(|n| self.import_item(n, None)).collect();
        self.slice(&items)
    }

    /// `import "request"`
    pub fn import_all(&self, request: &str) -> Stmt<'ast> {
        self.import_stmt(request, None, None)
    }

    /// `import { names } from "request"`
    pub fn import(&self, request: &str, names: &[&str]) -> Stmt<'ast> {
        let items = self.import_items(names);
        self.import_stmt(request, Some(items), None)
    }

    /// `import * as namespace from "request"`
    pub fn import_as(&self, request: &str, namespace: &str) -> Stmt<'ast> {
        let namespace = self.ident(namespace);
        self.import_stmt(request, None, Some(namespace))
    }

    fn import_stmt(
        &self,
        request: &str,
        items: Option<&'ast [ImportItem<'ast>]>,
        namespace: Option<Ident<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::Import(self.alloc(ImportStmt {
            id: NodeId::fresh(),
            request: self.str(request),
            items,
            namespace,
            position: self.position(),
        }))
    }

    /// `export { names }`
    pub fn export(&self, names: &[&str]) -> Stmt<'ast> {
        self.export_stmt(self.import_items(names), None, false)
    }

    /// `export { names } from "request"`
    pub fn export_from(&self, request: &str, names: &[&str]) -> Stmt<'ast> {
        self.export_stmt(self.import_items(names), Some(self.str(request)), false)
    }

    /// `export * from "request"`
    pub fn export_all_from(&self, request: &str) -> Stmt<'ast> {
        self.export_stmt(&[], Some(self.str(request)), true)
    }

    fn export_stmt(
        &self,
        items: &'ast [ImportItem<'ast>],
        from: Option<&'ast str>,
        wildcard: bool,
    ) -> Stmt<'ast> {
        Stmt::Export(self.alloc(ExportStmt {
            id: NodeId::fresh(),
            items,
            from,
            wildcard,
            position: self.position(),
        }))
    }

    pub fn using(&self, path: &[&str], alias: Option<&str>) -> Stmt<'ast> {
        Stmt::Using(self.alloc(UsingStmt {
            id: NodeId::fresh(),
            path: self.path(path),
            alias: alias.map(|a| self.ident(a)),
            position: self.position(),
        }))
    }

    pub fn attribute(&self, path: &[&str], arguments: &[AttributeArgument<'ast>]) -> Attribute<'ast> {
        Attribute {
            path: self.path(path),
            arguments: self.slice(arguments),
            position: self.position(),
        }
    }

    pub fn attribute_expr(&self, value: Expr<'ast>) -> AttributeArgument<'ast> {
        AttributeArgument::Expr(self.alloc(value))
    }

    pub fn attribute_type(&self, ty: TypeExpr<'ast>) -> AttributeArgument<'ast> {
        AttributeArgument::Type(self.alloc(ty))
    }

    pub fn root(&self, statements: &[Stmt<'ast>]) -> &'ast RootNode<'ast> {
        self.alloc(RootNode {
            id: NodeId::fresh(),
            file: self.position().file,
            statements: self.slice(statements),
            position: self.position(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_get_distinct_ids() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let a = b.int(1);
        let c = b.int(1);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn position_is_stamped() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        b.at(4, 9);
        let call = b.call(b.fetch("foo"), &[]);
        assert_eq!(call.position(), Position::new(4, 9));
    }

    #[test]
    fn named_arguments() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let call = b.call_args(b.fetch("add"), &[b.named("b", b.int(2)), b.named("a", b.int(1))]);
        let Expr::Call(call) = call else {
            panic!("expected call");
        };
        assert_eq!(call.args[0].name.map(|n| n.name), Some("b"));
        assert_eq!(call.args[1].name.map(|n| n.name), Some("a"));
    }

    #[test]
    fn type_layers() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let ty = b.ty_reference(b.ty_const(b.ty_int()));
        assert_eq!(ty.modifiers, &[Modifier::CONSTANT, Modifier::REFERENCE]);
        let ty = b.ty_const(b.ty_pointer(b.ty_int()));
        assert_eq!(ty.modifiers, &[Modifier::CONSTANT, Modifier::POINTER]);
    }

    #[test]
    fn optional_parameter_count() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let def = b.function(
            "f",
            &[
                b.param("a", b.ty_int()),
                b.param_default("b", b.ty_int(), b.int(1)),
                b.param_default("c", b.ty_int(), b.int(2)),
            ],
            None,
            &[],
        );
        assert_eq!(def.optional_parameter_count(), 2);
    }

    #[test]
    fn class_member_iterators() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let class = b.class(
            "Point",
            &[],
            &[
                b.field_member(b.field("x", Some(b.ty_int()), None)),
                b.method_member(b.function("len", &[], Some(b.ty_int()), &[])),
            ],
        );
        assert_eq!(class.fields().count(), 1);
        assert_eq!(class.functions().count(), 1);
    }
}
