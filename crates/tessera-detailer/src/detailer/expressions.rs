//! Expression detailing.
//!
//! Each expression is detailed once per frame and leaves a handle carrying
//! its [`ExpressionInfo`]. Operators, names, calls and lambdas live in their
//! own modules; this one dispatches and handles the remaining forms.

use tessera_core::{DetailingError, ItemId, NativeType, ScopeId, Type};
use tessera_syntax::{AwaitExpr, CastExpr, ConditionalExpr, Expr, LiteralExpr, LiteralValue, NewExpr, SizeOfExpr, YieldExpr};

use super::types::{size_type, string_type};
use super::{Access, Detailer, Frame, Result};
use crate::compatibility::{compatibility, compatibility_match};
use crate::handles::{CastHandle, CastKind, DetailHandle, ExpressionInfo, NewHandle, SizeOfHandle, SuspendHandle};

impl<'ast> Detailer<'ast> {
    /// Detail an expression whose value is read.
    pub(crate) fn detail_expr(&mut self, frame: Frame, expr: &'ast Expr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        self.detail_expr_as(frame, expr, scope, Access::Read)
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn detail_expr_as(
        &mut self,
        frame: Frame,
        expr: &'ast Expr<'ast>,
        scope: ScopeId,
        access: Access,
    ) -> Result<ExpressionInfo> {
        match *expr {
            Expr::Literal(literal) => self.detail_literal(frame, literal),
            Expr::Fetch(fetch) => self.detail_fetch(frame, fetch, scope, access),
            Expr::Accessor(accessor) => self.detail_accessor(frame, accessor, scope, access),
            Expr::Call(call) => self.detail_call(frame, call, scope),
            Expr::New(new) => self.detail_new(frame, new, scope),
            Expr::Binary(binary) => self.detail_binary(frame, binary, scope),
            Expr::Unary(unary) => self.detail_unary(frame, unary, scope),
            Expr::Assignment(assignment) => self.detail_assignment(frame, assignment, scope),
            Expr::Conditional(conditional) => self.detail_conditional(frame, conditional, scope),
            Expr::Cast(cast) => self.detail_cast(frame, cast, scope),
            Expr::Index(index) => self.detail_index(frame, index, scope),
            Expr::Lambda(lambda) => self.detail_lambda(frame, lambda, scope),
            Expr::This(marker) => self.detail_this(frame, marker, scope),
            Expr::Super(marker) => self.detail_super(frame, marker, scope),
            Expr::Await(await_expr) => self.detail_await(frame, await_expr, scope),
            Expr::Yield(yield_expr) => self.detail_yield(frame, yield_expr, scope),
            Expr::SizeOf(size_of) => self.detail_size_of(frame, size_of, scope),
        }
    }

    fn detail_literal(&mut self, frame: Frame, literal: &'ast LiteralExpr<'ast>) -> Result<ExpressionInfo> {
        let ty = match literal.value {
            LiteralValue::Int(_) => Type::int(),
            LiteralValue::Float(_) => Type::native(NativeType::Float),
            LiteralValue::Double(_) => Type::native(NativeType::Double),
            LiteralValue::Bool(_) => Type::bool(),
            LiteralValue::String(_) => string_type(),
            LiteralValue::Null => Type::null(),
        };
        let info = ExpressionInfo::rvalue(ty);
        self.store(frame, literal.id, DetailHandle::Literal(info.clone()), literal.position)?;
        Ok(info)
    }

    /// `c ? a : b` takes the branch type the other converts to best. Two
    /// lvalues of the same type stay an lvalue.
    fn detail_conditional(
        &mut self,
        frame: Frame,
        expr: &'ast ConditionalExpr<'ast>,
        scope: ScopeId,
    ) -> Result<ExpressionInfo> {
        self.detail_expr(frame, expr.condition, scope)?;
        let then_info = self.detail_expr(frame, expr.then_expr, scope)?;
        let else_info = self.detail_expr(frame, expr.else_expr, scope)?;

        let info = if then_info.ty.is_exactly_compatible_with(&else_info.ty) {
            ExpressionInfo {
                ty: then_info.ty.clone(),
                is_lvalue: then_info.is_lvalue && else_info.is_lvalue,
                implicit_cast: None,
            }
        } else {
            let then_ty = then_info.ty.without_outer_references();
            let else_ty = else_info.ty.without_outer_references();
            let to_then = compatibility(&else_ty, &then_ty, &self.graph, &self.options);
            let to_else = compatibility(&then_ty, &else_ty, &self.graph, &self.options);
            if to_then == 0 && to_else == 0 {
                return Err(DetailingError::TypeMismatch {
                    expected: self.type_name(&then_info.ty),
                    found: self.type_name(&else_info.ty),
                    position: expr.position,
                });
            }
            let ty = if to_then >= to_else { then_ty } else { else_ty };
            ExpressionInfo::rvalue(ty.deconstify())
        };
        self.store(frame, expr.id, DetailHandle::Conditional(info.clone()), expr.position)?;
        Ok(info)
    }

    /// Explicit casts, from the most to the least checked kind: implicit or
    /// user conversions, native numeric casts, downcasts through pointers or
    /// references, then reinterpretation between indirections.
    fn detail_cast(&mut self, frame: Frame, expr: &'ast CastExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let value = self.detail_expr(frame, expr.value, scope)?;
        let target = self.resolve_type(frame, &expr.ty, scope)?;
        let from = value.ty.without_outer_references();

        let m = compatibility_match(&value.ty, &target, &self.graph, &self.options);
        let (kind, via) = if m.is_compatible() {
            match m.cast {
                Some(function) => (CastKind::User, Some(function)),
                None => (CastKind::Implicit, None),
            }
        } else if from.is_arithmetic() && target.without_outer_references().is_arithmetic() {
            (CastKind::Native, None)
        } else if self.is_downcast(&from, &target) {
            (CastKind::Downcast, None)
        } else if is_reinterpretable(&from, &target) {
            (CastKind::Reinterpret, None)
        } else {
            return Err(DetailingError::InvalidCast {
                from: self.type_name(&value.ty),
                to: self.type_name(&target),
                position: expr.position,
            });
        };

        let info = ExpressionInfo {
            is_lvalue: target.is_reference(),
            ty: target,
            implicit_cast: None,
        };
        let handle = CastHandle {
            info: info.clone(),
            kind,
            via,
        };
        self.store(frame, expr.id, DetailHandle::Cast(handle), expr.position)?;
        Ok(info)
    }

    /// A pointer or reference to a class cast to one of its descendants.
    fn is_downcast(&self, from: &Type, to: &Type) -> bool {
        let pointee = |ty: &Type| -> Option<ItemId> {
            let inner = if ty.is_reference() {
                ty.without_outer_references()
            } else {
                ty.follow()?.without_outer_references()
            };
            inner.class_id().filter(|_| inner.indirection_level() == 0)
        };
        let (Some(base), Some(derived)) = (pointee(from).or_else(|| class_value(from)), pointee(to)) else {
            return false;
        };
        self.graph.has_parent(derived, base)
    }

    /// `new T(args)` builds a value; `new persistent T(args)` a pointer.
    fn detail_new(&mut self, frame: Frame, expr: &'ast NewExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let ty = self.resolve_type(frame, &expr.ty, scope)?;
        let arguments = self.detail_arguments(frame, expr.args, scope)?;

        let (class, constructor, resolution) = if let Some(class) = class_value(&ty) {
            let (constructor, resolution) = self.construct(frame, class, &arguments, expr.args, scope, expr.position)?;
            (Some(class), constructor, resolution)
        } else if ty.is_arithmetic() || ty.indirection_level() > 0 {
            match arguments.as_slice() {
                [] => {}
                [single] => {
                    let from = single.options.first().map(|o| o.ty.clone()).unwrap_or_else(Type::any);
                    if let Some(arg) = expr.args.first() {
                        self.check_assignable(frame, arg.value, &from, &ty, expr.position)?;
                    }
                }
                _ => {
                    return Err(DetailingError::other(
                        expr.position,
                        format!("'{}' takes at most one initial value", self.type_name(&ty)),
                    ));
                }
            }
            (None, None, None)
        } else {
            return Err(DetailingError::other(
                expr.position,
                format!("cannot create a '{}' with new", self.type_name(&ty)),
            ));
        };

        let result = if expr.persistent { ty.point() } else { ty };
        let info = ExpressionInfo::rvalue(result);
        let handle = NewHandle {
            info: info.clone(),
            class,
            constructor,
            resolution,
            persistent: expr.persistent,
        };
        self.store(frame, expr.id, DetailHandle::New(handle), expr.position)?;
        Ok(info)
    }

    fn detail_size_of(&mut self, frame: Frame, expr: &'ast SizeOfExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let measured = self.resolve_type(frame, &expr.ty, scope)?;
        if measured.is_void() {
            return Err(DetailingError::other(expr.position, "'void' has no size"));
        }
        let info = ExpressionInfo::rvalue(size_type());
        let handle = SizeOfHandle {
            info: info.clone(),
            measured,
        };
        self.store(frame, expr.id, DetailHandle::SizeOf(handle), expr.position)?;
        Ok(info)
    }

    /// `await x` inside an async function. Awaiting a call to an async
    /// function yields its coroutine return type.
    fn detail_await(&mut self, frame: Frame, expr: &'ast AwaitExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let function = self
            .graph
            .enclosing_function(scope)
            .filter(|&f| self.graph.function(f).is_some_and(|f| f.is_async()))
            .ok_or_else(|| DetailingError::InvalidContext {
                construct: "await".to_string(),
                requirement: "inside an async function".to_string(),
                position: expr.position,
            })?;
        let value = self.detail_expr(frame, expr.value, scope)?;
        let awaited = self
            .handles
            .get(frame.id, expr.value.id())
            .and_then(DetailHandle::as_call)
            .and_then(|call| call.callee)
            .and_then(|callee| self.graph.function(callee))
            .filter(|callee| callee.is_async())
            .map(|callee| {
                callee
                    .coroutine_return_type
                    .clone()
                    .unwrap_or_else(|| callee.return_type.clone())
            });
        let ty = awaited.unwrap_or_else(|| value.ty.without_outer_references());
        let info = ExpressionInfo::rvalue(ty);
        let handle = SuspendHandle {
            info: info.clone(),
            function,
        };
        self.store(frame, expr.id, DetailHandle::Await(handle), expr.position)?;
        Ok(info)
    }

    /// `yield v` inside a generator. The yielded value must fit the
    /// generator's return type; the expression evaluates to the value sent
    /// back in.
    fn detail_yield(&mut self, frame: Frame, expr: &'ast YieldExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let function = self
            .graph
            .enclosing_function(scope)
            .filter(|&f| self.graph.function(f).is_some_and(|f| f.is_generator()))
            .ok_or_else(|| DetailingError::InvalidContext {
                construct: "yield".to_string(),
                requirement: "inside a generator".to_string(),
                position: expr.position,
            })?;
        let (yielded, sent) = match self.graph.function(function) {
            Some(generator) => (
                generator.generator_return_type.clone(),
                generator.generator_parameter_type.clone(),
            ),
            None => (None, None),
        };
        if let Some(value) = expr.value {
            let info = self.detail_expr(frame, value, scope)?;
            if let Some(expected) = yielded.filter(|t| !t.is_void()) {
                self.check_assignable(frame, value, &info.ty, &expected, expr.position)?;
            }
        }
        let info = ExpressionInfo::rvalue(sent.unwrap_or_else(Type::void));
        let handle = SuspendHandle {
            info: info.clone(),
            function,
        };
        self.store(frame, expr.id, DetailHandle::Yield(handle), expr.position)?;
        Ok(info)
    }
}

fn class_value(ty: &Type) -> Option<ItemId> {
    let ty = ty.without_outer_references();
    ty.class_id().filter(|_| ty.indirection_level() == 0)
}

/// Pointers reinterpret as other pointers or integers, and integers as
/// pointers.
fn is_reinterpretable(from: &Type, to: &Type) -> bool {
    let to = to.without_outer_references();
    let integral = |ty: &Type| ty.is_arithmetic() && ty.as_native().is_some_and(NativeType::is_integral);
    (from.is_pointer() && (to.is_pointer() || integral(&to))) || (integral(from) && to.is_pointer())
}
