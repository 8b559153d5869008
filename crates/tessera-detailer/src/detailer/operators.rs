//! Operators.
//!
//! An operand of class type first looks for an operator function: on the
//! left operand's class, then on the right operand's class with the
//! reversed orientation. Only when neither has one does the native meaning
//! apply.

use tracing::trace;

use tessera_core::{
    BinaryOperator, DetailingError, FunctionSignature, ItemId, NativeType, NodeId, Operator, Orientation,
    Position, ScopeId, Type, UnaryOperator,
};
use tessera_syntax::{AssignmentExpr, BinaryExpr, IndexExpr, UnaryExpr};

use super::calls::result_info;
use super::{Access, Detailer, Frame, Result};
use crate::compatibility::compatibility_match;
use crate::handles::{AssignmentHandle, DetailHandle, ExpressionInfo, ImplicitCast, NameMeaning, OperatorHandle};
use crate::overload::{CallArgument, CallFailure, CallResolution, ambiguous_call_error, find_operator, operator_candidates};

/// Result type of a binary operator applied natively, or `None` when the
/// operands have no native meaning for it.
///
/// Mixed arithmetic yields the wider operand (`bool < byte < short < int <
/// long < float < double`); `bool` arithmetic promotes to `int`.
/// Comparisons and logical operators yield `bool`. A pointer plus or minus
/// an integer stays a pointer.
pub fn native_binary_type(op: BinaryOperator, left: &Type, right: &Type) -> Option<Type> {
    let left = left.without_outer_references();
    let right = right.without_outer_references();

    if left.is_wildcard() || right.is_wildcard() {
        return Some(if op.is_comparison() || op.is_logical() {
            Type::bool()
        } else {
            Type::any()
        });
    }
    if op.is_logical() {
        return (is_truthy(&left) && is_truthy(&right)).then(Type::bool);
    }

    if left.is_arithmetic() && right.is_arithmetic() {
        let (l, r) = (left.as_native()?, right.as_native()?);
        if is_bitwise(op) && !(integral_or_bool(l) && integral_or_bool(r)) {
            return None;
        }
        if op.is_comparison() {
            return Some(Type::bool());
        }
        let wider = if l.rank(left.native_qualifiers()) >= r.rank(right.native_qualifiers()) {
            left.deconstify()
        } else {
            right.deconstify()
        };
        return Some(if wider.as_native() == Some(NativeType::Bool) {
            Type::int()
        } else {
            wider
        });
    }

    let integral = |ty: &Type| ty.indirection_level() == 0 && ty.as_native().is_some_and(NativeType::is_integral);
    if op.is_pointer_arithmetic() {
        if left.is_pointer() && !left.is_null() && integral(&right) {
            return Some(left);
        }
        if op == BinaryOperator::Add && right.is_pointer() && !right.is_null() && integral(&left) {
            return Some(right);
        }
    }
    if matches!(op, BinaryOperator::Equal | BinaryOperator::NotEqual)
        && (left.is_pointer() || left.optional_inner().is_some())
        && (right.is_pointer() || right.optional_inner().is_some())
    {
        return Some(Type::bool());
    }
    None
}

fn is_bitwise(op: BinaryOperator) -> bool {
    matches!(
        op,
        BinaryOperator::BitAnd
            | BinaryOperator::BitOr
            | BinaryOperator::BitXor
            | BinaryOperator::ShiftLeft
            | BinaryOperator::ShiftRight
    )
}

fn integral_or_bool(native: NativeType) -> bool {
    native.is_integral() || native == NativeType::Bool
}

/// Whether a value can stand as a condition.
pub(crate) fn is_truthy(ty: &Type) -> bool {
    let ty = ty.without_outer_references();
    ty.is_wildcard() || ty.is_arithmetic() || ty.is_pointer() || ty.optional_inner().is_some()
}

/// The class of a by-value class type.
fn class_of(ty: &Type) -> Option<ItemId> {
    ty.class_id().filter(|_| ty.indirection_level() == 0)
}

impl<'ast> Detailer<'ast> {
    /// Resolve an operator function of `class`. `None` when the class has no
    /// matching one.
    pub(crate) fn resolve_operator(
        &mut self,
        class: ItemId,
        operator: Operator,
        orientation: Orientation,
        arguments: &[CallArgument],
        scope: ScopeId,
        position: Position,
    ) -> Result<Option<(ItemId, CallResolution, FunctionSignature)>> {
        self.class_signatures(class)?;
        let resolution = match find_operator(class, operator, orientation, arguments, &self.graph, &self.options) {
            Ok(resolution) => resolution,
            Err(CallFailure::NoMatch) => return Ok(None),
            Err(CallFailure::Ambiguous(tied)) => {
                let candidates = operator_candidates(&self.graph, class, operator, orientation);
                return Err(ambiguous_call_error(
                    &format!("operator{}", operator.symbol()),
                    arguments,
                    &candidates,
                    &tied,
                    &self.graph,
                    position,
                ));
            }
        };
        let Some(item) = resolution.item else {
            return Ok(None);
        };
        let Some(signature) = self.graph.function(item).map(|f| f.signature()) else {
            return Ok(None);
        };
        self.link_throws(item, scope);
        trace!(operator = operator.symbol(), function = %item, "operator overload");
        Ok(Some((item, resolution, signature)))
    }

    fn no_operator(&self, operator: &str, operands: &[&Type], position: Position) -> DetailingError {
        let operands = operands
            .iter()
            .map(|ty| format!("'{}'", self.type_name(ty)))
            .collect::<Vec<_>>()
            .join(" and ");
        DetailingError::NoOperator {
            operator: operator.to_string(),
            operands,
            position,
        }
    }

    /// Record the user cast an overload needs on its operand.
    fn cast_operand(&mut self, frame: Frame, node: NodeId, resolution: &CallResolution, signature: &FunctionSignature) {
        if let Some(&Some(function)) = resolution.casts.first()
            && let Some(parameter) = signature.parameters.first()
        {
            let cast = ImplicitCast {
                function,
                to: parameter.ty.clone(),
            };
            self.handles.set_implicit_cast(frame.id, node, cast);
        }
    }

    pub(crate) fn detail_binary(&mut self, frame: Frame, expr: &'ast BinaryExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let left = self.detail_expr(frame, expr.left, scope)?;
        let right = self.detail_expr(frame, expr.right, scope)?;
        let operator = Operator::Binary(expr.op);
        let left_ty = left.ty.without_outer_references();
        let right_ty = right.ty.without_outer_references();

        if !expr.op.is_logical() {
            let sides = [
                (class_of(&left_ty), Orientation::Left, &right, expr.right),
                (class_of(&right_ty), Orientation::Right, &left, expr.left),
            ];
            for (class, orientation, other, other_node) in sides {
                let Some(class) = class else {
                    continue;
                };
                let arguments = [CallArgument::typed(other.ty.clone())];
                if let Some((item, resolution, signature)) =
                    self.resolve_operator(class, operator, orientation, &arguments, scope, expr.position)?
                {
                    self.cast_operand(frame, other_node.id(), &resolution, &signature);
                    return self.store_operator(frame, expr.id, result_info(&signature.return_type), Some(item), expr.position);
                }
            }
        }

        match native_binary_type(expr.op, &left.ty, &right.ty) {
            Some(ty) => self.store_operator(frame, expr.id, ExpressionInfo::rvalue(ty), None, expr.position),
            None => Err(self.no_operator(expr.op.symbol(), &[&left.ty, &right.ty], expr.position)),
        }
    }

    pub(crate) fn detail_unary(&mut self, frame: Frame, expr: &'ast UnaryExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let access = if expr.op.mutates_operand() { Access::ReadWrite } else { Access::Read };
        let operand = self.detail_expr_as(frame, expr.operand, scope, access)?;
        let ty = operand.ty.without_outer_references();

        if expr.op.is_overloadable()
            && let Some(class) = class_of(&ty)
            && let Some((item, _, signature)) =
                self.resolve_operator(class, Operator::Unary(expr.op), Orientation::Left, &[], scope, expr.position)?
        {
            return self.store_operator(frame, expr.id, result_info(&signature.return_type), Some(item), expr.position);
        }

        let fail = |this: &Self| this.no_operator(expr.op.symbol(), &[&operand.ty], expr.position);
        let info = match expr.op {
            UnaryOperator::AddressOf => {
                if !operand.is_lvalue {
                    return Err(DetailingError::other(expr.position, "cannot take the address of a temporary"));
                }
                ExpressionInfo::rvalue(ty.point())
            }
            UnaryOperator::Dereference if ty.is_wildcard() => ExpressionInfo::lvalue(Type::any()),
            UnaryOperator::Dereference => match ty.follow() {
                Some(pointee) if !ty.is_null() => ExpressionInfo::lvalue(pointee),
                _ => return Err(fail(self)),
            },
            UnaryOperator::Not if is_truthy(&ty) => ExpressionInfo::rvalue(Type::bool()),
            UnaryOperator::Negate | UnaryOperator::Plus if ty.is_wildcard() || ty.is_arithmetic() => {
                ExpressionInfo::rvalue(ty.deconstify())
            }
            UnaryOperator::BitNot
                if ty.is_wildcard() || (ty.is_arithmetic() && ty.as_native().is_some_and(integral_or_bool)) =>
            {
                ExpressionInfo::rvalue(ty.deconstify())
            }
            op if op.mutates_operand() => {
                if !(ty.is_wildcard() || ty.is_arithmetic() || ty.is_pointer()) {
                    return Err(fail(self));
                }
                if !operand.is_lvalue || ty.is_constant() {
                    return Err(DetailingError::other(
                        expr.position,
                        format!("'{}' needs a mutable operand", op.symbol()),
                    ));
                }
                if matches!(op, UnaryOperator::PreIncrement | UnaryOperator::PreDecrement) {
                    ExpressionInfo::lvalue(ty)
                } else {
                    ExpressionInfo::rvalue(ty.deconstify())
                }
            }
            _ => return Err(fail(self)),
        };
        self.store_operator(frame, expr.id, info, None, expr.position)
    }

    /// `a = b` and compound `a op= b`. The value's fit is recorded on the
    /// handle rather than rejected here; property targets go through their
    /// setter.
    pub(crate) fn detail_assignment(
        &mut self,
        frame: Frame,
        expr: &'ast AssignmentExpr<'ast>,
        scope: ScopeId,
    ) -> Result<ExpressionInfo> {
        let access = if expr.op.is_some() { Access::ReadWrite } else { Access::Write };
        let target = self.detail_expr_as(frame, expr.target, scope, access)?;
        let value = self.detail_expr(frame, expr.value, scope)?;
        let setter = match self.meaning_of(frame, expr.target) {
            Some(NameMeaning::Property { setter, .. }) => setter,
            _ => None,
        };
        let target_ty = target.ty.without_outer_references();
        let arguments = [CallArgument::typed(value.ty.clone())];

        let (overload, value_type) = match (expr.op, class_of(&target_ty)) {
            (Some(op), class) => {
                let resolved = match class {
                    Some(class) => {
                        self.resolve_operator(class, Operator::Binary(op), Orientation::Left, &arguments, scope, expr.position)?
                    }
                    None => None,
                };
                match resolved {
                    Some((item, resolution, signature)) => {
                        self.cast_operand(frame, expr.value.id(), &resolution, &signature);
                        (Some(item), signature.return_type.without_outer_references())
                    }
                    None => match native_binary_type(op, &target_ty, &value.ty) {
                        Some(ty) => (None, ty),
                        None => return Err(self.no_operator(op.symbol(), &[&target.ty, &value.ty], expr.position)),
                    },
                }
            }
            (None, Some(class)) => {
                match self.resolve_operator(class, Operator::Assign, Orientation::Left, &arguments, scope, expr.position)? {
                    Some((item, resolution, signature)) => {
                        self.cast_operand(frame, expr.value.id(), &resolution, &signature);
                        (Some(item), value.ty.clone())
                    }
                    None => (None, value.ty.clone()),
                }
            }
            (None, None) => (None, value.ty.clone()),
        };

        let compatible = if overload.is_some() && expr.op.is_none() {
            true
        } else {
            let slot = target_ty.deconstify();
            let m = compatibility_match(&value_type, &slot, &self.graph, &self.options);
            if let Some(function) = m.cast
                && expr.op.is_none()
            {
                self.handles
                    .set_implicit_cast(frame.id, expr.value.id(), ImplicitCast { function, to: slot });
            }
            m.is_compatible()
        };

        let info = ExpressionInfo::rvalue(target_ty);
        let handle = AssignmentHandle {
            info: info.clone(),
            overload,
            setter,
            value_type,
            compatible,
        };
        self.store(frame, expr.id, DetailHandle::Assignment(handle), expr.position)?;
        Ok(info)
    }

    pub(crate) fn detail_index(&mut self, frame: Frame, expr: &'ast IndexExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        let object = self.detail_expr(frame, expr.object, scope)?;
        let index = self.detail_expr(frame, expr.index, scope)?;
        let ty = object.ty.without_outer_references();

        if let Some(class) = class_of(&ty) {
            let arguments = [CallArgument::typed(index.ty.clone())];
            return match self.resolve_operator(class, Operator::Index, Orientation::Left, &arguments, scope, expr.position)? {
                Some((item, resolution, signature)) => {
                    self.cast_operand(frame, expr.index.id(), &resolution, &signature);
                    self.store_operator(frame, expr.id, result_info(&signature.return_type), Some(item), expr.position)
                }
                None => Err(self.no_operator("[]", &[&object.ty, &index.ty], expr.position)),
            };
        }

        let index_ty = index.ty.without_outer_references();
        let integral_index =
            index_ty.is_wildcard() || (index_ty.is_arithmetic() && index_ty.as_native().is_some_and(NativeType::is_integral));
        let info = if ty.is_wildcard() {
            ExpressionInfo::lvalue(Type::any())
        } else {
            match ty.follow() {
                Some(element) if integral_index && !ty.is_null() => ExpressionInfo::lvalue(element),
                _ => return Err(self.no_operator("[]", &[&object.ty, &index.ty], expr.position)),
            }
        };
        self.store_operator(frame, expr.id, info, None, expr.position)
    }

    fn store_operator(
        &mut self,
        frame: Frame,
        node: NodeId,
        info: ExpressionInfo,
        overload: Option<ItemId>,
        position: Position,
    ) -> Result<ExpressionInfo> {
        let handle = OperatorHandle {
            info: info.clone(),
            overload,
        };
        self.store(frame, node, DetailHandle::Operator(handle), position)?;
        Ok(info)
    }
}
