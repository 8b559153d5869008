//! Lambdas and their captures.
//!
//! A lambda is a private function declared where it is written. Variables of
//! enclosing functions it refers to are collected while its body is
//! detailed; once the enclosing function finishes, they are copied into a
//! capture holder structure hoisted next to the lambda.

use tracing::debug;

use tessera_core::{
    Class, ClassFlags, DeferredAction, Function, FunctionFlags, ItemHeader, ItemId, ItemKind, ScopeId,
    ScopeOwner, Type, Variable, Visibility,
};
use tessera_syntax::LambdaExpr;

use super::{Detailer, Frame, Result};
use crate::handles::{DetailHandle, ExpressionInfo, LambdaHandle};

impl<'ast> Detailer<'ast> {
    pub(crate) fn detail_lambda(
        &mut self,
        frame: Frame,
        lambda: &'ast LambdaExpr<'ast>,
        scope: ScopeId,
    ) -> Result<ExpressionInfo> {
        self.lambda_count += 1;
        let name = format!("lambda#{}", self.lambda_count);
        let return_type = match &lambda.return_type {
            Some(written) => self.resolve_type(frame, written, scope)?,
            None => Type::void(),
        };

        let function_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        let header = ItemHeader::new(name.as_str(), scope, frame.module)
            .with_visibility(Visibility::Private)
            .with_position(lambda.position);
        let function = Function::new(function_scope, return_type).with_flags(FunctionFlags::LAMBDA);
        let item = self.graph.add_item(header, ItemKind::Function(function));
        self.graph.set_scope_owner(function_scope, ScopeOwner::Function(item));

        let (parameters, variables) = self.bind_parameters(frame, lambda.parameters, item, function_scope)?;
        if let Some(function) = self.graph.function_mut(item) {
            function.parameters = parameters;
            function.parameter_variables = variables;
        }

        if lambda.return_type.is_none() {
            self.inferring_returns.insert(item);
        }
        let body = self.detail_block(frame, lambda.body, function_scope);
        self.inferring_returns.remove(&item);
        body?;

        let actions = match self.graph.function_mut(item) {
            Some(function) => {
                function.is_detailed = true;
                function.done_detailing.fire()
            }
            None => Vec::new(),
        };
        self.run_actions(actions);

        let finalize = DeferredAction::FinalizeCaptures { lambda: item };
        let ready = match self.graph.enclosing_function(scope) {
            Some(outer) => match self.graph.function_mut(outer) {
                Some(outer) => outer.done_detailing.subscribe(finalize),
                None => Some(finalize),
            },
            None => Some(finalize),
        };
        if let Some(ready) = ready {
            self.run_actions(vec![ready]);
        }

        let ty = self.graph.function(item).map(Function::ty).unwrap_or_else(Type::any);
        let info = ExpressionInfo::rvalue(ty);
        let handle = LambdaHandle {
            info: info.clone(),
            function: item,
        };
        self.store(frame, lambda.id, DetailHandle::Lambda(handle), lambda.position)?;
        debug!(%name, %item, "detailed lambda");
        Ok(info)
    }

    /// Copy a lambda's referenced variables into its capture holder.
    pub(crate) fn finalize_captures(&mut self, lambda: ItemId) {
        let Some(function) = self.graph.function_mut(lambda) else {
            return;
        };
        if function.capture_holder.is_some() {
            return;
        }
        function.copied_variables = function.referenced_variables.clone();
        let captured = function.copied_variables.clone();
        let lambda_scope = function.scope;
        if captured.is_empty() {
            return;
        }

        let (name, module, position) = {
            let header = &self.graph.item(lambda).header;
            (format!("{}$captures", header.name), header.module, header.position)
        };
        let holder_scope = self.graph.new_scope(lambda_scope, ScopeOwner::Block);
        let header = ItemHeader::new(name.as_str(), lambda_scope, module)
            .with_visibility(Visibility::Private)
            .with_position(position);
        let holder_class = Class::new(holder_scope).with_flags(ClassFlags::STRUCTURE);
        let holder = self.graph.add_item(header, ItemKind::Class(holder_class));
        self.graph.set_scope_owner(holder_scope, ScopeOwner::Class(holder));

        let mut members = Vec::with_capacity(captured.len());
        for variable in captured {
            let entry = self.graph.item(variable);
            let member_name = entry.name().to_string();
            let Some(ty) = entry.as_variable().map(|v| v.ty.clone()) else {
                continue;
            };
            let header = ItemHeader::new(member_name, holder_scope, module).with_position(position);
            members.push(self.graph.add_item(header, ItemKind::Variable(Variable::member(ty))));
        }
        if let Some(class) = self.graph.class_mut(holder) {
            class.members = members;
            class.is_detailed = true;
        }
        if let Some(function) = self.graph.function_mut(lambda) {
            function.capture_holder = Some(holder);
        }
        self.graph.item_mut(lambda).header.private_hoisted.push(holder);
        self.graph.module_mut(module).hoisted_items.push(holder);
        debug!(%name, "finalized captures");
    }
}
