//! Calls: overloaded functions, constructors, conversions, `super(...)`,
//! values of function type and call operators.

use tracing::trace;

use tessera_core::{
    DetailingError, FunctionSignature, ItemId, Operator, Orientation, Position, ScopeId, Type,
};
use tessera_syntax::{Argument, CallExpr, Expr, MarkerExpr};

use super::{Detailer, Frame, Result, Template};
use crate::compatibility::is_compatible_with;
use crate::generics::infer_generic_arguments;
use crate::handles::{CallHandle, CallKind, DetailHandle, ExpressionInfo, ImplicitCast, NameHandle, NameMeaning};
use crate::overload::{
    ArgumentOption, CallArgument, CallCandidate, CallFailure, CallResolution, ambiguous_call_error,
    find_compatible_call, no_matching_call_error,
};

impl<'ast> Detailer<'ast> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn detail_call(&mut self, frame: Frame, call: &'ast CallExpr<'ast>, scope: ScopeId) -> Result<ExpressionInfo> {
        if let Expr::Super(marker) = *call.callee {
            return self.detail_super_call(frame, call, marker, scope);
        }
        let callee = match self.detail_expr(frame, call.callee, scope) {
            Err(DetailingError::NoTargetFound { name, .. }) if matches!(call.callee, Expr::Fetch(_)) => {
                return Err(DetailingError::NoTargetFound {
                    name,
                    position: call.position,
                });
            }
            result => result?,
        };
        let arguments = self.detail_arguments(frame, call.args, scope)?;

        let name_handle = self
            .handles
            .get(frame.id, call.callee.id())
            .and_then(DetailHandle::as_name)
            .cloned();
        let handle = match name_handle {
            Some(NameHandle {
                meaning: NameMeaning::Type(ty),
                ..
            }) => self.call_type(frame, call, &ty, &arguments, scope)?,
            Some(name) if self.is_overload_set(&name) => self.call_named(frame, call, &name, &arguments, scope)?,
            _ => self.call_value(frame, call, &callee.ty, &arguments, scope)?,
        };
        let info = handle.info.clone();
        self.store(frame, call.id, DetailHandle::Call(handle), call.position)?;
        Ok(info)
    }

    /// Detail call arguments. A bare overloaded function name stays open
    /// as one option per overload until resolution narrows it.
    pub(crate) fn detail_arguments(
        &mut self,
        frame: Frame,
        args: &'ast [Argument<'ast>],
        scope: ScopeId,
    ) -> Result<Vec<CallArgument>> {
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            let info = self.detail_expr(frame, arg.value, scope)?;
            let name = arg.name.map(|n| n.name.to_string());
            let overloads = self
                .handles
                .get(frame.id, arg.value.id())
                .and_then(DetailHandle::as_name)
                .filter(|h| h.target.is_none() && h.meaning == NameMeaning::Value && h.candidates.len() > 1)
                .map(|h| h.candidates.clone());
            let argument = match overloads {
                Some(items) => {
                    let options: Vec<ArgumentOption> = items
                        .into_iter()
                        .filter(|&item| !self.graph.item(item).header.is_generic())
                        .filter_map(|item| {
                            let ty = self.graph.function(item)?.ty();
                            Some(ArgumentOption { ty, item: Some(item) })
                        })
                        .collect();
                    CallArgument::overloaded(options)
                }
                None => CallArgument::typed(info.ty),
            };
            arguments.push(argument.with_name(name));
        }
        Ok(arguments)
    }

    fn is_overload_set(&self, handle: &NameHandle) -> bool {
        handle.meaning == NameMeaning::Value
            && !handle.candidates.is_empty()
            && handle
                .candidates
                .iter()
                .all(|&c| self.graph.function(c).is_some())
    }

    fn call_named(
        &mut self,
        frame: Frame,
        call: &'ast CallExpr<'ast>,
        handle: &NameHandle,
        arguments: &[CallArgument],
        scope: ScopeId,
    ) -> Result<CallHandle> {
        let name = callee_name(call.callee);
        let candidates = self.call_candidates(&handle.candidates, call.args, arguments, call.position)?;
        let resolution = self.resolve_call(name, arguments, &candidates, call.position)?;
        let signature = candidates[resolution.candidate].signature.clone();
        let Some(item) = resolution.item else {
            return Err(DetailingError::internal("resolved call without a function"));
        };
        if let Some(ty) = self.graph.function(item).map(|f| f.ty()) {
            self.handles.narrow(frame.id, call.callee.id(), item, ty);
        }
        self.apply_resolution(frame, call.args, &resolution, &signature);
        self.link_throws(item, scope);
        trace!(name, callee = %item, "resolved call");

        let kind = if self.graph.function(item).is_some_and(|f| f.is_method()) {
            CallKind::Method
        } else {
            CallKind::Function
        };
        Ok(CallHandle {
            info: result_info(&signature.return_type),
            kind,
            callee: Some(item),
            resolution: Some(resolution),
        })
    }

    /// Candidates for a call through a name. Generic templates are replaced
    /// by the instance their arguments infer.
    fn call_candidates(
        &mut self,
        items: &[ItemId],
        args: &'ast [Argument<'ast>],
        arguments: &[CallArgument],
        position: Position,
    ) -> Result<Vec<CallCandidate>> {
        let mut candidates: Vec<CallCandidate> = Vec::new();
        let mut inference_error = None;
        fn push(candidates: &mut Vec<CallCandidate>, candidate: Option<CallCandidate>) {
            if let Some(candidate) = candidate
                && !candidates.iter().any(|c| c.item == candidate.item)
            {
                candidates.push(candidate);
            }
        }
        for &item in items {
            if !self.graph.item(item).header.is_generic() {
                push(&mut candidates, CallCandidate::function(&self.graph, item));
                continue;
            }
            match self.infer_instance(item, args, arguments, position) {
                Ok(Some(instance)) => {
                    push(&mut candidates, CallCandidate::function(&self.graph, instance));
                    let variants = self
                        .graph
                        .function(instance)
                        .map(|f| f.optional_variants.clone())
                        .unwrap_or_default();
                    for variant in variants {
                        push(&mut candidates, CallCandidate::function(&self.graph, variant));
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    inference_error.get_or_insert(err);
                }
            }
        }
        match inference_error {
            Some(err) if candidates.is_empty() => Err(err),
            _ => Ok(candidates),
        }
    }

    /// Infer a generic function's type arguments from the call and
    /// instantiate it. `None` when the arguments cannot bind to its
    /// parameters at all.
    fn infer_instance(
        &mut self,
        template: ItemId,
        args: &'ast [Argument<'ast>],
        arguments: &[CallArgument],
        position: Position,
    ) -> Result<Option<ItemId>> {
        let Some(Template::Function { def, .. }) = self.templates.get(&template).copied() else {
            return Ok(None);
        };
        let generics: Vec<&str> = def.generics.iter().map(|g| g.name).collect();
        let mut bound = Vec::with_capacity(args.len());
        for (index, (arg, argument)) in args.iter().zip(arguments).enumerate() {
            let parameter = match arg.name {
                Some(name) => def.parameters.iter().find(|p| p.name.name == name.name),
                None => def
                    .parameters
                    .get(index)
                    .or_else(|| def.parameters.last().filter(|p| p.is_variadic)),
            };
            let Some(parameter) = parameter else {
                return Ok(None);
            };
            if let Some(option) = argument.options.first() {
                bound.push((parameter.ty.simple_name(), option.ty.clone()));
            }
        }
        match infer_generic_arguments(&generics, &bound) {
            Ok(types) => self.instantiate_generic_function(template, types, position).map(Some),
            Err(index) => Err(DetailingError::CannotInfer {
                name: def.name.name.to_string(),
                parameter: generics[index].to_string(),
                position,
            }),
        }
    }

    pub(crate) fn resolve_call(
        &self,
        name: &str,
        arguments: &[CallArgument],
        candidates: &[CallCandidate],
        position: Position,
    ) -> Result<CallResolution> {
        match find_compatible_call(arguments, candidates, &self.graph, &self.options) {
            Ok(mut resolution) => {
                resolution.item = candidates[resolution.candidate].item;
                Ok(resolution)
            }
            Err(CallFailure::NoMatch) => Err(no_matching_call_error(
                name,
                arguments,
                candidates,
                &self.graph,
                position,
            )),
            Err(CallFailure::Ambiguous(tied)) => Err(ambiguous_call_error(
                name,
                arguments,
                candidates,
                &tied,
                &self.graph,
                position,
            )),
        }
    }

    /// Narrow overloaded arguments and record the user casts the chosen
    /// candidate needs.
    pub(crate) fn apply_resolution(
        &mut self,
        frame: Frame,
        args: &'ast [Argument<'ast>],
        resolution: &CallResolution,
        signature: &FunctionSignature,
    ) {
        for (index, arg) in args.iter().enumerate() {
            let node = arg.value.id();
            if let Some(&Some(item)) = resolution.narrowed.get(index)
                && let Some(ty) = self.graph.function(item).map(|f| f.ty())
            {
                self.handles.narrow(frame.id, node, item, ty);
            }
            if let Some(&Some(function)) = resolution.casts.get(index)
                && let Some(parameter) = resolution
                    .argument_map
                    .get(index)
                    .and_then(|&p| signature.parameters.get(p))
            {
                let cast = ImplicitCast {
                    function,
                    to: parameter.ty.clone(),
                };
                self.handles.set_implicit_cast(frame.id, node, cast);
            }
        }
    }

    /// `T(args)`: construction for classes, conversion for natives.
    fn call_type(
        &mut self,
        frame: Frame,
        call: &'ast CallExpr<'ast>,
        ty: &Type,
        arguments: &[CallArgument],
        scope: ScopeId,
    ) -> Result<CallHandle> {
        if let Some(class) = ty.class_id().filter(|_| ty.indirection_level() == 0) {
            let (constructor, resolution) = self.construct(frame, class, arguments, call.args, scope, call.position)?;
            return Ok(CallHandle {
                info: ExpressionInfo::rvalue(Type::class(class)),
                kind: CallKind::Constructor { class },
                callee: constructor,
                resolution,
            });
        }

        let from = match arguments {
            [single] => single.options.first().map(|o| o.ty.clone()),
            _ => None,
        };
        let Some(from) = from else {
            return Err(no_matching_call_error(
                &self.type_name(ty),
                arguments,
                &[],
                &self.graph,
                call.position,
            ));
        };
        let value = from.without_outer_references();
        let convertible = (value.is_arithmetic() && ty.is_arithmetic())
            || is_compatible_with(&from, ty, &self.graph, &self.options);
        if !convertible {
            return Err(DetailingError::InvalidCast {
                from: self.type_name(&from),
                to: self.type_name(ty),
                position: call.position,
            });
        }
        Ok(CallHandle {
            info: ExpressionInfo::rvalue(ty.clone()),
            kind: CallKind::Conversion,
            callee: None,
            resolution: None,
        })
    }

    /// Pick the constructor of `class` for `arguments`. A class without
    /// constructors can only be built without arguments.
    pub(crate) fn construct(
        &mut self,
        frame: Frame,
        class: ItemId,
        arguments: &[CallArgument],
        args: &'ast [Argument<'ast>],
        scope: ScopeId,
        position: Position,
    ) -> Result<(Option<ItemId>, Option<CallResolution>)> {
        self.ensure_synthesized(class)?;
        let constructors = self
            .graph
            .class(class)
            .map(|c| c.constructors.clone())
            .unwrap_or_default();
        let name = self.item_name(class);
        if constructors.is_empty() {
            if arguments.is_empty() {
                return Ok((None, None));
            }
            return Err(no_matching_call_error(&name, arguments, &[], &self.graph, position));
        }
        let candidates: Vec<CallCandidate> = constructors
            .iter()
            .filter_map(|&c| CallCandidate::function(&self.graph, c))
            .collect();
        let resolution = self.resolve_call(&name, arguments, &candidates, position)?;
        let signature = candidates[resolution.candidate].signature.clone();
        self.apply_resolution(frame, args, &resolution, &signature);
        if let Some(constructor) = resolution.item {
            self.link_throws(constructor, scope);
        }
        Ok((resolution.item, Some(resolution)))
    }

    /// `super(args)` inside a constructor calls a constructor of the first
    /// parent.
    fn detail_super_call(
        &mut self,
        frame: Frame,
        call: &'ast CallExpr<'ast>,
        marker: &'ast MarkerExpr,
        scope: ScopeId,
    ) -> Result<ExpressionInfo> {
        let constructor = self
            .graph
            .enclosing_function(scope)
            .filter(|&f| self.graph.function(f).is_some_and(|f| f.is_constructor()))
            .ok_or_else(|| DetailingError::InvalidContext {
                construct: "super(...)".to_string(),
                requirement: "inside a constructor".to_string(),
                position: call.position,
            })?;
        let class = self.method_class(scope, "super(...)", call.position)?;
        let parent = self.first_parent(class, "super(...)", call.position)?;
        self.store(
            frame,
            marker.id,
            DetailHandle::Super(ExpressionInfo::lvalue(Type::class(parent))),
            marker.position,
        )?;

        let arguments = self.detail_arguments(frame, call.args, scope)?;
        let (callee, resolution) = self.construct(frame, parent, &arguments, call.args, scope, call.position)?;
        self.super_called.insert(constructor);

        let info = ExpressionInfo::rvalue(Type::void());
        let handle = CallHandle {
            info: info.clone(),
            kind: CallKind::SuperConstructor { class: parent },
            callee,
            resolution,
        };
        self.store(frame, call.id, DetailHandle::Call(handle), call.position)?;
        Ok(info)
    }

    /// Calling a value: a function-typed value, an `any`, or an object with
    /// a call operator.
    fn call_value(
        &mut self,
        frame: Frame,
        call: &'ast CallExpr<'ast>,
        ty: &Type,
        arguments: &[CallArgument],
        scope: ScopeId,
    ) -> Result<CallHandle> {
        let value = ty.without_outer_references();
        if value.is_wildcard() {
            return Ok(CallHandle {
                info: ExpressionInfo::rvalue(Type::any()),
                kind: CallKind::Dynamic,
                callee: None,
                resolution: None,
            });
        }
        if let Some(signature) = value.signature() {
            let candidates = vec![CallCandidate::new(None, signature.clone())];
            let resolution = self.resolve_call(callee_name(call.callee), arguments, &candidates, call.position)?;
            self.apply_resolution(frame, call.args, &resolution, signature);
            return Ok(CallHandle {
                info: result_info(&signature.return_type),
                kind: CallKind::Function,
                callee: None,
                resolution: Some(resolution),
            });
        }
        if let Some(class) = value.class_id().filter(|_| value.indirection_level() == 0) {
            let resolved = self.resolve_operator(class, Operator::Call, Orientation::Left, arguments, scope, call.position)?;
            if let Some((item, resolution, signature)) = resolved {
                self.apply_resolution(frame, call.args, &resolution, &signature);
                return Ok(CallHandle {
                    info: result_info(&signature.return_type),
                    kind: CallKind::CallOperator,
                    callee: Some(item),
                    resolution: Some(resolution),
                });
            }
        }
        Err(DetailingError::other(
            call.position,
            format!("'{}' is not callable", self.type_name(ty)),
        ))
    }
}

/// The name a call reports in diagnostics.
fn callee_name<'a>(callee: &Expr<'a>) -> &'a str {
    match *callee {
        Expr::Fetch(fetch) => fetch.name.name,
        Expr::Accessor(accessor) => accessor.member.name,
        _ => "function",
    }
}

/// A call result is assignable when the function returns a reference.
pub(crate) fn result_info(ty: &Type) -> ExpressionInfo {
    ExpressionInfo {
        ty: ty.clone(),
        is_lvalue: ty.is_reference(),
        implicit_cast: None,
    }
}
