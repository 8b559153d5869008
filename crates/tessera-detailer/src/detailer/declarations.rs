//! Declarations: hoisting phases, functions, variables, namespaces,
//! `using` aliases and attributes.

use tracing::{debug, trace, warn};

use tessera_core::{
    Alias, DetailingError, Function, FunctionFlags, ItemHeader, ItemId, ItemKind, ItemKindSet,
    Namespace, NodeId, Position, ScopeId, ScopeOwner, SignatureParameter, Type, Variable,
    Visibility,
};
use tessera_syntax::{
    Attribute, AttributeArgument, CastDirection, Expr, FunctionDefinition, FunctionModifiers,
    FunctionRole, LiteralValue, NamespaceDefinition, Parameter, Stmt, TypeExpr, UsingStmt,
    VariableDeclaration,
};

use super::{Detailer, Frame, Result, Template};
use crate::attributes::{AttributeInvocation, AttributeSubject, AttributeValue};
use crate::compatibility::compatibility_match;
use crate::generics::inferred_type;
use crate::handles::{DetailHandle, FunctionHandle, ImplicitCast, VariableHandle};

impl<'ast> Detailer<'ast> {
    // ==========================================================================
    // Hoisting
    // ==========================================================================

    /// Detail a module or namespace body: types, then signatures, then
    /// bodies.
    pub(crate) fn detail_hoisted(&mut self, frame: Frame, statements: &'ast [Stmt<'ast>], scope: ScopeId) -> Result<()> {
        self.hoist_types(frame, statements, scope)?;
        self.hoist_usings(frame, statements, scope, false)?;
        self.hoist_signatures(frame, statements, scope)?;
        self.hoist_usings(frame, statements, scope, true)?;
        self.detail_bodies(frame, statements, scope)
    }

    fn hoist_types(&mut self, frame: Frame, statements: &'ast [Stmt<'ast>], scope: ScopeId) -> Result<()> {
        for stmt in statements {
            if let Stmt::Import(import) = *stmt {
                let result = self.detail_import(frame, import, scope);
                self.recover(result)?;
            }
        }
        for stmt in statements {
            match *stmt {
                Stmt::Class(def) => {
                    let result = self.declare_class(frame, def, scope);
                    self.recover(result)?;
                }
                Stmt::Namespace(namespace) => {
                    let result = self.declare_namespace(frame, namespace, scope);
                    if let Some(inner) = self.recover(result)? {
                        self.hoist_types(frame, namespace.statements, inner)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Bind `using` aliases. Before signatures are known a target may be
    /// missing; only the final pass reports that.
    fn hoist_usings(
        &mut self,
        frame: Frame,
        statements: &'ast [Stmt<'ast>],
        scope: ScopeId,
        final_pass: bool,
    ) -> Result<()> {
        for stmt in statements {
            match *stmt {
                Stmt::Using(using) if self.declared_item(frame, using.id).is_none() => {
                    match self.bind_using(frame, using, scope) {
                        Ok(()) => {}
                        Err(err) if !final_pass => trace!(error = %err, "using deferred"),
                        Err(err) => {
                            self.recover(Err::<(), _>(err))?;
                        }
                    }
                }
                Stmt::Namespace(namespace) => {
                    if let Some(inner) = self.namespace_scope(frame, namespace) {
                        self.hoist_usings(frame, namespace.statements, inner, final_pass)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn hoist_signatures(&mut self, frame: Frame, statements: &'ast [Stmt<'ast>], scope: ScopeId) -> Result<()> {
        for stmt in statements {
            let result = match *stmt {
                Stmt::Class(def) => match self.declared_item(frame, def.id) {
                    Some(class) => self.class_signatures(class),
                    None => Ok(()),
                },
                Stmt::Function(def) => self.declare_function(frame, def, scope, None).map(drop),
                Stmt::VariableDeclaration(decl) if decl.ty.is_some() => self.predeclare_variable(frame, decl, scope),
                Stmt::Namespace(namespace) => match self.namespace_scope(frame, namespace) {
                    Some(inner) => self.hoist_signatures(frame, namespace.statements, inner),
                    None => Ok(()),
                },
                _ => Ok(()),
            };
            self.recover(result)?;
        }
        Ok(())
    }

    fn detail_bodies(&mut self, frame: Frame, statements: &'ast [Stmt<'ast>], scope: ScopeId) -> Result<()> {
        for stmt in statements {
            let result = match *stmt {
                Stmt::Class(def) => match self.declared_item(frame, def.id) {
                    Some(class) if self.classes.contains_key(&class) => self.detail_class_bodies(class),
                    _ => Ok(()),
                },
                Stmt::Function(def) => match self.declared_item(frame, def.id) {
                    Some(function) => self.detail_function_body(frame, def, function),
                    None => Ok(()),
                },
                Stmt::Namespace(namespace) => match self.namespace_scope(frame, namespace) {
                    Some(inner) => self.detail_bodies(frame, namespace.statements, inner),
                    None => Ok(()),
                },
                Stmt::Import(_) | Stmt::Using(_) => Ok(()),
                _ => self.detail_stmt(frame, stmt, scope),
            };
            self.recover(result)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Namespaces and usings
    // ==========================================================================

    /// Declare a namespace, reopening an existing one of the same name.
    fn declare_namespace(
        &mut self,
        frame: Frame,
        namespace: &'ast NamespaceDefinition<'ast>,
        scope: ScopeId,
    ) -> Result<ScopeId> {
        let name = namespace.name.name;
        let existing = self.graph.find_local(name, scope, ItemKindSet::empty(), None);
        let item = match existing.first() {
            Some(&id) => match &self.graph.item(id).kind {
                ItemKind::Namespace(_) => id,
                _ => {
                    return Err(DetailingError::DuplicateDefinition {
                        name: name.to_string(),
                        position: namespace.position,
                    });
                }
            },
            None => {
                let inner = self.graph.new_scope(scope, ScopeOwner::Block);
                let header = ItemHeader::new(name, scope, frame.module)
                    .with_visibility(namespace.visibility)
                    .with_position(namespace.position);
                let item = self
                    .graph
                    .add_item(header, ItemKind::Namespace(Namespace::new(inner)));
                self.graph.set_scope_owner(inner, ScopeOwner::Namespace(item));
                item
            }
        };
        self.record_declared(frame, namespace.id, item);
        self.store(frame, namespace.id, DetailHandle::Namespace { item }, namespace.position)?;
        self.namespace_scope(frame, namespace)
            .ok_or_else(|| DetailingError::internal("namespace without a scope"))
    }

    fn namespace_scope(&self, frame: Frame, namespace: &NamespaceDefinition<'_>) -> Option<ScopeId> {
        let item = self.declared_item(frame, namespace.id)?;
        self.graph.item(item).own_scope()
    }

    /// Bind `using a.b.c as d` in `scope`.
    pub(crate) fn bind_using(&mut self, frame: Frame, using: &'ast UsingStmt<'ast>, scope: ScopeId) -> Result<()> {
        let target = self.resolve_path(using.path, scope, ItemKindSet::empty(), using.position)?;
        let name = using
            .local_name()
            .ok_or_else(|| DetailingError::other(using.position, "empty using path"))?;
        self.check_redeclaration(name, scope, using.position)?;
        let header = ItemHeader::new(name, scope, frame.module)
            .with_visibility(Visibility::Private)
            .with_position(using.position);
        let alias = self
            .graph
            .add_item(header, ItemKind::Alias(Alias::new(target)));
        self.record_declared(frame, using.id, alias);
        self.store(frame, using.id, DetailHandle::Using { alias }, using.position)
    }

    /// Reject a second non-function declaration of `name` in `scope`.
    pub(crate) fn check_redeclaration(&self, name: &str, scope: ScopeId, position: Position) -> Result<()> {
        if self
            .graph
            .find_local(name, scope, ItemKindSet::empty(), None)
            .is_empty()
        {
            Ok(())
        } else {
            Err(DetailingError::DuplicateDefinition {
                name: name.to_string(),
                position,
            })
        }
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Declare a function and resolve its signature. A generic function is
    /// only recorded as a template.
    pub(crate) fn declare_function(
        &mut self,
        frame: Frame,
        def: &'ast FunctionDefinition<'ast>,
        scope: ScopeId,
        class: Option<ItemId>,
    ) -> Result<ItemId> {
        if let Some(item) = self.declared_item(frame, def.id) {
            return Ok(item);
        }
        let name = function_name(def);

        if def.is_generic() {
            let item = self.create_function_entity(frame, def, scope, name, class, def.generics.len());
            self.templates.insert(
                item,
                Template::Function {
                    def,
                    scope,
                    module: frame.module,
                    class,
                },
            );
            self.record_declared(frame, def.id, item);
            let handle = FunctionHandle {
                function: item,
                variants: Vec::new(),
                implicit_super: Vec::new(),
                is_template: true,
            };
            self.store(frame, def.id, DetailHandle::Function(handle), def.position)?;
            debug!(name, "declared generic function");
            return Ok(item);
        }

        let item = self.create_function_entity(frame, def, scope, name, class, 0);
        self.resolve_signature(frame, def, item, class)?;
        self.check_duplicate_function(item, def.position)?;
        if let Some(class) = class {
            self.register_member(class, item, def)?;
        }
        self.declare_optional_variants(def, item, class)?;
        if def.modifiers.contains(FunctionModifiers::EXPORT) {
            self.export_item(frame.module, name, item, def.position)?;
        }
        self.record_declared(frame, def.id, item);
        trace!(name, %item, "declared function");
        Ok(item)
    }

    /// Create the function item and its scope, without a signature.
    pub(crate) fn create_function_entity(
        &mut self,
        frame: Frame,
        def: &FunctionDefinition<'_>,
        scope: ScopeId,
        name: &str,
        class: Option<ItemId>,
        generic_count: usize,
    ) -> ItemId {
        let function_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        let mut flags = FunctionFlags::empty();
        if class.is_some() {
            flags |= FunctionFlags::METHOD;
        }
        flags |= match def.role {
            FunctionRole::Plain => FunctionFlags::empty(),
            FunctionRole::Constructor => FunctionFlags::CONSTRUCTOR,
            FunctionRole::Destructor => FunctionFlags::DESTRUCTOR,
            FunctionRole::Cast(_) => FunctionFlags::CAST,
            FunctionRole::Operator(..) => FunctionFlags::OPERATOR,
            FunctionRole::Accessor(_) => FunctionFlags::ACCESSOR,
        };
        for (modifier, flag) in [
            (FunctionModifiers::ASYNC, FunctionFlags::ASYNC),
            (FunctionModifiers::GENERATOR, FunctionFlags::GENERATOR),
            (FunctionModifiers::VIRTUAL, FunctionFlags::VIRTUAL),
            (FunctionModifiers::EXTERNAL, FunctionFlags::EXTERNAL),
        ] {
            if def.modifiers.contains(modifier) {
                flags |= flag;
            }
        }
        if def.body.is_none() {
            flags |= FunctionFlags::EXTERNAL;
        }

        let mut function = Function::new(function_scope, Type::void()).with_flags(flags);
        if let FunctionRole::Accessor(kind) = def.role {
            function.accessor = Some(kind);
        }
        if let FunctionRole::Operator(operator, orientation) = def.role {
            function.operator = Some(operator);
            function.orientation = orientation;
        }
        function.parent_class_type = class.map(Type::class);

        let header = ItemHeader::new(name, scope, frame.module)
            .with_visibility(def.visibility)
            .with_position(def.position)
            .with_generic_parameters(generic_count);
        let item = self.graph.add_item(header, ItemKind::Function(function));
        self.graph.set_scope_owner(function_scope, ScopeOwner::Function(item));
        item
    }

    /// Resolve parameter and return types and declare parameter variables.
    pub(crate) fn resolve_signature(
        &mut self,
        frame: Frame,
        def: &'ast FunctionDefinition<'ast>,
        item: ItemId,
        class: Option<ItemId>,
    ) -> Result<()> {
        let function_scope = self
            .graph
            .function(item)
            .map(|f| f.scope)
            .ok_or_else(|| DetailingError::internal("signature of a non-function"))?;

        let (parameters, variables) = self.bind_parameters(frame, def.parameters, item, function_scope)?;

        let return_type = match (def.role, class) {
            (FunctionRole::Constructor | FunctionRole::Destructor, _) => Type::void(),
            (FunctionRole::Cast(CastDirection::From), Some(class)) => Type::class(class),
            _ => match &def.return_type {
                Some(ty) => self.resolve_type(frame, ty, function_scope)?,
                None => Type::void(),
            },
        };
        let generator_parameter = match (&def.generator_parameter, def.modifiers.contains(FunctionModifiers::GENERATOR)) {
            (Some(ty), true) => Some(self.resolve_type(frame, ty, function_scope)?),
            (None, true) => Some(Type::void()),
            _ => None,
        };

        let function = self
            .graph
            .function_mut(item)
            .ok_or_else(|| DetailingError::internal("signature of a non-function"))?;
        function.parameters = parameters;
        function.parameter_variables = variables;
        if function.is_generator() {
            function.generator_return_type = Some(return_type.clone());
            function.generator_parameter_type = generator_parameter;
        }
        if function.is_async() {
            function.coroutine_return_type = Some(return_type.clone());
        }
        function.return_type = return_type;
        Ok(())
    }

    /// Resolve written parameters into signature parameters and declare a
    /// variable for each. A trailing variadic parameter is a pointer to its
    /// element type inside the body.
    pub(crate) fn bind_parameters(
        &mut self,
        frame: Frame,
        written: &'ast [Parameter<'ast>],
        function: ItemId,
        function_scope: ScopeId,
    ) -> Result<(Vec<SignatureParameter>, Vec<ItemId>)> {
        let mut parameters = Vec::with_capacity(written.len());
        let mut variables = Vec::with_capacity(written.len());
        for (index, parameter) in written.iter().enumerate() {
            let name = parameter.name.name;
            if written[..index].iter().any(|earlier| earlier.name.name == name) {
                return Err(DetailingError::DuplicateDefinition {
                    name: name.to_string(),
                    position: parameter.position,
                });
            }
            let ty = self.resolve_type(frame, &parameter.ty, function_scope)?;
            let trailing_variadic = parameter.is_variadic && index + 1 == written.len();
            let (signature_parameter, variable_ty) = if trailing_variadic {
                (SignatureParameter::variadic(name, ty.clone()), ty.point())
            } else {
                (SignatureParameter::new(name, ty.clone()), ty)
            };
            parameters.push(signature_parameter.with_id(index as u32));

            let header = ItemHeader::new(name, function_scope, frame.module).with_position(parameter.position);
            let variable = self.graph.add_item(
                header,
                ItemKind::Variable(Variable::parameter(variable_ty, function)),
            );
            self.record_declared(frame, parameter.id, variable);
            variables.push(variable);
        }
        Ok((parameters, variables))
    }

    /// Overloads with identical parameter lists in one scope are an error.
    fn check_duplicate_function(&self, item: ItemId, position: Position) -> Result<()> {
        let entry = self.graph.item(item);
        let Some(function) = entry.as_function() else {
            return Ok(());
        };
        for other in self
            .graph
            .find_local(entry.name(), entry.header.parent_scope, ItemKindSet::empty(), None)
        {
            if other == item {
                continue;
            }
            let duplicate = match &self.graph.item(other).kind {
                ItemKind::Function(existing) => {
                    existing.optional_variant_parent.is_none()
                        && !self.graph.item(other).header.is_generic()
                        && existing.parameters == function.parameters
                }
                _ => true,
            };
            if duplicate {
                return Err(DetailingError::DuplicateDefinition {
                    name: entry.name().to_string(),
                    position,
                });
            }
        }
        Ok(())
    }

    /// File a member function into its class's role lists.
    pub(crate) fn register_member(&mut self, class: ItemId, item: ItemId, def: &FunctionDefinition<'_>) -> Result<()> {
        let class_ty = Type::class(class);
        let parameters = self
            .graph
            .function(item)
            .map(|f| f.parameters.clone())
            .unwrap_or_default();
        let is_copy = matches!(parameters.as_slice(), [only] if only.ty.without_outer_references().deconstify() == class_ty);

        let entity = self
            .graph
            .class_mut(class)
            .ok_or_else(|| DetailingError::internal("member of a non-class"))?;
        let mut copy_constructor = false;
        match def.role {
            FunctionRole::Constructor => {
                entity.constructors.push(item);
                if parameters.is_empty() && entity.default_constructor.is_none() {
                    entity.default_constructor = Some(item);
                } else if is_copy && entity.copy_constructor.is_none() {
                    entity.copy_constructor = Some(item);
                    copy_constructor = true;
                }
            }
            FunctionRole::Destructor => {
                if entity.destructor.is_some() {
                    return Err(DetailingError::DuplicateDefinition {
                        name: "destructor".to_string(),
                        position: def.position,
                    });
                }
                entity.destructor = Some(item);
            }
            FunctionRole::Cast(CastDirection::From) => entity.from_casts.push(item),
            FunctionRole::Cast(CastDirection::To) => entity.to_casts.push(item),
            FunctionRole::Operator(..) => entity.operators.push(item),
            FunctionRole::Plain | FunctionRole::Accessor(_) => entity.methods.push(item),
        }
        if copy_constructor && let Some(function) = self.graph.function_mut(item) {
            function.flags |= FunctionFlags::COPY_CONSTRUCTOR;
        }
        Ok(())
    }

    /// One hoisted variant per omittable trailing parameter. Each records
    /// the default expressions it supplies.
    pub(crate) fn declare_optional_variants(
        &mut self,
        def: &FunctionDefinition<'_>,
        canonical: ItemId,
        class: Option<ItemId>,
    ) -> Result<()> {
        let optional = def.optional_parameter_count();
        if optional == 0 {
            return Ok(());
        }
        let header = self.graph.item(canonical).header.clone();
        let Some(source) = self.graph.function(canonical).cloned() else {
            return Ok(());
        };
        let total = source.parameters.len();

        for omitted in 1..=optional {
            let kept = total - omitted;
            let scope = self.graph.new_scope(header.parent_scope, ScopeOwner::Block);
            let mut variant = Function::new(scope, source.return_type.clone())
                .with_parameters(source.parameters[..kept].to_vec())
                .with_flags((source.flags | FunctionFlags::SYNTHESIZED) - FunctionFlags::COPY_CONSTRUCTOR);
            variant.accessor = source.accessor;
            variant.operator = source.operator;
            variant.orientation = source.orientation;
            variant.generator_parameter_type = source.generator_parameter_type.clone();
            variant.generator_return_type = source.generator_return_type.clone();
            variant.coroutine_return_type = source.coroutine_return_type.clone();
            variant.parent_class_type = source.parent_class_type.clone();
            variant.optional_variant_parent = Some(canonical);
            variant.supplied_defaults = def.parameters[kept..]
                .iter()
                .enumerate()
                .filter_map(|(offset, p)| p.default.map(|d| (kept + offset, d.id())))
                .collect();

            let variant_header = ItemHeader::new(header.name.clone(), header.parent_scope, header.module)
                .with_visibility(header.visibility)
                .with_position(header.position);
            let item = self.graph.add_item(variant_header, ItemKind::Function(variant));
            self.graph.set_scope_owner(scope, ScopeOwner::Function(item));

            if let Some(function) = self.graph.function_mut(canonical) {
                function.optional_variants.push(item);
            }
            self.graph.item_mut(canonical).header.public_hoisted.push(item);
            self.graph.module_mut(header.module).hoisted_items.push(item);
            if let Some(class) = class {
                self.register_member(class, item, def)?;
            }
            trace!(name = %header.name, kept, "declared optional variant");
        }
        Ok(())
    }

    /// Detail a function's default arguments and body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn detail_function_body(
        &mut self,
        frame: Frame,
        def: &'ast FunctionDefinition<'ast>,
        item: ItemId,
    ) -> Result<()> {
        let entry = self.graph.item(item);
        if entry.header.is_generic() {
            return Ok(());
        }
        let parent_scope = entry.header.parent_scope;
        let Some(function) = entry.as_function() else {
            return Err(DetailingError::internal("body of a non-function"));
        };
        if function.is_detailed {
            return Ok(());
        }
        let function_scope = function.scope;
        let parameters = function.parameters.clone();
        let synthesized_copy = function.is(FunctionFlags::SYNTHESIZED | FunctionFlags::COPY_CONSTRUCTOR);
        let is_constructor = function.is_constructor();

        for (index, parameter) in def.parameters.iter().enumerate() {
            let (Some(default), Some(expected)) = (parameter.default, parameters.get(index)) else {
                continue;
            };
            let info = self.detail_expr(frame, default, parent_scope)?;
            self.check_assignable(frame, default, &info.ty, &expected.ty, parameter.position)?;
        }

        if let Some(body) = def.body {
            for stmt in body.statements {
                self.detail_stmt(frame, stmt, function_scope)?;
            }
            self.store(frame, body.id, DetailHandle::Block { scope: function_scope }, body.position)?;
        }

        let implicit_super = if is_constructor && !synthesized_copy {
            self.implicit_super_calls(item, def.position)?
        } else {
            Vec::new()
        };

        let (variants, actions) = match self.graph.function_mut(item) {
            Some(function) => {
                function.is_detailed = true;
                (function.optional_variants.clone(), function.done_detailing.fire())
            }
            None => (Vec::new(), Vec::new()),
        };
        self.run_actions(actions);

        let handle = FunctionHandle {
            function: item,
            variants,
            implicit_super,
            is_template: false,
        };
        self.store(frame, def.id, DetailHandle::Function(handle), def.position)?;
        self.apply_attributes(frame, def.attributes, AttributeSubject::Function(item), def.id, parent_scope)?;
        debug!(name = %self.item_name(item), "detailed function");
        Ok(())
    }

    /// Default constructors of the parents a constructor does not call with
    /// `super(...)`. An explicit `super(...)` covers the first parent.
    fn implicit_super_calls(&mut self, constructor: ItemId, position: Position) -> Result<Vec<ItemId>> {
        let scope = self.graph.item(constructor).header.parent_scope;
        let Some(class) = self.graph.scope(scope).class_owner() else {
            return Ok(Vec::new());
        };
        let parents = self.graph.class(class).map(|c| c.parents.clone()).unwrap_or_default();
        let skip = usize::from(self.super_called.contains(&constructor));

        let mut calls = Vec::new();
        for parent in parents.into_iter().skip(skip) {
            self.ensure_synthesized(parent)?;
            match self.graph.class(parent).and_then(|c| c.default_constructor) {
                Some(default) => calls.push(default),
                None => {
                    return Err(DetailingError::NoDefaultConstructor {
                        class: self.item_name(parent),
                        reason: format!("required by the constructors of '{}'", self.item_name(class)),
                        position,
                    });
                }
            }
        }
        Ok(calls)
    }

    /// A function statement inside a body.
    pub(crate) fn detail_local_function(
        &mut self,
        frame: Frame,
        def: &'ast FunctionDefinition<'ast>,
        scope: ScopeId,
    ) -> Result<()> {
        let item = self.declare_function(frame, def, scope, None)?;
        self.detail_function_body(frame, def, item)
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Declare a typed global before bodies so functions can refer to it.
    fn predeclare_variable(
        &mut self,
        frame: Frame,
        decl: &'ast VariableDeclaration<'ast>,
        scope: ScopeId,
    ) -> Result<()> {
        let Some(written) = &decl.ty else {
            return Ok(());
        };
        let ty = self.declared_type(frame, decl, written, scope)?;
        self.check_redeclaration(decl.name.name, scope, decl.position)?;
        let variable = self.add_variable(frame, decl, ty, scope)?;
        self.record_declared(frame, decl.id, variable);
        Ok(())
    }

    fn declared_type(
        &mut self,
        frame: Frame,
        decl: &VariableDeclaration<'ast>,
        written: &TypeExpr<'ast>,
        scope: ScopeId,
    ) -> Result<Type> {
        let ty = self.resolve_type(frame, written, scope)?;
        Ok(if decl.is_constant { ty.constify() } else { ty })
    }

    /// Detail a variable declaration: its initializer, its type and the
    /// default constructor an uninitialised class value needs.
    pub(crate) fn detail_variable(
        &mut self,
        frame: Frame,
        decl: &'ast VariableDeclaration<'ast>,
        scope: ScopeId,
    ) -> Result<()> {
        let name = decl.name.name;
        let predeclared = self.declared_item(frame, decl.id);
        let explicit = match (predeclared, &decl.ty) {
            (Some(variable), _) => self.graph.variable(variable).map(|v| v.ty.clone()),
            (None, Some(written)) => Some(self.declared_type(frame, decl, written, scope)?),
            (None, None) => None,
        };

        let mut constructor = None;
        let ty = match decl.initializer {
            Some(initializer) => {
                let info = self.detail_expr(frame, initializer, scope)?;
                match explicit {
                    Some(ty) => {
                        self.check_assignable(frame, initializer, &info.ty, &ty, decl.position)?;
                        ty
                    }
                    None => {
                        let inferred = inferred_type(&info.ty);
                        if inferred.is_void() {
                            return Err(DetailingError::other(
                                decl.position,
                                format!("cannot declare '{name}' from a void value"),
                            ));
                        }
                        if decl.is_constant { inferred.constify() } else { inferred }
                    }
                }
            }
            None => {
                let ty = explicit.ok_or_else(|| {
                    DetailingError::other(
                        decl.position,
                        format!("cannot infer the type of '{name}' without an initializer"),
                    )
                })?;
                if ty.is_reference() {
                    return Err(DetailingError::other(
                        decl.position,
                        format!("reference '{name}' must be initialized"),
                    ));
                }
                if let Some(class) = ty.class_id()
                    && ty.indirection_level() == 0
                {
                    self.ensure_synthesized(class)?;
                    constructor = self.graph.class(class).and_then(|c| c.default_constructor);
                    if constructor.is_none() {
                        return Err(DetailingError::NoDefaultConstructor {
                            class: self.item_name(class),
                            reason: format!("variable '{name}' has no initializer"),
                            position: decl.position,
                        });
                    }
                }
                ty
            }
        };

        let variable = match predeclared {
            Some(variable) => variable,
            None => {
                self.check_redeclaration(name, scope, decl.position)?;
                self.add_variable(frame, decl, ty, scope)?
            }
        };
        if decl.is_constant
            && matches!(decl.initializer, Some(Expr::Literal(literal)) if !matches!(literal.value, LiteralValue::Null))
            && let ItemKind::Variable(entity) = &mut self.graph.item_mut(variable).kind
        {
            entity.is_literal = true;
        }

        let handle = VariableHandle { variable, constructor };
        self.store(frame, decl.id, DetailHandle::Variable(handle), decl.position)?;
        self.apply_attributes(frame, decl.attributes, AttributeSubject::Variable(variable), decl.id, scope)
    }

    fn add_variable(
        &mut self,
        frame: Frame,
        decl: &VariableDeclaration<'ast>,
        ty: Type,
        scope: ScopeId,
    ) -> Result<ItemId> {
        let owner = self.graph.enclosing_function(scope);
        let mut variable = Variable::new(ty).owned_by(owner);
        variable.is_export = decl.is_export;
        let header = ItemHeader::new(decl.name.name, scope, frame.module)
            .with_visibility(decl.visibility)
            .with_position(decl.position);
        let item = self.graph.add_item(header, ItemKind::Variable(variable));
        if decl.is_export {
            self.export_item(frame.module, decl.name.name, item, decl.position)?;
        }
        Ok(item)
    }

    /// Check that a `from` value may initialise a `to` slot, recording the
    /// user cast used on `node`. The slot's own `const` does not matter.
    pub(crate) fn check_assignable(
        &mut self,
        frame: Frame,
        node: &Expr<'ast>,
        from: &Type,
        to: &Type,
        position: Position,
    ) -> Result<()> {
        let target = to.deconstify();
        let m = compatibility_match(from, &target, &self.graph, &self.options);
        if !m.is_compatible() {
            return Err(DetailingError::TypeMismatch {
                expected: self.type_name(to),
                found: self.type_name(from),
                position,
            });
        }
        if let Some(function) = m.cast {
            self.handles.set_implicit_cast(
                frame.id,
                node.id(),
                ImplicitCast {
                    function,
                    to: target,
                },
            );
        }
        Ok(())
    }

    // ==========================================================================
    // Attributes
    // ==========================================================================

    /// Evaluate attribute arguments and run the registered callbacks.
    /// Unregistered attributes are logged and skipped.
    pub(crate) fn apply_attributes(
        &mut self,
        frame: Frame,
        attributes: &'ast [Attribute<'ast>],
        subject: AttributeSubject,
        node: NodeId,
        scope: ScopeId,
    ) -> Result<()> {
        for attribute in attributes {
            let path = attribute.path_text();
            if self
                .attributes
                .find_attribute(&path, subject.target(), frame.module)
                .is_none()
            {
                warn!(attribute = %path, "unknown attribute ignored");
                continue;
            }

            let mut arguments = Vec::with_capacity(attribute.arguments.len());
            for argument in attribute.arguments {
                arguments.push(self.attribute_value(frame, argument, scope, attribute.position)?);
            }

            let invocation = AttributeInvocation {
                subject,
                node,
                position: attribute.position,
                arguments: &arguments,
            };
            if let Some(registered) = self.attributes.find_attribute(&path, subject.target(), frame.module) {
                registered
                    .invoke(&mut self.graph, &invocation)
                    .map_err(|message| DetailingError::Attribute {
                        name: path.clone(),
                        message,
                        position: attribute.position,
                    })?;
            }
        }
        Ok(())
    }

    fn attribute_value(
        &mut self,
        frame: Frame,
        argument: &AttributeArgument<'ast>,
        scope: ScopeId,
        position: Position,
    ) -> Result<AttributeValue> {
        match *argument {
            AttributeArgument::Type(ty) => Ok(AttributeValue::Type(self.resolve_type(frame, ty, scope)?)),
            AttributeArgument::Expr(Expr::Literal(literal)) => Ok(match literal.value {
                LiteralValue::Int(v) => AttributeValue::Int(v),
                LiteralValue::Float(v) => AttributeValue::Float(f64::from(v.into_inner())),
                LiteralValue::Double(v) => AttributeValue::Float(v.into_inner()),
                LiteralValue::Bool(v) => AttributeValue::Bool(v),
                LiteralValue::String(v) => AttributeValue::String(v.to_string()),
                LiteralValue::Null => AttributeValue::Null,
            }),
            AttributeArgument::Expr(Expr::Fetch(fetch)) => {
                let found = self
                    .graph
                    .find_all(fetch.name.name, scope, ItemKindSet::empty(), Some(scope));
                match found.first() {
                    Some(&item) => Ok(AttributeValue::Item(item)),
                    None => Err(self.missing_name(fetch.name.name, scope, ItemKindSet::empty(), fetch.position)),
                }
            }
            AttributeArgument::Expr(_) => Err(DetailingError::other(
                position,
                "attribute arguments must be literals, names or types",
            )),
        }
    }
}

/// The item name a function declaration is registered under.
pub(crate) fn function_name<'a>(def: &FunctionDefinition<'a>) -> &'a str {
    match def.role {
        FunctionRole::Constructor => "constructor",
        FunctionRole::Destructor => "destructor",
        FunctionRole::Cast(CastDirection::From) => "from",
        FunctionRole::Cast(CastDirection::To) => "to",
        _ => def.name.name,
    }
}
